//! Latency buckets and the optional speed acceptance window

use crate::proxy::models::EndpointRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Latencies below this are fast
pub const FAST_BELOW: Duration = Duration::from_millis(500);

/// Latencies below this (and at least `FAST_BELOW`) are medium
pub const MEDIUM_BELOW: Duration = Duration::from_millis(1000);

/// Discrete latency bucket, assigned whether or not filtering is enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpeedCategory {
    Fast,
    Medium,
    Slow,
    #[default]
    Unknown,
}

impl SpeedCategory {
    /// Categorize a probe latency; `None` means the endpoint was unreachable
    pub fn from_latency(latency: Option<Duration>) -> Self {
        match latency {
            Some(l) if l < FAST_BELOW => SpeedCategory::Fast,
            Some(l) if l < MEDIUM_BELOW => SpeedCategory::Medium,
            Some(_) => SpeedCategory::Slow,
            None => SpeedCategory::Unknown,
        }
    }
}

impl fmt::Display for SpeedCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeedCategory::Fast => write!(f, "fast"),
            SpeedCategory::Medium => write!(f, "medium"),
            SpeedCategory::Slow => write!(f, "slow"),
            SpeedCategory::Unknown => write!(f, "unknown"),
        }
    }
}

/// Inclusive latency window applied to reachable endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeedFilter {
    pub enabled: bool,
    pub min_latency: Duration,
    pub max_latency: Duration,
}

impl Default for SpeedFilter {
    fn default() -> Self {
        Self {
            enabled: false,
            min_latency: Duration::ZERO,
            max_latency: MEDIUM_BELOW,
        }
    }
}

impl SpeedFilter {
    /// An enabled filter over `[min_latency, max_latency]`
    pub fn window(min_latency: Duration, max_latency: Duration) -> Self {
        Self {
            enabled: true,
            min_latency,
            max_latency,
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    /// Whether a reachable endpoint with this latency stays in the working set
    pub fn accepts(&self, latency: Duration) -> bool {
        !self.enabled || (self.min_latency..=self.max_latency).contains(&latency)
    }

    /// Whether a probe result must be dropped from the working set
    ///
    /// Unreachable endpoints are never "excluded"; they are simply failing.
    pub fn excludes(&self, reachable: bool, latency: Option<Duration>) -> bool {
        match (reachable, latency) {
            (true, Some(latency)) => !self.accepts(latency),
            _ => false,
        }
    }

    /// Assign speed categories and mark records that fall outside the window
    pub fn apply(&self, records: &mut [EndpointRecord]) {
        for record in records {
            let reachable = record.final_outcome.reachable;
            let latency = record.final_outcome.latency.filter(|_| reachable);
            record.speed_category = SpeedCategory::from_latency(latency);
            record.excluded_by_speed_filter = self.excludes(reachable, latency);
        }
    }
}
