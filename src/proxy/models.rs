//! Proxy data models

use crate::error::ProbeFailure;
use crate::proxy::speed::SpeedCategory;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Proxy type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProxyType {
    #[default]
    Http,
    Https,
    Socks4,
    Socks5,
}

impl ProxyType {
    /// Map a lower-cased URL scheme to a proxy type
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme {
            "http" => Some(ProxyType::Http),
            "https" => Some(ProxyType::Https),
            "socks4" => Some(ProxyType::Socks4),
            "socks5" => Some(ProxyType::Socks5),
            _ => None,
        }
    }

    pub fn is_socks(&self) -> bool {
        matches!(self, ProxyType::Socks4 | ProxyType::Socks5)
    }
}

impl fmt::Display for ProxyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyType::Http => write!(f, "http"),
            ProxyType::Https => write!(f, "https"),
            ProxyType::Socks4 => write!(f, "socks4"),
            ProxyType::Socks5 => write!(f, "socks5"),
        }
    }
}

/// Proxy authentication credentials
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProxyAuth {
    pub username: String,
    pub password: String,
}

impl ProxyAuth {
    pub fn new(username: String, password: String) -> Self {
        Self { username, password }
    }
}

/// A single candidate proxy endpoint
///
/// Only the parser builds these from text, and it never produces one with an
/// empty host or a zero port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Proxy {
    pub host: String,
    pub port: u16,
    pub proxy_type: ProxyType,
    pub auth: Option<ProxyAuth>,
}

impl Proxy {
    /// Create a new proxy without authentication
    pub fn new(host: String, port: u16, proxy_type: ProxyType) -> Self {
        Self {
            host,
            port,
            proxy_type,
            auth: None,
        }
    }

    /// Create a new proxy with authentication
    pub fn with_auth(
        host: String,
        port: u16,
        proxy_type: ProxyType,
        username: String,
        password: String,
    ) -> Self {
        Self {
            host,
            port,
            proxy_type,
            auth: Some(ProxyAuth::new(username, password)),
        }
    }

    /// Canonical `protocol://[user:pass@]host:port` form
    pub fn url(&self) -> String {
        let auth_part = self.auth.as_ref().map_or(String::new(), |auth| {
            format!("{}:{}@", auth.username, auth.password)
        });

        format!("{}://{}{}:{}", self.proxy_type, auth_part, self.host, self.port)
    }
}

impl fmt::Display for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url())
    }
}

/// What the protocol checker observed for one probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub reachable: bool,
    pub latency: Option<Duration>,
    pub failure: Option<ProbeFailure>,
}

impl ProbeResult {
    pub fn working(latency: Duration) -> Self {
        Self {
            reachable: true,
            latency: Some(latency),
            failure: None,
        }
    }

    pub fn failed(failure: ProbeFailure) -> Self {
        Self {
            reachable: false,
            latency: None,
            failure: Some(failure),
        }
    }
}

/// Result of one probe attempt against the endpoint at `index`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    /// Position of the endpoint in the run's input list
    pub index: usize,
    /// 1 for the initial pass, incremented per retry
    pub attempt: u32,
    pub reachable: bool,
    pub latency: Option<Duration>,
    pub failure: Option<ProbeFailure>,
}

impl CheckOutcome {
    pub fn from_probe(index: usize, attempt: u32, probe: ProbeResult) -> Self {
        Self {
            index,
            attempt,
            reachable: probe.reachable,
            latency: probe.latency,
            failure: probe.failure,
        }
    }

    pub fn failed(index: usize, attempt: u32, failure: ProbeFailure) -> Self {
        Self::from_probe(index, attempt, ProbeResult::failed(failure))
    }

    pub fn latency_ms(&self) -> Option<u64> {
        self.latency.map(|latency| latency.as_millis() as u64)
    }
}

/// Finalized per-endpoint entry of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointRecord {
    pub endpoint: Proxy,
    /// Outcome of the last attempt, not the best one
    pub final_outcome: CheckOutcome,
    pub attempts_used: u32,
    pub speed_category: SpeedCategory,
    pub excluded_by_speed_filter: bool,
}

impl EndpointRecord {
    /// Reachable and kept by the speed filter
    pub fn is_working(&self) -> bool {
        self.final_outcome.reachable && !self.excluded_by_speed_filter
    }

    pub fn to_report(&self) -> ProxyReport {
        ProxyReport {
            proxy: self.endpoint.url(),
            speed: self.final_outcome.latency_ms(),
            success_rate: u8::from(self.final_outcome.reachable),
            category: self.speed_category,
            attempts: self.attempts_used,
        }
    }
}

/// Structured output entry for one working endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyReport {
    pub proxy: String,
    /// Latency in milliseconds
    pub speed: Option<u64>,
    pub success_rate: u8,
    pub category: SpeedCategory,
    pub attempts: u32,
}

/// Aggregate counts for a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total_input: usize,
    pub rejected_lines: usize,
    pub working: usize,
    pub failing: usize,
    pub excluded_by_speed_filter: usize,
    pub fast: usize,
    pub medium: usize,
    pub slow: usize,
    pub unknown: usize,
}
