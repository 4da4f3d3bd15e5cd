//! Run configuration and the on-disk settings file

use crate::error::ConfigError;
use crate::proxy::speed::SpeedFilter;
use crate::Result;
use anyhow::Context;
use rand::seq::IndexedRandom;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::warn;

/// Default timeout for proxy checks in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Default number of concurrent checks
const DEFAULT_CONCURRENCY: usize = 20;

/// Default number of additional attempts for failed proxies
const DEFAULT_RETRY_COUNT: u32 = 1;

/// Wave deadline as a multiple of the per-check timeout
const WAVE_DEADLINE_FACTOR: u32 = 3;

/// Default URLs to test proxies against
const DEFAULT_TEST_URLS: [&str; 5] = [
    "https://www.google.com",
    "https://www.cloudflare.com",
    "https://www.microsoft.com",
    "https://www.amazon.com",
    "https://www.github.com",
];

fn default_test_urls() -> Vec<String> {
    DEFAULT_TEST_URLS.iter().map(|url| url.to_string()).collect()
}

/// Options for one validation run
///
/// Built once by the caller and only read by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfiguration {
    /// Maximum number of probes in flight at once
    pub concurrency_limit: usize,
    /// Deadline for a single probe
    pub per_check_timeout: Duration,
    /// Additional attempts for endpoints that failed
    pub retry_count: u32,
    /// Probe URLs; one is picked at random per attempt
    pub test_targets: Vec<String>,
    pub speed_filter: SpeedFilter,
}

impl Default for RunConfiguration {
    fn default() -> Self {
        Self {
            concurrency_limit: DEFAULT_CONCURRENCY,
            per_check_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry_count: DEFAULT_RETRY_COUNT,
            test_targets: default_test_urls(),
            speed_filter: SpeedFilter::disabled(),
        }
    }
}

impl RunConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_concurrency(mut self, concurrency_limit: usize) -> Self {
        self.concurrency_limit = concurrency_limit;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.per_check_timeout = timeout;
        self
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    pub fn with_test_targets(mut self, targets: Vec<String>) -> Self {
        self.test_targets = targets;
        self
    }

    pub fn with_speed_filter(mut self, speed_filter: SpeedFilter) -> Self {
        self.speed_filter = speed_filter;
        self
    }

    /// How long the scheduler waits for one wave before abandoning it
    pub fn wave_deadline(&self) -> Duration {
        self.per_check_timeout.saturating_mul(WAVE_DEADLINE_FACTOR)
    }

    /// Pick a probe URL uniformly at random
    pub fn pick_target(&self) -> Option<&str> {
        self.test_targets
            .choose(&mut rand::rng())
            .map(String::as_str)
    }

    /// Reject configurations a run cannot start with
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.concurrency_limit == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.concurrency_limit > Semaphore::MAX_PERMITS {
            return Err(ConfigError::ConcurrencyTooLarge {
                limit: self.concurrency_limit,
                max: Semaphore::MAX_PERMITS,
            });
        }
        if self.per_check_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.per_check_timeout.checked_mul(WAVE_DEADLINE_FACTOR).is_none() {
            return Err(ConfigError::TimeoutTooLarge(self.per_check_timeout));
        }
        if self.test_targets.is_empty() {
            return Err(ConfigError::NoTestTargets);
        }
        for target in &self.test_targets {
            let url = Url::parse(target).map_err(|e| ConfigError::InvalidTestTarget {
                url: target.clone(),
                reason: e.to_string(),
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::InvalidTestTarget {
                    url: target.clone(),
                    reason: format!("unsupported scheme {}", url.scheme()),
                });
            }
        }
        let filter = &self.speed_filter;
        if filter.enabled && filter.min_latency > filter.max_latency {
            return Err(ConfigError::InvertedSpeedWindow {
                min: filter.min_latency,
                max: filter.max_latency,
            });
        }
        Ok(())
    }
}

/// Speed filter section of the settings file, in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedFilterSettings {
    pub enabled: bool,
    pub min_speed: u64,
    pub max_speed: u64,
}

impl Default for SpeedFilterSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            min_speed: 0,
            max_speed: 1000,
        }
    }
}

impl From<&SpeedFilterSettings> for SpeedFilter {
    fn from(settings: &SpeedFilterSettings) -> Self {
        SpeedFilter {
            enabled: settings.enabled,
            min_latency: Duration::from_millis(settings.min_speed),
            max_latency: Duration::from_millis(settings.max_speed),
        }
    }
}

/// Contents of `config/config.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub proxy_file: PathBuf,
    pub output_file: PathBuf,
    /// Optional JSON report with per-proxy details
    pub details_file: Option<PathBuf>,
    /// Single test URL from older config files
    pub test_url: Option<String>,
    #[serde(default)]
    pub test_urls: Vec<String>,
    /// Per-check timeout in seconds
    pub timeout: u64,
    pub concurrent_checks: usize,
    pub retry_count: u32,
    /// Overwrite the input list with the working proxies
    pub save_to_input_file: bool,
    pub speed_filter: SpeedFilterSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            proxy_file: PathBuf::from("data/proxy.txt"),
            output_file: PathBuf::from("data/working_proxies.txt"),
            details_file: None,
            test_url: None,
            test_urls: default_test_urls(),
            timeout: DEFAULT_TIMEOUT_SECS,
            concurrent_checks: DEFAULT_CONCURRENCY,
            retry_count: DEFAULT_RETRY_COUNT,
            save_to_input_file: false,
            speed_filter: SpeedFilterSettings::default(),
        }
    }
}

impl Settings {
    /// Default location of the settings file
    pub fn default_path() -> PathBuf {
        Path::new("config").join("config.json")
    }

    /// Load settings from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let settings = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(settings)
    }

    /// Load settings, falling back to defaults when the file is missing or broken
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(&path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("{:#}; using default settings", e);
                Self::default()
            }
        }
    }

    /// Test targets, preferring `test_urls` over the legacy `test_url`
    ///
    /// Falls back to the built-in list when neither is set.
    pub fn test_targets(&self) -> Vec<String> {
        if !self.test_urls.is_empty() {
            return self.test_urls.clone();
        }
        match &self.test_url {
            Some(url) => vec![url.clone()],
            None => default_test_urls(),
        }
    }

    /// Every file the working set is written to
    ///
    /// Always `output_file`; the input list is overwritten as well when
    /// `save_to_input_file` is set.
    pub fn working_set_paths(&self) -> Vec<&Path> {
        let mut paths = vec![self.output_file.as_path()];
        if self.save_to_input_file {
            paths.push(self.proxy_file.as_path());
        }
        paths
    }

    pub fn run_configuration(&self) -> RunConfiguration {
        RunConfiguration {
            concurrency_limit: self.concurrent_checks,
            per_check_timeout: Duration::from_secs(self.timeout),
            retry_count: self.retry_count,
            test_targets: self.test_targets(),
            speed_filter: SpeedFilter::from(&self.speed_filter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_configuration_default() {
        let config = RunConfiguration::default();
        assert_eq!(config.concurrency_limit, DEFAULT_CONCURRENCY);
        assert_eq!(
            config.per_check_timeout,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        );
        assert_eq!(config.retry_count, DEFAULT_RETRY_COUNT);
        assert!(!config.speed_filter.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_run_configuration_builder() {
        let config = RunConfiguration::new()
            .with_concurrency(50)
            .with_timeout(Duration::from_millis(1500))
            .with_retry_count(3)
            .with_test_targets(vec!["http://example.com".to_string()]);

        assert_eq!(config.concurrency_limit, 50);
        assert_eq!(config.per_check_timeout, Duration::from_millis(1500));
        assert_eq!(config.wave_deadline(), Duration::from_millis(4500));
        assert_eq!(config.retry_count, 3);
        assert_eq!(config.pick_target(), Some("http://example.com"));
    }

    #[test]
    fn test_pick_target_stays_in_set() {
        let config = RunConfiguration::default();
        for _ in 0..20 {
            let target = config.pick_target().unwrap();
            assert!(config.test_targets.iter().any(|t| t == target));
        }
    }

    #[test]
    fn test_validate_rejects_bad_configurations() {
        let base = RunConfiguration::default();

        assert_eq!(
            base.clone().with_concurrency(0).validate(),
            Err(ConfigError::ZeroConcurrency)
        );
        assert_eq!(
            base.clone().with_timeout(Duration::ZERO).validate(),
            Err(ConfigError::ZeroTimeout)
        );
        assert_eq!(
            base.clone().with_test_targets(Vec::new()).validate(),
            Err(ConfigError::NoTestTargets)
        );
        assert!(matches!(
            base.clone()
                .with_test_targets(vec!["not a url".to_string()])
                .validate(),
            Err(ConfigError::InvalidTestTarget { .. })
        ));
        assert!(matches!(
            base.clone()
                .with_test_targets(vec!["ftp://example.com".to_string()])
                .validate(),
            Err(ConfigError::InvalidTestTarget { .. })
        ));
        assert!(matches!(
            base.with_speed_filter(SpeedFilter::window(
                Duration::from_millis(500),
                Duration::from_millis(100)
            ))
            .validate(),
            Err(ConfigError::InvertedSpeedWindow { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_oversized_limits() {
        let base = RunConfiguration::default();

        assert_eq!(
            base.clone().with_concurrency(usize::MAX).validate(),
            Err(ConfigError::ConcurrencyTooLarge {
                limit: usize::MAX,
                max: Semaphore::MAX_PERMITS,
            })
        );
        assert!(base
            .clone()
            .with_concurrency(Semaphore::MAX_PERMITS)
            .validate()
            .is_ok());

        let huge = Duration::from_secs(u64::MAX);
        let config = base.with_timeout(huge);
        assert_eq!(config.validate(), Err(ConfigError::TimeoutTooLarge(huge)));
        assert_eq!(config.wave_deadline(), Duration::MAX);
    }

    #[test]
    fn test_disabled_inverted_window_is_allowed() {
        let mut filter =
            SpeedFilter::window(Duration::from_millis(500), Duration::from_millis(100));
        filter.enabled = false;
        let config = RunConfiguration::default().with_speed_filter(filter);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_settings_from_json() {
        let json = r#"{
            "proxy_file": "data/proxy.txt",
            "output_file": "data/working_proxies.txt",
            "test_urls": ["https://www.google.com", "https://www.github.com"],
            "timeout": 3,
            "concurrent_checks": 50,
            "save_to_input_file": false,
            "retry_count": 2,
            "speed_filter": {"enabled": true, "max_speed": 800, "min_speed": 50}
        }"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        let config = settings.run_configuration();

        assert_eq!(config.concurrency_limit, 50);
        assert_eq!(config.per_check_timeout, Duration::from_secs(3));
        assert_eq!(config.retry_count, 2);
        assert_eq!(config.test_targets.len(), 2);
        assert_eq!(
            config.speed_filter,
            SpeedFilter::window(Duration::from_millis(50), Duration::from_millis(800))
        );
        assert_eq!(
            settings.working_set_paths(),
            vec![Path::new("data/working_proxies.txt")]
        );
    }

    #[test]
    fn test_settings_legacy_test_url() {
        let json = r#"{"test_url": "http://httpbin.org/status/200"}"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(
            settings.test_targets(),
            vec!["http://httpbin.org/status/200"]
        );
        assert_eq!(settings.concurrent_checks, DEFAULT_CONCURRENCY);

        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.test_targets().len(), DEFAULT_TEST_URLS.len());
    }

    #[test]
    fn test_settings_save_to_input_file() {
        let settings = Settings {
            save_to_input_file: true,
            ..Default::default()
        };
        assert_eq!(
            settings.working_set_paths(),
            vec![settings.output_file.as_path(), settings.proxy_file.as_path()]
        );
    }

    #[test]
    fn test_settings_load_or_default() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert_eq!(Settings::load_or_default(&missing), Settings::default());

        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"concurrent_checks": 7}"#).unwrap();
        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.concurrent_checks, 7);
        assert_eq!(settings.timeout, DEFAULT_TIMEOUT_SECS);
    }
}
