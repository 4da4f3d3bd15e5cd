//! Error types for parsing, probing, configuration and persistence

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors produced when a proxy line cannot be turned into an endpoint
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty line")]
    Empty,

    #[error("missing port in {0:?}")]
    MissingPort(String),

    #[error("invalid port {0:?}")]
    InvalidPort(String),

    #[error("empty host")]
    EmptyHost,

    #[error("expected 2 or 4 colon-separated fields, found {0}")]
    FieldCount(usize),

    #[error("credentials must be in user:pass form")]
    InvalidCredentials,
}

/// Reasons a single probe attempt did not classify the endpoint as reachable
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeFailure {
    #[error("client setup failed: {0}")]
    Client(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("unsuccessful status {0}")]
    Status(u16),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("abandoned at wave deadline")]
    WaveTimeout,

    #[error("probe task cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for ProbeFailure {
    fn from(err: reqwest::Error) -> Self {
        ProbeFailure::Request(err.to_string())
    }
}

/// Invalid run configuration; fatal before any probing begins
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("concurrency limit must be greater than zero")]
    ZeroConcurrency,

    #[error("concurrency limit {limit} exceeds the maximum of {max}")]
    ConcurrencyTooLarge { limit: usize, max: usize },

    #[error("per-check timeout must be greater than zero")]
    ZeroTimeout,

    #[error("per-check timeout {0:?} is too large")]
    TimeoutTooLarge(Duration),

    #[error("at least one test target is required")]
    NoTestTargets,

    #[error("invalid test target {url:?}: {reason}")]
    InvalidTestTarget { url: String, reason: String },

    #[error("speed filter minimum {min:?} exceeds maximum {max:?}")]
    InvertedSpeedWindow { min: Duration, max: Duration },
}

/// Failures writing results to disk
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}
