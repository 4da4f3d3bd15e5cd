//! Proxy Checker - concurrent proxy validation
//!
//! Parses proxy lists in the common text formats, probes every proxy under a
//! concurrency cap with retries, and reports the working set along with
//! latency categories.

pub mod config;
pub mod error;
pub mod proxy;

pub use config::{RunConfiguration, Settings};
pub use error::{ConfigError, ParseError, PersistenceError, ProbeFailure};
pub use proxy::*;

/// Application result type
pub type Result<T> = anyhow::Result<T>;
