//! Proxy module for parsing and validating proxies
//!
//! This module provides functionality for:
//! - Parsing proxies from various formats (IP:PORT, IP:PORT:USER:PASS, etc.)
//! - Probing proxies through HTTP or SOCKS with a per-check timeout
//! - Scheduling probes under a concurrency cap, with retries for failures
//! - Categorizing and filtering working proxies by latency
//! - Saving the working set and a detailed report

pub mod aggregator;
pub mod checker;
pub mod models;
pub mod output;
pub mod parser;
pub mod retry;
pub mod scheduler;
pub mod speed;
pub mod transport;
pub mod validator;

pub use aggregator::{Aggregator, Ledger, RunReport};
pub use checker::{ProbePath, ProxyChecker};
pub use models::{
    CheckOutcome, EndpointRecord, ProbeResult, Proxy, ProxyAuth, ProxyReport, ProxyType, RunSummary,
};
pub use output::DetailedReport;
pub use parser::{ParsedInput, ProxyParser, RejectedLine};
pub use retry::RetryCoordinator;
pub use scheduler::{BoundedScheduler, ProbeFn, ProgressUpdate};
pub use speed::{SpeedCategory, SpeedFilter};
pub use transport::{ProbeTransport, ReqwestTransport};
pub use validator::ProxyValidator;
