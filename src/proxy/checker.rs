//! Proxy checker module for probing a single proxy

use crate::error::ProbeFailure;
use crate::proxy::models::{ProbeResult, Proxy, ProxyType};
use crate::proxy::transport::{ProbeTransport, ReqwestTransport};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Route a probe takes, by proxy protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbePath {
    /// Plain HTTP(S) proxy forwarding the request
    HttpProxy,
    /// SOCKS tunnel carrying the request
    SocksTunnel,
}

impl ProbePath {
    pub fn for_protocol(proxy_type: ProxyType) -> Self {
        if proxy_type.is_socks() {
            ProbePath::SocksTunnel
        } else {
            ProbePath::HttpProxy
        }
    }
}

/// Only a 2xx response counts as reachable, on every path
fn classify(status: u16, elapsed: Duration) -> ProbeResult {
    if (200..300).contains(&status) {
        ProbeResult::working(elapsed)
    } else {
        ProbeResult::failed(ProbeFailure::Status(status))
    }
}

/// Proxy checker for validating proxies
///
/// Never fails: every error becomes an unreachable [`ProbeResult`].
#[derive(Clone)]
pub struct ProxyChecker {
    transport: Arc<dyn ProbeTransport>,
}

impl ProxyChecker {
    /// Create a new proxy checker backed by reqwest
    pub fn new() -> Self {
        Self::with_transport(Arc::new(ReqwestTransport::new()))
    }

    /// Create a proxy checker over a custom transport
    pub fn with_transport(transport: Arc<dyn ProbeTransport>) -> Self {
        Self { transport }
    }

    /// Check a single proxy against one target
    ///
    /// When `timeout` elapses the request future is dropped, which closes the
    /// underlying connection.
    pub async fn probe(&self, proxy: &Proxy, target: &str, timeout: Duration) -> ProbeResult {
        let path = ProbePath::for_protocol(proxy.proxy_type);
        let start = Instant::now();

        let request = self.transport.head(proxy, target, timeout);
        let result = match tokio::time::timeout(timeout, request).await {
            Ok(Ok(status)) => classify(status, start.elapsed()),
            Ok(Err(failure)) => ProbeResult::failed(failure),
            Err(_) => ProbeResult::failed(ProbeFailure::Timeout(timeout)),
        };

        match &result.failure {
            None => debug!(
                proxy = %proxy,
                ?path,
                latency = ?result.latency,
                "probe succeeded"
            ),
            Some(failure) => debug!(proxy = %proxy, ?path, %failure, "probe failed"),
        }

        result
    }
}

impl Default for ProxyChecker {
    fn default() -> Self {
        Self::new()
    }
}
