//! Transport used by the checker to send one HEAD request through a proxy

use crate::error::ProbeFailure;
use crate::proxy::models::Proxy;
use async_trait::async_trait;
use reqwest::{Client, Proxy as ReqwestProxy};
use std::time::Duration;

/// Sends a single bodiless request to `target` through `proxy`
///
/// Implementations return the response status code. Dropping the returned
/// future must abort the request.
#[async_trait]
pub trait ProbeTransport: Send + Sync {
    async fn head(
        &self,
        proxy: &Proxy,
        target: &str,
        timeout: Duration,
    ) -> Result<u16, ProbeFailure>;
}

/// `reqwest`-backed transport; credentials travel in the proxy URL
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport;

impl ReqwestTransport {
    pub fn new() -> Self {
        Self
    }

    /// Create a reqwest client with the proxy
    fn create_client(&self, proxy: &Proxy, timeout: Duration) -> Result<Client, ProbeFailure> {
        // `Proxy::http` would only route plain-http targets; probes may use https
        let reqwest_proxy = ReqwestProxy::all(proxy.url())
            .map_err(|e| ProbeFailure::Client(e.to_string()))?;

        Client::builder()
            .proxy(reqwest_proxy)
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| ProbeFailure::Client(e.to_string()))
    }
}

#[async_trait]
impl ProbeTransport for ReqwestTransport {
    async fn head(
        &self,
        proxy: &Proxy,
        target: &str,
        timeout: Duration,
    ) -> Result<u16, ProbeFailure> {
        let client = self.create_client(proxy, timeout)?;
        match client.head(target).send().await {
            Ok(response) => Ok(response.status().as_u16()),
            Err(e) if e.is_timeout() => Err(ProbeFailure::Timeout(timeout)),
            Err(e) => Err(e.into()),
        }
    }
}
