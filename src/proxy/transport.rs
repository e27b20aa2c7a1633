//! Probe transport: how a single request is routed through a proxy

use crate::proxy::models::ProxyDescriptor;
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Proxy as ReqwestProxy};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Why a single probe did not count as alive
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("unable to build client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("{0}")]
    Request(#[from] reqwest::Error),
    #[error("unreachable: {0}")]
    Unreachable(String),
    #[error("cancelled")]
    Cancelled,
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// Sends one request to `test_url` routed through `proxy`.
///
/// The routing target is a per-call argument: implementations must not
/// keep it in state shared between concurrent calls. Any HTTP response
/// counts as success, whatever its status.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn probe(&self, proxy: &ProxyDescriptor, test_url: &Url) -> Result<(), ProbeError>;
}

/// Production transport backed by `reqwest`.
///
/// Builds a dedicated client for every probe so each request carries its
/// own proxy route and no connection is ever reused across proxies.
/// Certificate verification is off: the proxies are untrusted third
/// parties and only reachability is being measured.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    probe_timeout: Option<Duration>,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound each individual request in addition to the batch deadline
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = Some(timeout);
        self
    }

    /// Create a reqwest client routed through the proxy.
    ///
    /// Credentials embedded in the proxy URL are sent as
    /// `Proxy-Authorization: Basic` by reqwest.
    fn create_client(&self, proxy: &ProxyDescriptor) -> Result<Client, ProbeError> {
        let route = ReqwestProxy::all(proxy.target().clone()).map_err(ProbeError::Client)?;

        let mut builder = Client::builder()
            .proxy(route)
            .danger_accept_invalid_certs(true)
            .pool_max_idle_per_host(0);

        if let Some(timeout) = self.probe_timeout {
            builder = builder.timeout(timeout);
        }

        builder.build().map_err(ProbeError::Client)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn probe(&self, proxy: &ProxyDescriptor, test_url: &Url) -> Result<(), ProbeError> {
        let client = self.create_client(proxy)?;
        let response = client.get(test_url.clone()).send().await?;
        debug!("[{}] => status {}", proxy, response.status());
        Ok(())
    }
}
