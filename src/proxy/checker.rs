//! Proxy checker module for probing proxy liveness concurrently

use crate::proxy::context::ProbeContext;
use crate::proxy::models::ProxyDescriptor;
use crate::proxy::transport::{ProbeError, ReqwestTransport, Transport};
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use url::Url;

/// Default number of probes in flight at once
pub const DEFAULT_CONCURRENCY: usize = 500;

/// Default reachability oracle
pub const DEFAULT_TEST_URL: &str = "https://api.ipify.org?format=json";

/// Configuration for proxy checker
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// Maximum number of probes holding network resources at once
    pub concurrency: usize,
    /// URL every probe requests through its proxy
    pub test_url: Url,
    /// Optional bound on each individual probe
    pub probe_timeout: Option<Duration>,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            test_url: Url::parse(DEFAULT_TEST_URL).expect("default test url is valid"),
            probe_timeout: None,
        }
    }
}

impl CheckerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the concurrency ceiling, kept within `1..=Semaphore::MAX_PERMITS`
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = clamp_concurrency(concurrency);
        self
    }

    pub fn with_test_url(mut self, url: Url) -> Self {
        self.test_url = url;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = Some(timeout);
        self
    }
}

fn clamp_concurrency(concurrency: usize) -> usize {
    concurrency.clamp(1, Semaphore::MAX_PERMITS)
}

/// Proxy checker for finding live proxies
#[derive(Clone)]
pub struct ProxyChecker {
    config: CheckerConfig,
    transport: Arc<dyn Transport>,
}

impl ProxyChecker {
    /// Create a new proxy checker with default configuration
    pub fn new() -> Self {
        Self::with_config(CheckerConfig::default())
    }

    /// Create a new proxy checker probing over HTTP via reqwest
    pub fn with_config(config: CheckerConfig) -> Self {
        let mut transport = ReqwestTransport::new();
        if let Some(timeout) = config.probe_timeout {
            transport = transport.with_probe_timeout(timeout);
        }
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a proxy checker with a custom transport
    pub fn with_transport(config: CheckerConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// Probe a single proxy, giving up when `ctx` is done.
    pub async fn check_proxy(
        &self,
        proxy: &ProxyDescriptor,
        ctx: &ProbeContext,
    ) -> Result<(), ProbeError> {
        if ctx.is_done() {
            return Err(ctx.done().await);
        }
        tokio::select! {
            reason = ctx.done() => Err(reason),
            result = self.transport.probe(proxy, &self.config.test_url) => result,
        }
    }

    /// Probe every proxy and return the ones that answered.
    ///
    /// One task is spawned per proxy; each must take a permit from a gate
    /// of `concurrency` slots before touching the network and gives it
    /// back as soon as its probe finishes. Probes still waiting or in
    /// flight when `ctx` is done count as dead. The result is in
    /// completion order, and duplicates in the input stay duplicated.
    pub async fn check_proxies(
        &self,
        proxies: Vec<ProxyDescriptor>,
        ctx: &ProbeContext,
    ) -> Vec<ProxyDescriptor> {
        if proxies.is_empty() {
            return Vec::new();
        }

        let gate = Arc::new(Semaphore::new(clamp_concurrency(self.config.concurrency)));
        let (alive_tx, mut alive_rx) = mpsc::channel(proxies.len());
        let mut workers = JoinSet::new();

        for proxy in proxies {
            let gate = Arc::clone(&gate);
            let alive_tx = alive_tx.clone();
            let checker = self.clone();
            let ctx = ctx.clone();

            workers.spawn(async move {
                let permit = tokio::select! {
                    reason = ctx.done() => Err(reason),
                    permit = gate.acquire_owned() => {
                        permit.map_err(|_| ProbeError::Cancelled)
                    }
                };

                let outcome = match permit {
                    Ok(permit) => {
                        let outcome = checker.check_proxy(&proxy, &ctx).await;
                        drop(permit);
                        outcome
                    }
                    Err(reason) => Err(reason),
                };

                match outcome {
                    Ok(()) => {
                        info!("[{}] => ok", proxy);
                        // capacity equals the number of workers, so this never waits
                        let _ = alive_tx.send(proxy).await;
                    }
                    Err(e) => warn!("[{}] => error: {}", proxy, e),
                }
            });
        }
        drop(alive_tx);

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                warn!("probe task failed: {}", e);
            }
        }

        let mut alive = Vec::new();
        while let Some(proxy) = alive_rx.recv().await {
            alive.push(proxy);
        }
        alive
    }
}

impl Default for ProxyChecker {
    fn default() -> Self {
        Self::new()
    }
}
