//! Run orchestration: load the list, probe it, write the survivors

use crate::proxy::{CheckerConfig, ProbeContext, ProxyChecker, ProxyParser};
use crate::Result;
use log::{info, warn};
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Default overall deadline for a run
pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(120);

/// Settings for one run of the checker
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// File with one proxy URL per line
    pub input: PathBuf,
    /// File that receives the alive proxies
    pub output: PathBuf,
    /// Deadline for the whole batch
    pub timeout: Duration,
    /// Drop repeated addresses before probing
    pub dedup: bool,
    pub checker: CheckerConfig,
}

impl RunConfig {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            timeout: DEFAULT_RUN_TIMEOUT,
            dedup: false,
            checker: CheckerConfig::default(),
        }
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Number of parseable proxies that were probed
    pub candidates: usize,
    /// Number of proxies that answered
    pub alive: usize,
    /// Where the alive list was written; `None` when nothing was alive
    pub output: Option<PathBuf>,
}

/// Run with the reqwest transport, a deadline of `config.timeout` and
/// Ctrl-C wired to cancellation.
pub async fn run(config: &RunConfig) -> Result<RunReport> {
    let checker = ProxyChecker::with_config(config.checker.clone());
    let ctx = ProbeContext::with_timeout(config.timeout);

    run_interruptible(config, &checker, &ctx, tokio::signal::ctrl_c()).await
}

/// Like [`run_with`], cancelling `ctx` if `interrupt` resolves first.
///
/// The listener is torn down before returning.
pub async fn run_interruptible<F>(
    config: &RunConfig,
    checker: &ProxyChecker,
    ctx: &ProbeContext,
    interrupt: F,
) -> Result<RunReport>
where
    F: Future<Output = io::Result<()>> + Send + 'static,
{
    let listener = watch_interrupt(ctx, interrupt);
    let result = run_with(config, checker, ctx).await;
    listener.abort();
    let _ = listener.await;
    result
}

fn watch_interrupt<F>(ctx: &ProbeContext, interrupt: F) -> JoinHandle<()>
where
    F: Future<Output = io::Result<()>> + Send + 'static,
{
    let ctx = ctx.clone();
    tokio::spawn(async move {
        if interrupt.await.is_ok() {
            warn!("interrupted, cancelling outstanding probes");
            ctx.cancel();
        }
    })
}

/// Load, probe and persist using the given checker and context.
///
/// Fails only when the input yields no candidate or the output cannot be
/// written. Zero alive proxies is a normal outcome: no file is written and
/// any existing output file is left as it was.
pub async fn run_with(
    config: &RunConfig,
    checker: &ProxyChecker,
    ctx: &ProbeContext,
) -> Result<RunReport> {
    let mut proxies = ProxyParser::parse_file(&config.input)?;
    if config.dedup {
        proxies = ProxyParser::dedup(proxies);
    }
    let candidates = proxies.len();
    info!(
        "checking {} proxies from {:?} (concurrency {})",
        candidates,
        config.input,
        checker.config().concurrency
    );

    let alive = checker.check_proxies(proxies, ctx).await;
    if alive.is_empty() {
        warn!("no proxies alive");
        return Ok(RunReport {
            candidates,
            alive: 0,
            output: None,
        });
    }

    ProxyParser::save_to_file(&alive, &config.output)?;
    info!(
        "{} of {} proxies alive, saved to {:?}",
        alive.len(),
        candidates,
        config.output
    );

    Ok(RunReport {
        candidates,
        alive: alive.len(),
        output: Some(config.output.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::proxy::{ProbeError, ProxyDescriptor, Transport};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::fs;
    use std::sync::Arc;
    use tokio::sync::oneshot;
    use url::Url;

    /// Oracle that only answers through the listed hosts
    struct FakeOracle {
        reachable: HashSet<&'static str>,
    }

    impl FakeOracle {
        fn checker(reachable: &[&'static str]) -> ProxyChecker {
            let oracle = FakeOracle {
                reachable: reachable.iter().copied().collect(),
            };
            ProxyChecker::with_transport(CheckerConfig::new().with_concurrency(2), Arc::new(oracle))
        }
    }

    #[async_trait]
    impl Transport for FakeOracle {
        async fn probe(
            &self,
            proxy: &ProxyDescriptor,
            _: &Url,
        ) -> std::result::Result<(), ProbeError> {
            if self.reachable.contains(proxy.host()) {
                Ok(())
            } else {
                Err(ProbeError::Unreachable("connection refused".to_string()))
            }
        }
    }

    /// Oracle that never answers
    struct StalledOracle;

    #[async_trait]
    impl Transport for StalledOracle {
        async fn probe(
            &self,
            _: &ProxyDescriptor,
            _: &Url,
        ) -> std::result::Result<(), ProbeError> {
            tokio::time::sleep(Duration::from_secs(600)).await;
            Ok(())
        }
    }

    fn setup(content: &str) -> (tempfile::TempDir, RunConfig) {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("proxies.txt");
        fs::write(&input, content).unwrap();
        let config = RunConfig::new(input, dir.path().join("alive.txt"));
        (dir, config)
    }

    fn ctx() -> ProbeContext {
        ProbeContext::with_timeout(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_mixed_input_writes_only_alive() {
        let (_dir, config) = setup("http://10.0.0.1:8080\nnot-a-url\nhttp://10.0.0.2:3128\n");
        let checker = FakeOracle::checker(&["10.0.0.1"]);

        let report = run_with(&config, &checker, &ctx()).await.unwrap();

        assert_eq!(report.candidates, 2);
        assert_eq!(report.alive, 1);
        assert_eq!(report.output.as_ref(), Some(&config.output));
        assert_eq!(fs::read_to_string(&config.output).unwrap(), "http://10.0.0.1:8080");
    }

    #[tokio::test]
    async fn test_empty_input_is_fatal() {
        let (_dir, config) = setup("");
        let checker = FakeOracle::checker(&["10.0.0.1"]);

        let result = run_with(&config, &checker, &ctx()).await;

        assert!(matches!(result, Err(Error::NoValidCandidates { .. })));
        assert!(!config.output.exists());
    }

    #[tokio::test]
    async fn test_missing_input_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig::new(dir.path().join("nope.txt"), dir.path().join("alive.txt"));
        let checker = FakeOracle::checker(&[]);

        let result = run_with(&config, &checker, &ctx()).await;

        assert!(matches!(result, Err(Error::Load { .. })));
    }

    #[tokio::test]
    async fn test_all_dead_writes_nothing() {
        let (_dir, config) = setup("http://10.0.0.1:8080\nhttp://10.0.0.2:3128");
        let checker = FakeOracle::checker(&[]);

        let report = run_with(&config, &checker, &ctx()).await.unwrap();

        assert_eq!(report.candidates, 2);
        assert_eq!(report.alive, 0);
        assert!(report.output.is_none());
        assert!(!config.output.exists());
    }

    #[tokio::test]
    async fn test_unwritable_output_is_fatal() {
        let (dir, mut config) = setup("http://10.0.0.1:8080");
        config.output = dir.path().join("missing-dir").join("alive.txt");
        let checker = FakeOracle::checker(&["10.0.0.1"]);

        let result = run_with(&config, &checker, &ctx()).await;

        assert!(matches!(result, Err(Error::Persistence { .. })));
    }

    #[tokio::test]
    async fn test_dedup_option() {
        let content = "http://10.0.0.1:8080\nhttp://10.0.0.1:8080\nhttp://10.0.0.2:3128";

        let (_dir, config) = setup(content);
        let report = run_with(&config, &FakeOracle::checker(&["10.0.0.1"]), &ctx())
            .await
            .unwrap();
        assert_eq!(report.candidates, 3);
        assert_eq!(report.alive, 2);

        let (_dir, mut config) = setup(content);
        config.dedup = true;
        let report = run_with(&config, &FakeOracle::checker(&["10.0.0.1"]), &ctx())
            .await
            .unwrap();
        assert_eq!(report.candidates, 2);
        assert_eq!(report.alive, 1);
        assert_eq!(fs::read_to_string(&config.output).unwrap(), "http://10.0.0.1:8080");
    }

    #[tokio::test]
    async fn test_interrupt_listener_is_released() {
        let (_dir, config) = setup("http://10.0.0.1:8080");
        let checker = FakeOracle::checker(&["10.0.0.1"]);
        let ctx = ctx();
        let (signal_tx, signal_rx) = oneshot::channel::<()>();
        let interrupt = async move {
            signal_rx
                .await
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
        };

        let report = run_interruptible(&config, &checker, &ctx, interrupt)
            .await
            .unwrap();

        assert_eq!(report.alive, 1);
        assert!(signal_tx.is_closed());
        assert!(signal_tx.send(()).is_err());
        assert!(!ctx.is_done());
    }

    #[tokio::test]
    async fn test_interrupt_cancels_context() {
        let (_dir, config) = setup("http://10.0.0.1:8080");
        let ctx = ProbeContext::with_timeout(Duration::from_secs(60));
        let checker = ProxyChecker::with_transport(
            CheckerConfig::new().with_concurrency(1),
            Arc::new(StalledOracle),
        );
        let interrupt = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(())
        };

        let report = run_interruptible(&config, &checker, &ctx, interrupt)
            .await
            .unwrap();

        assert_eq!(report.alive, 0);
        assert!(ctx.is_done());
        assert!(!config.output.exists());
    }
}
