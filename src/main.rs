use anyhow::{Context, Result};
use clap::Parser;
use proxy_pulse::app::{self, RunConfig, DEFAULT_RUN_TIMEOUT};
use proxy_pulse::proxy::checker::{DEFAULT_CONCURRENCY, DEFAULT_TEST_URL};
use proxy_pulse::proxy::CheckerConfig;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Check a list of HTTP/HTTPS proxies and keep the ones that answer
#[derive(Parser)]
#[command(name = "proxy-pulse")]
#[command(about = "Check a list of HTTP/HTTPS proxies and keep the ones that answer")]
struct Cli {
    /// Input file with one proxy URL per line
    #[arg(default_value = "proxies.txt")]
    input: PathBuf,

    /// Output file for alive proxies
    #[arg(short, long, default_value = "alive.txt")]
    output: PathBuf,

    /// Number of concurrent probes
    #[arg(short = 'n', long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Deadline for the whole run in seconds
    #[arg(long, default_value_t = DEFAULT_RUN_TIMEOUT.as_secs())]
    timeout: u64,

    /// Timeout for each individual probe in seconds
    #[arg(long)]
    probe_timeout: Option<u64>,

    /// URL to request through every proxy
    #[arg(long, default_value = DEFAULT_TEST_URL)]
    test_url: Url,

    /// Drop duplicate addresses before probing
    #[arg(long)]
    dedup: bool,

    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .init();

    let mut checker = CheckerConfig::new()
        .with_concurrency(cli.concurrency)
        .with_test_url(cli.test_url);
    if let Some(secs) = cli.probe_timeout {
        checker = checker.with_probe_timeout(Duration::from_secs(secs));
    }

    let config = RunConfig {
        input: cli.input,
        output: cli.output,
        timeout: Duration::from_secs(cli.timeout),
        dedup: cli.dedup,
        checker,
    };

    let report = app::run(&config)
        .await
        .with_context(|| format!("proxy check of {:?} failed", config.input))?;

    println!("{} of {} proxies alive", report.alive, report.candidates);
    Ok(())
}
