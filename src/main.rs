//! dh-ddns-updater - Dynamic DNS updater daemon for Dreamhost.

use anyhow::Context;
use clap::Parser;
use dh_ddns_updater::{Config, DreamhostProvider, IpDetector, Reconciler, Scheduler, State};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dh-ddns-updater")]
#[command(about = "Keeps Dreamhost DNS records pointed at this host's public IP")]
#[command(version)]
struct Cli {
    /// Path to config file
    config: Option<PathBuf>,

    /// Run a single check and exit
    #[arg(long)]
    once: bool,

    /// Validate configuration and exit
    #[arg(long, conflicts_with = "once")]
    check_config: bool,
}

/// Process exit codes.
#[derive(Debug, Clone, Copy)]
enum DaemonExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration or state error at startup
    StartupError = 1,
    /// A `--once` pass failed
    RuntimeError = 2,
}

impl From<DaemonExitCode> for ExitCode {
    fn from(code: DaemonExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Filter for `config.log_level`, unknown levels fall back to info.
/// `RUST_LOG` directives, when set, take precedence.
fn env_filter(config: &Config, rust_log: &str) -> EnvFilter {
    let level = config.log_level_filter().unwrap_or(LevelFilter::INFO);
    EnvFilter::builder()
        .with_default_directive(level.into())
        .parse_lossy(rust_log)
}

fn init_tracing(config: &Config) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(config, &rust_log))
        .init();
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    let config = Config::load_from(path)
        .with_context(|| format!("loading config from {}", path.display()))?;
    init_tracing(&config);
    config.validate().context("validating config")?;
    Ok(config)
}

fn build_scheduler(config: &Config) -> anyhow::Result<Scheduler> {
    let state = State::load(&config.state_path)
        .with_context(|| format!("loading state from {}", config.state_path.display()))?;

    let resolver = IpDetector::new(config.ip_service.clone(), config.http_timeout())?;
    tracing::debug!(
        service = resolver.service(),
        state = %config.state_path.display(),
        "Initialized"
    );
    let provider = DreamhostProvider::new(
        config.dreamhost_api_key.clone(),
        config.api_base_url.clone(),
        config.http_timeout(),
    )?;

    let reconciler = Reconciler::new(
        Box::new(resolver),
        Box::new(provider),
        config.domains.clone(),
        config.state_path.clone(),
    );

    Ok(Scheduler::new(reconciler, config.check_interval(), state))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(Config::default_path);

    let config = match load_config(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to initialize updater: {:#}", e);
            return DaemonExitCode::StartupError.into();
        }
    };

    if cli.check_config {
        println!(
            "{}: OK ({} domain(s))",
            config_path.display(),
            config.domains.len()
        );
        return DaemonExitCode::CleanShutdown.into();
    }

    let mut scheduler = match build_scheduler(&config) {
        Ok(scheduler) => scheduler,
        Err(e) => {
            tracing::error!(error = ?e, "Failed to initialize updater");
            return DaemonExitCode::StartupError.into();
        }
    };

    let cancel = CancellationToken::new();
    tokio::spawn(forward_shutdown(cancel.clone()));

    if cli.once {
        return if scheduler.run_pass(&cancel).await {
            DaemonExitCode::CleanShutdown.into()
        } else {
            DaemonExitCode::RuntimeError.into()
        };
    }

    scheduler.run(cancel).await;
    DaemonExitCode::CleanShutdown.into()
}

/// Cancel `cancel` on the first SIGINT or SIGTERM.
async fn forward_shutdown(cancel: CancellationToken) {
    match wait_for_signal().await {
        Ok(signal) => {
            tracing::info!(signal, "Received signal");
            cancel.cancel();
        }
        Err(e) => tracing::error!(error = %e, "Failed to install signal handlers"),
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("SIGINT")
}
