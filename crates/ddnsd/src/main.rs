// # ddnsd - Hetzner DDNS Daemon
//
// This daemon is a THIN integration layer:
// - All reconciliation, retry and scheduling logic lives in ddns-core
// - Configuration is via environment variables only
//
// The ddnsd daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Wiring the HTTP IP resolver and the Hetzner zone provider
// 4. Running the engine until SIGINT/SIGTERM
//
// ## Configuration
//
// Every variable may also be given without the `DDNS_` prefix.
//
// ### Required
// - `DDNS_HETZNER_TOKEN`: Hetzner Cloud API token
// - `DDNS_ZONE_NAME` (single zone) or `DDNS_ZONE_<N>_NAME` (multiple zones)
//
// ### Zones
// - `DDNS_RECORDS`: Comma-separated records, `name` or `name:ttl` (default `@`)
// - `DDNS_ZONE_<N>_RECORDS`, `_RECORD_TYPE`, `_TTL`, `_IP_PROVIDER`: per-zone overrides
// - `DDNS_RECORD_TYPE`: A or AAAA (default A)
// - `DDNS_IP_PROVIDER`: Plain-text IP echo service (default https://api.ipify.org)
// - `DDNS_TTL`: Default zone TTL (unset = leave TTL alone)
// - `DDNS_PRESERVE_EXISTING_RECORDS`: Keep extra values of multi-value sets (default true)
//
// ### Timing
// - `DDNS_INTERVAL` (e.g. `5m`) or `DDNS_INTERVAL_SECONDS`
// - `DDNS_HTTP_TIMEOUT` (10s), `DDNS_REQUEST_TIMEOUT` (20s)
// - `DDNS_RETRY_ATTEMPTS` (3), `DDNS_RETRY_BASE_DELAY` (500ms), `DDNS_RETRY_MAX_DELAY` (5s)
//
// ### Logging
// - `DDNS_LOG_LEVEL`: trace, debug, info, warn, error (default info)
// - `DDNS_LOG_FORMAT`: text or json (default text)
// - `DDNS_USER_AGENT`: User-Agent sent to the IP provider
//
// ## Example
//
// ```bash
// export DDNS_HETZNER_TOKEN=your_token
// export DDNS_ZONE_NAME=example.com
// export DDNS_RECORDS=@,home:300
//
// ddnsd
// ```

mod config;

use anyhow::{Context, Result};
use config::{DaemonConfig, LogFormat};
use ddns_core::{CancellationToken, DdnsEngine, EngineEvent};
use ddns_ip_http::HttpIpResolver;
use ddns_provider_hetzner::HetznerProvider;
use std::process::ExitCode;
use tokio::sync::mpsc;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    // Load and validate configuration from environment
    let config = match DaemonConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e:#}");
            return DdnsExitCode::ConfigError.into();
        }
    };

    if let Err(e) = init_logging(config.log_level, config.log_format) {
        eprintln!("Failed to set tracing subscriber: {e:#}");
        return DdnsExitCode::ConfigError.into();
    }

    let zone_names: Vec<&str> = config.ddns.zones.iter().map(|z| z.name.as_str()).collect();
    info!(
        zones = ?zone_names,
        zone_count = zone_names.len(),
        interval = ?config.ddns.interval,
        preserve_records = config.ddns.preserve_records,
        retry_attempts = config.ddns.retry.attempts,
        retry_base_delay = ?config.ddns.retry.base_delay,
        retry_max_delay = ?config.ddns.retry.max_delay,
        http_timeout = ?config.ddns.http_timeout,
        request_timeout = ?config.ddns.request_timeout,
        log_format = ?config.log_format,
        "Starting ddnsd daemon"
    );

    let (engine, events) = match build_engine(config) {
        Ok(parts) => parts,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Startup failed");
            return DdnsExitCode::ConfigError.into();
        }
    };

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create tokio runtime");
            return DdnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(engine, events).await {
            error!(error = %format!("{e:#}"), "DDNS service stopped with error");
            DdnsExitCode::RuntimeError
        } else {
            info!("DDNS service stopped");
            DdnsExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Install the global tracing subscriber
fn init_logging(level: Level, format: LogFormat) -> Result<()> {
    let builder = FmtSubscriber::builder().with_max_level(level);
    match format {
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    }
    .context("global subscriber already set")
}

/// Wire the resolver and provider into an engine
fn build_engine(config: DaemonConfig) -> Result<(DdnsEngine, mpsc::Receiver<EngineEvent>)> {
    let resolver = HttpIpResolver::new(config.ddns.http_timeout, config.ddns.user_agent.as_str())
        .context("failed to create IP resolver")?;
    let provider = HetznerProvider::new(config.token, config.ddns.http_timeout)
        .context("failed to create Hetzner provider")?;

    let (engine, events) = DdnsEngine::new(Box::new(resolver), Box::new(provider), config.ddns)
        .context("failed to create engine")?;
    Ok((engine, events))
}

/// Run the engine until a shutdown signal arrives
async fn run_daemon(engine: DdnsEngine, events: mpsc::Receiver<EngineEvent>) -> Result<()> {
    let shutdown = CancellationToken::new();
    let signals = tokio::spawn(wait_for_shutdown(shutdown.clone())?);
    let event_log = tokio::spawn(log_events(events));

    let result = engine.run(shutdown).await;

    signals.abort();
    // Dropping the engine closes the event channel and ends the drain task.
    drop(engine);
    if let Err(e) = event_log.await {
        warn!(error = %e, "Event drain task failed");
    }

    result.context("engine stopped with error")
}

/// Drain engine events so the bounded channel never fills up
async fn log_events(mut events: mpsc::Receiver<EngineEvent>) {
    while let Some(event) = events.recv().await {
        debug!(event = ?event, "Engine event");
    }
}

/// Install SIGTERM/SIGINT handlers; the returned future cancels `shutdown`
/// when either arrives.
#[cfg(unix)]
fn wait_for_shutdown(
    shutdown: CancellationToken,
) -> Result<impl std::future::Future<Output = ()> + Send + 'static> {
    let mut sigterm = signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;

    Ok(async move {
        let name = tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        };
        info!(signal = name, "Received shutdown signal");
        shutdown.cancel();
    })
}

/// Fallback for non-Unix platforms (CTRL-C only)
#[cfg(not(unix))]
fn wait_for_shutdown(
    shutdown: CancellationToken,
) -> Result<impl std::future::Future<Output = ()> + Send + 'static> {
    Ok(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!(signal = "SIGINT", "Received shutdown signal");
                shutdown.cancel();
            }
            Err(e) => error!(error = %e, "Failed to wait for CTRL-C"),
        }
    })
}
