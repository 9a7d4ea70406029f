//! Castersugar Monitor - headless ICY metadata monitor.
//!
//! Watches a set of `key=url` stream bindings, logs track changes as they
//! happen, and periodically reports what every monitored stream is playing.
//! Runs until Ctrl+C or SIGTERM.

mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use castersugar_core::{bootstrap_services, BootstrappedServices, LoggingEventEmitter};
use clap::Parser;
use tokio::signal;

use crate::config::{ServerConfig, WatchBinding};

/// Castersugar Monitor - follows "now playing" metadata of internet radio streams.
#[derive(Parser, Debug)]
#[command(name = "castersugar-monitor")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "CASTERSUGAR_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Stream to watch, as KEY=URL (repeatable, added to the config file's list).
    #[arg(short, long = "watch", value_name = "KEY=URL")]
    watch: Vec<WatchBinding>,

    /// Seconds between metadata polls (overrides config file).
    #[arg(short = 'i', long)]
    poll_interval: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Castersugar Monitor v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(secs) = args.poll_interval {
        config.monitor.poll_interval_secs = secs;
    }
    config.watch.extend(args.watch);

    if config.watch.is_empty() {
        anyhow::bail!("Nothing to monitor: pass --watch KEY=URL or list streams under `watch:`");
    }

    let services =
        bootstrap_services(&config.monitor).context("Failed to bootstrap services")?;

    if args.log_level >= log::LevelFilter::Debug {
        services
            .event_bridge
            .set_external_emitter(Arc::new(LoggingEventEmitter));
    }

    services.start_background_tasks();

    start_watching(&services, &config.watch).await?;

    log::info!("Monitoring {} stream(s)", services.registry.monitor_count());

    let status_handle = (config.status_interval_secs > 0).then(|| {
        let services = services.clone();
        let period = Duration::from_secs(config.status_interval_secs);
        tokio::spawn(report_status(services, period))
    });

    // Wait for shutdown signal
    shutdown_signal().await;

    log::info!("Shutdown signal received, cleaning up...");

    services.shutdown().await;

    if let Some(handle) = status_handle {
        handle.abort();
    }

    log::info!("Shutdown complete");
    Ok(())
}

/// Starts a monitor for every binding.
///
/// If one fails, the monitors already started are shut down before the
/// error is returned.
async fn start_watching(services: &BootstrappedServices, bindings: &[WatchBinding]) -> Result<()> {
    for binding in bindings {
        let started = services
            .registry
            .start_monitoring(&binding.key, &binding.url)
            .await
            .with_context(|| format!("Failed to start monitoring {}", binding));

        match started {
            Ok(outcome) => log::debug!("{} -> {:?}", binding.key, outcome),
            Err(e) => {
                services.shutdown().await;
                return Err(e);
            }
        }
    }
    Ok(())
}

/// Logs what every active monitor is playing, every `period`.
async fn report_status(services: BootstrappedServices, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await;

    loop {
        tokio::select! {
            _ = services.cancel_token.cancelled() => break,
            _ = interval.tick() => {}
        }

        for monitor in services.registry.active_monitors() {
            let playing = services
                .registry
                .get_snapshot(&monitor.key)
                .and_then(|snapshot| snapshot.current)
                .map_or_else(|| "-".to_string(), |current| current.raw_title);

            log::info!(
                "[Status] {} ({}s, metadata {:?}): {}",
                monitor.key,
                monitor.elapsed_secs,
                monitor.supports_metadata,
                playing
            );
        }
    }
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
