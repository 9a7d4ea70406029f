//! Application bootstrap and dependency wiring.
//!
//! This module is the composition root: the HTTP client, fetcher, event
//! bridge, cancellation token and registry are created and wired together
//! here and nowhere else.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::MonitorConfig;
use crate::error::{CoreError, CoreResult};
use crate::events::BroadcastEventBridge;
use crate::icy::HttpIcyFetcher;
use crate::monitor::MonitorRegistry;
use crate::protocol_constants::EVENT_CHANNEL_CAPACITY;
use crate::runtime::TokioSpawner;

/// Container for all bootstrapped services.
#[derive(Clone)]
pub struct BootstrappedServices {
    /// Owns every stream monitor.
    pub registry: Arc<MonitorRegistry>,
    /// Fans monitor events out to subscribers.
    pub event_bridge: Arc<BroadcastEventBridge>,
    /// Cancelled on shutdown; the registry's root token is a child of it.
    pub cancel_token: CancellationToken,
}

impl BootstrappedServices {
    /// Starts background maintenance (the monitor expiry sweep).
    pub fn start_background_tasks(&self) {
        if self.registry.spawn_expiry_sweeper().is_some() {
            log::debug!("[Bootstrap] Expiry sweeper started");
        } else {
            log::debug!("[Bootstrap] Monitor expiry disabled");
        }
    }

    /// Initiates graceful shutdown of all services.
    pub async fn shutdown(&self) {
        log::info!("[Bootstrap] Beginning graceful shutdown...");

        self.cancel_token.cancel();
        self.registry.shutdown().await;

        log::info!("[Bootstrap] Shutdown complete");
    }
}

/// Bootstraps all services with proper dependency ordering.
///
/// Must be called from within a Tokio runtime.
pub fn bootstrap_services(config: &MonitorConfig) -> CoreResult<BootstrappedServices> {
    config.validate().map_err(CoreError::Configuration)?;

    let spawner = TokioSpawner::try_current()?;
    let fetcher = Arc::new(HttpIcyFetcher::from_config(config)?);

    let event_bridge = Arc::new(BroadcastEventBridge::new(EVENT_CHANNEL_CAPACITY));
    let cancel_token = CancellationToken::new();

    let registry = Arc::new(MonitorRegistry::new(
        config.clone(),
        fetcher,
        event_bridge.clone(),
        spawner,
        cancel_token.child_token(),
    ));

    log::info!(
        "[Bootstrap] Monitor registry ready (poll every {:?}, max {} monitors)",
        config.poll_interval(),
        config.max_concurrent_monitors
    );

    Ok(BootstrappedServices {
        registry,
        event_bridge,
        cancel_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{MonitorEvent, StopReason};

    #[tokio::test]
    async fn bootstrap_wires_registry_to_bridge() {
        let services = bootstrap_services(&MonitorConfig::default()).unwrap();
        let mut events = services.event_bridge.subscribe();

        services
            .registry
            .start_monitoring("dev-1", "http://127.0.0.1:9/live")
            .await
            .unwrap();
        assert!(matches!(
            events.recv().await.unwrap(),
            MonitorEvent::Started { .. }
        ));

        services.shutdown().await;
        assert!(services.cancel_token.is_cancelled());
        assert_eq!(services.registry.monitor_count(), 0);
        assert!(matches!(
            events.recv().await.unwrap(),
            MonitorEvent::Stopped {
                reason: StopReason::Shutdown,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let config = MonitorConfig {
            poll_interval_secs: 0,
            ..Default::default()
        };
        let err = bootstrap_services(&config).err().unwrap();
        assert!(matches!(err, CoreError::Configuration(_)));
    }

    #[test]
    fn bootstrap_requires_runtime() {
        let err = bootstrap_services(&MonitorConfig::default()).err().unwrap();
        assert!(matches!(err, CoreError::Internal(_)));
    }
}
