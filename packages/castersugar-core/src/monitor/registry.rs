//! Lifecycle management for stream monitors.
//!
//! The [`MonitorRegistry`] owns one entry per monitored key: the key's
//! snapshot store, its worker task, and the cancellation token that stops
//! the worker. Every worker token is a child of the registry's root token.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::store::{MetadataSupport, MonitorSnapshot, SnapshotStore};
use super::worker::MonitorWorker;
use crate::config::MonitorConfig;
use crate::error::{CoreError, CoreResult};
use crate::events::{EventEmitter, MonitorEvent, StopReason};
use crate::icy::MetadataFetcher;
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::utils::{now_millis, validate_stream_url};

/// Result of a successful [`MonitorRegistry::start_monitoring`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StartOutcome {
    /// A new monitor was created.
    Started,
    /// The key was already bound to this URL; nothing changed.
    AlreadyMonitoring,
    /// The key was bound to another URL; that monitor was replaced.
    Rebound,
}

/// Summary of one running monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveMonitor {
    pub key: String,
    pub stream_url: String,
    pub supports_metadata: MetadataSupport,
    /// Unix timestamp in milliseconds when monitoring started.
    pub started_at: u64,
    /// Seconds since monitoring started.
    pub elapsed_secs: u64,
}

struct MonitorEntry {
    store: Arc<SnapshotStore>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    started: Instant,
    started_at: u64,
}

/// Registry of active stream monitors, keyed by device.
///
/// Reads (`get_snapshot`, `is_monitoring`, `active_monitors`) only touch the
/// concurrent map. Lifecycle changes are serialized by an async mutex so a
/// rebind can await the old worker before the new one starts.
pub struct MonitorRegistry<S = TokioSpawner> {
    entries: DashMap<String, MonitorEntry>,
    lifecycle: Mutex<()>,
    fetcher: Arc<dyn MetadataFetcher>,
    emitter: Arc<dyn EventEmitter>,
    spawner: S,
    config: MonitorConfig,
    root_token: CancellationToken,
    closed: AtomicBool,
}

impl<S: TaskSpawner> MonitorRegistry<S> {
    /// Creates a registry.
    ///
    /// `root_token` is the parent of every worker token; cancelling it stops
    /// all workers at once.
    pub fn new(
        config: MonitorConfig,
        fetcher: Arc<dyn MetadataFetcher>,
        emitter: Arc<dyn EventEmitter>,
        spawner: S,
        root_token: CancellationToken,
    ) -> Self {
        Self {
            entries: DashMap::new(),
            lifecycle: Mutex::new(()),
            fetcher,
            emitter,
            spawner,
            config,
            root_token,
            closed: AtomicBool::new(false),
        }
    }

    /// Starts monitoring `url` under `key`.
    ///
    /// Starting the same binding again is a no-op that keeps history. Binding
    /// the key to a different URL tears down the old monitor first and starts
    /// a fresh one with empty history.
    pub async fn start_monitoring(&self, key: &str, url: &str) -> CoreResult<StartOutcome> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(CoreError::ShuttingDown);
        }
        validate_stream_url(url).map_err(CoreError::InvalidUrl)?;

        let _guard = self.lifecycle.lock().await;

        if self.closed.load(Ordering::SeqCst) {
            return Err(CoreError::ShuttingDown);
        }

        let mut outcome = StartOutcome::Started;
        let bound_url = self
            .entries
            .get(key)
            .map(|entry| entry.store.stream_url().to_string());

        if let Some(bound_url) = bound_url {
            if bound_url == url {
                log::debug!("[Registry] {} already monitoring {}", key, url);
                return Ok(StartOutcome::AlreadyMonitoring);
            }

            log::info!("[Registry] {} switching {} -> {}", key, bound_url, url);
            if let Some((key, entry)) = self.entries.remove(key) {
                self.teardown(&key, entry, StopReason::Rebound).await;
            }
            outcome = StartOutcome::Rebound;
        }

        let max = self.config.max_concurrent_monitors;
        if self.entries.len() >= max {
            log::warn!("[Registry] Rejecting {}: {} monitors active", key, max);
            return Err(CoreError::MonitorLimitReached(max));
        }

        let entry = self.spawn_monitor(key, url);
        self.entries.insert(key.to_string(), entry);

        log::info!("[Registry] {} monitoring {}", key, url);
        self.emitter.emit_monitor(MonitorEvent::Started {
            key: key.to_string(),
            stream_url: url.to_string(),
            timestamp: now_millis(),
        });

        Ok(outcome)
    }

    /// Stops monitoring `key`. Returns false if the key was not monitored.
    pub async fn stop_monitoring(&self, key: &str) -> bool {
        let _guard = self.lifecycle.lock().await;

        match self.entries.remove(key) {
            Some((key, entry)) => {
                self.teardown(&key, entry, StopReason::Requested).await;
                true
            }
            None => false,
        }
    }

    /// Returns a consistent copy of the key's state, if monitored.
    #[must_use]
    pub fn get_snapshot(&self, key: &str) -> Option<MonitorSnapshot> {
        self.entries.get(key).map(|entry| entry.store.read())
    }

    #[must_use]
    pub fn is_monitoring(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    #[must_use]
    pub fn monitor_count(&self) -> usize {
        self.entries.len()
    }

    /// Lists running monitors, oldest first.
    #[must_use]
    pub fn active_monitors(&self) -> Vec<ActiveMonitor> {
        let mut monitors: Vec<_> = self
            .entries
            .iter()
            .map(|entry| ActiveMonitor {
                key: entry.key().clone(),
                stream_url: entry.store.stream_url().to_string(),
                supports_metadata: entry.store.support(),
                started_at: entry.started_at,
                elapsed_secs: entry.started.elapsed().as_secs(),
            })
            .collect();
        monitors.sort_by(|a, b| b.elapsed_secs.cmp(&a.elapsed_secs).then(a.key.cmp(&b.key)));
        monitors
    }

    /// Stops every monitor that has run longer than the configured maximum
    /// duration and returns their keys.
    pub async fn reap_expired(&self) -> Vec<String> {
        let Some(max_age) = self.config.max_monitor_duration() else {
            return Vec::new();
        };

        let _guard = self.lifecycle.lock().await;

        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.started.elapsed() >= max_age)
            .map(|entry| entry.key().clone())
            .collect();

        for key in &expired {
            if let Some((key, entry)) = self.entries.remove(key) {
                log::info!(
                    "[Registry] {} exceeded {:?}, stopping",
                    key,
                    max_age
                );
                self.teardown(&key, entry, StopReason::Expired).await;
            }
        }

        expired
    }

    /// Stops every monitor and refuses further starts.
    pub async fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.root_token.cancel();

        let _guard = self.lifecycle.lock().await;

        let keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        log::info!("[Registry] Shutting down {} monitor(s)", keys.len());

        for key in keys {
            if let Some((key, entry)) = self.entries.remove(&key) {
                self.teardown(&key, entry, StopReason::Shutdown).await;
            }
        }
    }

    fn spawn_monitor(&self, key: &str, url: &str) -> MonitorEntry {
        let store = Arc::new(SnapshotStore::new(url));
        let cancel = self.root_token.child_token();

        let worker = MonitorWorker {
            key: key.to_string(),
            store: Arc::clone(&store),
            fetcher: Arc::clone(&self.fetcher),
            emitter: Arc::clone(&self.emitter),
            poll_interval: self.config.poll_interval(),
            unsupported_policy: self.config.unsupported_policy,
            cancel: cancel.clone(),
        };

        MonitorEntry {
            store,
            cancel,
            handle: self.spawner.spawn(worker.run()),
            started: Instant::now(),
            started_at: now_millis(),
        }
    }

    /// Cancels a removed entry's worker and waits for it to exit, aborting
    /// it after the stop timeout.
    async fn teardown(&self, key: &str, entry: MonitorEntry, reason: StopReason) {
        let MonitorEntry {
            store,
            cancel,
            mut handle,
            ..
        } = entry;

        cancel.cancel();

        let timeout = self.config.stop_timeout();
        match tokio::time::timeout(timeout, &mut handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::warn!("[Registry] {} worker ended abnormally: {}", key, e),
            Err(_) => {
                log::warn!(
                    "[Registry] {} worker did not stop within {:?}, aborting",
                    key,
                    timeout
                );
                handle.abort();
            }
        }

        log::info!("[Registry] {} stopped ({:?})", key, reason);
        self.emitter.emit_monitor(MonitorEvent::Stopped {
            key: key.to_string(),
            stream_url: store.stream_url().to_string(),
            reason,
            timestamp: now_millis(),
        });
    }
}

impl<S: TaskSpawner + 'static> MonitorRegistry<S> {
    /// Spawns the periodic expiry sweep.
    ///
    /// Returns `None` when expiry is disabled. The sweep holds only a weak
    /// reference and ends when the registry is dropped or shut down.
    pub fn spawn_expiry_sweeper(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.config.max_monitor_duration().is_none() {
            return None;
        }

        let registry = Arc::downgrade(self);
        let period = self.config.expiry_check_interval();
        let cancel = self.root_token.clone();

        Some(self.spawner.spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {}
                }

                let Some(registry) = registry.upgrade() else {
                    break;
                };
                let reaped = registry.reap_expired().await;
                if !reaped.is_empty() {
                    log::info!("[Registry] Expiry sweep stopped {} monitor(s)", reaped.len());
                }
            }
            log::debug!("[Registry] Expiry sweeper stopped");
        }))
    }
}
