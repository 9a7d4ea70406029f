//! Polling loop for one monitored stream.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::store::{MetadataSupport, SnapshotStore};
use crate::config::UnsupportedPolicy;
use crate::events::{EventEmitter, MonitorEvent};
use crate::icy::{FetchOutcome, FetchResult, MetadataFetcher};
use crate::utils::now_millis;

/// What the loop does after handling one fetch result.
#[derive(Debug, PartialEq, Eq)]
enum Next {
    Sleep,
    Idle,
}

/// One long-lived task per monitored key.
///
/// The worker is the only writer of its [`SnapshotStore`]. Both suspension
/// points (the fetch and the sleep) race the cancellation token, so a stop
/// request never waits for a slow origin.
pub(crate) struct MonitorWorker {
    pub(crate) key: String,
    pub(crate) store: Arc<SnapshotStore>,
    pub(crate) fetcher: Arc<dyn MetadataFetcher>,
    pub(crate) emitter: Arc<dyn EventEmitter>,
    pub(crate) poll_interval: Duration,
    pub(crate) unsupported_policy: UnsupportedPolicy,
    pub(crate) cancel: CancellationToken,
}

impl MonitorWorker {
    pub(crate) async fn run(self) {
        log::debug!(
            "[Monitor] {} polling {} every {:?}",
            self.key,
            self.store.stream_url(),
            self.poll_interval
        );

        loop {
            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                result = self.fetcher.fetch(self.store.stream_url()) => result,
            };

            if self.handle(result) == Next::Idle {
                log::info!(
                    "[Monitor] {} has no ICY metadata, idling until stopped",
                    self.key
                );
                self.cancel.cancelled().await;
                break;
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        log::debug!("[Monitor] {} stopped", self.key);
    }

    fn handle(&self, result: FetchResult<FetchOutcome>) -> Next {
        match result {
            Ok(FetchOutcome::Track(track)) => {
                self.store.set_support(MetadataSupport::Supported);
                if let Some(snapshot) = self.store.write(track) {
                    log::info!("[Monitor] {} now playing: {}", self.key, snapshot.raw_title);
                    self.emitter.emit_monitor(MonitorEvent::TrackChanged {
                        key: self.key.clone(),
                        stream_url: self.store.stream_url().to_string(),
                        timestamp: snapshot.observed_at,
                        track: snapshot,
                    });
                }
                Next::Sleep
            }
            Ok(FetchOutcome::NoMetadata) => {
                self.store.set_support(MetadataSupport::Supported);
                log::trace!("[Monitor] {} sent no metadata this cycle", self.key);
                Next::Sleep
            }
            Ok(FetchOutcome::Unsupported) => {
                let previous = self.store.set_support(MetadataSupport::Unsupported);
                if previous != MetadataSupport::Unsupported {
                    self.emitter.emit_monitor(MonitorEvent::Unsupported {
                        key: self.key.clone(),
                        stream_url: self.store.stream_url().to_string(),
                        timestamp: now_millis(),
                    });
                }
                match self.unsupported_policy {
                    UnsupportedPolicy::StopPolling => Next::Idle,
                    UnsupportedPolicy::KeepPolling => Next::Sleep,
                }
            }
            Err(e) if e.is_transient() => {
                log::debug!("[Monitor] {} fetch failed: {}", self.key, e);
                Next::Sleep
            }
            Err(e) => {
                log::warn!("[Monitor] {} fetch failed: {}", self.key, e);
                Next::Sleep
            }
        }
    }
}
