//! Stream monitoring: per-key workers, their snapshot stores, and the
//! registry that owns them.

mod registry;
mod store;
mod worker;

pub use registry::{ActiveMonitor, MonitorRegistry, StartOutcome};
pub use store::{MetadataSnapshot, MetadataSupport, MonitorSnapshot, SnapshotStore};

#[cfg(test)]
pub(crate) mod test_support {
    //! Test doubles shared by the worker and registry tests.

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use crate::events::{EventEmitter, MonitorEvent};
    use crate::icy::{FetchOutcome, FetchResult, MetadataFetcher};

    /// Fetcher that replays a fixed script of results.
    ///
    /// Once the script is exhausted it returns the repeat result, or
    /// `NoMetadata` when none was given.
    #[derive(Default)]
    pub struct ScriptedFetcher {
        script: Mutex<VecDeque<FetchResult<FetchOutcome>>>,
        repeat: Option<FetchResult<FetchOutcome>>,
        hang: bool,
        calls: AtomicUsize,
        urls: Mutex<Vec<String>>,
    }

    impl ScriptedFetcher {
        pub fn new(script: Vec<FetchResult<FetchOutcome>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                ..Default::default()
            })
        }

        pub fn repeating(result: FetchResult<FetchOutcome>) -> Arc<Self> {
            Arc::new(Self {
                repeat: Some(result),
                ..Default::default()
            })
        }

        /// A fetcher whose fetches never complete.
        pub fn hanging() -> Arc<Self> {
            Arc::new(Self {
                hang: true,
                ..Default::default()
            })
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn urls(&self) -> Vec<String> {
            self.urls.lock().clone()
        }
    }

    #[async_trait]
    impl MetadataFetcher for ScriptedFetcher {
        async fn fetch(&self, url: &str) -> FetchResult<FetchOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.urls.lock().push(url.to_string());

            if self.hang {
                return std::future::pending().await;
            }

            let next = self.script.lock().pop_front();
            next.or_else(|| self.repeat.clone())
                .unwrap_or(Ok(FetchOutcome::NoMetadata))
        }
    }

    /// Emitter that keeps every event.
    #[derive(Default)]
    pub struct RecordingEmitter {
        events: Mutex<Vec<MonitorEvent>>,
    }

    impl RecordingEmitter {
        pub fn events(&self) -> Vec<MonitorEvent> {
            self.events.lock().clone()
        }
    }

    impl EventEmitter for RecordingEmitter {
        fn emit_monitor(&self, event: MonitorEvent) {
            self.events.lock().push(event);
        }
    }
}
