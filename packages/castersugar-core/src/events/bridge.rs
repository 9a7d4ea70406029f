//! Bridge implementation that maps monitor events to a broadcast channel.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use super::emitter::EventEmitter;
use super::MonitorEvent;

/// Bridges monitor events to a `tokio::sync::broadcast` channel.
///
/// Events are also forwarded to an optional external emitter that can be
/// set after construction (the monitor binary uses it for debug logging).
#[derive(Clone)]
pub struct BroadcastEventBridge {
    tx: broadcast::Sender<MonitorEvent>,
    external_emitter: Arc<RwLock<Option<Arc<dyn EventEmitter>>>>,
}

impl BroadcastEventBridge {
    /// Creates a new bridge with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self::with_sender(tx)
    }

    /// Creates a new bridge wrapping an existing broadcast sender.
    pub fn with_sender(tx: broadcast::Sender<MonitorEvent>) -> Self {
        Self {
            tx,
            external_emitter: Arc::new(RwLock::new(None)),
        }
    }

    /// Sets an external emitter that receives every event before broadcast.
    pub fn set_external_emitter(&self, emitter: Arc<dyn EventEmitter>) {
        *self.external_emitter.write() = Some(emitter);
    }

    /// Returns a new receiver for the broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.tx.subscribe()
    }
}

impl EventEmitter for BroadcastEventBridge {
    fn emit_monitor(&self, event: MonitorEvent) {
        if let Some(ref emitter) = *self.external_emitter.read() {
            emitter.emit_monitor(event.clone());
        }
        if let Err(e) = self.tx.send(event) {
            log::trace!("[EventBridge] No broadcast receivers: {}", e);
        }
    }
}
