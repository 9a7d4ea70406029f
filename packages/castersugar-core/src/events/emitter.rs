//! Event emitter abstraction for decoupling monitors from transport.
//!
//! The registry and its workers depend on the [`EventEmitter`] trait rather
//! than a concrete broadcast channel, so tests can record events and an
//! embedding application can deliver them however it likes.

use super::MonitorEvent;

/// Trait for emitting monitor events without knowledge of transport.
pub trait EventEmitter: Send + Sync {
    /// Emits a monitor lifecycle or track change event.
    fn emit_monitor(&self, event: MonitorEvent);
}

/// No-op emitter for embedding without subscribers, or testing.
pub struct NoopEventEmitter;

impl EventEmitter for NoopEventEmitter {
    fn emit_monitor(&self, _event: MonitorEvent) {}
}

/// Logging emitter for debugging and development.
///
/// Logs all events at debug level.
pub struct LoggingEventEmitter;

impl EventEmitter for LoggingEventEmitter {
    fn emit_monitor(&self, event: MonitorEvent) {
        tracing::debug!(?event, "monitor_event");
    }
}
