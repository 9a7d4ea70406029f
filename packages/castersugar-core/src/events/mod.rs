//! Event system for monitor lifecycle and track changes.
//!
//! This module provides:
//! - [`EventEmitter`] trait for the registry and workers to emit events
//! - [`BroadcastEventBridge`] for fanning events out to subscribers
//! - [`MonitorEvent`] and [`StopReason`]

mod bridge;
mod emitter;

pub use bridge::BroadcastEventBridge;
pub use emitter::{EventEmitter, LoggingEventEmitter, NoopEventEmitter};

use serde::Serialize;

use crate::monitor::MetadataSnapshot;

/// Why a monitor was stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StopReason {
    /// `stop_monitoring` was called.
    Requested,
    /// The key was rebound to a different stream URL.
    Rebound,
    /// The monitor ran longer than the configured maximum duration.
    Expired,
    /// The registry is shutting down.
    Shutdown,
}

/// Events emitted by the monitoring subsystem.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MonitorEvent {
    /// A monitor was started for a key.
    Started {
        key: String,
        #[serde(rename = "streamUrl")]
        stream_url: String,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// A monitor was stopped and its entry removed.
    Stopped {
        key: String,
        #[serde(rename = "streamUrl")]
        stream_url: String,
        reason: StopReason,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// The current track for a key changed.
    TrackChanged {
        key: String,
        #[serde(rename = "streamUrl")]
        stream_url: String,
        track: MetadataSnapshot,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// The stream turned out not to carry ICY metadata.
    Unsupported {
        key: String,
        #[serde(rename = "streamUrl")]
        stream_url: String,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}

impl MonitorEvent {
    /// Returns the monitor key the event refers to.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Started { key, .. }
            | Self::Stopped { key, .. }
            | Self::TrackChanged { key, .. }
            | Self::Unsupported { key, .. } => key,
        }
    }
}
