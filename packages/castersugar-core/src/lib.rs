//! Castersugar Core - stream metadata monitoring for Castersugar.
//!
//! For every device that is playing an internet radio stream, this crate
//! periodically reconnects to the stream's origin, reads one ICY metadata
//! block, and keeps the current track plus a short history that any number
//! of readers can query concurrently.
//!
//! # Architecture
//!
//! - [`icy`]: ICY metadata block parsing and the HTTP fetcher
//! - [`monitor`]: per-key workers, snapshot stores and the registry
//! - [`events`]: monitor lifecycle and track change events
//! - [`config`]: monitoring configuration
//! - [`runtime`]: task spawning abstraction
//! - [`bootstrap`]: composition root and shutdown
//! - [`error`]: centralized error types
//!
//! # Abstraction Traits
//!
//! - [`MetadataFetcher`](icy::MetadataFetcher): one metadata round-trip
//! - [`TaskSpawner`](runtime::TaskSpawner): spawning worker tasks
//! - [`EventEmitter`](events::EventEmitter): emitting monitor events

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod events;
pub mod icy;
pub mod monitor;
pub mod protocol_constants;
pub mod runtime;
pub mod utils;

// Re-export commonly used types at the crate root
pub use bootstrap::{bootstrap_services, BootstrappedServices};
pub use config::{MonitorConfig, UnsupportedPolicy};
pub use error::{CoreError, CoreResult, ErrorCode, FetchResult};
pub use events::{
    BroadcastEventBridge, EventEmitter, LoggingEventEmitter, MonitorEvent, NoopEventEmitter,
    StopReason,
};
pub use icy::{FetchError, FetchOutcome, HttpIcyFetcher, MetadataFetcher, TrackInfo};
pub use monitor::{
    ActiveMonitor, MetadataSnapshot, MetadataSupport, MonitorRegistry, MonitorSnapshot,
    StartOutcome,
};
pub use runtime::{TaskSpawner, TokioSpawner};
