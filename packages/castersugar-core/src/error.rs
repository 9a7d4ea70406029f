//! Centralized error types for the Castersugar core library.
//!
//! This module provides a unified error handling system that:
//! - Defines structured error types using `thiserror`
//! - Gives every error a machine-readable code for the surrounding application

use serde::Serialize;
use thiserror::Error;

use crate::icy::FetchError;

/// Trait for error types that provide machine-readable error codes.
///
/// Implement this trait to provide consistent error codes across different
/// error conversion paths.
pub trait ErrorCode {
    /// Returns a machine-readable error code for API responses.
    fn code(&self) -> &'static str;
}

impl ErrorCode for FetchError {
    fn code(&self) -> &'static str {
        match self {
            Self::Connection(_) => "stream_connection_failed",
            Self::Timeout(_) => "stream_timeout",
            Self::Protocol(_) => "icy_protocol_error",
        }
    }
}

/// Application-wide error type for monitor lifecycle operations.
///
/// Per-poll network failures never surface here; they are absorbed by the
/// monitor worker. Only failures the caller can act on are reported.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum CoreError {
    /// The stream URL cannot be polled (bad syntax or non-HTTP scheme).
    #[error("Invalid stream URL: {0}")]
    InvalidUrl(String),

    /// Starting another monitor would exceed the configured limit.
    #[error("Maximum number of concurrent monitors reached ({0})")]
    MonitorLimitReached(usize),

    /// The registry has been shut down and accepts no new monitors.
    #[error("Monitor registry is shutting down")]
    ShuttingDown,

    /// Configuration values are invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error (HTTP client construction, runtime unavailable).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ErrorCode for CoreError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidUrl(_) => "invalid_stream_url",
            Self::MonitorLimitReached(_) => "monitor_limit_reached",
            Self::ShuttingDown => "shutting_down",
            Self::Configuration(_) => "configuration_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Result Type Aliases
// ─────────────────────────────────────────────────────────────────────────────

// Re-export Result type aliases from their defining modules
pub use crate::icy::FetchResult;

/// Convenient Result alias for registry and bootstrap operations.
pub type CoreResult<T> = Result<T, CoreError>;
