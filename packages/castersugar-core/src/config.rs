//! Monitoring configuration.
//!
//! All fields have sensible defaults so a partially specified YAML file
//! deserializes cleanly.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::protocol_constants::DEFAULT_USER_AGENT;

/// What a monitor does after the origin reports no in-band metadata support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnsupportedPolicy {
    /// Stop fetching; the worker idles until it is stopped so the entry
    /// stays queryable.
    #[default]
    StopPolling,
    /// Keep re-checking every poll interval. Some servers only start
    /// sending `icy-metaint` after a stream switch.
    KeepPolling,
}

/// Configuration for stream metadata monitoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Delay between two metadata fetches for one stream (seconds).
    pub poll_interval_secs: u64,

    /// TCP/TLS connect timeout for one fetch (seconds).
    pub connect_timeout_secs: u64,

    /// Maximum idle time between two body reads (seconds).
    pub read_timeout_secs: u64,

    /// Hard deadline for one complete fetch (seconds).
    ///
    /// Bounds how long a slow-dripping server can hold a connection open.
    pub fetch_timeout_secs: u64,

    /// How long `stop_monitoring` waits for a worker to exit (milliseconds)
    /// before aborting it.
    pub stop_timeout_ms: u64,

    /// Maximum number of concurrently monitored keys.
    pub max_concurrent_monitors: usize,

    /// Behavior after a stream turns out not to support ICY metadata.
    pub unsupported_policy: UnsupportedPolicy,

    /// Monitors running longer than this are stopped by the expiry sweep
    /// (seconds). `None` disables the sweep.
    pub max_monitor_duration_secs: Option<u64>,

    /// Interval between expiry sweeps (seconds).
    pub expiry_check_interval_secs: u64,

    /// `User-Agent` header sent to stream origin servers.
    pub user_agent: String,
}

impl MonitorConfig {
    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.poll_interval_secs == 0 {
            return Err("poll_interval_secs must be >= 1".to_string());
        }
        if self.connect_timeout_secs == 0 {
            return Err("connect_timeout_secs must be >= 1".to_string());
        }
        if self.read_timeout_secs == 0 {
            return Err("read_timeout_secs must be >= 1".to_string());
        }
        if self.fetch_timeout_secs == 0 {
            return Err("fetch_timeout_secs must be >= 1".to_string());
        }
        if self.max_concurrent_monitors == 0 {
            return Err("max_concurrent_monitors must be >= 1".to_string());
        }
        if self.max_monitor_duration_secs == Some(0) {
            return Err(
                "max_monitor_duration_secs must be >= 1 (omit it to disable expiry)".to_string(),
            );
        }
        if self.expiry_check_interval_secs == 0 {
            return Err("expiry_check_interval_secs must be >= 1".to_string());
        }
        if self.user_agent.trim().is_empty() {
            return Err("user_agent must not be empty".to_string());
        }
        Ok(())
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    #[must_use]
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    #[must_use]
    pub fn max_monitor_duration(&self) -> Option<Duration> {
        self.max_monitor_duration_secs.map(Duration::from_secs)
    }

    #[must_use]
    pub fn expiry_check_interval(&self) -> Duration {
        Duration::from_secs(self.expiry_check_interval_secs)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 15,
            connect_timeout_secs: 5,
            read_timeout_secs: 10,
            fetch_timeout_secs: 20,
            stop_timeout_ms: 5000,
            max_concurrent_monitors: 64,
            unsupported_policy: UnsupportedPolicy::default(),
            max_monitor_duration_secs: Some(600),
            expiry_check_interval_secs: 60,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}
