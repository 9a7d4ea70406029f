//! Monitor binary configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use castersugar_core::MonitorConfig;
use serde::Deserialize;

/// A device key bound to the stream it is playing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WatchBinding {
    pub key: String,
    pub url: String,
}

impl FromStr for WatchBinding {
    type Err = String;

    /// Parses `key=url`. The URL itself may contain `=`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, url) = s
            .split_once('=')
            .ok_or_else(|| format!("expected KEY=URL, got '{}'", s))?;
        let key = key.trim();
        let url = url.trim();
        if key.is_empty() || url.is_empty() {
            return Err(format!("expected KEY=URL, got '{}'", s));
        }
        Ok(Self {
            key: key.to_string(),
            url: url.to_string(),
        })
    }
}

impl fmt::Display for WatchBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.url)
    }
}

/// Configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Polling, timeout and lifecycle settings for the core.
    pub monitor: MonitorConfig,

    /// Streams to monitor from startup.
    pub watch: Vec<WatchBinding>,

    /// Seconds between status reports of all active monitors. 0 disables.
    /// Override: `CASTERSUGAR_STATUS_INTERVAL`
    pub status_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            monitor: MonitorConfig::default(),
            watch: Vec::new(),
            status_interval_secs: 60,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_yaml(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Applies environment variable overrides to the configuration.
    ///
    /// Values that fail to parse are ignored.
    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(secs) = var("CASTERSUGAR_POLL_INTERVAL").and_then(|v| v.parse().ok()) {
            self.monitor.poll_interval_secs = secs;
        }

        if let Some(max) = var("CASTERSUGAR_MAX_MONITORS").and_then(|v| v.parse().ok()) {
            self.monitor.max_concurrent_monitors = max;
        }

        if let Some(secs) = var("CASTERSUGAR_MAX_MONITOR_DURATION").and_then(|v| v.parse().ok()) {
            // 0 disables expiry
            self.monitor.max_monitor_duration_secs = (secs > 0).then_some(secs);
        }

        if let Some(agent) = var("CASTERSUGAR_USER_AGENT").filter(|v| !v.trim().is_empty()) {
            self.monitor.user_agent = agent;
        }

        if let Some(secs) = var("CASTERSUGAR_STATUS_INTERVAL").and_then(|v| v.parse().ok()) {
            self.status_interval_secs = secs;
        }

        // Note: CASTERSUGAR_LOG_LEVEL is handled by clap via #[arg(env = ...)] in main.rs
    }
}
