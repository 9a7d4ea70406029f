//! General utilities shared across the crate.

use std::time::{SystemTime, UNIX_EPOCH};

// ─────────────────────────────────────────────────────────────────────────────
// Time Utilities
// ─────────────────────────────────────────────────────────────────────────────

/// Returns the current Unix timestamp in milliseconds.
///
/// Returns 0 if the system clock is before the Unix epoch (shouldn't happen in practice).
#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ─────────────────────────────────────────────────────────────────────────────
// URL Validation
// ─────────────────────────────────────────────────────────────────────────────

/// Checks that a stream URL can be polled over HTTP.
///
/// Only `http` and `https` URLs with a host are accepted. The error string
/// describes why the URL was rejected.
pub fn validate_stream_url(url: &str) -> Result<reqwest::Url, String> {
    let parsed = reqwest::Url::parse(url).map_err(|e| format!("{url}: {e}"))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(format!("{url}: unsupported scheme '{other}'")),
    }

    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(format!("{url}: missing host"));
    }

    Ok(parsed)
}
