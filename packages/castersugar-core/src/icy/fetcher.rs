//! One-shot ICY metadata fetches over HTTP.
//!
//! Each fetch opens a fresh connection, asks for in-band metadata, reads up
//! to and including the first metadata block, and drops the response. The
//! connection never outlives the call, whatever the exit path.

use std::error::Error as _;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Client;
use thiserror::Error;

use super::parser::{MetadataBlockReader, ReadProgress, TrackInfo};
use crate::config::MonitorConfig;
use crate::error::{CoreError, CoreResult};
use crate::protocol_constants::{
    ICY_METADATA_REQUEST_HEADER, ICY_METADATA_REQUEST_VALUE, ICY_METAINT_HEADER, MAX_ICY_METAINT,
};

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur while fetching metadata from a stream origin.
///
/// None of these are fatal to a monitor: the worker logs them and retries on
/// its next cycle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Connection refused, reset, or DNS resolution failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Connect, read, or overall fetch deadline exceeded.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// The server spoke HTTP/ICY in a way we cannot use (error status,
    /// invalid `icy-metaint`, body ending before the metadata block).
    #[error("ICY protocol error: {0}")]
    Protocol(String),
}

/// Convenient Result alias for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

impl FetchError {
    /// Returns true if retrying later has a reasonable chance of succeeding.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout(_))
    }

    /// Classifies a reqwest error.
    fn from_reqwest(err: reqwest::Error) -> Self {
        let message = describe(&err);
        if err.is_timeout() {
            Self::Timeout(message)
        } else if err.is_status() || err.is_decode() {
            Self::Protocol(message)
        } else {
            // Connect failures, resets mid-body, malformed status lines
            Self::Connection(message)
        }
    }
}

/// Flattens an error and its sources into one line.
///
/// reqwest's top-level message ("error sending request") hides the useful
/// part (refused, reset, DNS) in the source chain.
fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

// ─────────────────────────────────────────────────────────────────────────────
// Fetch Outcome
// ─────────────────────────────────────────────────────────────────────────────

/// Successful result of one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A metadata block with a usable `StreamTitle` was read.
    Track(TrackInfo),
    /// The stream supports metadata but sent nothing usable this cycle.
    NoMetadata,
    /// The server did not advertise `icy-metaint`.
    Unsupported,
}

/// Source of stream metadata.
///
/// Used by the monitor worker; tests substitute a scripted implementation.
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    /// Performs one bounded round-trip to `url`.
    async fn fetch(&self, url: &str) -> FetchResult<FetchOutcome>;
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP Implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Fetches ICY metadata with reqwest.
#[derive(Clone)]
pub struct HttpIcyFetcher {
    client: Client,
    fetch_timeout: Duration,
}

impl HttpIcyFetcher {
    /// Creates a fetcher around an existing client.
    ///
    /// `fetch_timeout` bounds one complete fetch, on top of whatever connect
    /// and read timeouts the client already enforces.
    #[must_use]
    pub fn new(client: Client, fetch_timeout: Duration) -> Self {
        Self {
            client,
            fetch_timeout,
        }
    }

    /// Creates a fetcher with a client built from `config`.
    pub fn from_config(config: &MonitorConfig) -> CoreResult<Self> {
        Ok(Self::new(build_client(config)?, config.fetch_timeout()))
    }

    async fn fetch_once(&self, url: &str) -> FetchResult<FetchOutcome> {
        let mut response = self
            .client
            .get(url)
            .header(ICY_METADATA_REQUEST_HEADER, ICY_METADATA_REQUEST_VALUE)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Protocol(format!("HTTP {}", status)));
        }

        let Some(metaint) = parse_metaint(response.headers())? else {
            log::debug!("[IcyFetch] {} does not advertise {}", url, ICY_METAINT_HEADER);
            return Ok(FetchOutcome::Unsupported);
        };

        log::trace!("[IcyFetch] {} metaint={}", url, metaint);

        let mut reader = MetadataBlockReader::new(metaint);
        loop {
            let Some(chunk) = response.chunk().await.map_err(FetchError::from_reqwest)? else {
                return Err(reader.premature_end());
            };

            if let ReadProgress::Complete(track) = reader.push(&chunk)? {
                return Ok(match track {
                    Some(track) => FetchOutcome::Track(track),
                    None => FetchOutcome::NoMetadata,
                });
            }
        }
    }
}

#[async_trait]
impl MetadataFetcher for HttpIcyFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<FetchOutcome> {
        // Dropping the inner future on timeout drops the response with it
        match tokio::time::timeout(self.fetch_timeout, self.fetch_once(url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(format!(
                "no metadata block within {:?}",
                self.fetch_timeout
            ))),
        }
    }
}

/// Builds the HTTP client used for metadata polling.
///
/// Idle connections are not pooled: every poll must reconnect, and a pooled
/// socket would keep the origin streaming audio to nobody.
pub fn build_client(config: &MonitorConfig) -> CoreResult<Client> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .connect_timeout(config.connect_timeout())
        .read_timeout(config.read_timeout())
        .pool_max_idle_per_host(0)
        .build()
        .map_err(|e| CoreError::Internal(format!("Failed to create HTTP client: {}", e)))
}

/// Reads `icy-metaint`. `Ok(None)` means the header is absent.
fn parse_metaint(headers: &HeaderMap) -> FetchResult<Option<usize>> {
    let Some(value) = headers.get(ICY_METAINT_HEADER) else {
        return Ok(None);
    };

    let text = value
        .to_str()
        .map_err(|_| FetchError::Protocol("non-ASCII icy-metaint header".to_string()))?
        .trim();

    match text.parse::<usize>() {
        Ok(0) => Err(FetchError::Protocol("icy-metaint is zero".to_string())),
        Ok(n) if n > MAX_ICY_METAINT => Err(FetchError::Protocol(format!(
            "icy-metaint {} exceeds limit of {}",
            n, MAX_ICY_METAINT
        ))),
        Ok(n) => Ok(Some(n)),
        Err(_) => Err(FetchError::Protocol(format!(
            "invalid icy-metaint '{}'",
            text
        ))),
    }
}
