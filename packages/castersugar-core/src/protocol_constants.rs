//! Fixed protocol constants that should NOT be changed.
//!
//! These values are defined by the ICY (Shoutcast/Icecast) convention and
//! changing them would break compatibility with stream origin servers.

// ─────────────────────────────────────────────────────────────────────────────
// ICY Protocol (Shoutcast/Icecast metadata)
// ─────────────────────────────────────────────────────────────────────────────

/// Request header announcing that the client understands in-band metadata.
pub const ICY_METADATA_REQUEST_HEADER: &str = "Icy-MetaData";

/// Value sent with [`ICY_METADATA_REQUEST_HEADER`].
pub const ICY_METADATA_REQUEST_VALUE: &str = "1";

/// Response header carrying the metadata interval in bytes.
///
/// HTTP header names are case-insensitive, so this also matches `Icy-MetaInt`.
pub const ICY_METAINT_HEADER: &str = "icy-metaint";

/// Each unit of the metadata length byte stands for this many bytes.
pub const ICY_BLOCK_UNIT: usize = 16;

/// Upper bound accepted for `icy-metaint`.
///
/// Real servers use 8192-32768. Anything above this is treated as a protocol
/// error so a hostile server cannot make us drain megabytes per poll.
pub const MAX_ICY_METAINT: usize = 1024 * 1024;

/// Metadata key holding the "now playing" text.
pub const STREAM_TITLE_KEY: &str = "StreamTitle";

/// Separator between artist and title inside a `StreamTitle` value.
pub const ARTIST_TITLE_SEPARATOR: &str = " - ";

// ─────────────────────────────────────────────────────────────────────────────
// Monitoring
// ─────────────────────────────────────────────────────────────────────────────

/// Number of previous tracks kept per monitored key.
pub const HISTORY_DEPTH: usize = 2;

/// Capacity of the monitor event broadcast channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 100;

// ─────────────────────────────────────────────────────────────────────────────
// Application Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Default `User-Agent` sent to stream origin servers.
pub const DEFAULT_USER_AGENT: &str = concat!("Castersugar/", env!("CARGO_PKG_VERSION"));
