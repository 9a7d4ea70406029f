//! Per-key "current + recent" track state.
//!
//! One worker writes, any number of readers copy. A single lock guards the
//! whole state so `current` and `history` are always read as a pair.

use parking_lot::RwLock;
use serde::Serialize;

use crate::icy::TrackInfo;
use crate::protocol_constants::HISTORY_DEPTH;
use crate::utils::now_millis;

/// One identified track at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataSnapshot {
    pub artist: Option<String>,
    pub title: String,
    pub raw_title: String,
    /// Unix timestamp in milliseconds when this track was first observed.
    pub observed_at: u64,
}

impl MetadataSnapshot {
    fn new(track: TrackInfo, observed_at: u64) -> Self {
        Self {
            artist: track.artist,
            title: track.title,
            raw_title: track.raw_title,
            observed_at,
        }
    }

    fn is_same_track(&self, track: &TrackInfo) -> bool {
        self.artist == track.artist && self.title == track.title
    }
}

/// Whether a stream carries ICY metadata, as far as we know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum MetadataSupport {
    /// No fetch has completed yet.
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
    /// The origin advertised `icy-metaint`.
    #[serde(rename = "yes")]
    Supported,
    /// The origin answered without `icy-metaint`.
    #[serde(rename = "no")]
    Unsupported,
}

/// Read view of one monitored key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorSnapshot {
    pub stream_url: String,
    pub supports_metadata: MetadataSupport,
    pub current: Option<MetadataSnapshot>,
    /// Previous tracks, most recent first.
    pub history: Vec<MetadataSnapshot>,
}

#[derive(Default)]
struct StoreState {
    current: Option<MetadataSnapshot>,
    history: Vec<MetadataSnapshot>,
    support: MetadataSupport,
}

/// Track state for one monitored stream.
pub struct SnapshotStore {
    stream_url: String,
    state: RwLock<StoreState>,
}

impl SnapshotStore {
    /// Creates an empty store with support `Unknown`.
    pub fn new(stream_url: impl Into<String>) -> Self {
        Self {
            stream_url: stream_url.into(),
            state: RwLock::new(StoreState::default()),
        }
    }

    /// The stream URL this store was created for.
    #[must_use]
    pub fn stream_url(&self) -> &str {
        &self.stream_url
    }

    /// Records a track observed now. See [`SnapshotStore::write_at`].
    pub fn write(&self, track: TrackInfo) -> Option<MetadataSnapshot> {
        self.write_at(track, now_millis())
    }

    /// Records a track observed at `observed_at`.
    ///
    /// A different track becomes current and the previous current moves to
    /// the front of history. The same `(artist, title)` changes nothing, so
    /// `observed_at` keeps the first sighting. A blank raw title is ignored.
    ///
    /// Returns the new current snapshot if it changed.
    pub fn write_at(&self, track: TrackInfo, observed_at: u64) -> Option<MetadataSnapshot> {
        if track.raw_title.trim().is_empty() {
            return None;
        }

        let mut state = self.state.write();

        if let Some(current) = &state.current {
            if current.is_same_track(&track) {
                return None;
            }
        }

        let snapshot = MetadataSnapshot::new(track, observed_at);
        if let Some(previous) = state.current.replace(snapshot.clone()) {
            state.history.insert(0, previous);
            state.history.truncate(HISTORY_DEPTH);
        }

        Some(snapshot)
    }

    /// Returns a consistent copy of the whole state.
    #[must_use]
    pub fn read(&self) -> MonitorSnapshot {
        let state = self.state.read();
        MonitorSnapshot {
            stream_url: self.stream_url.clone(),
            supports_metadata: state.support,
            current: state.current.clone(),
            history: state.history.clone(),
        }
    }

    /// Updates the support flag and returns the previous value.
    pub fn set_support(&self, support: MetadataSupport) -> MetadataSupport {
        std::mem::replace(&mut self.state.write().support, support)
    }

    #[must_use]
    pub fn support(&self) -> MetadataSupport {
        self.state.read().support
    }
}
