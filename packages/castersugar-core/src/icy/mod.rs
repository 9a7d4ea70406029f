//! ICY (Shoutcast/Icecast) in-band metadata.
//!
//! - [`parser`]: pure decoding of metadata blocks into [`TrackInfo`]
//! - [`fetcher`]: one bounded HTTP round-trip per poll

pub mod fetcher;
pub mod parser;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use fetcher::{
    build_client, FetchError, FetchOutcome, FetchResult, HttpIcyFetcher, MetadataFetcher,
};
pub use parser::{parse_metadata_block, parse_metadata_text, split_stream_title, TrackInfo};
