//! ICY metadata block parsing.
//!
//! Everything here is pure: bytes in, track identification out. The fetcher
//! feeds response chunks into [`MetadataBlockReader`], which does the offset
//! arithmetic (skip `metaint` audio bytes, read the length byte, collect
//! `L * 16` bytes) and hands the finished block to [`parse_metadata_block`].

use std::borrow::Cow;

use bytes::BytesMut;
use serde::Serialize;

use super::{FetchError, FetchResult};
use crate::protocol_constants::{ARTIST_TITLE_SEPARATOR, ICY_BLOCK_UNIT, STREAM_TITLE_KEY};

/// A track identification parsed from one `StreamTitle` value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    /// Left side of the first `" - "`, trimmed. `None` when the title does
    /// not follow the `Artist - Title` convention.
    pub artist: Option<String>,
    /// Right side of the first `" - "`, or the whole value.
    pub title: String,
    /// The `StreamTitle` value exactly as received.
    pub raw_title: String,
}

/// Number of metadata bytes announced by a length byte.
#[inline]
#[must_use]
pub const fn block_len(length_byte: u8) -> usize {
    length_byte as usize * ICY_BLOCK_UNIT
}

/// Parses a metadata block that starts at its length byte.
///
/// Returns `Ok(None)` when the length byte is zero (no metadata this cycle)
/// or when the block carries no usable `StreamTitle`. Returns a protocol
/// error when the buffer is shorter than the length byte announces.
pub fn parse_metadata_block(block: &[u8]) -> FetchResult<Option<TrackInfo>> {
    let (&length_byte, rest) = block
        .split_first()
        .ok_or_else(|| FetchError::Protocol("missing metadata length byte".to_string()))?;

    let len = block_len(length_byte);
    if len == 0 {
        return Ok(None);
    }

    if rest.len() < len {
        return Err(FetchError::Protocol(format!(
            "metadata block declares {} bytes but only {} were read",
            len,
            rest.len()
        )));
    }

    let payload = trim_nul_padding(&rest[..len]);
    Ok(parse_metadata_text(&decode_metadata_text(payload)))
}

/// Strips the trailing NUL bytes servers use to pad blocks to 16 bytes.
fn trim_nul_padding(payload: &[u8]) -> &[u8] {
    let end = payload
        .iter()
        .rposition(|&b| b != 0)
        .map_or(0, |last| last + 1);
    &payload[..end]
}

/// Decodes metadata bytes as UTF-8, dropping undecodable sequences.
#[must_use]
pub fn decode_metadata_text(payload: &[u8]) -> String {
    match String::from_utf8_lossy(payload) {
        Cow::Borrowed(text) => text.to_string(),
        // Lossy decoding only allocates when it had to substitute something
        Cow::Owned(text) => text.replace(char::REPLACEMENT_CHARACTER, ""),
    }
}

/// Extracts the track from decoded metadata text such as
/// `StreamTitle='Artist - Title';StreamUrl='';`.
///
/// An absent or blank `StreamTitle` yields `None`, as does a value that is
/// nothing but the separator (`' - '`).
#[must_use]
pub fn parse_metadata_text(text: &str) -> Option<TrackInfo> {
    let (_, value) = metadata_fields(text).find(|(key, _)| *key == STREAM_TITLE_KEY)?;

    if value.trim().is_empty() {
        return None;
    }

    let track = split_stream_title(value);
    if track.artist.is_none() && track.title.is_empty() {
        return None;
    }

    Some(track)
}

/// Splits a `StreamTitle` value on the first `" - "`.
#[must_use]
pub fn split_stream_title(raw: &str) -> TrackInfo {
    match raw.split_once(ARTIST_TITLE_SEPARATOR) {
        Some((artist, title)) => {
            let artist = artist.trim();
            TrackInfo {
                artist: (!artist.is_empty()).then(|| artist.to_string()),
                title: title.trim().to_string(),
                raw_title: raw.to_string(),
            }
        }
        None => TrackInfo {
            artist: None,
            title: raw.trim().to_string(),
            raw_title: raw.to_string(),
        },
    }
}

/// Iterates over the `key='value'` assignments of an ICY metadata string.
///
/// A value ends at the next `';`, so apostrophes inside a value survive
/// (`StreamTitle='Don't Stop';`). A trailing assignment without its closing
/// `;` is still returned. Parsing stops at the first fragment without `='`.
#[must_use]
pub fn metadata_fields(text: &str) -> MetadataFields<'_> {
    MetadataFields { rest: text }
}

/// Iterator returned by [`metadata_fields`].
pub struct MetadataFields<'a> {
    rest: &'a str,
}

impl<'a> Iterator for MetadataFields<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self
            .rest
            .trim_start_matches(|c: char| c == ';' || c.is_whitespace());
        if rest.is_empty() {
            self.rest = rest;
            return None;
        }

        let Some(eq) = rest.find("='") else {
            self.rest = "";
            return None;
        };

        let key = rest[..eq].trim();
        let after = &rest[eq + 2..];

        let value = match after.find("';") {
            Some(end) => {
                self.rest = &after[end + 2..];
                &after[..end]
            }
            None => {
                self.rest = "";
                after.strip_suffix('\'').unwrap_or(after)
            }
        };

        Some((key, value))
    }
}

/// Progress of a [`MetadataBlockReader`].
#[derive(Debug, PartialEq, Eq)]
pub enum ReadProgress {
    /// More response bytes are needed.
    NeedMore,
    /// The first metadata block has been read and parsed.
    Complete(Option<TrackInfo>),
}

/// Incrementally locates the first metadata block in an ICY response body.
///
/// Audio bytes are counted and discarded, never buffered. Only the length
/// byte and the block itself are kept, and bytes past the block are ignored.
pub struct MetadataBlockReader {
    audio_remaining: usize,
    block: BytesMut,
}

impl MetadataBlockReader {
    /// Creates a reader for a stream with the given `icy-metaint`.
    #[must_use]
    pub fn new(metaint: usize) -> Self {
        Self {
            audio_remaining: metaint,
            block: BytesMut::with_capacity(ICY_BLOCK_UNIT + 1),
        }
    }

    /// Feeds the next chunk of the response body.
    pub fn push(&mut self, chunk: &[u8]) -> FetchResult<ReadProgress> {
        let mut data = chunk;

        if self.audio_remaining > 0 {
            let skip = self.audio_remaining.min(data.len());
            self.audio_remaining -= skip;
            data = &data[skip..];
            if self.audio_remaining > 0 {
                return Ok(ReadProgress::NeedMore);
            }
        }

        if self.block.is_empty() {
            let Some((&length_byte, tail)) = data.split_first() else {
                return Ok(ReadProgress::NeedMore);
            };
            self.block.extend_from_slice(&[length_byte]);
            data = tail;
        }

        let needed = 1 + block_len(self.block[0]);
        let take = (needed - self.block.len()).min(data.len());
        self.block.extend_from_slice(&data[..take]);

        if self.block.len() < needed {
            return Ok(ReadProgress::NeedMore);
        }

        parse_metadata_block(&self.block).map(ReadProgress::Complete)
    }

    /// Describes where the body ended, for a premature end-of-stream error.
    #[must_use]
    pub fn premature_end(&self) -> FetchError {
        if self.audio_remaining > 0 {
            FetchError::Protocol(format!(
                "stream ended {} bytes before the metadata block",
                self.audio_remaining
            ))
        } else if self.block.is_empty() {
            FetchError::Protocol("stream ended before the metadata length byte".to_string())
        } else {
            FetchError::Protocol(format!(
                "stream ended inside the metadata block ({} of {} bytes)",
                self.block.len() - 1,
                block_len(self.block[0])
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icy::test_fixtures::{format_metadata_block, icy_body};

    fn parse_title(stream_title: &str) -> Option<TrackInfo> {
        parse_metadata_block(&format_metadata_block(stream_title)).unwrap()
    }

    #[test]
    fn artist_and_title_are_split() {
        let track = parse_title("A - B").unwrap();
        assert_eq!(track.artist.as_deref(), Some("A"));
        assert_eq!(track.title, "B");
        assert_eq!(track.raw_title, "A - B");
    }

    #[test]
    fn only_first_separator_splits() {
        let track = parse_title("Artist - Song - Remix").unwrap();
        assert_eq!(track.artist.as_deref(), Some("Artist"));
        assert_eq!(track.title, "Song - Remix");
        assert_eq!(track.raw_title, "Artist - Song - Remix");
    }

    #[test]
    fn title_without_separator_has_no_artist() {
        let track = parse_title("Station Jingle").unwrap();
        assert_eq!(track.artist, None);
        assert_eq!(track.title, "Station Jingle");
        assert_eq!(track.raw_title, "Station Jingle");
    }

    #[test]
    fn hyphen_without_spaces_is_not_a_separator() {
        let track = parse_title("Jay-Z").unwrap();
        assert_eq!(track.artist, None);
        assert_eq!(track.title, "Jay-Z");
    }

    #[test]
    fn surrounding_whitespace_is_trimmed_but_raw_is_kept() {
        let track = parse_title("  Boards of Canada  -  Roygbiv ").unwrap();
        assert_eq!(track.artist.as_deref(), Some("Boards of Canada"));
        assert_eq!(track.title, "Roygbiv");
        assert_eq!(track.raw_title, "  Boards of Canada  -  Roygbiv ");
    }

    #[test]
    fn zero_length_byte_means_no_metadata() {
        assert_eq!(parse_metadata_block(&[0]).unwrap(), None);
        // Trailing bytes after a zero length byte belong to the next audio run
        assert_eq!(parse_metadata_block(&[0, 0xFF, 0xFB]).unwrap(), None);
    }

    #[test]
    fn empty_stream_title_means_no_metadata() {
        assert_eq!(parse_title(""), None);
        assert_eq!(parse_title("   "), None);
    }

    #[test]
    fn missing_stream_title_means_no_metadata() {
        let text = "StreamUrl='http://example.org/';";
        let mut block = vec![2u8];
        block.extend_from_slice(text.as_bytes());
        block.resize(33, 0);
        assert_eq!(parse_metadata_block(&block).unwrap(), None);
    }

    #[test]
    fn empty_buffer_is_a_protocol_error() {
        assert!(matches!(
            parse_metadata_block(&[]),
            Err(FetchError::Protocol(_))
        ));
    }

    #[test]
    fn short_block_is_a_protocol_error() {
        let mut block = format_metadata_block("A - B");
        block.truncate(block.len() - 5);
        let err = parse_metadata_block(&block).unwrap_err();
        assert!(matches!(err, FetchError::Protocol(ref msg) if msg.contains("declares")));
    }

    #[test]
    fn apostrophes_inside_title_survive() {
        let track = parse_title("Queen - Don't Stop Me Now").unwrap();
        assert_eq!(track.artist.as_deref(), Some("Queen"));
        assert_eq!(track.title, "Don't Stop Me Now");
    }

    #[test]
    fn invalid_utf8_bytes_are_dropped() {
        let mut payload = b"StreamTitle='Caf".to_vec();
        payload.push(0xE9); // Latin-1 e-acute, invalid as UTF-8 here
        payload.extend_from_slice(b" - Noir';");
        let mut block = vec![payload.len().div_ceil(16) as u8];
        block.extend_from_slice(&payload);
        block.resize(1 + block_len(block[0]), 0);

        let track = parse_metadata_block(&block).unwrap().unwrap();
        assert_eq!(track.artist.as_deref(), Some("Caf"));
        assert_eq!(track.title, "Noir");
    }

    #[test]
    fn valid_utf8_is_preserved() {
        let track = parse_title("Sigur Rós - Hoppípolla").unwrap();
        assert_eq!(track.artist.as_deref(), Some("Sigur Rós"));
        assert_eq!(track.title, "Hoppípolla");
    }

    #[test]
    fn fields_iterator_handles_multiple_assignments() {
        let fields: Vec<_> =
            metadata_fields("StreamTitle='A - B';StreamUrl='http://x/';").collect();
        assert_eq!(
            fields,
            vec![("StreamTitle", "A - B"), ("StreamUrl", "http://x/")]
        );
    }

    #[test]
    fn fields_iterator_accepts_unterminated_last_value() {
        let fields: Vec<_> = metadata_fields("StreamTitle='A - B'").collect();
        assert_eq!(fields, vec![("StreamTitle", "A - B")]);

        let fields: Vec<_> = metadata_fields("StreamTitle='A - B").collect();
        assert_eq!(fields, vec![("StreamTitle", "A - B")]);
    }

    #[test]
    fn fields_iterator_stops_on_garbage() {
        assert_eq!(metadata_fields("garbage without assignment").count(), 0);
        assert_eq!(metadata_fields("").count(), 0);
    }

    #[test]
    fn stream_title_key_is_case_sensitive() {
        assert_eq!(parse_metadata_text("streamtitle='A - B';"), None);
    }

    #[test]
    fn bare_separator_means_no_metadata() {
        assert_eq!(parse_title(" - "), None);
        assert_eq!(parse_title("  -   "), None);
        assert_eq!(parse_metadata_text("StreamTitle=' - ';"), None);
    }

    #[test]
    fn one_sided_split_is_still_a_track() {
        let track = parse_title("Artist - ").unwrap();
        assert_eq!(track.artist.as_deref(), Some("Artist"));
        assert_eq!(track.title, "");

        let track = parse_title(" - Title").unwrap();
        assert_eq!(track.artist, None);
        assert_eq!(track.title, "Title");
    }

    #[test]
    fn formatted_fixture_block_is_padded_to_unit() {
        let block = format_metadata_block("Test Song");
        // "StreamTitle='Test Song';" is 24 bytes, so two 16-byte units
        assert_eq!(block[0], 2);
        assert_eq!(block.len(), 33);
        assert_eq!(block[32], 0);
    }

    #[test]
    fn reader_skips_audio_and_reads_block() {
        let body = icy_body(32, "SomaFM - Intro");
        let mut reader = MetadataBlockReader::new(32);
        let track = match reader.push(&body).unwrap() {
            ReadProgress::Complete(Some(track)) => track,
            other => panic!("expected a parsed track, got {:?}", other),
        };
        assert_eq!(track.artist.as_deref(), Some("SomaFM"));
        assert_eq!(track.title, "Intro");
    }

    #[test]
    fn reader_handles_byte_at_a_time_delivery() {
        let body = icy_body(20, "Artist X - Song Y");
        let mut reader = MetadataBlockReader::new(20);
        let mut result = None;
        for byte in &body {
            match reader.push(std::slice::from_ref(byte)).unwrap() {
                ReadProgress::NeedMore => continue,
                ReadProgress::Complete(track) => {
                    result = track;
                    break;
                }
            }
        }
        assert_eq!(result.unwrap().title, "Song Y");
    }

    #[test]
    fn reader_splits_exactly_at_metaint_boundary() {
        let body = icy_body(16, "A - B");
        let mut reader = MetadataBlockReader::new(16);
        assert_eq!(reader.push(&body[..16]).unwrap(), ReadProgress::NeedMore);
        assert!(matches!(
            reader.push(&body[16..]).unwrap(),
            ReadProgress::Complete(Some(_))
        ));
    }

    #[test]
    fn reader_reports_zero_length_block() {
        let mut body = vec![0xAAu8; 8];
        body.push(0);
        let mut reader = MetadataBlockReader::new(8);
        assert_eq!(reader.push(&body).unwrap(), ReadProgress::Complete(None));
    }

    #[test]
    fn premature_end_describes_position() {
        let mut reader = MetadataBlockReader::new(100);
        reader.push(&[0u8; 40]).unwrap();
        assert!(reader.premature_end().to_string().contains("60 bytes"));

        let mut reader = MetadataBlockReader::new(4);
        reader.push(&[0, 0, 0, 0]).unwrap();
        assert!(reader.premature_end().to_string().contains("length byte"));

        let mut reader = MetadataBlockReader::new(4);
        reader.push(&[0, 0, 0, 0, 2, b'S']).unwrap();
        assert!(reader.premature_end().to_string().contains("1 of 32"));
    }
}
