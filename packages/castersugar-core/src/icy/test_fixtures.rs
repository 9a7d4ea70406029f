//! Builders for ICY wire data used by parser, fetcher and monitor tests.

use crate::protocol_constants::ICY_BLOCK_UNIT;

/// Formats a `StreamTitle` into an ICY metadata block.
///
/// The first byte is the number of 16-byte units, followed by
/// `StreamTitle='...';` padded with NULs to that length. An empty title is
/// still wrapped (`StreamTitle='';`) so callers can exercise that case.
pub fn format_metadata_block(stream_title: &str) -> Vec<u8> {
    let meta_str = format!("StreamTitle='{}';", stream_title);
    let meta_bytes = meta_str.as_bytes();

    let num_blocks = meta_bytes.len().div_ceil(ICY_BLOCK_UNIT);
    assert!(num_blocks <= u8::MAX as usize, "fixture title too long");
    let padded_len = num_blocks * ICY_BLOCK_UNIT;

    let mut result = Vec::with_capacity(padded_len + 1);
    result.push(num_blocks as u8);
    result.extend_from_slice(meta_bytes);
    result.resize(padded_len + 1, 0);

    result
}

/// Builds a response body: `metaint` bytes of fake audio, then a metadata
/// block, then a little more audio that a reader must ignore.
pub fn icy_body(metaint: usize, stream_title: &str) -> Vec<u8> {
    let mut body = vec![0xFFu8; metaint];
    body.extend_from_slice(&format_metadata_block(stream_title));
    body.extend_from_slice(&[0xFF; 64]);
    body
}
