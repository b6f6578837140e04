//! Cross-crate integration test helpers.
//!
//! Drives `mantle_core` chunks through `mantle_io` streams and checks the
//! results against independently computed expectations.

use crate::fixtures::{blob_contents, decode_blob_chunk, encode_chunk, BlobAdapter};
use crate::generators::ChunkSpec;
use mantle_core::{scan_chunk, Chunk, ChunkLayout, ChunkResult, CURRENT_FORMAT_VERSION};
use mantle_io::CountingReader;

/// What came back from a write/read cycle.
#[derive(Debug)]
pub struct RoundTrip {
    /// The encoded bytes.
    pub bytes: Vec<u8>,
    /// The decoded chunk.
    pub chunk: Chunk<BlobAdapter>,
    /// Bytes consumed by the decode.
    pub consumed: u64,
}

/// Builds `spec`, encodes it and decodes the result with `read_capacity` slots.
pub fn round_trip(spec: &ChunkSpec, read_capacity: u8) -> ChunkResult<RoundTrip> {
    let bytes = encode_chunk(&spec.build());
    let (chunk, consumed) = decode_blob_chunk(&bytes, read_capacity)?;
    Ok(RoundTrip {
        bytes,
        chunk,
        consumed,
    })
}

/// Scans the frame table of an encoded chunk.
pub fn layout_of(bytes: &[u8]) -> ChunkResult<ChunkLayout> {
    scan_chunk(CURRENT_FORMAT_VERSION, &mut CountingReader::new(bytes))
}

/// Asserts that a decoded chunk matches `spec`, truncated or padded to its capacity.
pub fn assert_matches_spec(chunk: &Chunk<BlobAdapter>, spec: &ChunkSpec) {
    assert_eq!((chunk.x(), chunk.z()), (spec.x, spec.z), "coordinates");
    assert_eq!(chunk.flags().bits(), spec.flag_bits(), "flags");

    let mut expected = spec.expected();
    expected.resize(chunk.section_count(), None);
    assert_eq!(blob_contents(chunk), expected, "section contents");
}
