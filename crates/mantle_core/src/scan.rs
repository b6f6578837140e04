//! Frame-level inspection of encoded chunks.

use crate::error::ChunkResult;
use crate::flags::ChunkFlags;
use mantle_io::CountingReader;
use std::io::Read;

/// Location of one frame inside an encoded chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    /// Slot index.
    pub index: usize,
    /// Offset of the payload (just past the length prefix).
    pub offset: u64,
    /// Payload length; zero for an absent slot.
    pub len: u32,
}

impl FrameInfo {
    /// Returns true if the frame carries a section.
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.len > 0
    }
}

/// The framing of one encoded chunk, without section content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkLayout {
    /// Chunk x coordinate.
    pub x: i8,
    /// Chunk z coordinate.
    pub z: i8,
    /// Raw flag bitmask.
    pub flags: u64,
    /// Offset where the chunk started.
    pub start: u64,
    /// Offset just past the last frame.
    pub end: u64,
    /// One entry per declared slot.
    pub frames: Vec<FrameInfo>,
}

impl ChunkLayout {
    /// Number of slots the chunk declares.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.frames.len()
    }

    /// Number of frames that carry a section.
    #[must_use]
    pub fn present_count(&self) -> usize {
        self.frames.iter().filter(|f| f.is_present()).count()
    }

    /// Total encoded size of the chunk in bytes.
    #[must_use]
    pub fn encoded_len(&self) -> u64 {
        self.end - self.start
    }
}

/// Reads the header and frame table of one chunk, skipping every payload.
///
/// On success `input` is positioned just past the chunk, exactly where
/// [`Chunk::read`](crate::Chunk::read) would leave it.
///
/// # Errors
///
/// Returns an error if the stream ends inside the header, a length prefix or
/// a payload.
pub fn scan_chunk<R: Read>(version: u8, input: &mut CountingReader<R>) -> ChunkResult<ChunkLayout> {
    let start = input.offset();
    let x = input.read_i8()?;
    let z = input.read_i8()?;
    let slot_count = usize::from(input.read_u8()?);
    let flags = ChunkFlags::read(version, input)?.bits();

    let mut frames = Vec::with_capacity(slot_count);
    for index in 0..slot_count {
        let len = input.read_u32_be()?;
        let offset = input.offset();
        input.skip_to(offset + u64::from(len))?;
        frames.push(FrameInfo { index, offset, len });
    }

    Ok(ChunkLayout {
        x,
        z,
        flags,
        start,
        end: input.offset(),
        frames,
    })
}
