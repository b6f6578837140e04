//! Section adapter contract.

use crate::error::{ChunkError, ChunkResult};
use mantle_io::CountingReader;
use std::io::Read;

/// Everything a chunk needs to know about its section type.
///
/// The chunk never looks inside a section. It creates, decodes, encodes,
/// trims and asks about emptiness exclusively through this trait. One
/// adapter is typically shared by every chunk of a world through an `Arc`.
///
/// Sections are stored as `Arc<Self::Section>` and may be shared between
/// chunks (see [`Chunk::copy_from`](crate::Chunk::copy_from)), so
/// [`trim_section`](Self::trim_section) receives a shared reference and
/// sections that trim must use interior mutability.
///
/// # Hooks
///
/// [`on_before_read_section`](Self::on_before_read_section) and
/// [`on_read_section_failure`](Self::on_read_section_failure) are
/// instrumentation points with default implementations.
pub trait SectionAdapter: Send + Sync {
    /// The section payload type.
    type Section: Send + Sync;

    /// Creates a new, empty section.
    fn create_section(&self) -> Self::Section;

    /// Decodes one section from `input`.
    ///
    /// The decoder should consume exactly the bytes [`write_section`]
    /// produced. A decoder that stops short is resynchronized by the chunk
    /// only when it fails; a successful decode that consumes the wrong
    /// number of bytes fails the whole chunk.
    ///
    /// [`write_section`]: Self::write_section
    ///
    /// # Errors
    ///
    /// Any error is recovered by the chunk: the failure hook runs, the stream
    /// skips to the end of the frame and the slot stays empty.
    fn read_section<R: Read>(&self, input: &mut CountingReader<R>) -> ChunkResult<Self::Section>;

    /// Encodes `section` into `out`.
    ///
    /// # Errors
    ///
    /// Errors propagate out of [`Chunk::write`](crate::Chunk::write).
    fn write_section(&self, section: &Self::Section, out: &mut Vec<u8>) -> ChunkResult<()>;

    /// Compacts `section` in place.
    fn trim_section(&self, section: &Self::Section);

    /// Returns true if `section` holds no data worth storing.
    fn is_section_empty(&self, section: &Self::Section) -> bool;

    /// Called before the frame of slot `index` is read.
    fn on_before_read_section(&self, index: usize) {
        let _ = index;
    }

    /// Called when slot `index` failed to decode.
    ///
    /// `start` and `end` delimit the frame payload; `input` is positioned
    /// wherever the failed decoder left it. The chunk skips to `end` after
    /// this returns.
    ///
    /// The default implementation logs the failure at `warn` level through
    /// `tracing`. Overriding it replaces that warning.
    fn on_read_section_failure<R: Read>(
        &self,
        index: usize,
        start: u64,
        end: u64,
        input: &CountingReader<R>,
        error: &ChunkError,
    ) {
        tracing::warn!(
            index,
            start,
            end,
            offset = input.offset(),
            %error,
            "failed to read chunk section, skipping frame"
        );
    }
}
