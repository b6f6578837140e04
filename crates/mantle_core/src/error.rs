//! Error types for Mantle core.

use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type ChunkResult<T> = Result<T, ChunkError>;

/// Errors that can occur in chunk operations.
#[derive(Debug, Error)]
pub enum ChunkError {
    /// Stream error while decoding.
    #[error("stream error: {0}")]
    Stream(#[from] mantle_io::StreamError),

    /// I/O error while encoding.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The chunk has been closed and can no longer be used.
    #[error("chunk is closed")]
    Closed,

    /// A section decoder consumed a different number of bytes than its frame declared.
    #[error("section {index} size mismatch: frame ends at {expected}, stream at {actual}")]
    FrameSizeMismatch {
        /// Slot index of the offending frame.
        index: usize,
        /// Offset where the frame should have ended.
        expected: u64,
        /// Offset where the stream actually is.
        actual: u64,
    },

    /// A slot index at or past the chunk capacity.
    #[error("section index {index} out of range for capacity {capacity}")]
    SlotOutOfRange {
        /// The requested index.
        index: usize,
        /// The chunk capacity.
        capacity: usize,
    },

    /// An encoded section does not fit in a frame.
    #[error("section {index} too large to frame: {len} bytes")]
    SectionTooLarge {
        /// Slot index of the section.
        index: usize,
        /// Encoded length in bytes.
        len: usize,
    },

    /// A section adapter failed to decode or encode a section.
    #[error("section error: {message}")]
    Section {
        /// Description of the failure.
        message: String,
    },

    /// Invalid chunk format.
    #[error("invalid chunk format: {message}")]
    InvalidFormat {
        /// Description of the format issue.
        message: String,
    },
}

impl ChunkError {
    /// Create a section error.
    pub fn section(message: impl Into<String>) -> Self {
        Self::Section {
            message: message.into(),
        }
    }

    /// Create an invalid format error.
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    /// Returns true if this error is a corrupted frame boundary.
    #[must_use]
    pub fn is_framing(&self) -> bool {
        matches!(self, Self::FrameSizeMismatch { .. })
    }
}
