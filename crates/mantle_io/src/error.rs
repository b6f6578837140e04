//! Error types for stream operations.

use std::io;
use thiserror::Error;

/// Result type for stream operations.
pub type StreamResult<T> = Result<T, StreamError>;

/// Errors that can occur while reading from a counting stream.
#[derive(Debug, Error)]
pub enum StreamError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The source ended before the requested bytes were available.
    #[error("unexpected end of stream at offset {offset}: needed {needed} more bytes")]
    UnexpectedEof {
        /// Offset at which the stream ran dry.
        offset: u64,
        /// Number of bytes still missing.
        needed: u64,
    },

    /// A skip targeted an offset behind the current position.
    #[error("cannot skip backwards: current offset {current}, target {target}")]
    SkipBackwards {
        /// The current stream offset.
        current: u64,
        /// The requested target offset.
        target: u64,
    },
}

impl StreamError {
    /// Returns true if this error means the source ran out of bytes.
    #[must_use]
    pub fn is_eof(&self) -> bool {
        match self {
            Self::UnexpectedEof { .. } => true,
            Self::Io(e) => e.kind() == io::ErrorKind::UnexpectedEof,
            Self::SkipBackwards { .. } => false,
        }
    }
}
