//! Chunk flag set.

use crate::error::{ChunkError, ChunkResult};
use mantle_io::CountingReader;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicU64, Ordering};

/// Format version written by default.
pub const CURRENT_FORMAT_VERSION: u8 = 1;

/// Format version that predates the flag payload.
pub const LEGACY_FORMAT_VERSION: u8 = 0;

/// A single chunk flag, identified by its ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkFlag(u8);

impl ChunkFlag {
    /// Highest ordinal a flag may have.
    pub const MAX_ORDINAL: u8 = 63;

    /// Creates a flag from its ordinal.
    ///
    /// # Errors
    ///
    /// Returns an error if `ordinal > MAX_ORDINAL`.
    pub fn new(ordinal: u8) -> ChunkResult<Self> {
        if ordinal > Self::MAX_ORDINAL {
            return Err(ChunkError::invalid_format(format!(
                "flag ordinal {ordinal} exceeds {}",
                Self::MAX_ORDINAL
            )));
        }
        Ok(Self(ordinal))
    }

    /// Returns the ordinal.
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        self.0
    }

    const fn mask(self) -> u64 {
        1 << self.0
    }
}

/// A thread-safe set of [`ChunkFlag`]s.
///
/// Encoded as a big-endian `u64` bitmask from format version 1 onwards;
/// version 0 chunks carry no flag payload and decode with no flags raised.
#[derive(Debug, Default)]
pub struct ChunkFlags {
    bits: AtomicU64,
}

impl ChunkFlags {
    /// Creates an empty flag set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a flag set from a raw bitmask.
    #[must_use]
    pub fn from_bits(bits: u64) -> Self {
        Self {
            bits: AtomicU64::new(bits),
        }
    }

    /// Returns the raw bitmask.
    #[must_use]
    pub fn bits(&self) -> u64 {
        self.bits.load(Ordering::Acquire)
    }

    /// Raises or lowers `flag`. Returns the previous state.
    pub fn set(&self, flag: ChunkFlag, on: bool) -> bool {
        let prev = if on {
            self.bits.fetch_or(flag.mask(), Ordering::AcqRel)
        } else {
            self.bits.fetch_and(!flag.mask(), Ordering::AcqRel)
        };
        prev & flag.mask() != 0
    }

    /// Returns true if `flag` is raised.
    #[must_use]
    pub fn is_set(&self, flag: ChunkFlag) -> bool {
        self.bits() & flag.mask() != 0
    }

    /// Raises every flag raised in `other`.
    pub fn merge_from(&self, other: &ChunkFlags) {
        self.bits.fetch_or(other.bits(), Ordering::AcqRel);
    }

    /// Decodes a flag set for the given format version.
    pub fn read<R: Read>(version: u8, input: &mut CountingReader<R>) -> ChunkResult<Self> {
        if version == LEGACY_FORMAT_VERSION {
            return Ok(Self::new());
        }
        Ok(Self::from_bits(input.read_u64_be()?))
    }

    /// Encodes the flag set for the given format version.
    pub fn write<W: Write>(&self, version: u8, output: &mut W) -> ChunkResult<()> {
        if version != LEGACY_FORMAT_VERSION {
            output.write_all(&self.bits().to_be_bytes())?;
        }
        Ok(())
    }
}
