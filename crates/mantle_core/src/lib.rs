//! # Mantle Core
//!
//! Section-based chunk container for Mantle.
//!
//! This crate provides:
//! - A fixed-size, lock-per-slot section table with install-once-wins creation
//! - A quiescence barrier that drains users before a chunk is closed
//! - A framed binary codec that tolerates slot-count drift and detects corruption
//! - Trim/compaction of empty sections
//! - The [`SectionAdapter`] contract that section types plug into
//!
//! Section content is opaque to this crate. It never performs file or
//! network I/O; it reads from a [`mantle_io::CountingReader`] and writes to
//! any [`std::io::Write`].
//!
//! ## Example
//!
//! ```rust
//! use mantle_core::{Chunk, ChunkConfig, ChunkResult, SectionAdapter};
//! use mantle_io::CountingReader;
//! use parking_lot::Mutex;
//! use std::io::Read;
//! use std::sync::Arc;
//!
//! struct Counter;
//!
//! impl SectionAdapter for Counter {
//!     type Section = Mutex<u32>;
//!
//!     fn create_section(&self) -> Mutex<u32> {
//!         Mutex::new(0)
//!     }
//!
//!     fn read_section<R: Read>(&self, input: &mut CountingReader<R>) -> ChunkResult<Mutex<u32>> {
//!         Ok(Mutex::new(input.read_u32_be()?))
//!     }
//!
//!     fn write_section(&self, section: &Mutex<u32>, out: &mut Vec<u8>) -> ChunkResult<()> {
//!         out.extend_from_slice(&section.lock().to_be_bytes());
//!         Ok(())
//!     }
//!
//!     fn trim_section(&self, _section: &Mutex<u32>) {}
//!
//!     fn is_section_empty(&self, section: &Mutex<u32>) -> bool {
//!         *section.lock() == 0
//!     }
//! }
//!
//! let config = ChunkConfig::new().capacity(4);
//! let chunk = Chunk::new(1, 2, &config, Arc::new(Counter));
//! *chunk.get_or_create(3).unwrap().lock() = 42;
//!
//! let mut bytes = Vec::new();
//! chunk.write(&mut bytes).unwrap();
//!
//! let mut input = CountingReader::new(&bytes[..]);
//! let decoded = Chunk::read(&config, Arc::new(Counter), &mut input).unwrap();
//! assert_eq!(*decoded.get(3).unwrap().lock(), 42);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod barrier;
mod chunk;
mod config;
mod error;
mod flags;
mod scan;
mod section;
mod slots;

pub use barrier::UseBarrier;
pub use chunk::{Chunk, ChunkHold};
pub use config::ChunkConfig;
pub use error::{ChunkError, ChunkResult};
pub use flags::{ChunkFlag, ChunkFlags, CURRENT_FORMAT_VERSION, LEGACY_FORMAT_VERSION};
pub use scan::{scan_chunk, ChunkLayout, FrameInfo};
pub use section::SectionAdapter;
pub use slots::SlotTable;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
