//! # Mantle IO
//!
//! Byte-counting stream primitives for Mantle.
//!
//! Chunk decoding needs to know the absolute position of the stream at every
//! frame boundary and needs to be able to jump forward to the end of a frame
//! it could not (or should not) decode. This crate provides that one
//! abstraction and nothing else.
//!
//! ## Design Principles
//!
//! - Streams are **opaque byte sources** - they do not interpret the data
//! - Offsets are absolute, counted from the moment the source was wrapped
//! - Skipping only ever moves forward
//!
//! ## Example
//!
//! ```rust
//! use mantle_io::CountingReader;
//!
//! let data = [0x00, 0x00, 0x00, 0x02, 0xAA, 0xBB, 0xCC];
//! let mut input = CountingReader::new(&data[..]);
//! let len = input.read_u32_be().unwrap();
//! assert_eq!(len, 2);
//! input.skip_to(input.offset() + u64::from(len)).unwrap();
//! assert_eq!(input.offset(), 6);
//! assert_eq!(input.read_u8().unwrap(), 0xCC);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod reader;

pub use error::{StreamError, StreamResult};
pub use reader::CountingReader;
