//! # Mantle Testkit
//!
//! Test utilities for Mantle.
//!
//! This crate provides:
//! - A byte-blob section type and adapter for exercising chunks
//! - An adapter wrapper that records hook invocations
//! - Property-based test generators using proptest
//! - Concurrency stress helpers
//! - Cross-crate integration test helpers
//!
//! ## Usage
//!
//! ```rust
//! use mantle_testkit::prelude::*;
//!
//! let chunk = blob_chunk(0, 0, 4, &[(1, &b"data"[..])]);
//! let bytes = encode_chunk(&chunk);
//! let (decoded, _) = decode_blob_chunk(&bytes, 4).unwrap();
//! assert!(decoded.exists(1));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
pub use stress::*;
