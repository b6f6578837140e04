//! Offset-tracking reader.

use crate::error::{StreamError, StreamResult};
use std::io::{self, Read};

/// A reader that counts every byte it hands out.
///
/// `CountingReader` wraps any [`Read`] source and keeps the absolute number
/// of bytes consumed so far. Chunk decoding uses the offset to validate frame
/// boundaries and [`skip_to`](Self::skip_to) to resynchronize after a frame
/// it could not decode.
///
/// The wrapper itself implements [`Read`], so section decoders can layer any
/// `Read`-based decoder on top of it and the offset stays accurate.
///
/// # Example
///
/// ```rust
/// use mantle_io::CountingReader;
///
/// let mut input = CountingReader::new(&[1u8, 2, 3, 4][..]);
/// assert_eq!(input.read_u8().unwrap(), 1);
/// assert_eq!(input.offset(), 1);
/// input.skip_to(3).unwrap();
/// assert_eq!(input.read_u8().unwrap(), 4);
/// ```
#[derive(Debug)]
pub struct CountingReader<R> {
    inner: R,
    offset: u64,
}

impl<R: Read> CountingReader<R> {
    /// Wraps a source, starting the count at zero.
    pub fn new(inner: R) -> Self {
        Self::with_offset(inner, 0)
    }

    /// Wraps a source whose first byte sits at `offset`.
    ///
    /// Useful when the source has already been advanced (for example a file
    /// seeked to the start of a chunk) and offsets should stay absolute.
    pub fn with_offset(inner: R, offset: u64) -> Self {
        Self { inner, offset }
    }

    /// Returns the number of bytes consumed so far.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Returns a reference to the wrapped source.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Unwraps the reader, returning the underlying source.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Discards bytes until the stream is positioned at `target`.
    ///
    /// Skipping to the current offset is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `target` is behind the current offset
    /// - the source ends before `target` is reached
    /// - an I/O error occurs
    pub fn skip_to(&mut self, target: u64) -> StreamResult<()> {
        if target < self.offset {
            return Err(StreamError::SkipBackwards {
                current: self.offset,
                target,
            });
        }

        let needed = target - self.offset;
        if needed == 0 {
            return Ok(());
        }

        let skipped = io::copy(&mut (&mut self.inner).take(needed), &mut io::sink())?;
        self.offset += skipped;

        if skipped < needed {
            return Err(StreamError::UnexpectedEof {
                offset: self.offset,
                needed: needed - skipped,
            });
        }

        Ok(())
    }

    /// Reads exactly `N` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::UnexpectedEof`] if the source ends first.
    pub fn read_array<const N: usize>(&mut self) -> StreamResult<[u8; N]> {
        let mut buf = [0u8; N];
        self.fill(&mut buf)?;
        Ok(buf)
    }

    /// Reads exactly `len` bytes into a new buffer.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::UnexpectedEof`] if the source ends first.
    pub fn read_vec(&mut self, len: usize) -> StreamResult<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.fill(&mut buf)?;
        Ok(buf)
    }

    /// Reads one unsigned byte.
    pub fn read_u8(&mut self) -> StreamResult<u8> {
        let [b] = self.read_array::<1>()?;
        Ok(b)
    }

    /// Reads one signed byte.
    pub fn read_i8(&mut self) -> StreamResult<i8> {
        let [b] = self.read_array::<1>()?;
        Ok(i8::from_be_bytes([b]))
    }

    /// Reads a big-endian `u16`.
    pub fn read_u16_be(&mut self) -> StreamResult<u16> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    /// Reads a big-endian `u32`.
    pub fn read_u32_be(&mut self) -> StreamResult<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    /// Reads a big-endian `u64`.
    pub fn read_u64_be(&mut self) -> StreamResult<u64> {
        Ok(u64::from_be_bytes(self.read_array()?))
    }

    fn fill(&mut self, buf: &mut [u8]) -> StreamResult<()> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => {
                    return Err(StreamError::UnexpectedEof {
                        offset: self.offset,
                        needed: (buf.len() - filled) as u64,
                    });
                }
                Ok(n) => {
                    filled += n;
                    self.offset += n as u64;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.offset += n as u64;
        Ok(n)
    }
}
