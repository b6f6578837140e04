//! Test fixtures and chunk helpers.
//!
//! Provides a simple byte-blob section type, an instrumented adapter
//! wrapper, and convenience functions for encoding and decoding chunks.

use bytes::{BufMut, Bytes, BytesMut};
use mantle_core::{Chunk, ChunkConfig, ChunkError, ChunkResult, SectionAdapter};
use mantle_io::CountingReader;
use parking_lot::{Mutex, RwLock};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// A section holding an opaque byte blob.
///
/// Trimming strips trailing zero bytes; a blob with no bytes is empty.
#[derive(Debug, Default)]
pub struct BlobSection {
    data: RwLock<BytesMut>,
}

impl BlobSection {
    /// Creates a section holding `data`.
    pub fn new(data: &[u8]) -> Self {
        Self {
            data: RwLock::new(BytesMut::from(data)),
        }
    }

    /// Returns a snapshot of the blob.
    pub fn bytes(&self) -> Bytes {
        Bytes::copy_from_slice(&self.data.read())
    }

    /// Replaces the blob.
    pub fn set(&self, data: &[u8]) {
        let mut guard = self.data.write();
        guard.clear();
        guard.extend_from_slice(data);
    }

    /// Appends to the blob.
    pub fn append(&self, data: &[u8]) {
        self.data.write().extend_from_slice(data);
    }

    /// Returns the blob length.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Returns true if the blob has no bytes.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

/// Returns what `data` looks like after [`BlobAdapter`] trims it.
pub fn trimmed(data: &[u8]) -> &[u8] {
    let end = data.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    &data[..end]
}

/// Adapter for [`BlobSection`]s.
///
/// Wire format of one section: `len:u32 (big-endian) | bytes[len]`.
///
/// A poison byte can be configured: a section whose blob starts with it
/// fails to decode after its whole payload has been consumed.
#[derive(Debug, Default)]
pub struct BlobAdapter {
    poison: Option<u8>,
    created: AtomicUsize,
    trimmed: AtomicUsize,
}

impl BlobAdapter {
    /// Creates an adapter without a poison byte.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an adapter that rejects blobs starting with `marker`.
    pub fn with_poison(marker: u8) -> Self {
        Self {
            poison: Some(marker),
            ..Self::default()
        }
    }

    /// Number of sections built by [`SectionAdapter::create_section`].
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Number of times a section was trimmed.
    pub fn trim_calls(&self) -> usize {
        self.trimmed.load(Ordering::SeqCst)
    }
}

impl SectionAdapter for BlobAdapter {
    type Section = BlobSection;

    fn create_section(&self) -> BlobSection {
        self.created.fetch_add(1, Ordering::SeqCst);
        BlobSection::default()
    }

    fn read_section<R: Read>(&self, input: &mut CountingReader<R>) -> ChunkResult<BlobSection> {
        let len = input.read_u32_be()? as usize;
        let data = input.read_vec(len)?;
        if self.poison.is_some() && data.first() == self.poison.as_ref() {
            return Err(ChunkError::section("poisoned blob"));
        }
        Ok(BlobSection::new(&data))
    }

    fn write_section(&self, section: &BlobSection, out: &mut Vec<u8>) -> ChunkResult<()> {
        let data = section.data.read();
        let len = u32::try_from(data.len())
            .map_err(|_| ChunkError::section("blob longer than u32::MAX"))?;
        out.put_u32(len);
        out.put_slice(&data);
        Ok(())
    }

    fn trim_section(&self, section: &BlobSection) {
        self.trimmed.fetch_add(1, Ordering::SeqCst);
        let mut data = section.data.write();
        let keep = trimmed(&data).len();
        data.truncate(keep);
    }

    fn is_section_empty(&self, section: &BlobSection) -> bool {
        section.is_empty()
    }
}

/// A section read failure captured by [`RecordingAdapter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadFailure {
    /// Slot index.
    pub index: usize,
    /// Frame payload start.
    pub start: u64,
    /// Frame payload end.
    pub end: u64,
    /// Stream offset when the hook ran.
    pub offset: u64,
    /// Rendered error.
    pub message: String,
}

/// Wraps an adapter and records every hook invocation.
#[derive(Debug, Default)]
pub struct RecordingAdapter<A> {
    inner: A,
    before: Mutex<Vec<usize>>,
    failures: Mutex<Vec<ReadFailure>>,
}

impl<A> RecordingAdapter<A> {
    /// Wraps `inner`.
    pub fn new(inner: A) -> Self {
        Self {
            inner,
            before: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
        }
    }

    /// Returns the wrapped adapter.
    pub fn inner(&self) -> &A {
        &self.inner
    }

    /// Indices passed to `on_before_read_section`, in call order.
    pub fn before_reads(&self) -> Vec<usize> {
        self.before.lock().clone()
    }

    /// Failures passed to `on_read_section_failure`, in call order.
    pub fn failures(&self) -> Vec<ReadFailure> {
        self.failures.lock().clone()
    }
}

impl<A: SectionAdapter> SectionAdapter for RecordingAdapter<A> {
    type Section = A::Section;

    fn create_section(&self) -> Self::Section {
        self.inner.create_section()
    }

    fn read_section<R: Read>(&self, input: &mut CountingReader<R>) -> ChunkResult<Self::Section> {
        self.inner.read_section(input)
    }

    fn write_section(&self, section: &Self::Section, out: &mut Vec<u8>) -> ChunkResult<()> {
        self.inner.write_section(section, out)
    }

    fn trim_section(&self, section: &Self::Section) {
        self.inner.trim_section(section);
    }

    fn is_section_empty(&self, section: &Self::Section) -> bool {
        self.inner.is_section_empty(section)
    }

    fn on_before_read_section(&self, index: usize) {
        self.before.lock().push(index);
        self.inner.on_before_read_section(index);
    }

    fn on_read_section_failure<R: Read>(
        &self,
        index: usize,
        start: u64,
        end: u64,
        input: &CountingReader<R>,
        error: &ChunkError,
    ) {
        self.failures.lock().push(ReadFailure {
            index,
            start,
            end,
            offset: input.offset(),
            message: error.to_string(),
        });
        self.inner
            .on_read_section_failure(index, start, end, input, error);
    }
}

/// Builds an open blob chunk with the given sections.
pub fn blob_chunk(x: i8, z: i8, capacity: u8, sections: &[(usize, &[u8])]) -> Chunk<BlobAdapter> {
    let config = ChunkConfig::new().capacity(capacity);
    let chunk = Chunk::new(x, z, &config, Arc::new(BlobAdapter::new()));
    for (index, data) in sections {
        chunk
            .get_or_create(*index)
            .expect("section index within capacity")
            .set(data);
    }
    chunk
}

/// Encodes `chunk` into a new buffer. Closes the chunk.
pub fn encode_chunk<A: SectionAdapter>(chunk: &Chunk<A>) -> Vec<u8> {
    let mut out = Vec::new();
    chunk.write(&mut out).expect("failed to encode chunk");
    out
}

/// Decodes a blob chunk with the given capacity.
///
/// Returns the chunk and the number of bytes consumed.
pub fn decode_blob_chunk(bytes: &[u8], capacity: u8) -> ChunkResult<(Chunk<BlobAdapter>, u64)> {
    decode_with(bytes, capacity, Arc::new(BlobAdapter::new()))
}

/// Decodes a chunk with the given capacity and adapter.
///
/// Returns the chunk and the number of bytes consumed.
pub fn decode_with<A: SectionAdapter>(
    bytes: &[u8],
    capacity: u8,
    adapter: Arc<A>,
) -> ChunkResult<(Chunk<A>, u64)> {
    let config = ChunkConfig::new().capacity(capacity);
    let mut input = CountingReader::new(bytes);
    let chunk = Chunk::read(&config, adapter, &mut input)?;
    Ok((chunk, input.offset()))
}

/// Returns every slot of a blob chunk as optional byte vectors.
pub fn blob_contents(chunk: &Chunk<BlobAdapter>) -> Vec<Option<Vec<u8>>> {
    (0..chunk.section_count())
        .map(|index| chunk.get(index).map(|s| s.bytes().to_vec()))
        .collect()
}

/// A temporary directory of encoded chunk files.
pub struct ChunkFiles {
    dir: TempDir,
}

impl ChunkFiles {
    /// Creates an empty temporary directory.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Returns the directory path.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes raw bytes to `name` and returns the file path.
    pub fn write_bytes(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.dir.path().join(name);
        let mut file = std::fs::File::create(&path).expect("Failed to create chunk file");
        file.write_all(bytes).expect("Failed to write chunk file");
        path
    }

    /// Encodes `chunk` into `name` and returns the file path.
    pub fn write_chunk<A: SectionAdapter>(&self, name: &str, chunk: &Chunk<A>) -> PathBuf {
        self.write_bytes(name, &encode_chunk(chunk))
    }
}

impl Default for ChunkFiles {
    fn default() -> Self {
        Self::new()
    }
}
