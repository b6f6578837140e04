//! Section-based chunk container and its binary codec.

use crate::barrier::UseBarrier;
use crate::config::ChunkConfig;
use crate::error::{ChunkError, ChunkResult};
use crate::flags::{ChunkFlag, ChunkFlags};
use crate::section::SectionAdapter;
use crate::slots::SlotTable;
use mantle_io::CountingReader;
use std::io::{Read, Write};
use std::ops::Deref;
use std::sync::Arc;

/// Length prefix of an absent slot.
const EMPTY_FRAME: [u8; 4] = 0u32.to_be_bytes();

/// A coordinate-addressed container of section slots.
///
/// A chunk owns a fixed number of slots (its capacity), each holding at most
/// one section built by the chunk's [`SectionAdapter`]. Sections are created
/// lazily through [`get_or_create`](Self::get_or_create) and compacted by
/// [`trim_sections`](Self::trim_sections).
///
/// ## Lifecycle
///
/// A chunk is open until [`close`](Self::close) (or [`write`](Self::write),
/// which closes first). Closing waits for every [`ChunkHold`] to be dropped
/// and from then on [`use_chunk`](Self::use_chunk) fails. A closed chunk
/// never reopens.
///
/// ## Wire format
///
/// ```text
/// x:i8 | z:i8 | slot_count:u8 | flags | frame[0..slot_count]
/// frame = len:u32 (big-endian) | payload[len]     (len == 0: absent)
/// ```
///
/// Writes always emit exactly `capacity` frames. Reads accept any slot count:
/// frames past the reader's capacity are skipped, missing ones stay empty.
pub struct Chunk<A: SectionAdapter> {
    x: i8,
    z: i8,
    format_version: u8,
    scratch_capacity: usize,
    adapter: Arc<A>,
    sections: SlotTable<A::Section>,
    flags: ChunkFlags,
    barrier: UseBarrier,
}

impl<A: SectionAdapter> Chunk<A> {
    /// Creates an empty, open chunk.
    pub fn new(x: i8, z: i8, config: &ChunkConfig, adapter: Arc<A>) -> Self {
        Self::with_flags(x, z, config, adapter, ChunkFlags::new())
    }

    fn with_flags(
        x: i8,
        z: i8,
        config: &ChunkConfig,
        adapter: Arc<A>,
        flags: ChunkFlags,
    ) -> Self {
        Self {
            x,
            z,
            format_version: config.format_version,
            scratch_capacity: config.scratch_capacity,
            adapter,
            sections: SlotTable::new(usize::from(config.capacity)),
            flags,
            barrier: UseBarrier::new(),
        }
    }

    /// Decodes a chunk from `input`.
    ///
    /// The chunk gets `config.capacity` slots regardless of how many frames
    /// the stream declares, and `config.format_version` selects the flag
    /// layout. Sections that fail to decode are reported to
    /// [`SectionAdapter::on_read_section_failure`] and left empty.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the header, flags or a frame length cannot be read
    /// - a frame cannot be skipped (truncated stream)
    /// - after a section, the stream is not exactly at the end of its frame
    ///   ([`ChunkError::FrameSizeMismatch`])
    pub fn read<R: Read>(
        config: &ChunkConfig,
        adapter: Arc<A>,
        input: &mut CountingReader<R>,
    ) -> ChunkResult<Self> {
        let x = input.read_i8()?;
        let z = input.read_i8()?;
        let slot_count = usize::from(input.read_u8()?);
        let flags = ChunkFlags::read(config.format_version, input)?;

        let chunk = Self::with_flags(x, z, config, adapter, flags);

        for index in 0..slot_count {
            chunk.adapter.on_before_read_section(index);

            let size = u64::from(input.read_u32_be()?);
            if size == 0 {
                continue;
            }

            let start = input.offset();
            let end = start + size;

            if index >= chunk.section_count() {
                tracing::debug!(
                    x,
                    z,
                    index,
                    size,
                    capacity = chunk.section_count(),
                    "skipping section beyond chunk capacity"
                );
                input.skip_to(end)?;
                continue;
            }

            match chunk.adapter.read_section(input) {
                Ok(section) => {
                    chunk.sections.set(index, Some(Arc::new(section)))?;
                }
                Err(error) => {
                    chunk
                        .adapter
                        .on_read_section_failure(index, start, end, input, &error);
                    if input.offset() < end {
                        input.skip_to(end)?;
                    }
                }
            }

            let actual = input.offset();
            if actual != end {
                return Err(ChunkError::FrameSizeMismatch {
                    index,
                    expected: end,
                    actual,
                });
            }
        }

        Ok(chunk)
    }

    /// Closes the chunk and encodes it into `output`.
    ///
    /// Every slot is trimmed before it is framed, so empty sections are
    /// written as absent. Exactly `capacity` frames are written.
    ///
    /// This waits for all outstanding holds, so calling it while the current
    /// thread holds a [`ChunkHold`] on the same chunk never returns.
    ///
    /// # Errors
    ///
    /// Returns an error if a section fails to encode, an encoded section
    /// exceeds `u32::MAX` bytes, or `output` fails. The chunk stays closed.
    pub fn write<W: Write>(&self, output: &mut W) -> ChunkResult<()> {
        self.close();

        output.write_all(&self.x.to_be_bytes())?;
        output.write_all(&self.z.to_be_bytes())?;
        output.write_all(&[self.capacity()])?;
        self.flags.write(self.format_version, output)?;

        let mut scratch = Vec::with_capacity(self.scratch_capacity);
        for index in 0..self.section_count() {
            self.trim_index(index);

            match self.sections.get(index) {
                Some(section) => {
                    let framed = self.write_frame(index, &section, &mut scratch, output);
                    scratch.clear();
                    framed?;
                }
                None => output.write_all(&EMPTY_FRAME)?,
            }
        }

        Ok(())
    }

    fn write_frame<W: Write>(
        &self,
        index: usize,
        section: &A::Section,
        scratch: &mut Vec<u8>,
        output: &mut W,
    ) -> ChunkResult<()> {
        self.adapter.write_section(section, scratch)?;

        let len = u32::try_from(scratch.len()).map_err(|_| ChunkError::SectionTooLarge {
            index,
            len: scratch.len(),
        })?;
        tracing::trace!(index, len, "writing section frame");

        output.write_all(&len.to_be_bytes())?;
        output.write_all(scratch)?;
        Ok(())
    }

    /// Returns the chunk x coordinate.
    #[must_use]
    pub fn x(&self) -> i8 {
        self.x
    }

    /// Returns the chunk z coordinate.
    #[must_use]
    pub fn z(&self) -> i8 {
        self.z
    }

    /// Returns the number of section slots.
    #[must_use]
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Returns the number of section slots as stored on the wire.
    #[must_use]
    pub fn capacity(&self) -> u8 {
        // The table is always built from a u8 capacity.
        self.sections.len() as u8
    }

    /// Returns the format version this chunk writes.
    #[must_use]
    pub fn format_version(&self) -> u8 {
        self.format_version
    }

    /// Returns the adapter shared by this chunk.
    #[must_use]
    pub fn adapter(&self) -> &Arc<A> {
        &self.adapter
    }

    /// Registers a hold on the chunk.
    ///
    /// The hold is released when the returned guard is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError::Closed`] if the chunk is closed or closes
    /// concurrently.
    pub fn use_chunk(&self) -> ChunkResult<ChunkHold<'_, A>> {
        self.barrier.acquire()?;
        Ok(ChunkHold { chunk: self })
    }

    /// Returns true if any hold is outstanding.
    #[must_use]
    pub fn in_use(&self) -> bool {
        self.barrier.in_use()
    }

    /// Returns true once the chunk has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.barrier.is_closed()
    }

    /// Permanently closes the chunk, waiting for outstanding holds.
    pub fn close(&self) {
        let pending = self.barrier.holders();
        if pending > 0 {
            tracing::debug!(x = self.x, z = self.z, pending, "waiting for chunk holds");
        }
        self.barrier.close();
        tracing::debug!(x = self.x, z = self.z, "chunk closed");
    }

    /// Merges `other` into this chunk.
    ///
    /// Flags raised in `other` are raised here, and every slot takes
    /// `other`'s section at the same index (absent where `other` has none).
    /// Sections are shared, not cloned.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError::Closed`] if this chunk is closed.
    pub fn copy_from(&self, other: &Chunk<A>) -> ChunkResult<()> {
        let _hold = self.use_chunk()?;
        self.flags.merge_from(&other.flags);
        for index in 0..self.section_count() {
            self.sections.set(index, other.get(index))?;
        }
        Ok(())
    }

    /// Returns the section at `index`, if present.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Arc<A::Section>> {
        self.sections.get(index)
    }

    /// Returns true if a section is present at `index`.
    #[must_use]
    pub fn exists(&self, index: usize) -> bool {
        self.sections.exists(index)
    }

    /// Returns the section at `index`, creating an empty one if absent.
    ///
    /// Concurrent callers on the same index all get the same instance.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError::SlotOutOfRange`] if `index >= section_count()`.
    pub fn get_or_create(&self, index: usize) -> ChunkResult<Arc<A::Section>> {
        self.sections
            .get_or_create(index, || self.adapter.create_section())
    }

    /// Removes the section at `index`.
    pub fn delete(&self, index: usize) -> Option<Arc<A::Section>> {
        self.sections.delete(index)
    }

    /// Removes every section.
    pub fn clear(&self) {
        self.sections.clear();
    }

    /// Returns the number of present sections.
    #[must_use]
    pub fn present_count(&self) -> usize {
        self.sections.occupied()
    }

    /// Calls `f` with every present section in index order.
    pub fn for_each_section<F>(&self, mut f: F)
    where
        F: FnMut(usize, &A::Section),
    {
        for index in 0..self.section_count() {
            if let Some(section) = self.sections.get(index) {
                f(index, &section);
            }
        }
    }

    /// Trims every present section, dropping the ones left empty.
    pub fn trim_sections(&self) {
        for index in 0..self.section_count() {
            if self.exists(index) {
                self.trim_index(index);
            }
        }
    }

    /// Trims the section at `index`, dropping it if it is or becomes empty.
    pub fn trim_index(&self, index: usize) {
        let Some(section) = self.sections.get(index) else {
            return;
        };

        if self.adapter.is_section_empty(&section) {
            self.sections.delete_if_same(index, &section);
            return;
        }

        self.adapter.trim_section(&section);
        if self.adapter.is_section_empty(&section) {
            self.sections.delete_if_same(index, &section);
        }
    }

    /// Returns the chunk's flag set.
    #[must_use]
    pub fn flags(&self) -> &ChunkFlags {
        &self.flags
    }

    /// Raises or lowers `flag`.
    pub fn flag(&self, flag: ChunkFlag, on: bool) {
        self.flags.set(flag, on);
    }

    /// Returns true if `flag` is raised.
    #[must_use]
    pub fn is_flagged(&self, flag: ChunkFlag) -> bool {
        self.flags.is_set(flag)
    }

    /// Raises `flag` and runs `f` if it was not already raised.
    ///
    /// Returns true if `f` ran.
    pub fn raise_flag<F: FnOnce()>(&self, flag: ChunkFlag, f: F) -> bool {
        if self.flags.set(flag, true) {
            return false;
        }
        f();
        true
    }

    /// Lowers `flag` and runs `f` if it was raised.
    ///
    /// Returns true if `f` ran.
    pub fn lower_flag<F: FnOnce()>(&self, flag: ChunkFlag, f: F) -> bool {
        if !self.flags.set(flag, false) {
            return false;
        }
        f();
        true
    }
}

impl<A: SectionAdapter> std::fmt::Debug for Chunk<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunk")
            .field("x", &self.x)
            .field("z", &self.z)
            .field("sections", &self.sections)
            .field("flags", &self.flags.bits())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// A registered hold on a [`Chunk`].
///
/// While any hold exists, [`Chunk::close`] and [`Chunk::write`] wait.
/// Dropping the guard releases the hold.
#[must_use = "the hold is released as soon as the guard is dropped"]
pub struct ChunkHold<'a, A: SectionAdapter> {
    chunk: &'a Chunk<A>,
}

impl<A: SectionAdapter> ChunkHold<'_, A> {
    /// Releases the hold explicitly.
    pub fn release(self) {
        drop(self);
    }
}

impl<A: SectionAdapter> Deref for ChunkHold<'_, A> {
    type Target = Chunk<A>;

    fn deref(&self) -> &Self::Target {
        self.chunk
    }
}

impl<A: SectionAdapter> Drop for ChunkHold<'_, A> {
    fn drop(&mut self) {
        self.chunk.barrier.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::{CURRENT_FORMAT_VERSION, LEGACY_FORMAT_VERSION};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    /// Header length for the current format: x, z, slot count, 8 flag bytes.
    const HEADER_LEN: usize = 11;

    /// Payload marker that makes decoding fail after the frame is consumed.
    const POISON: u8 = 0xEE;
    /// Payload marker that makes encoding fail after partial output.
    const UNENCODABLE: u8 = 0xEF;

    #[derive(Debug)]
    struct Bytes(Mutex<Vec<u8>>);

    impl Bytes {
        fn data(&self) -> Vec<u8> {
            self.0.lock().clone()
        }

        fn fill(&self, data: &[u8]) {
            *self.0.lock() = data.to_vec();
        }
    }

    /// Sections are byte strings framed as `len:u16 | bytes`.
    #[derive(Default)]
    struct BytesAdapter {
        before: Mutex<Vec<usize>>,
        failures: Mutex<Vec<(usize, u64, u64)>>,
        trims: AtomicUsize,
    }

    impl SectionAdapter for BytesAdapter {
        type Section = Bytes;

        fn create_section(&self) -> Bytes {
            Bytes(Mutex::new(Vec::new()))
        }

        fn read_section<R: Read>(&self, input: &mut CountingReader<R>) -> ChunkResult<Bytes> {
            let len = input.read_u16_be()?;
            let data = input.read_vec(usize::from(len))?;
            if data.first() == Some(&POISON) {
                return Err(ChunkError::section("poisoned section"));
            }
            Ok(Bytes(Mutex::new(data)))
        }

        fn write_section(&self, section: &Bytes, out: &mut Vec<u8>) -> ChunkResult<()> {
            let data = section.data();
            out.extend_from_slice(&(data.len() as u16).to_be_bytes());
            if data.first() == Some(&UNENCODABLE) {
                return Err(ChunkError::section("unencodable section"));
            }
            out.extend_from_slice(&data);
            Ok(())
        }

        fn trim_section(&self, section: &Bytes) {
            self.trims.fetch_add(1, Ordering::SeqCst);
            let mut data = section.0.lock();
            while data.last() == Some(&0) {
                data.pop();
            }
        }

        fn is_section_empty(&self, section: &Bytes) -> bool {
            section.0.lock().is_empty()
        }

        fn on_before_read_section(&self, index: usize) {
            self.before.lock().push(index);
        }

        fn on_read_section_failure<R: Read>(
            &self,
            index: usize,
            start: u64,
            end: u64,
            _input: &CountingReader<R>,
            _error: &ChunkError,
        ) {
            self.failures.lock().push((index, start, end));
        }
    }

    fn config(capacity: u8) -> ChunkConfig {
        ChunkConfig::new().capacity(capacity)
    }

    fn chunk(capacity: u8) -> Chunk<BytesAdapter> {
        Chunk::new(3, -4, &config(capacity), Arc::new(BytesAdapter::default()))
    }

    fn put(chunk: &Chunk<BytesAdapter>, index: usize, data: &[u8]) {
        chunk.get_or_create(index).unwrap().fill(data);
    }

    fn encode(chunk: &Chunk<BytesAdapter>) -> Vec<u8> {
        let mut out = Vec::new();
        chunk.write(&mut out).unwrap();
        out
    }

    fn decode(bytes: &[u8], capacity: u8) -> ChunkResult<(Chunk<BytesAdapter>, u64)> {
        let mut input = CountingReader::new(bytes);
        let chunk = Chunk::read(
            &config(capacity),
            Arc::new(BytesAdapter::default()),
            &mut input,
        )?;
        Ok((chunk, input.offset()))
    }

    fn flag(n: u8) -> ChunkFlag {
        ChunkFlag::new(n).unwrap()
    }

    #[test]
    fn new_chunk_is_empty() {
        let chunk = chunk(8);
        assert_eq!((chunk.x(), chunk.z()), (3, -4));
        assert_eq!(chunk.section_count(), 8);
        assert_eq!(chunk.present_count(), 0);
        assert!(!chunk.is_closed());
        assert!(!chunk.in_use());
    }

    #[test]
    fn get_or_create_returns_same_instance() {
        let chunk = chunk(2);
        let a = chunk.get_or_create(1).unwrap();
        let b = chunk.get_or_create(1).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(chunk.exists(1));
        assert!(!chunk.exists(0));
    }

    #[test]
    fn get_or_create_past_capacity_fails() {
        let chunk = chunk(2);
        assert!(matches!(
            chunk.get_or_create(2),
            Err(ChunkError::SlotOutOfRange { index: 2, .. })
        ));
    }

    #[test]
    fn delete_and_clear() {
        let chunk = chunk(4);
        put(&chunk, 0, b"a");
        put(&chunk, 3, b"b");

        chunk.delete(0);
        assert!(!chunk.exists(0));
        assert!(chunk.exists(3));

        chunk.clear();
        assert_eq!(chunk.present_count(), 0);
        assert_eq!(chunk.section_count(), 4);
    }

    #[test]
    fn roundtrip_preserves_sections_and_flags() {
        let original = chunk(6);
        put(&original, 0, b"zero");
        put(&original, 2, b"two");
        put(&original, 5, &[5; 40]);
        original.flag(flag(1), true);
        original.flag(flag(40), true);

        let bytes = encode(&original);
        let (decoded, consumed) = decode(&bytes, 6).unwrap();

        assert_eq!(consumed, bytes.len() as u64);
        assert_eq!((decoded.x(), decoded.z()), (3, -4));
        assert_eq!(decoded.flags().bits(), original.flags().bits());
        for index in 0..6 {
            assert_eq!(decoded.exists(index), original.exists(index), "slot {index}");
            if let Some(section) = decoded.get(index) {
                assert_eq!(section.data(), original.get(index).unwrap().data());
            }
        }
    }

    #[test]
    fn write_layout() {
        let chunk = chunk(2);
        put(&chunk, 1, b"hi");

        let bytes = encode(&chunk);
        let mut expected = vec![3, 0xFC, 2, 0, 0, 0, 0, 0, 0, 0, 0];
        expected.extend_from_slice(&[0, 0, 0, 0]);
        expected.extend_from_slice(&[0, 0, 0, 4, 0, 2, b'h', b'i']);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn legacy_version_roundtrip() {
        let config = config(2).format_version(LEGACY_FORMAT_VERSION);
        let original = Chunk::new(0, 0, &config, Arc::new(BytesAdapter::default()));
        put(&original, 0, b"old");
        original.flag(flag(2), true);

        let bytes = encode(&original);
        assert_eq!(bytes.len(), 3 + (4 + 5) + 4);

        let mut input = CountingReader::new(&bytes[..]);
        let decoded = Chunk::read(&config, Arc::new(BytesAdapter::default()), &mut input).unwrap();
        assert_eq!(decoded.get(0).unwrap().data(), b"old");
        assert_eq!(decoded.flags().bits(), 0);
    }

    #[test]
    fn write_closes_chunk() {
        let chunk = chunk(1);
        encode(&chunk);

        assert!(chunk.is_closed());
        assert!(matches!(chunk.use_chunk(), Err(ChunkError::Closed)));
    }

    #[test]
    fn write_drops_empty_sections() {
        let chunk = chunk(3);
        chunk.get_or_create(0).unwrap();
        put(&chunk, 1, &[0, 0, 0]);
        put(&chunk, 2, &[7, 0]);

        let bytes = encode(&chunk);
        let (decoded, _) = decode(&bytes, 3).unwrap();

        assert!(!decoded.exists(0));
        assert!(!decoded.exists(1));
        assert_eq!(decoded.get(2).unwrap().data(), [7]);
    }

    #[test]
    fn write_always_emits_capacity_frames() {
        let chunk = chunk(5);
        let bytes = encode(&chunk);
        assert_eq!(bytes[2], 5);
        assert_eq!(bytes.len(), HEADER_LEN + 5 * 4);
    }

    #[test]
    fn encode_failure_propagates_without_partial_frame() {
        let chunk = chunk(2);
        put(&chunk, 0, &[UNENCODABLE, 1]);

        let mut out = Vec::new();
        let result = chunk.write(&mut out);

        assert!(matches!(result, Err(ChunkError::Section { .. })));
        assert_eq!(out.len(), HEADER_LEN);
        assert!(chunk.is_closed());
    }

    #[test]
    fn trim_index_drops_empty_without_trimming() {
        let chunk = chunk(1);
        chunk.get_or_create(0).unwrap();

        chunk.trim_index(0);
        assert!(!chunk.exists(0));
        assert_eq!(chunk.adapter().trims.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn trim_sections_compacts() {
        let chunk = chunk(3);
        put(&chunk, 0, &[0, 0]);
        put(&chunk, 1, &[1, 2, 0, 0]);

        chunk.trim_sections();

        assert!(!chunk.exists(0));
        assert_eq!(chunk.get(1).unwrap().data(), [1, 2]);
        assert!(!chunk.exists(2));
        assert_eq!(chunk.adapter().trims.load(Ordering::SeqCst), 2);

        chunk.trim_sections();
        assert_eq!(chunk.get(1).unwrap().data(), [1, 2]);
    }

    #[test]
    fn read_more_slots_than_capacity() {
        let wide = chunk(4);
        for index in 0..4 {
            put(&wide, index, &[index as u8 + 1; 3]);
        }
        let bytes = encode(&wide);

        let mut input = CountingReader::new(&bytes[..]);
        let adapter = Arc::new(BytesAdapter::default());
        let narrow = Chunk::read(&config(2), Arc::clone(&adapter), &mut input).unwrap();

        assert_eq!(narrow.section_count(), 2);
        assert_eq!(narrow.get(0).unwrap().data(), [1, 1, 1]);
        assert_eq!(narrow.get(1).unwrap().data(), [2, 2, 2]);
        assert!(!narrow.exists(2));
        assert_eq!(input.offset(), bytes.len() as u64);
        assert_eq!(*adapter.before.lock(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn read_fewer_slots_than_capacity() {
        let narrow = chunk(2);
        put(&narrow, 1, b"x");
        let bytes = encode(&narrow);

        let (wide, consumed) = decode(&bytes, 4).unwrap();
        assert_eq!(wide.section_count(), 4);
        assert!(wide.exists(1));
        assert!(!wide.exists(2));
        assert!(!wide.exists(3));
        assert_eq!(consumed, bytes.len() as u64);
    }

    #[test]
    fn section_failure_is_recovered() {
        let source = chunk(3);
        put(&source, 0, b"ok");
        put(&source, 1, &[POISON, 1, 2]);
        put(&source, 2, b"after");
        let bytes = encode(&source);

        let mut input = CountingReader::new(&bytes[..]);
        let adapter = Arc::new(BytesAdapter::default());
        let chunk = Chunk::read(&config(3), Arc::clone(&adapter), &mut input).unwrap();

        assert_eq!(chunk.get(0).unwrap().data(), b"ok");
        assert!(!chunk.exists(1));
        assert_eq!(chunk.get(2).unwrap().data(), b"after");

        // slot 0 frame: 4 + 4 bytes, slot 1 payload starts after its prefix
        let start = (HEADER_LEN + 8 + 4) as u64;
        assert_eq!(*adapter.failures.lock(), vec![(1, start, start + 5)]);
    }

    #[test]
    fn section_failure_before_frame_end_resyncs() {
        // Frame declares 6 bytes; the decoder fails after reading 3 of them.
        let mut bytes = vec![0, 0, 2, 0, 0, 0, 0, 0, 0, 0, 0];
        bytes.extend_from_slice(&[0, 0, 0, 6, 0, 1, POISON, 9, 9, 9]);
        bytes.extend_from_slice(&[0, 0, 0, 3, 0, 1, b'z']);

        let (chunk, consumed) = decode(&bytes, 2).unwrap();
        assert!(!chunk.exists(0));
        assert_eq!(chunk.get(1).unwrap().data(), b"z");
        assert_eq!(consumed, bytes.len() as u64);
    }

    #[test]
    fn section_failure_past_frame_end_fails_decode() {
        // Frame declares 2 bytes; the decoder reads 5 before failing.
        let mut bytes = vec![0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0];
        bytes.extend_from_slice(&[0, 0, 0, 2, 0, 3, POISON, 1, 2]);

        let adapter = Arc::new(BytesAdapter::default());
        let mut input = CountingReader::new(&bytes[..]);
        let result = Chunk::read(&config(1), Arc::clone(&adapter), &mut input);

        assert!(matches!(
            result,
            Err(ChunkError::FrameSizeMismatch {
                index: 0,
                expected: 17,
                actual: 20
            })
        ));
        assert_eq!(*adapter.failures.lock(), vec![(0, 15, 17)]);
    }

    #[test]
    fn frame_size_mismatch_fails_decode() {
        // Frame declares 5 bytes but the section only uses 3.
        let mut bytes = vec![1, 2, 2, 0, 0, 0, 0, 0, 0, 0, 0];
        bytes.extend_from_slice(&[0, 0, 0, 5, 0, 1, 0xAB, 0xCC, 0xCC]);
        bytes.extend_from_slice(&[0, 0, 0, 3, 0, 1, b'z']);

        let result = decode(&bytes, 2);
        assert!(matches!(
            result,
            Err(ChunkError::FrameSizeMismatch {
                index: 0,
                expected: 20,
                actual: 18
            })
        ));
    }

    #[test]
    fn truncated_stream_fails_decode() {
        let chunk = chunk(2);
        put(&chunk, 0, b"data");
        let bytes = encode(&chunk);

        for cut in [1, HEADER_LEN - 1, HEADER_LEN + 2, bytes.len() - 1] {
            let result = decode(&bytes[..cut], 2);
            assert!(matches!(result, Err(ChunkError::Stream(_))), "cut at {cut}");
        }
    }

    #[test]
    fn truncated_legacy_frame_fails_decode() {
        let chunk = chunk(3);
        put(&chunk, 2, b"legacy");
        let bytes = encode(&chunk);

        let result = decode(&bytes[..bytes.len() - 2], 1);
        assert!(matches!(result, Err(ChunkError::Stream(_))));
    }

    #[test]
    fn copy_from_shares_sections_and_merges_flags() {
        let source = chunk(3);
        put(&source, 0, b"shared");
        source.flag(flag(5), true);

        let target = chunk(3);
        put(&target, 2, b"gone");
        target.flag(flag(6), true);

        target.copy_from(&source).unwrap();

        assert!(Arc::ptr_eq(
            &target.get(0).unwrap(),
            &source.get(0).unwrap()
        ));
        assert!(!target.exists(2));
        assert!(target.is_flagged(flag(5)));
        assert!(target.is_flagged(flag(6)));
        assert!(!target.in_use());
    }

    #[test]
    fn copy_from_closed_chunk_fails() {
        let source = chunk(1);
        let target = chunk(1);
        target.close();
        assert!(matches!(target.copy_from(&source), Err(ChunkError::Closed)));
    }

    #[test]
    fn hold_guard_releases_on_drop() {
        let chunk = chunk(1);
        {
            let hold = chunk.use_chunk().unwrap();
            assert!(chunk.in_use());
            assert_eq!(hold.section_count(), 1);
        }
        assert!(!chunk.in_use());

        let hold = chunk.use_chunk().unwrap();
        hold.release();
        assert!(!chunk.in_use());
    }

    #[test]
    fn write_waits_for_holds() {
        let chunk = chunk(1);
        put(&chunk, 0, b"held");
        let written = AtomicBool::new(false);

        thread::scope(|s| {
            let hold = chunk.use_chunk().unwrap();

            let writer = s.spawn(|| {
                let bytes = encode(&chunk);
                written.store(true, Ordering::SeqCst);
                bytes
            });

            while !chunk.is_closed() {
                thread::yield_now();
            }
            assert!(matches!(chunk.use_chunk(), Err(ChunkError::Closed)));
            thread::sleep(Duration::from_millis(20));
            assert!(!written.load(Ordering::SeqCst));

            drop(hold);
            let bytes = writer.join().unwrap();
            assert_eq!(bytes.len(), HEADER_LEN + 4 + 6);
        });

        assert!(written.load(Ordering::SeqCst));
    }

    #[test]
    fn raise_and_lower_flag_run_once() {
        let chunk = chunk(1);
        let mut runs = 0;

        assert!(chunk.raise_flag(flag(9), || runs += 1));
        assert!(!chunk.raise_flag(flag(9), || runs += 1));
        assert!(chunk.is_flagged(flag(9)));
        assert!(chunk.lower_flag(flag(9), || runs += 1));
        assert!(!chunk.lower_flag(flag(9), || runs += 1));
        assert_eq!(runs, 2);
    }

    #[test]
    fn for_each_section_visits_present_in_order() {
        let chunk = chunk(5);
        put(&chunk, 4, b"d");
        put(&chunk, 1, b"a");

        let mut seen = Vec::new();
        chunk.for_each_section(|index, section| seen.push((index, section.data())));
        assert_eq!(seen, vec![(1, b"a".to_vec()), (4, b"d".to_vec())]);
    }

    #[test]
    fn default_format_version_is_current() {
        assert_eq!(chunk(1).format_version(), CURRENT_FORMAT_VERSION);
    }
}
