//! Property-based test generators using proptest.
//!
//! Provides strategies for generating chunk layouts whose expected
//! post-encode contents can be computed independently of the codec.

use crate::fixtures::{blob_chunk, trimmed, BlobAdapter};
use mantle_core::{Chunk, ChunkFlag};
use proptest::prelude::*;

/// A chunk description that can be materialized into a blob chunk.
#[derive(Debug, Clone)]
pub struct ChunkSpec {
    /// Chunk x coordinate.
    pub x: i8,
    /// Chunk z coordinate.
    pub z: i8,
    /// Section slot count.
    pub capacity: u8,
    /// One entry per slot; `None` leaves the slot absent.
    pub sections: Vec<Option<Vec<u8>>>,
    /// Flag ordinals to raise.
    pub flags: Vec<u8>,
}

impl ChunkSpec {
    /// Builds an open chunk matching this spec.
    pub fn build(&self) -> Chunk<BlobAdapter> {
        let present: Vec<(usize, &[u8])> = self
            .sections
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_deref().map(|data| (i, data)))
            .collect();
        let chunk = blob_chunk(self.x, self.z, self.capacity, &present);
        for &ordinal in &self.flags {
            chunk.flag(ChunkFlag::new(ordinal).expect("valid flag ordinal"), true);
        }
        chunk
    }

    /// Slot contents expected after a write/read cycle.
    ///
    /// Sections are trimmed on write and dropped if left empty.
    pub fn expected(&self) -> Vec<Option<Vec<u8>>> {
        self.sections
            .iter()
            .map(|s| {
                s.as_deref()
                    .map(trimmed)
                    .filter(|data| !data.is_empty())
                    .map(<[u8]>::to_vec)
            })
            .collect()
    }

    /// Raw flag bitmask this spec produces.
    pub fn flag_bits(&self) -> u64 {
        self.flags.iter().fold(0, |bits, &ordinal| bits | (1 << ordinal))
    }
}

/// Strategy for section payloads, including ones that trim to nothing.
pub fn section_data_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        4 => prop::collection::vec(any::<u8>(), 1..96),
        1 => prop::collection::vec(Just(0u8), 0..8),
        1 => (prop::collection::vec(1u8..=255, 1..16), 1usize..8)
            .prop_map(|(mut data, zeros)| {
                data.extend(std::iter::repeat(0).take(zeros));
                data
            }),
    ]
}

/// Strategy for flag ordinal sets.
pub fn flag_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(0u8..=ChunkFlag::MAX_ORDINAL, 0..6)
}

/// Strategy for chunk specs with capacity in `0..=max_capacity`.
pub fn chunk_spec_strategy(max_capacity: u8) -> impl Strategy<Value = ChunkSpec> {
    (0u8..=max_capacity).prop_flat_map(|capacity| {
        (
            any::<i8>(),
            any::<i8>(),
            prop::collection::vec(
                prop::option::weighted(0.6, section_data_strategy()),
                usize::from(capacity),
            ),
            flag_strategy(),
        )
            .prop_map(move |(x, z, sections, flags)| ChunkSpec {
                x,
                z,
                capacity,
                sections,
                flags,
            })
    })
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn spec_has_one_entry_per_slot(spec in chunk_spec_strategy(12)) {
            prop_assert_eq!(spec.sections.len(), usize::from(spec.capacity));
            prop_assert_eq!(spec.expected().len(), usize::from(spec.capacity));
        }

        #[test]
        fn expected_never_holds_empty_or_zero_tailed(spec in chunk_spec_strategy(12)) {
            for data in spec.expected().into_iter().flatten() {
                prop_assert!(!data.is_empty());
                prop_assert_ne!(data.last(), Some(&0));
            }
        }

        #[test]
        fn built_chunk_matches_spec(spec in chunk_spec_strategy(8)) {
            let chunk = spec.build();
            prop_assert_eq!(chunk.section_count(), usize::from(spec.capacity));
            prop_assert_eq!(chunk.flags().bits(), spec.flag_bits());
            for (index, section) in spec.sections.iter().enumerate() {
                prop_assert_eq!(chunk.exists(index), section.is_some());
            }
        }
    }
}
