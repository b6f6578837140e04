//! Chunk configuration.

use crate::flags::CURRENT_FORMAT_VERSION;

/// Configuration for creating or decoding chunks.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Number of section slots per chunk.
    pub capacity: u8,

    /// Format version written by this configuration and assumed when decoding.
    pub format_version: u8,

    /// Initial size of the scratch buffer used to frame sections on write.
    pub scratch_capacity: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            capacity: 16,
            format_version: CURRENT_FORMAT_VERSION,
            scratch_capacity: 8 * 1024, // 8 KB
        }
    }
}

impl ChunkConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of section slots.
    #[must_use]
    pub const fn capacity(mut self, capacity: u8) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the format version.
    #[must_use]
    pub const fn format_version(mut self, version: u8) -> Self {
        self.format_version = version;
        self
    }

    /// Sets the initial scratch buffer size.
    #[must_use]
    pub const fn scratch_capacity(mut self, size: usize) -> Self {
        self.scratch_capacity = size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ChunkConfig::default();
        assert_eq!(config.capacity, 16);
        assert_eq!(config.format_version, CURRENT_FORMAT_VERSION);
        assert_eq!(config.scratch_capacity, 8192);
    }

    #[test]
    fn builder_pattern() {
        let config = ChunkConfig::new()
            .capacity(24)
            .format_version(0)
            .scratch_capacity(64);

        assert_eq!(config.capacity, 24);
        assert_eq!(config.format_version, 0);
        assert_eq!(config.scratch_capacity, 64);
    }
}
