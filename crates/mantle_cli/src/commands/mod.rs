//! CLI command implementations.

pub mod inspect;
pub mod verify;

use mantle_core::{scan_chunk, ChunkLayout};
use mantle_io::CountingReader;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Every chunk found in a file, plus where scanning stopped.
#[derive(Debug)]
pub struct FileScan {
    /// File size in bytes.
    pub file_size: u64,
    /// Layouts of the chunks scanned successfully, in file order.
    pub chunks: Vec<ChunkLayout>,
    /// Offset and message of the first failure, if scanning stopped early.
    pub failure: Option<(u64, String)>,
}

/// Scans a file holding zero or more concatenated chunks.
pub fn scan_file(path: &Path, format_version: u8) -> Result<FileScan, Box<dyn std::error::Error>> {
    let file = File::open(path).map_err(|e| format!("cannot open {}: {e}", path.display()))?;
    let file_size = file.metadata()?.len();
    let mut input = CountingReader::new(BufReader::new(file));

    let mut chunks = Vec::new();
    let mut failure = None;
    while input.offset() < file_size {
        let start = input.offset();
        match scan_chunk(format_version, &mut input) {
            Ok(layout) => {
                tracing::debug!(
                    start,
                    x = layout.x,
                    z = layout.z,
                    slots = layout.slot_count(),
                    "scanned chunk"
                );
                chunks.push(layout);
            }
            Err(e) => {
                failure = Some((start, e.to_string()));
                break;
            }
        }
    }

    Ok(FileScan {
        file_size,
        chunks,
        failure,
    })
}
