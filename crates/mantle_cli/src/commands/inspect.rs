//! Inspect command implementation.

use super::scan_file;
use serde::Serialize;
use std::path::Path;

/// File inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// File path.
    pub path: String,
    /// File size in bytes.
    pub file_size: u64,
    /// One entry per chunk.
    pub chunks: Vec<ChunkSummary>,
    /// First scan failure, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Layout of a single chunk.
#[derive(Debug, Serialize)]
pub struct ChunkSummary {
    /// Chunk x coordinate.
    pub x: i8,
    /// Chunk z coordinate.
    pub z: i8,
    /// Offset of the chunk in the file.
    pub offset: u64,
    /// Encoded size in bytes.
    pub size: u64,
    /// Raw flag bitmask.
    pub flags: u64,
    /// Declared slot count.
    pub slots: usize,
    /// Present sections.
    pub sections: Vec<SectionSummary>,
}

/// Frame of a present section.
#[derive(Debug, Serialize)]
pub struct SectionSummary {
    /// Slot index.
    pub index: usize,
    /// Payload offset in the file.
    pub offset: u64,
    /// Payload length.
    pub len: u32,
}

/// Builds the inspection result for `path`.
pub fn inspect(path: &Path, format_version: u8) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let scan = scan_file(path, format_version)?;

    let chunks = scan
        .chunks
        .iter()
        .map(|layout| ChunkSummary {
            x: layout.x,
            z: layout.z,
            offset: layout.start,
            size: layout.encoded_len(),
            flags: layout.flags,
            slots: layout.slot_count(),
            sections: layout
                .frames
                .iter()
                .filter(|f| f.is_present())
                .map(|f| SectionSummary {
                    index: f.index,
                    offset: f.offset,
                    len: f.len,
                })
                .collect(),
        })
        .collect();

    Ok(InspectResult {
        path: path.display().to_string(),
        file_size: scan.file_size,
        chunks,
        error: scan
            .failure
            .map(|(offset, message)| format!("at offset {offset}: {message}")),
    })
}

/// Runs the inspect command.
pub fn run(path: &Path, format_version: u8, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let result = inspect(path, format_version)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("File: {}", result.path);
    println!("Size: {} bytes", result.file_size);
    println!("Chunks: {}", result.chunks.len());

    for chunk in &result.chunks {
        println!();
        println!(
            "Chunk ({}, {}) at {} ({} bytes, flags {:#018x})",
            chunk.x, chunk.z, chunk.offset, chunk.size, chunk.flags
        );
        println!("  Sections: {}/{}", chunk.sections.len(), chunk.slots);
        for section in &chunk.sections {
            println!(
                "    [{:>3}] offset {:>8}  len {:>8}",
                section.index, section.offset, section.len
            );
        }
    }

    if let Some(error) = &result.error {
        println!();
        println!("Error: {error}");
    }
}
