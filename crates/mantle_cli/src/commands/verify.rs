//! Verify command implementation.

use super::scan_file;
use std::path::Path;

/// Verification summary.
#[derive(Debug)]
pub struct VerifyResult {
    /// Chunks that scanned cleanly.
    pub chunks: usize,
    /// Present sections across those chunks.
    pub sections: usize,
    /// Bytes covered by clean chunks.
    pub verified_bytes: u64,
    /// File size in bytes.
    pub file_size: u64,
    /// Problems found.
    pub errors: Vec<String>,
}

impl VerifyResult {
    /// Returns true if the whole file is a clean sequence of chunks.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Checks the framing of every chunk in `path`.
pub fn verify(path: &Path, format_version: u8) -> Result<VerifyResult, Box<dyn std::error::Error>> {
    let scan = scan_file(path, format_version)?;

    let verified_bytes = scan.chunks.last().map_or(0, |layout| layout.end);
    let mut errors = Vec::new();
    if let Some((offset, message)) = scan.failure {
        errors.push(format!(
            "chunk {} at offset {offset}: {message}",
            scan.chunks.len()
        ));
    }

    Ok(VerifyResult {
        chunks: scan.chunks.len(),
        sections: scan.chunks.iter().map(|c| c.present_count()).sum(),
        verified_bytes,
        file_size: scan.file_size,
        errors,
    })
}

/// Runs the verify command.
pub fn run(path: &Path, format_version: u8) -> Result<(), Box<dyn std::error::Error>> {
    let result = verify(path, format_version)?;

    println!("Verified {} chunks ({} sections)", result.chunks, result.sections);
    println!("Covered {}/{} bytes", result.verified_bytes, result.file_size);

    if result.is_ok() {
        println!("OK");
        Ok(())
    } else {
        for error in &result.errors {
            println!("ERROR: {error}");
        }
        Err(format!("{} problem(s) found", result.errors.len()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mantle_core::CURRENT_FORMAT_VERSION;
    use mantle_testkit::{blob_chunk, encode_chunk, ChunkFiles};

    #[test]
    fn clean_file_verifies() {
        let files = ChunkFiles::new();
        let path = files.write_chunk("ok.chunk", &blob_chunk(0, 0, 3, &[(2, &b"zz"[..])]));

        let result = verify(&path, CURRENT_FORMAT_VERSION).unwrap();
        assert!(result.is_ok());
        assert_eq!(result.chunks, 1);
        assert_eq!(result.sections, 1);
        assert_eq!(result.verified_bytes, result.file_size);
    }

    #[test]
    fn empty_file_verifies() {
        let files = ChunkFiles::new();
        let path = files.write_bytes("empty.chunk", &[]);

        let result = verify(&path, CURRENT_FORMAT_VERSION).unwrap();
        assert!(result.is_ok());
        assert_eq!(result.chunks, 0);
    }

    #[test]
    fn truncated_file_fails() {
        let files = ChunkFiles::new();
        let mut bytes = encode_chunk(&blob_chunk(0, 0, 2, &[(0, &b"full"[..])]));
        let second = encode_chunk(&blob_chunk(1, 0, 2, &[(1, &b"cut"[..])]));
        bytes.extend_from_slice(&second[..second.len() - 3]);
        let path = files.write_bytes("cut.chunk", &bytes);

        let result = verify(&path, CURRENT_FORMAT_VERSION).unwrap();
        assert!(!result.is_ok());
        assert_eq!(result.chunks, 1);
        assert!(result.errors[0].starts_with("chunk 1 at offset"));
        assert!(result.verified_bytes < result.file_size);
    }
}
