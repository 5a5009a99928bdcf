//! File reading helpers with size limits.

use std::fs;
use std::path::Path;

use crate::error::{GateWatchError, Result};

/// Largest reference image or camera frame read into memory (8 MB).
pub const MAX_IMAGE_SIZE: u64 = 8 * 1024 * 1024;

/// Largest text file (fixture, raw response) read into memory (1 MB).
pub const MAX_TEXT_SIZE: u64 = 1024 * 1024;

fn check_size(path: &Path, max_size: u64) -> Result<()> {
    let metadata = fs::metadata(path).map_err(|e| GateWatchError::storage(path, e))?;

    let size = metadata.len();
    if size > max_size {
        return Err(GateWatchError::FileTooLarge {
            path: path.to_path_buf(),
            size,
            max: max_size,
        });
    }
    Ok(())
}

/// Read a file's bytes, refusing anything larger than `max_size`.
pub fn read_bytes_with_limit(path: &Path, max_size: u64) -> Result<Vec<u8>> {
    check_size(path, max_size)?;
    fs::read(path).map_err(|e| GateWatchError::storage(path, e))
}

/// Read a text file, refusing anything larger than `max_size`.
pub fn read_to_string_with_limit(path: &Path, max_size: u64) -> Result<String> {
    check_size(path, max_size)?;
    fs::read_to_string(path).map_err(|e| GateWatchError::storage(path, e))
}
