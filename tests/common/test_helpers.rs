#![allow(dead_code)]

// Common test helper functions

use std::fs;
use std::io::Read;
use std::path::Path;

/// Verify that a file contains only `byte`
pub fn verify_filled_with(path: &Path, byte: u8) -> std::io::Result<bool> {
    Ok(first_byte_not(path, byte)?.is_none())
}

/// Verify that a file contains only zeros
pub fn verify_all_zeros(path: &Path) -> std::io::Result<bool> {
    verify_filled_with(path, 0x00)
}

/// Offset of the first byte that differs from `byte`
pub fn first_byte_not(path: &Path, byte: u8) -> std::io::Result<Option<u64>> {
    let mut file = fs::File::open(path)?;
    let mut buffer = vec![0u8; 64 * 1024];
    let mut offset = 0u64;

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            return Ok(None);
        }
        if let Some(i) = buffer[..bytes_read].iter().position(|&b| b != byte) {
            return Ok(Some(offset + i as u64));
        }
        offset += bytes_read as u64;
    }
}
