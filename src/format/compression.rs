//! LZ4 compression of the entity name table.

use crate::types::error::{LineageError, LineageResult};

/// Encode names as length-prefixed UTF-8 and compress with LZ4 (size prepended).
pub fn compress_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<u8> {
    let mut raw = Vec::new();
    for name in names {
        raw.extend_from_slice(&(name.len() as u32).to_le_bytes());
        raw.extend_from_slice(name.as_bytes());
    }
    lz4_flex::compress_prepend_size(&raw)
}

/// Decompress a name table produced by [`compress_names`].
pub fn decompress_names(data: &[u8], expected: usize) -> LineageResult<Vec<String>> {
    let raw = lz4_flex::decompress_size_prepended(data)
        .map_err(|e| LineageError::Compression(e.to_string()))?;

    // Every entry carries a 4-byte length, which bounds the count.
    let mut names = Vec::with_capacity(expected.min(raw.len() / 4));
    let mut pos = 0usize;
    while pos < raw.len() {
        if pos + 4 > raw.len() {
            return Err(LineageError::Corrupt(pos as u64));
        }
        let len = u32::from_le_bytes([raw[pos], raw[pos + 1], raw[pos + 2], raw[pos + 3]]) as usize;
        pos += 4;
        if pos + len > raw.len() {
            return Err(LineageError::Corrupt(pos as u64));
        }
        let name = std::str::from_utf8(&raw[pos..pos + len])
            .map_err(|e| LineageError::Compression(e.to_string()))?;
        names.push(name.to_string());
        pos += len;
    }

    if names.len() != expected {
        return Err(LineageError::Corrupt(0));
    }
    Ok(names)
}
