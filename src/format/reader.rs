//! Reads embedding cache files into memory.

use std::io::Read;
use std::path::Path;

use crate::embed::EmbeddingCache;
use crate::types::error::{LineageError, LineageResult};
use crate::types::header::{CacheHeader, HEADER_SIZE};

use super::compression::decompress_names;

/// Reader for .lemb embedding cache files.
pub struct CacheReader;

impl CacheReader {
    /// Read a cache file into an [`EmbeddingCache`].
    pub fn read_from_file(path: &Path) -> LineageResult<EmbeddingCache> {
        let data = std::fs::read(path)?;
        let mut cursor = std::io::Cursor::new(data);
        Self::read_from(&mut cursor)
    }

    /// Read from any reader.
    pub fn read_from(reader: &mut impl Read) -> LineageResult<EmbeddingCache> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        if (data.len() as u64) < HEADER_SIZE {
            return Err(LineageError::Truncated);
        }

        let header = CacheHeader::read_from(&mut std::io::Cursor::new(&data[..64]))?;
        let names = read_names(&data, &header)?;

        let dim = header.dimension as usize;
        let stride = vector_stride(&header)?;
        let end = vector_block_end(&header, names.len())?;
        if end > data.len() {
            return Err(LineageError::Truncated);
        }

        let mut cache = EmbeddingCache::new(dim);
        let mut offset = header.vectors_offset as usize;
        for name in names {
            cache.insert(name, decode_vector(&data[offset..offset + stride]))?;
            offset += stride;
        }
        Ok(cache)
    }
}

/// Decode the name table of a cache whose header has been parsed.
pub(crate) fn read_names(data: &[u8], header: &CacheHeader) -> LineageResult<Vec<String>> {
    let start = usize::try_from(header.names_offset)
        .map_err(|_| LineageError::Corrupt(header.names_offset))?;
    let end = usize::try_from(header.names_length)
        .ok()
        .and_then(|len| start.checked_add(len))
        .ok_or(LineageError::Corrupt(header.names_offset))?;
    if end > data.len() {
        return Err(LineageError::Truncated);
    }
    decompress_names(&data[start..end], header.entity_count as usize)
}

/// Bytes per stored vector.
pub(crate) fn vector_stride(header: &CacheHeader) -> LineageResult<usize> {
    (header.dimension as usize)
        .checked_mul(4)
        .ok_or(LineageError::Corrupt(header.vectors_offset))
}

/// End offset of the vector block holding `count` vectors.
pub(crate) fn vector_block_end(header: &CacheHeader, count: usize) -> LineageResult<usize> {
    let stride = vector_stride(header)?;
    usize::try_from(header.vectors_offset)
        .ok()
        .zip(stride.checked_mul(count))
        .and_then(|(start, len)| start.checked_add(len))
        .ok_or(LineageError::Corrupt(header.vectors_offset))
}

/// Decode a little-endian f32 run.
pub(crate) fn decode_vector(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}
