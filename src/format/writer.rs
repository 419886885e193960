//! Writes embedding cache files.

use std::io::Write;
use std::path::Path;

use crate::embed::EmbeddingCache;
use crate::types::error::LineageResult;
use crate::types::header::{CacheHeader, HEADER_SIZE};

use super::compression::compress_names;

/// Writer for .lemb embedding cache files.
pub struct CacheWriter;

impl CacheWriter {
    /// Write a complete cache to a file.
    pub fn write_to_file(cache: &EmbeddingCache, path: &Path) -> LineageResult<()> {
        let file = std::fs::File::create(path)?;
        let mut writer = std::io::BufWriter::new(file);
        Self::write_to(cache, &mut writer)
    }

    /// Write a complete cache to any writer.
    ///
    /// Entities are stored in ascending order so readers can binary search the
    /// name table and index straight into the vector block.
    pub fn write_to(cache: &EmbeddingCache, writer: &mut impl Write) -> LineageResult<()> {
        let names = compress_names(cache.iter().map(|(name, _)| name));

        let header = CacheHeader {
            entity_count: cache.len() as u64,
            names_offset: HEADER_SIZE,
            names_length: names.len() as u64,
            vectors_offset: HEADER_SIZE + names.len() as u64,
            ..CacheHeader::new(cache.dimension() as u32)
        };
        header.write_to(writer)?;

        writer.write_all(&names)?;

        for (_, vector) in cache.iter() {
            for &val in vector {
                writer.write_all(&val.to_le_bytes())?;
            }
        }

        writer.flush()?;
        Ok(())
    }
}
