//! Memory-mapped access to embedding cache files.

use std::path::Path;

use memmap2::Mmap;

use crate::embed::{Embedding, EmbeddingProvider};
use crate::types::error::{LineageError, LineageResult};
use crate::types::header::{CacheHeader, HEADER_SIZE};

use super::reader::{decode_vector, read_names, vector_block_end};

/// Read-only memory-mapped embedding cache.
///
/// The name table is decoded once on open; vectors stay on disk and are
/// decoded on lookup.
pub struct MmapCache {
    mmap: Mmap,
    header: CacheHeader,
    names: Vec<String>,
}

impl MmapCache {
    /// Open a cache file for memory-mapped read access.
    pub fn open(path: &Path) -> LineageResult<Self> {
        let file = std::fs::File::open(path)?;
        // SAFETY: the map is read-only and the file is not modified while open.
        let mmap = unsafe { Mmap::map(&file)? };

        if (mmap.len() as u64) < HEADER_SIZE {
            return Err(LineageError::Truncated);
        }
        let header = CacheHeader::read_from(&mut std::io::Cursor::new(&mmap[..64]))?;
        let names = read_names(&mmap, &header)?;

        if vector_block_end(&header, names.len())? > mmap.len() {
            return Err(LineageError::Truncated);
        }

        Ok(Self {
            mmap,
            header,
            names,
        })
    }

    /// Get the file header.
    pub fn header(&self) -> &CacheHeader {
        &self.header
    }

    /// Cached entity names, ascending.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Read the vector for an entity.
    pub fn vector(&self, entity: &str) -> LineageResult<Embedding> {
        let idx = self
            .names
            .binary_search_by(|n| n.as_str().cmp(entity))
            .map_err(|_| LineageError::EmbeddingLookup(entity.to_string()))?;
        let dim = self.header.dimension as usize;
        let offset = self.header.vectors_offset as usize + idx * dim * 4;
        Ok(decode_vector(&self.mmap[offset..offset + dim * 4]))
    }
}

impl EmbeddingProvider for MmapCache {
    fn embed(&self, text: &str) -> Option<Embedding> {
        self.vector(text).ok()
    }

    fn dimension(&self) -> usize {
        self.header.dimension as usize
    }

    fn name(&self) -> &str {
        "mmap-cache"
    }
}
