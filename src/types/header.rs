//! File header for embedding cache files.

use std::io::{Read, Write};

use crate::types::error::{LineageError, LineageResult};
use crate::types::{CACHE_MAGIC, FORMAT_VERSION};

/// Header of an embedding cache file. Fixed size: 64 bytes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheHeader {
    /// Magic bytes: [0x4C, 0x45, 0x4D, 0x42] ("LEMB").
    pub magic: [u8; 4],
    /// Format version (currently 1).
    pub version: u32,
    /// Embedding dimensionality.
    pub dimension: u32,
    /// Number of cached entities.
    pub entity_count: u64,
    /// Byte offset of the compressed name block.
    pub names_offset: u64,
    /// Compressed length of the name block.
    pub names_length: u64,
    /// Byte offset of the vector block.
    pub vectors_offset: u64,
}

/// The fixed size of a CacheHeader on disk: 64 bytes.
pub const HEADER_SIZE: u64 = 64;

impl CacheHeader {
    /// Create a new header with default magic and version.
    pub fn new(dimension: u32) -> Self {
        Self {
            magic: CACHE_MAGIC,
            version: FORMAT_VERSION,
            dimension,
            entity_count: 0,
            names_offset: HEADER_SIZE,
            names_length: 0,
            vectors_offset: HEADER_SIZE,
        }
    }

    /// Write this header. Writes exactly 64 bytes.
    ///
    /// Layout (all little-endian):
    /// - 0x00..0x04: magic
    /// - 0x04..0x08: version (u32)
    /// - 0x08..0x0C: dimension (u32)
    /// - 0x0C..0x10: _reserved
    /// - 0x10..0x18: entity_count (u64)
    /// - 0x18..0x20: names_offset (u64)
    /// - 0x20..0x28: names_length (u64)
    /// - 0x28..0x30: vectors_offset (u64)
    /// - 0x30..0x40: _reserved
    pub fn write_to(&self, writer: &mut impl Write) -> LineageResult<()> {
        writer.write_all(&self.magic)?;
        writer.write_all(&self.version.to_le_bytes())?;
        writer.write_all(&self.dimension.to_le_bytes())?;
        writer.write_all(&0u32.to_le_bytes())?;
        writer.write_all(&self.entity_count.to_le_bytes())?;
        writer.write_all(&self.names_offset.to_le_bytes())?;
        writer.write_all(&self.names_length.to_le_bytes())?;
        writer.write_all(&self.vectors_offset.to_le_bytes())?;
        writer.write_all(&[0u8; 16])?;
        Ok(())
    }

    /// Read a header. Reads exactly 64 bytes.
    pub fn read_from(reader: &mut impl Read) -> LineageResult<Self> {
        let mut buf = [0u8; 64];
        reader.read_exact(&mut buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                LineageError::Truncated
            } else {
                LineageError::Io(e)
            }
        })?;

        let magic = [buf[0], buf[1], buf[2], buf[3]];
        if magic != CACHE_MAGIC {
            return Err(LineageError::InvalidMagic);
        }

        let version = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
        if version != FORMAT_VERSION {
            return Err(LineageError::UnsupportedVersion(version));
        }

        let dimension = u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]);
        Ok(Self {
            magic,
            version,
            dimension,
            entity_count: read_u64(&buf, 16),
            names_offset: read_u64(&buf, 24),
            names_length: read_u64(&buf, 32),
            vectors_offset: read_u64(&buf, 40),
        })
    }
}

pub(crate) fn read_u64(buf: &[u8], at: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(bytes)
}
