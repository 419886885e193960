//! Binary file I/O for embedding cache (.lemb) files.

pub mod compression;
pub mod mmap;
pub mod reader;
pub mod writer;

pub use mmap::MmapCache;
pub use reader::CacheReader;
pub use writer::CacheWriter;
