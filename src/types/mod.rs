//! All data types for the topic lineage library.

pub mod cluster;
pub mod document;
pub mod error;
pub mod header;

pub use cluster::{ClusterId, Evolution, SliceClusters};
pub use document::{parse_document_date, Corpus, DocumentRecord, SourceTable};
pub use error::{LineageError, LineageResult};
pub use header::{CacheHeader, HEADER_SIZE};

/// Magic bytes at the start of every embedding cache file.
pub const CACHE_MAGIC: [u8; 4] = [0x4C, 0x45, 0x4D, 0x42]; // "LEMB"

/// Current embedding cache format version.
pub const FORMAT_VERSION: u32 = 1;

/// First slice year used when none is configured.
pub const DEFAULT_START_YEAR: i32 = 2010;

/// Default Jaccard threshold a cross-slice match must exceed.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.5;

/// Default number of TF-IDF terms joined into a cluster name.
pub const DEFAULT_TOP_N_TERMS: usize = 3;

/// Default dimensionality of the hashed n-gram embedding.
pub const DEFAULT_DIMENSION: usize = 128;
