//! Error types for the topic lineage library.

use thiserror::Error;

/// All errors that can occur while building and tracking entity clusters.
#[derive(Error, Debug)]
pub enum LineageError {
    /// A time slice has too few entities for the candidate cluster counts.
    #[error("Insufficient data: {entities} entities, at least {required} required")]
    InsufficientData { entities: usize, required: usize },

    /// An entity has no embedding available.
    #[error("No embedding available for entity {0:?}")]
    EmbeddingLookup(String),

    /// A document date could not be parsed.
    #[error("Malformed date {raw:?} on document {document_id}")]
    MalformedDate { document_id: String, raw: String },

    /// A time slice holds no usable entities at all.
    #[error("Time slice {0} has no usable entities")]
    EmptySlice(i32),

    /// No time slice in the requested horizon could be clustered.
    #[error("No usable time slices between {start} and {end}")]
    NoUsableSlices { start: i32, end: i32 },

    /// Cluster count outside 1..=n.
    #[error("Invalid cluster count {k} for {n} entities")]
    InvalidClusterCount { k: usize, n: usize },

    /// Candidate cluster-count range is malformed.
    #[error("Invalid candidate range: {0}")]
    InvalidCandidateRange(String),

    /// Similarity threshold out of range [0.0, 1.0).
    #[error("Similarity threshold out of range [0.0, 1.0): {0}")]
    InvalidThreshold(f64),

    /// Embedding vector dimension mismatch.
    #[error("Embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// An embedding vector has a NaN or infinite component.
    #[error("Non-finite embedding component for entity {0:?}")]
    NonFiniteEmbedding(String),

    /// Every cluster-count trial produced an undefined quality score.
    #[error("No finite quality score for {0} entities")]
    NoFiniteScore(usize),

    /// The worker pool for the quality sweep could not be built.
    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    /// Invalid magic bytes in an embedding cache header.
    #[error("Invalid magic bytes in embedding cache header")]
    InvalidMagic,

    /// Unsupported embedding cache format version.
    #[error("Unsupported format version: {0}")]
    UnsupportedVersion(u32),

    /// File is empty or truncated.
    #[error("File is empty or truncated")]
    Truncated,

    /// Corrupt data at a given offset.
    #[error("Corrupt data at offset {0}")]
    Corrupt(u64),

    /// Compression error.
    #[error("Compression error: {0}")]
    Compression(String),

    /// Configuration could not be parsed or failed validation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience result type for topic lineage operations.
pub type LineageResult<T> = Result<T, LineageError>;
