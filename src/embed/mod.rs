//! Entity embeddings: providers, the per-run cache and 2-D projection.

pub mod cache;
pub mod projection;
pub mod provider;

pub use cache::EmbeddingCache;
pub use projection::project_2d;
pub use provider::{EmbeddingProvider, HashedNgramEmbedding, PrecomputedEmbeddings};

/// Embedding vector.
pub type Embedding = Vec<f32>;
