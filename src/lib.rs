//! Topic lineage: temporal tracking of entity clusters.
//!
//! Groups the cumulative entity vocabulary of each year into k-means clusters,
//! carries cluster identity forward across years by Jaccard matching, and
//! names each identity from the TF-IDF terms of its members.

pub mod cli;
pub mod config;
pub mod embed;
pub mod engine;
pub mod format;
pub mod index;
pub mod types;

// Re-export commonly used types at the crate root
pub use config::{EvolutionConfig, FrequencyBound, MatchingStrategy};
pub use embed::{
    project_2d, Embedding, EmbeddingCache, EmbeddingProvider, HashedNgramEmbedding,
    PrecomputedEmbeddings,
};
pub use engine::{
    jaccard_similarity, make_names_unique, silhouette_score, ClusterCountSelector, ClusterMatch,
    EvolutionContext, EvolutionEngine, EvolutionReport, IdentityPropagator, LineageSummary,
    Propagation, Selection, SliceClusterer, TfIdfNamer, TimeSlice, TimeSliceBuilder,
};
pub use format::{CacheReader, CacheWriter, MmapCache};
pub use index::{ClusterMap, DistanceMatrix, DocumentTimeline, KMeansParams};
pub use types::{
    ClusterId, Corpus, DocumentRecord, Evolution, LineageError, LineageResult, SliceClusters,
    SourceTable, DEFAULT_DIMENSION,
};
