//! High-level operations: slicing, cluster-count selection, clustering,
//! identity propagation and naming.

pub mod assignment;
pub mod clusterer;
pub mod filter;
pub mod naming;
pub mod pipeline;
pub mod propagate;
pub mod selector;
pub mod slices;
pub mod summary;

pub use clusterer::{EmbeddedSlice, SliceClusterer};
pub use filter::EntityFrequencyFilter;
pub use naming::{make_names_unique, TfIdfNamer, ENGLISH_STOP_WORDS};
pub use pipeline::{EvolutionContext, EvolutionEngine, EvolutionReport, SkippedSlice};
pub use propagate::{jaccard_similarity, ClusterMatch, IdentityPropagator, Propagation};
pub use selector::{silhouette_score, ClusterCountSelector, QualityTrial, Selection};
pub use slices::{TimeSlice, TimeSliceBuilder};
pub use summary::{document_cluster_vectors, summarize, LineageSummary};
