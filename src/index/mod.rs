//! Index structures used by the clustering stages. Each is built once per
//! slice (or per source) and read without mutation afterwards.

pub mod cluster_map;
pub mod distance;
pub mod temporal_index;

pub use cluster_map::{ClusterMap, KMeansParams};
pub use distance::{squared_euclidean, DistanceMatrix};
pub use temporal_index::DocumentTimeline;
