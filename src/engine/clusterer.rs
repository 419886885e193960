//! Slice clusterer: one independent k-means partition per time slice.

use crate::embed::EmbeddingCache;
use crate::index::{ClusterMap, KMeansParams};
use crate::types::{LineageError, LineageResult, SliceClusters};

use super::slices::TimeSlice;

/// Entities of a slice that have an embedding, paired with their vectors.
pub struct EmbeddedSlice<'a> {
    pub year: i32,
    pub entities: Vec<&'a str>,
    pub points: Vec<&'a [f32]>,
    /// Entities excluded for lack of an embedding.
    pub missing: Vec<&'a str>,
}

impl<'a> EmbeddedSlice<'a> {
    /// Look up every slice entity; misses are excluded and logged.
    pub fn lookup(slice: &'a TimeSlice, cache: &'a EmbeddingCache) -> Self {
        let mut entities = Vec::with_capacity(slice.len());
        let mut points = Vec::with_capacity(slice.len());
        let mut missing = Vec::new();
        for entity in &slice.entities {
            match cache.get(entity) {
                Ok(v) => {
                    entities.push(entity.as_str());
                    points.push(v);
                }
                Err(e) => {
                    log::debug!("Slice {}: {}", slice.year, e);
                    missing.push(entity.as_str());
                }
            }
        }
        if !missing.is_empty() {
            log::warn!(
                "Slice {}: excluded {} entities without an embedding",
                slice.year,
                missing.len()
            );
        }
        Self {
            year: slice.year,
            entities,
            points,
            missing,
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Partitions the entities of one slice into `k` clusters.
#[derive(Debug, Clone, Copy, Default)]
pub struct SliceClusterer {
    params: KMeansParams,
}

impl SliceClusterer {
    pub fn new(params: KMeansParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &KMeansParams {
        &self.params
    }

    /// Hard partition into `k` non-empty groups, indexed by local label.
    pub fn partition(
        &self,
        slice: &EmbeddedSlice<'_>,
        k: usize,
    ) -> LineageResult<Vec<Vec<String>>> {
        if slice.is_empty() {
            return Err(LineageError::EmptySlice(slice.year));
        }
        let map = ClusterMap::fit(&slice.points, k, &self.params)?;
        Ok((0..map.cluster_count())
            .map(|c| {
                map.get_cluster(c)
                    .iter()
                    .map(|&i| slice.entities[i].to_string())
                    .collect()
            })
            .collect())
    }

    /// Cluster a slice, minting a fresh identity per cluster.
    pub fn cluster(&self, slice: &EmbeddedSlice<'_>, k: usize) -> LineageResult<SliceClusters> {
        let groups = self.partition(slice, k)?;
        log::debug!("Slice {}: {} entities in {} clusters", slice.year, slice.len(), k);
        Ok(SliceClusters::from_partition(slice.year, groups))
    }
}
