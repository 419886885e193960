//! Per-run embedding cache: every distinct entity is embedded exactly once and
//! the same vector is reused for every time slice.

use std::collections::BTreeMap;

use super::{Embedding, EmbeddingProvider};
use crate::types::{LineageError, LineageResult};

/// Entity -> embedding store shared read-only by all clustering stages.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingCache {
    vectors: BTreeMap<String, Embedding>,
    dimension: usize,
}

impl EmbeddingCache {
    pub fn new(dimension: usize) -> Self {
        Self {
            vectors: BTreeMap::new(),
            dimension,
        }
    }

    /// Insert a vector, rejecting dimension mismatches and non-finite components.
    pub fn insert(&mut self, entity: impl Into<String>, vector: Embedding) -> LineageResult<()> {
        let entity = entity.into();
        if vector.len() != self.dimension {
            return Err(LineageError::DimensionMismatch {
                expected: self.dimension,
                got: vector.len(),
            });
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(LineageError::NonFiniteEmbedding(entity));
        }
        self.vectors.insert(entity, vector);
        Ok(())
    }

    /// Ask `provider` for every entity not already cached. Returns how many
    /// vectors were added. Entities the provider cannot embed, or embeds with
    /// a bad vector, are logged and left out; they surface later as lookup
    /// misses.
    pub fn populate<'a>(
        &mut self,
        provider: &dyn EmbeddingProvider,
        entities: impl IntoIterator<Item = &'a str>,
    ) -> LineageResult<usize> {
        if provider.dimension() != self.dimension {
            return Err(LineageError::DimensionMismatch {
                expected: self.dimension,
                got: provider.dimension(),
            });
        }

        let mut missing: Vec<&str> = entities
            .into_iter()
            .filter(|e| !self.vectors.contains_key(*e))
            .collect();
        missing.sort_unstable();
        missing.dedup();
        if missing.is_empty() {
            return Ok(0);
        }

        log::info!(
            "Embedding {} new entities with provider {}",
            missing.len(),
            provider.name()
        );
        let mut added = 0;
        for (entity, vector) in missing.iter().zip(provider.embed_batch(&missing)) {
            match vector {
                Some(v) => match self.insert(*entity, v) {
                    Ok(()) => added += 1,
                    Err(e) => log::warn!("Skipping embedding for {:?}: {}", entity, e),
                },
                None => log::warn!(
                    "Provider {} returned no embedding for {:?}",
                    provider.name(),
                    entity
                ),
            }
        }
        Ok(added)
    }

    /// Look up an entity's vector.
    pub fn get(&self, entity: &str) -> LineageResult<&[f32]> {
        self.vectors
            .get(entity)
            .map(|v| v.as_slice())
            .ok_or_else(|| LineageError::EmbeddingLookup(entity.to_string()))
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.vectors.contains_key(entity)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Entries in ascending entity order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f32])> {
        self.vectors.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}
