//! Embedding providers. Real models live outside this crate; anything that can
//! map an entity string to a fixed-length vector plugs in through the trait.

use std::collections::HashMap;
use std::path::Path;

use super::Embedding;
use crate::types::{LineageError, LineageResult};

/// Trait for embedding providers.
///
/// Implementations must be deterministic for a fixed model version: the same
/// entity always yields the same vector.
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for one entity.
    fn embed(&self, text: &str) -> Option<Embedding>;

    /// Generate embeddings for multiple entities (batched).
    fn embed_batch(&self, texts: &[&str]) -> Vec<Option<Embedding>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Embedding dimension.
    fn dimension(&self) -> usize;

    /// Provider name.
    fn name(&self) -> &str;
}

/// Character n-gram feature hashing. No model, fast and deterministic.
///
/// Entities sharing surface forms ("gene expression", "gene expression
/// profiling") land close together, which is enough for tests and for runs
/// where no model-serving process is available.
pub struct HashedNgramEmbedding {
    dimension: usize,
    n: usize,
}

impl HashedNgramEmbedding {
    pub fn new(dimension: usize) -> Self {
        Self { dimension, n: 3 }
    }

    /// Use n-grams of length `n` instead of trigrams.
    pub fn with_ngram(mut self, n: usize) -> Self {
        self.n = n.max(1);
        self
    }
}

impl EmbeddingProvider for HashedNgramEmbedding {
    fn embed(&self, text: &str) -> Option<Embedding> {
        if self.dimension == 0 {
            return None;
        }
        let mut embedding = vec![0.0f32; self.dimension];
        let padded: Vec<char> = format!(" {} ", text.trim().to_lowercase())
            .chars()
            .collect();
        if padded.len() < self.n {
            return Some(embedding);
        }

        for window in padded.windows(self.n) {
            let h = fnv1a(window);
            let idx = (h % self.dimension as u64) as usize;
            let sign = if (h >> 63) & 1 == 0 { 1.0 } else { -1.0 };
            embedding[idx] += sign;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut embedding {
                *x /= norm;
            }
        }
        Some(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "hashed-ngram"
    }
}

fn fnv1a(chars: &[char]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for c in chars {
        let mut buf = [0u8; 4];
        for b in c.encode_utf8(&mut buf).bytes() {
            hash ^= b as u64;
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
    }
    hash
}

/// Vectors computed ahead of time by an external model.
pub struct PrecomputedEmbeddings {
    vectors: HashMap<String, Embedding>,
    dimension: usize,
}

impl PrecomputedEmbeddings {
    /// Build from an entity -> vector map. All vectors must share one dimension.
    ///
    /// Vectors with a NaN or infinite component are dropped with a warning.
    pub fn new(mut vectors: HashMap<String, Embedding>) -> LineageResult<Self> {
        vectors.retain(|entity, v| {
            let finite = v.iter().all(|x| x.is_finite());
            if !finite {
                log::warn!("Dropping non-finite precomputed vector for {:?}", entity);
            }
            finite
        });
        let dimension = vectors.values().next().map(|v| v.len()).unwrap_or(0);
        if let Some(bad) = vectors.values().find(|v| v.len() != dimension) {
            return Err(LineageError::DimensionMismatch {
                expected: dimension,
                got: bad.len(),
            });
        }
        Ok(Self { vectors, dimension })
    }

    /// Load a JSON object of the form `{"entity": [f32, ...], ...}`.
    pub fn from_json_file(path: &Path) -> LineageResult<Self> {
        let data = std::fs::read_to_string(path)?;
        let vectors: HashMap<String, Embedding> = serde_json::from_str(&data)?;
        Self::new(vectors)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

impl EmbeddingProvider for PrecomputedEmbeddings {
    fn embed(&self, text: &str) -> Option<Embedding> {
        self.vectors.get(text).cloned()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "precomputed"
    }
}
