//! Cluster identity propagation across consecutive time slices.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;

use super::assignment::max_weight_assignment;
use crate::config::{MatchingStrategy, PropagationConfig};
use crate::types::{ClusterId, LineageError, LineageResult, SliceClusters};

/// Jaccard similarity of two entity collections: |A ∩ B| / |A ∪ B|.
///
/// Duplicates are ignored. Two empty collections score 0.
pub fn jaccard_similarity<S: AsRef<str>>(a: &[S], b: &[S]) -> f64 {
    let a: HashSet<&str> = a.iter().map(|s| s.as_ref()).collect();
    let b: HashSet<&str> = b.iter().map(|s| s.as_ref()).collect();
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}

/// An accepted (or candidate) pairing between a cluster at t-1 and one at t.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterMatch {
    /// Identity at t-1, donated to the successor.
    pub predecessor: ClusterId,
    /// Pre-propagation label at t.
    pub successor: ClusterId,
    pub similarity: f64,
}

/// Result of propagating identities into one slice.
#[derive(Debug, Clone, PartialEq)]
pub struct Propagation {
    /// The relabelled slice.
    pub slice: SliceClusters,
    /// Accepted matches, in acceptance order.
    pub matches: Vec<ClusterMatch>,
    /// Identities born at this slice.
    pub births: Vec<ClusterId>,
}

/// Matches clusters across a slice boundary and relabels the later slice.
#[derive(Debug, Clone, Copy)]
pub struct IdentityPropagator {
    threshold: f64,
    strategy: MatchingStrategy,
}

impl IdentityPropagator {
    /// Propagator accepting pairs with similarity strictly above `threshold`.
    pub fn new(threshold: f64) -> LineageResult<Self> {
        if !(0.0..1.0).contains(&threshold) {
            return Err(LineageError::InvalidThreshold(threshold));
        }
        Ok(Self {
            threshold,
            strategy: MatchingStrategy::Greedy,
        })
    }

    pub fn from_config(config: &PropagationConfig) -> LineageResult<Self> {
        Ok(Self::new(config.similarity_threshold)?.with_strategy(config.strategy))
    }

    pub fn with_strategy(mut self, strategy: MatchingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn strategy(&self) -> MatchingStrategy {
        self.strategy
    }

    /// Every (x, y) pair with non-zero similarity above the threshold, sorted
    /// by similarity descending. Equal similarities keep (x, y) iteration order.
    pub fn candidate_pairs(
        &self,
        previous: &SliceClusters,
        current: &SliceClusters,
    ) -> Vec<ClusterMatch> {
        let mut pairs = Vec::new();
        for (x, x_members) in &previous.clusters {
            for (y, y_members) in &current.clusters {
                let similarity = jaccard_similarity(x_members, y_members);
                if similarity != 0.0 && similarity > self.threshold {
                    pairs.push(ClusterMatch {
                        predecessor: x.clone(),
                        successor: y.clone(),
                        similarity,
                    });
                }
            }
        }
        pairs.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        pairs
    }

    /// Relabel `current` so matched clusters inherit their predecessor's
    /// identity. Builds a new slice; neither input is modified.
    pub fn propagate(&self, previous: &SliceClusters, current: &SliceClusters) -> Propagation {
        let candidates = self.candidate_pairs(previous, current);
        let matches = match self.strategy {
            MatchingStrategy::Greedy => greedy(candidates),
            MatchingStrategy::OptimalBipartite => optimal(candidates),
        };

        let inherited: BTreeMap<&ClusterId, &ClusterId> = matches
            .iter()
            .map(|m| (&m.successor, &m.predecessor))
            .collect();
        let taken: BTreeSet<&ClusterId> = inherited.values().copied().collect();

        let mut slice = SliceClusters::new(current.year);
        let mut births = Vec::new();
        for (label, members) in &current.clusters {
            let id = match inherited.get(label) {
                Some(predecessor) => (*predecessor).clone(),
                None => {
                    // A fresh label that happens to equal an inherited identity
                    // is re-minted so the two clusters stay distinct.
                    let id = if taken.contains(label) {
                        ClusterId::new(format!("{}_{}", label, current.year))
                    } else {
                        label.clone()
                    };
                    births.push(id.clone());
                    id
                }
            };
            slice.clusters.insert(id, members.clone());
        }

        log::debug!(
            "Slice {}: {} clusters inherited, {} born",
            current.year,
            matches.len(),
            births.len()
        );
        Propagation {
            slice,
            matches,
            births,
        }
    }
}

/// Walk candidates best-first; a pair is accepted only if neither side has
/// been consumed by an earlier acceptance.
fn greedy(candidates: Vec<ClusterMatch>) -> Vec<ClusterMatch> {
    let mut used_x: HashSet<ClusterId> = HashSet::new();
    let mut used_y: HashSet<ClusterId> = HashSet::new();
    let mut accepted = Vec::new();
    for pair in candidates {
        if used_x.contains(&pair.predecessor) || used_y.contains(&pair.successor) {
            continue;
        }
        used_x.insert(pair.predecessor.clone());
        used_y.insert(pair.successor.clone());
        accepted.push(pair);
    }
    accepted
}

/// Maximum total similarity over the candidate graph.
fn optimal(candidates: Vec<ClusterMatch>) -> Vec<ClusterMatch> {
    if candidates.is_empty() {
        return candidates;
    }
    let xs: Vec<&ClusterId> = candidates
        .iter()
        .map(|c| &c.predecessor)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let ys: Vec<&ClusterId> = candidates
        .iter()
        .map(|c| &c.successor)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut weights = vec![vec![0.0f64; ys.len()]; xs.len()];
    let mut lookup: BTreeMap<(usize, usize), &ClusterMatch> = BTreeMap::new();
    for c in &candidates {
        let xi = xs.binary_search(&&c.predecessor).unwrap_or_default();
        let yi = ys.binary_search(&&c.successor).unwrap_or_default();
        weights[xi][yi] = c.similarity;
        lookup.insert((xi, yi), c);
    }

    let mut accepted: Vec<ClusterMatch> = max_weight_assignment(&weights)
        .into_iter()
        .filter_map(|pair| lookup.get(&pair).map(|c| (*c).clone()))
        .collect();
    accepted.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    accepted
}
