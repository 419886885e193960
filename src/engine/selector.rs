//! Cluster-count selection by silhouette score.

use serde::Serialize;

use rayon::prelude::*;

use crate::config::ClusteringConfig;
use crate::index::{ClusterMap, DistanceMatrix, KMeansParams};
use crate::types::{LineageError, LineageResult};

/// Scores closer than this are treated as tied.
const SCORE_TOLERANCE: f64 = 1e-12;

/// One clustering trial of the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualityTrial {
    pub k: usize,
    pub score: f64,
}

/// Outcome of a cluster-count search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection {
    /// Smallest count among the best-scoring ones.
    pub best: usize,
    /// Every count achieving the best score, ascending.
    pub tied: Vec<usize>,
    /// All trials in candidate order.
    pub trials: Vec<QualityTrial>,
}

/// Mean silhouette coefficient of a labelling, in [-1, 1].
///
/// For each point, `a` is its mean distance to the rest of its own cluster and
/// `b` the smallest mean distance to any other cluster; the point scores
/// `(b - a) / max(a, b)`, or 0 when it is alone in its cluster. Requires
/// between 2 and n - 1 distinct labels.
pub fn silhouette_score(distances: &DistanceMatrix, labels: &[usize]) -> LineageResult<f64> {
    let n = labels.len();
    if n != distances.len() {
        return Err(LineageError::DimensionMismatch {
            expected: distances.len(),
            got: n,
        });
    }
    let k = labels.iter().copied().max().map_or(0, |m| m + 1);
    let mut sizes = vec![0usize; k];
    for &l in labels {
        sizes[l] += 1;
    }
    let used = sizes.iter().filter(|&&s| s > 0).count();
    if used < 2 || used >= n {
        return Err(LineageError::InvalidClusterCount { k: used, n });
    }

    let mut total = 0.0f64;
    let mut sums = vec![0.0f64; k];
    for i in 0..n {
        let own = labels[i];
        if sizes[own] == 1 {
            continue;
        }
        sums.iter_mut().for_each(|s| *s = 0.0);
        for j in 0..n {
            if i != j {
                sums[labels[j]] += distances.get(i, j);
            }
        }
        let a = sums[own] / (sizes[own] - 1) as f64;
        let b = (0..k)
            .filter(|&c| c != own && sizes[c] > 0)
            .map(|c| sums[c] / sizes[c] as f64)
            .fold(f64::INFINITY, f64::min);
        let denom = a.max(b);
        if denom > 0.0 {
            total += (b - a) / denom;
        }
    }
    Ok(total / n as f64)
}

/// Searches candidate cluster counts for the best silhouette score.
#[derive(Debug, Clone)]
pub struct ClusterCountSelector {
    candidates: Vec<usize>,
    narrow: bool,
    params: KMeansParams,
    threads: usize,
}

impl ClusterCountSelector {
    pub fn new(candidates: Vec<usize>, params: KMeansParams) -> Self {
        let mut candidates = candidates;
        candidates.sort_unstable();
        candidates.dedup();
        Self {
            candidates,
            narrow: false,
            params,
            threads: 1,
        }
    }

    pub fn from_config(config: &ClusteringConfig) -> Self {
        Self::new(
            config.candidate_k.candidates(),
            KMeansParams {
                seed: config.seed,
                max_iterations: config.max_iterations,
                n_init: config.n_init,
            },
        )
        .with_narrowing(config.narrow_candidates)
        .with_threads(config.threads)
    }

    /// Allow shrinking the search space for slices too small for it.
    pub fn with_narrowing(mut self, narrow: bool) -> Self {
        self.narrow = narrow;
        self
    }

    /// Run trials on up to `threads` worker threads.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn candidates(&self) -> &[usize] {
        &self.candidates
    }

    /// Candidate counts usable for `n` entities.
    ///
    /// With fewer than twice the smallest candidate, the search either
    /// narrows to `2..=n/2` or fails with `InsufficientData`. Candidates with
    /// no defined silhouette (k >= n) are dropped.
    pub fn effective_candidates(&self, n: usize) -> LineageResult<Vec<usize>> {
        let Some(&min) = self.candidates.first() else {
            return Err(LineageError::InvalidCandidateRange(
                "no candidate cluster counts".into(),
            ));
        };
        let required = 2 * min.max(2);

        let usable: Vec<usize> = if n >= required {
            self.candidates
                .iter()
                .copied()
                .filter(|&k| k >= 2 && k < n)
                .collect()
        } else if self.narrow {
            log::debug!(
                "Narrowing cluster-count search to 2..={} for {} entities",
                n / 2,
                n
            );
            (2..=n / 2).collect()
        } else {
            return Err(LineageError::InsufficientData {
                entities: n,
                required,
            });
        };

        if usable.is_empty() {
            return Err(LineageError::InsufficientData {
                entities: n,
                required: required.min(4),
            });
        }
        Ok(usable)
    }

    /// Run one k-means trial per candidate and pick the best silhouette.
    pub fn select(&self, points: &[&[f32]]) -> LineageResult<Selection> {
        let candidates = self.effective_candidates(points.len())?;
        let distances = DistanceMatrix::new(points);

        let trials = if self.threads > 1 && candidates.len() > 1 {
            self.run_parallel(points, &distances, &candidates)?
        } else {
            candidates
                .iter()
                .map(|&k| self.trial(points, &distances, k))
                .collect::<LineageResult<Vec<_>>>()?
        };

        let top = trials
            .iter()
            .map(|t| t.score)
            .filter(|s| s.is_finite())
            .fold(f64::NEG_INFINITY, f64::max);
        let tied: Vec<usize> = trials
            .iter()
            .filter(|t| t.score.is_finite() && (t.score - top).abs() <= SCORE_TOLERANCE)
            .map(|t| t.k)
            .collect();
        let Some(&best) = tied.first() else {
            return Err(LineageError::NoFiniteScore(points.len()));
        };
        log::debug!(
            "Selected k={} (score {:.4}) from {} candidates",
            best,
            top,
            trials.len()
        );

        Ok(Selection { best, tied, trials })
    }

    fn trial(
        &self,
        points: &[&[f32]],
        distances: &DistanceMatrix,
        k: usize,
    ) -> LineageResult<QualityTrial> {
        let map = ClusterMap::fit(points, k, &self.params)?;
        let score = silhouette_score(distances, map.labels())?;
        Ok(QualityTrial { k, score })
    }

    fn run_parallel(
        &self,
        points: &[&[f32]],
        distances: &DistanceMatrix,
        candidates: &[usize],
    ) -> LineageResult<Vec<QualityTrial>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .build()
            .map_err(|e| LineageError::ThreadPool(e.to_string()))?;
        pool.install(|| {
            candidates
                .par_iter()
                .map(|&k| self.trial(points, distances, k))
                .collect::<LineageResult<Vec<_>>>()
        })
    }
}
