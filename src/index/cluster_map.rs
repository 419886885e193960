//! Cluster map: seeded k-means partition of embedding vectors.

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::distance::squared_euclidean;
use crate::types::{LineageError, LineageResult};

/// Parameters for a k-means fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KMeansParams {
    /// Seed for k-means++ initialization.
    pub seed: u64,
    /// Maximum Lloyd iterations per run.
    pub max_iterations: usize,
    /// Independent runs; the one with the lowest inertia is kept.
    pub n_init: usize,
}

impl Default for KMeansParams {
    fn default() -> Self {
        Self {
            seed: 42,
            max_iterations: 300,
            n_init: 4,
        }
    }
}

/// Hard partition of a point set into k non-empty clusters.
pub struct ClusterMap {
    /// Cluster centroids.
    centroids: Vec<Vec<f32>>,
    /// point index -> cluster index.
    labels: Vec<usize>,
    /// cluster index -> sorted point indices.
    assignments: Vec<Vec<usize>>,
    /// Sum of squared distances to assigned centroids.
    inertia: f64,
    /// Vector dimension.
    dimension: usize,
}

impl ClusterMap {
    /// Run k-means with k-means++ seeding on `points`.
    ///
    /// Requires `1 <= k <= points.len()` and equal-length, finite vectors. Every
    /// returned cluster is non-empty: a cluster left empty after an
    /// assignment step takes the point farthest from its own centroid among
    /// clusters holding more than one point.
    pub fn fit(points: &[&[f32]], k: usize, params: &KMeansParams) -> LineageResult<Self> {
        let n = points.len();
        if k == 0 || k > n {
            return Err(LineageError::InvalidClusterCount { k, n });
        }
        let dimension = points[0].len();
        if let Some(bad) = points.iter().find(|p| p.len() != dimension) {
            return Err(LineageError::DimensionMismatch {
                expected: dimension,
                got: bad.len(),
            });
        }

        if let Some(bad) = points.iter().position(|p| p.iter().any(|x| !x.is_finite())) {
            return Err(LineageError::NonFiniteEmbedding(format!("point {bad}")));
        }

        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut best: Option<(Vec<Vec<f32>>, Vec<usize>, f64)> = None;
        for _ in 0..params.n_init.max(1) {
            let run = lloyd(points, k, params.max_iterations.max(1), &mut rng);
            if best.as_ref().map_or(true, |(_, _, inertia)| run.2 < *inertia) {
                best = Some(run);
            }
        }
        let (centroids, labels, inertia) = best.ok_or(LineageError::InvalidClusterCount { k, n })?;

        let mut assignments = vec![Vec::new(); k];
        for (i, &c) in labels.iter().enumerate() {
            assignments[c].push(i);
        }

        Ok(Self {
            centroids,
            labels,
            assignments,
            inertia,
            dimension,
        })
    }

    /// Cluster index of each input point, in input order.
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Point indices in a specific cluster.
    pub fn get_cluster(&self, cluster_index: usize) -> &[usize] {
        self.assignments
            .get(cluster_index)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Get the centroid for a cluster.
    pub fn centroid(&self, cluster_index: usize) -> Option<&[f32]> {
        self.centroids.get(cluster_index).map(|v| v.as_slice())
    }

    /// Find the nearest cluster for a query vector.
    pub fn nearest_cluster(&self, query: &[f32]) -> Option<usize> {
        if self.centroids.is_empty() || query.len() != self.dimension {
            return None;
        }
        Some(nearest(query, &self.centroids).0)
    }

    /// Number of clusters.
    pub fn cluster_count(&self) -> usize {
        self.centroids.len()
    }

    /// Sum of squared distances of points to their centroids.
    pub fn inertia(&self) -> f64 {
        self.inertia
    }

    /// Get the dimension.
    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

fn lloyd(
    points: &[&[f32]],
    k: usize,
    max_iterations: usize,
    rng: &mut StdRng,
) -> (Vec<Vec<f32>>, Vec<usize>, f64) {
    let mut centroids = kmeans_plus_plus(points, k, rng);
    let mut labels: Vec<usize> = Vec::new();

    for _ in 0..max_iterations {
        let mut next: Vec<usize> = points.iter().map(|p| nearest(p, &centroids).0).collect();
        repair_empty(&mut next, points, &centroids, k);

        let changed = next != labels;
        labels = next;
        centroids = recompute_centroids(points, &labels, k);
        if !changed {
            break;
        }
    }

    let inertia = points
        .iter()
        .zip(&labels)
        .map(|(p, &c)| squared_euclidean(p, &centroids[c]))
        .sum();
    (centroids, labels, inertia)
}

/// k-means++ seeding: each next centroid is drawn with probability
/// proportional to squared distance from the nearest chosen one.
fn kmeans_plus_plus(points: &[&[f32]], k: usize, rng: &mut StdRng) -> Vec<Vec<f32>> {
    let n = points.len();
    let mut chosen = vec![false; n];
    let first = rng.gen_range(0..n);
    chosen[first] = true;
    let mut centroids = vec![points[first].to_vec()];
    let mut closest: Vec<f64> = points
        .iter()
        .map(|p| squared_euclidean(p, points[first]))
        .collect();

    while centroids.len() < k {
        let next = match WeightedIndex::new(&closest) {
            Ok(dist) => dist.sample(rng),
            // All remaining mass is zero (duplicate points): pick any unused index.
            Err(_) => {
                let unused: Vec<usize> = (0..n).filter(|&i| !chosen[i]).collect();
                unused[rng.gen_range(0..unused.len())]
            }
        };
        chosen[next] = true;
        centroids.push(points[next].to_vec());
        for (i, p) in points.iter().enumerate() {
            let d = squared_euclidean(p, points[next]);
            if d < closest[i] {
                closest[i] = d;
            }
        }
    }
    centroids
}

fn nearest(point: &[f32], centroids: &[Vec<f32>]) -> (usize, f64) {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (i, c) in centroids.iter().enumerate() {
        let d = squared_euclidean(point, c);
        if d < best_dist {
            best_dist = d;
            best = i;
        }
    }
    (best, best_dist)
}

fn repair_empty(labels: &mut [usize], points: &[&[f32]], centroids: &[Vec<f32>], k: usize) {
    let mut counts = vec![0usize; k];
    for &c in labels.iter() {
        counts[c] += 1;
    }
    for empty in 0..k {
        if counts[empty] > 0 {
            continue;
        }
        let donor = (0..labels.len())
            .filter(|&i| counts[labels[i]] > 1)
            .map(|i| (i, squared_euclidean(points[i], &centroids[labels[i]])))
            .fold(None, |best: Option<(usize, f64)>, (i, d)| match best {
                Some((_, bd)) if bd >= d => best,
                _ => Some((i, d)),
            });
        if let Some((i, _)) = donor {
            counts[labels[i]] -= 1;
            labels[i] = empty;
            counts[empty] += 1;
        }
    }
}

fn recompute_centroids(points: &[&[f32]], labels: &[usize], k: usize) -> Vec<Vec<f32>> {
    let dim = points[0].len();
    let mut sums = vec![vec![0.0f64; dim]; k];
    let mut counts = vec![0usize; k];
    for (p, &c) in points.iter().zip(labels) {
        counts[c] += 1;
        for (s, &x) in sums[c].iter_mut().zip(p.iter()) {
            *s += x as f64;
        }
    }
    sums.into_iter()
        .zip(counts)
        .map(|(s, count)| {
            let count = count.max(1) as f64;
            s.into_iter().map(|x| (x / count) as f32).collect()
        })
        .collect()
}
