//! Pairwise Euclidean distances.

/// Squared Euclidean distance between two vectors of equal length.
pub fn squared_euclidean(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum()
}

/// Condensed (upper-triangular) matrix of Euclidean distances.
///
/// Computed once per slice and shared read-only by every quality trial.
pub struct DistanceMatrix {
    n: usize,
    data: Vec<f32>,
}

impl DistanceMatrix {
    pub fn new(points: &[&[f32]]) -> Self {
        let n = points.len();
        let mut data = Vec::with_capacity(n * n.saturating_sub(1) / 2);
        for i in 0..n {
            for j in (i + 1)..n {
                data.push(squared_euclidean(points[i], points[j]).sqrt() as f32);
            }
        }
        Self { n, data }
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Distance between points `i` and `j`.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        if i == j {
            return 0.0;
        }
        let (i, j) = if i < j { (i, j) } else { (j, i) };
        // Row i starts after rows 0..i, each holding n - r - 1 entries.
        let row_start = i * self.n - i * (i + 1) / 2;
        self.data[row_start + (j - i - 1)] as f64
    }
}
