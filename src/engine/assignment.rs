//! Maximum-weight bipartite assignment (Hungarian algorithm).

/// Assign rows to columns maximizing total weight.
///
/// `weights` is row-major, `rows x cols`, all rows the same length. Returns
/// `(row, col)` pairs; every row is assigned when `rows <= cols`, otherwise
/// every column is. Callers drop pairs whose weight carries no meaning.
pub fn max_weight_assignment(weights: &[Vec<f64>]) -> Vec<(usize, usize)> {
    let rows = weights.len();
    let cols = weights.first().map_or(0, |r| r.len());
    if rows == 0 || cols == 0 {
        return Vec::new();
    }

    if rows > cols {
        let transposed: Vec<Vec<f64>> = (0..cols)
            .map(|c| (0..rows).map(|r| weights[r][c]).collect())
            .collect();
        let mut pairs: Vec<(usize, usize)> = max_weight_assignment(&transposed)
            .into_iter()
            .map(|(c, r)| (r, c))
            .collect();
        pairs.sort_unstable();
        return pairs;
    }

    let top = weights
        .iter()
        .flat_map(|r| r.iter().copied())
        .fold(f64::NEG_INFINITY, f64::max);
    let cost = |r: usize, c: usize| top - weights[r][c];

    // Potentials and matching, 1-indexed with column 0 as the virtual source.
    let mut u = vec![0.0f64; rows + 1];
    let mut v = vec![0.0f64; cols + 1];
    let mut matched_row = vec![0usize; cols + 1];
    let mut way = vec![0usize; cols + 1];

    for i in 1..=rows {
        matched_row[0] = i;
        let mut j0 = 0usize;
        let mut min_to = vec![f64::INFINITY; cols + 1];
        let mut used = vec![false; cols + 1];
        loop {
            used[j0] = true;
            let i0 = matched_row[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0usize;
            for j in 1..=cols {
                if used[j] {
                    continue;
                }
                let reduced = cost(i0 - 1, j - 1) - u[i0] - v[j];
                if reduced < min_to[j] {
                    min_to[j] = reduced;
                    way[j] = j0;
                }
                if min_to[j] < delta {
                    delta = min_to[j];
                    j1 = j;
                }
            }
            for j in 0..=cols {
                if used[j] {
                    u[matched_row[j]] += delta;
                    v[j] -= delta;
                } else {
                    min_to[j] -= delta;
                }
            }
            j0 = j1;
            if matched_row[j0] == 0 {
                break;
            }
        }
        loop {
            let j1 = way[j0];
            matched_row[j0] = matched_row[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut pairs: Vec<(usize, usize)> = (1..=cols)
        .filter(|&j| matched_row[j] != 0)
        .map(|j| (matched_row[j] - 1, j - 1))
        .collect();
    pairs.sort_unstable();
    pairs
}
