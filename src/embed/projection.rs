//! Two-dimensional projection of entity embeddings for visualization.

use std::collections::BTreeMap;

use super::EmbeddingCache;

const POWER_ITERATIONS: usize = 200;

/// Project every cached embedding onto its first two principal components.
///
/// Components are found by power iteration with deflation, starting from a
/// fixed vector, so the output is deterministic. Component signs are fixed so
/// that the largest-magnitude loading is positive.
pub fn project_2d(cache: &EmbeddingCache) -> BTreeMap<String, [f32; 2]> {
    let dim = cache.dimension();
    let n = cache.len();
    if n == 0 {
        return BTreeMap::new();
    }
    if dim == 0 {
        return cache.iter().map(|(e, _)| (e.to_string(), [0.0, 0.0])).collect();
    }

    let mut mean = vec![0.0f64; dim];
    for (_, v) in cache.iter() {
        for (m, &x) in mean.iter_mut().zip(v) {
            *m += x as f64;
        }
    }
    for m in &mut mean {
        *m /= n as f64;
    }

    let centered: Vec<Vec<f64>> = cache
        .iter()
        .map(|(_, v)| v.iter().zip(&mean).map(|(&x, m)| x as f64 - m).collect())
        .collect();

    let mut covariance = vec![vec![0.0f64; dim]; dim];
    for row in &centered {
        for i in 0..dim {
            if row[i] == 0.0 {
                continue;
            }
            for j in i..dim {
                covariance[i][j] += row[i] * row[j];
            }
        }
    }
    for i in 0..dim {
        for j in 0..i {
            covariance[i][j] = covariance[j][i];
        }
    }

    let first = principal_component(&covariance, None);
    let second = if dim > 1 {
        principal_component(&covariance, Some(&first))
    } else {
        vec![0.0; dim]
    };

    cache
        .iter()
        .zip(&centered)
        .map(|((entity, _), row)| {
            let x = dot(row, &first) as f32;
            let y = dot(row, &second) as f32;
            (entity.to_string(), [x, y])
        })
        .collect()
}

fn principal_component(covariance: &[Vec<f64>], orthogonal_to: Option<&[f64]>) -> Vec<f64> {
    let dim = covariance.len();
    let mut v: Vec<f64> = (0..dim)
        .map(|i| if i % 2 == 0 { 1.0 } else { 0.5 })
        .collect();
    if let Some(u) = orthogonal_to {
        remove_projection(&mut v, u);
    }
    if !normalize(&mut v) {
        return vec![0.0; dim];
    }

    for _ in 0..POWER_ITERATIONS {
        let mut next: Vec<f64> = covariance.iter().map(|row| dot(row, &v)).collect();
        if let Some(u) = orthogonal_to {
            remove_projection(&mut next, u);
        }
        if !normalize(&mut next) {
            return vec![0.0; dim];
        }
        let delta: f64 = next.iter().zip(&v).map(|(a, b)| (a - b).abs()).sum();
        v = next;
        if delta < 1e-10 {
            break;
        }
    }

    let pivot = v
        .iter()
        .copied()
        .fold(0.0f64, |acc, x| if x.abs() > acc.abs() { x } else { acc });
    if pivot < 0.0 {
        for x in &mut v {
            *x = -*x;
        }
    }
    v
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn remove_projection(v: &mut [f64], u: &[f64]) {
    let p = dot(v, u);
    for (x, y) in v.iter_mut().zip(u) {
        *x -= p * y;
    }
}

fn normalize(v: &mut [f64]) -> bool {
    let norm = dot(v, v).sqrt();
    if norm < 1e-12 {
        return false;
    }
    for x in v.iter_mut() {
        *x /= norm;
    }
    true
}
