//! Phase 3 tests: k-means, silhouette scoring, cluster-count selection and
//! slice clustering.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use topic_lineage::embed::EmbeddingCache;
use topic_lineage::engine::{
    silhouette_score, ClusterCountSelector, EmbeddedSlice, SliceClusterer, TimeSlice,
};
use topic_lineage::index::{ClusterMap, DistanceMatrix, KMeansParams};
use topic_lineage::LineageError;

// ==================== Helpers ====================

/// `per_blob` noisy points around each center.
fn blobs(rng: &mut impl Rng, centers: &[[f32; 2]], per_blob: usize, noise: f32) -> Vec<Vec<f32>> {
    let mut points = Vec::new();
    for c in centers {
        for _ in 0..per_blob {
            points.push(vec![
                c[0] + rng.gen_range(-noise..noise),
                c[1] + rng.gen_range(-noise..noise),
            ]);
        }
    }
    points
}

fn as_refs(points: &[Vec<f32>]) -> Vec<&[f32]> {
    points.iter().map(|p| p.as_slice()).collect()
}

/// Three tight pairs far apart.
fn three_pairs() -> Vec<Vec<f32>> {
    vec![
        vec![0.0, 0.0],
        vec![0.0, 0.1],
        vec![10.0, 0.0],
        vec![10.0, 0.1],
        vec![0.0, 10.0],
        vec![0.1, 10.0],
    ]
}

// ==================== Distances ====================

#[test]
fn test_distance_matrix_symmetric() {
    let points = three_pairs();
    let m = DistanceMatrix::new(&as_refs(&points));
    assert_eq!(m.len(), 6);
    for i in 0..6 {
        assert_eq!(m.get(i, i), 0.0);
        for j in 0..6 {
            assert_eq!(m.get(i, j), m.get(j, i));
        }
    }
    assert!((m.get(0, 2) - 10.0).abs() < 1e-6);
}

// ==================== k-means ====================

#[test]
fn test_kmeans_recovers_blobs() {
    let mut rng = StdRng::seed_from_u64(7);
    let points = blobs(&mut rng, &[[0.0, 0.0], [20.0, 0.0], [0.0, 20.0]], 15, 1.0);
    let map = ClusterMap::fit(&as_refs(&points), 3, &KMeansParams::default()).unwrap();

    assert_eq!(map.cluster_count(), 3);
    for c in 0..3 {
        let members = map.get_cluster(c);
        assert_eq!(members.len(), 15);
        // Every member of a cluster comes from the same blob.
        let blob = members[0] / 15;
        assert!(members.iter().all(|&i| i / 15 == blob));
    }
    assert_eq!(map.nearest_cluster(&[19.0, 1.0]), Some(map.labels()[20]));
}

#[test]
fn test_kmeans_is_reproducible_for_a_seed() {
    let mut rng = StdRng::seed_from_u64(3);
    let points = blobs(&mut rng, &[[0.0, 0.0], [5.0, 5.0]], 20, 3.0);
    let params = KMeansParams {
        seed: 11,
        ..KMeansParams::default()
    };
    let a = ClusterMap::fit(&as_refs(&points), 4, &params).unwrap();
    let b = ClusterMap::fit(&as_refs(&points), 4, &params).unwrap();
    assert_eq!(a.labels(), b.labels());
    assert_eq!(a.inertia(), b.inertia());
}

#[test]
fn test_kmeans_clusters_never_empty() {
    // Duplicate points force the empty-cluster repair path.
    let points = vec![vec![1.0, 1.0]; 5];
    let map = ClusterMap::fit(&as_refs(&points), 5, &KMeansParams::default()).unwrap();
    for c in 0..5 {
        assert_eq!(map.get_cluster(c).len(), 1);
    }
}

#[test]
fn test_kmeans_rejects_invalid_k() {
    let points = three_pairs();
    let refs = as_refs(&points);
    assert!(matches!(
        ClusterMap::fit(&refs, 0, &KMeansParams::default()),
        Err(LineageError::InvalidClusterCount { k: 0, n: 6 })
    ));
    assert!(matches!(
        ClusterMap::fit(&refs, 7, &KMeansParams::default()),
        Err(LineageError::InvalidClusterCount { k: 7, n: 6 })
    ));
}

#[test]
fn test_kmeans_rejects_non_finite_vectors() {
    let mut points = three_pairs();
    points[2][0] = f32::NAN;
    assert!(matches!(
        ClusterMap::fit(&as_refs(&points), 2, &KMeansParams::default()),
        Err(LineageError::NonFiniteEmbedding(p)) if p == "point 2"
    ));
}

#[test]
fn test_kmeans_rejects_ragged_vectors() {
    let points = vec![vec![1.0, 1.0], vec![1.0]];
    assert!(matches!(
        ClusterMap::fit(&as_refs(&points), 1, &KMeansParams::default()),
        Err(LineageError::DimensionMismatch { .. })
    ));
}

// ==================== Silhouette ====================

#[test]
fn test_silhouette_known_value() {
    let points = vec![vec![0.0], vec![1.0], vec![10.0], vec![11.0]];
    let m = DistanceMatrix::new(&as_refs(&points));
    let score = silhouette_score(&m, &[0, 0, 1, 1]).unwrap();
    let expected = (2.0 * (9.5 / 10.5) + 2.0 * (8.5 / 9.5)) / 4.0;
    assert!((score - expected).abs() < 1e-5);
}

#[test]
fn test_silhouette_bad_labelling_scores_lower() {
    let points = three_pairs();
    let m = DistanceMatrix::new(&as_refs(&points));
    let good = silhouette_score(&m, &[0, 0, 1, 1, 2, 2]).unwrap();
    let bad = silhouette_score(&m, &[0, 1, 2, 0, 1, 2]).unwrap();
    assert!(good > 0.9);
    assert!(bad < 0.0);
    assert!((-1.0..=1.0).contains(&bad));
}

#[test]
fn test_silhouette_requires_two_to_n_minus_one_labels() {
    let points = three_pairs();
    let m = DistanceMatrix::new(&as_refs(&points));
    assert!(silhouette_score(&m, &[0; 6]).is_err());
    assert!(silhouette_score(&m, &[0, 1, 2, 3, 4, 5]).is_err());
    assert!(silhouette_score(&m, &[0, 1]).is_err());
}

// ==================== Cluster-count selection ====================

#[test]
fn test_selector_picks_three_for_three_pairs() {
    let points = three_pairs();
    let selector = ClusterCountSelector::new(vec![2, 3, 4], KMeansParams::default());
    let selection = selector.select(&as_refs(&points)).unwrap();

    assert_eq!(selection.best, 3);
    assert_eq!(selection.tied, vec![3]);
    let ks: Vec<usize> = selection.trials.iter().map(|t| t.k).collect();
    assert_eq!(ks, vec![2, 3, 4]);
    for t in &selection.trials {
        if t.k != 3 {
            assert!(t.score < selection.trials[1].score);
        }
    }
}

#[test]
fn test_selector_parallel_matches_sequential() {
    let mut rng = StdRng::seed_from_u64(21);
    let points = blobs(
        &mut rng,
        &[[0.0, 0.0], [10.0, 0.0], [0.0, 10.0], [10.0, 10.0]],
        8,
        1.5,
    );
    let refs = as_refs(&points);
    let sequential = ClusterCountSelector::new(vec![2, 3, 4, 5, 6], KMeansParams::default());
    let parallel = sequential.clone().with_threads(3);

    let a = sequential.select(&refs).unwrap();
    let b = parallel.select(&refs).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.best, 4);
}

#[test]
fn test_selector_tie_prefers_smallest_count() {
    // Identical points score 0 under every labelling.
    let points = vec![vec![1.0, 1.0]; 8];
    let selector = ClusterCountSelector::new(vec![2, 3, 4], KMeansParams::default());
    let selection = selector.select(&as_refs(&points)).unwrap();

    assert!(selection.tied.len() > 1);
    assert_eq!(selection.tied, vec![2, 3, 4]);
    assert_eq!(selection.best, selection.tied[0]);
    assert!(selection.trials.iter().all(|t| t.score == 0.0));

    let parallel = selector.with_threads(2).select(&as_refs(&points)).unwrap();
    assert_eq!(parallel.best, 2);
}

#[test]
fn test_selector_rejects_non_finite_points() {
    let mut points = three_pairs();
    points[4][1] = f32::INFINITY;
    let selector = ClusterCountSelector::new(vec![2, 3], KMeansParams::default());
    assert!(matches!(
        selector.select(&as_refs(&points)),
        Err(LineageError::NonFiniteEmbedding(_))
    ));
    assert!(matches!(
        selector.with_threads(2).select(&as_refs(&points)),
        Err(LineageError::NonFiniteEmbedding(_))
    ));
}

#[test]
fn test_selector_insufficient_data() {
    let points = three_pairs();
    let selector = ClusterCountSelector::new(vec![10, 15, 20], KMeansParams::default());
    assert!(matches!(
        selector.select(&as_refs(&points)),
        Err(LineageError::InsufficientData {
            entities: 6,
            required: 20
        })
    ));
}

#[test]
fn test_selector_narrows_small_slices() {
    let points = three_pairs();
    let selector =
        ClusterCountSelector::new(vec![10, 15, 20], KMeansParams::default()).with_narrowing(true);
    assert_eq!(selector.effective_candidates(6).unwrap(), vec![2, 3]);
    assert_eq!(selector.select(&as_refs(&points)).unwrap().best, 3);

    // Nothing left to search with three entities.
    assert!(selector.effective_candidates(3).is_err());
}

#[test]
fn test_selector_drops_counts_at_or_above_n() {
    let selector = ClusterCountSelector::new(vec![4, 2, 6, 2], KMeansParams::default());
    assert_eq!(selector.candidates(), &[2, 4, 6]);
    assert_eq!(selector.effective_candidates(6).unwrap(), vec![2, 4]);
}

// ==================== Slice clusterer ====================

#[test]
fn test_slice_clustering_is_a_partition() {
    let mut rng = StdRng::seed_from_u64(5);
    let entities: Vec<String> = (0..30).map(|i| format!("entity {i:02}")).collect();
    let mut cache = EmbeddingCache::new(4);
    for e in &entities {
        let v: Vec<f32> = (0..4).map(|_| rng.gen_range(-1.0..1.0)).collect();
        cache.insert(e.clone(), v).unwrap();
    }
    let slice = TimeSlice {
        year: 2015,
        entities: entities.clone(),
    };

    let embedded = EmbeddedSlice::lookup(&slice, &cache);
    let clusters = SliceClusterer::default().cluster(&embedded, 5).unwrap();
    assert_eq!(clusters.year, 2015);
    assert_eq!(clusters.len(), 5);
    assert!(clusters.is_partition_of(&entities));
    assert!(clusters.clusters.keys().all(|id| id.as_str().ends_with("_2015")));
}

#[test]
fn test_slice_lookup_excludes_missing_embeddings() {
    let mut cache = EmbeddingCache::new(2);
    cache.insert("dna", vec![0.0, 0.0]).unwrap();
    cache.insert("rna", vec![0.0, 1.0]).unwrap();
    cache.insert("protein", vec![5.0, 5.0]).unwrap();
    let slice = TimeSlice {
        year: 2012,
        entities: vec!["dna".into(), "ghost".into(), "protein".into(), "rna".into()],
    };

    let embedded = EmbeddedSlice::lookup(&slice, &cache);
    assert_eq!(embedded.entities, vec!["dna", "protein", "rna"]);
    assert_eq!(embedded.missing, vec!["ghost"]);

    let clusters = SliceClusterer::default().cluster(&embedded, 2).unwrap();
    let covered: Vec<String> = ["dna", "protein", "rna"].iter().map(|s| s.to_string()).collect();
    assert!(clusters.is_partition_of(&covered));
}

#[test]
fn test_slice_clusterer_empty_slice() {
    let cache = EmbeddingCache::new(2);
    let slice = TimeSlice {
        year: 2011,
        entities: vec!["ghost".into()],
    };
    let embedded = EmbeddedSlice::lookup(&slice, &cache);
    assert!(matches!(
        SliceClusterer::default().cluster(&embedded, 1),
        Err(LineageError::EmptySlice(2011))
    ));
}
