//! Phase 5 tests: the full evolution pipeline, summaries and persistence.

use tempfile::NamedTempFile;

use topic_lineage::config::{CandidateRange, EvolutionConfig};
use topic_lineage::embed::{EmbeddingCache, HashedNgramEmbedding};
use topic_lineage::engine::{
    document_cluster_vectors, summarize, EvolutionContext, EvolutionEngine, TimeSlice,
};
use topic_lineage::types::{ClusterId, Corpus, Evolution, LineageError, SourceTable};

// ==================== Helpers ====================

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Three well separated groups: g* near (0, 0), p* near (10, 0), q* near (0, 10).
fn embeddings() -> EmbeddingCache {
    let mut cache = EmbeddingCache::new(2);
    let groups: [(&str, [f32; 2]); 3] = [("g", [0.0, 0.0]), ("p", [10.0, 0.0]), ("q", [0.0, 10.0])];
    for (prefix, [x, y]) in groups {
        cache.insert(format!("{prefix}1"), vec![x, y]).unwrap();
        cache.insert(format!("{prefix}2"), vec![x, y + 0.2]).unwrap();
        cache.insert(format!("{prefix}3"), vec![x + 0.2, y]).unwrap();
    }
    cache
}

fn corpus() -> Corpus {
    let papers = SourceTable::new("papers")
        .with_document("d1", "2010-05-01", &["g1", "g2"])
        .with_document("d2", "2010-06-01", &["p1", "p2"])
        .with_document("d3", "2011-03-01", &["g3", "p3"])
        .with_document("d4", "2011-04-01", &["q1", "q2"])
        .with_document("d5", "sometime", &["zzz"]);
    let patents = SourceTable::new("patents")
        .with_document("n1", "2011-09-30", &["q3"])
        .with_document("n2", "2012-02-01", &[]);
    Corpus::new(vec![papers, patents])
}

fn config() -> EvolutionConfig {
    let mut config = EvolutionConfig::default();
    config.slices.start_year = 2011;
    config.slices.end_year = Some(2013);
    config.clustering.candidate_k = CandidateRange::new(2, 3, 1);
    config
}

fn engine(config: EvolutionConfig) -> EvolutionEngine {
    EvolutionEngine::new(EvolutionContext::new(config, embeddings())).unwrap()
}

fn ids(evolution: &Evolution, year: i32) -> Vec<ClusterId> {
    evolution.slice(year).unwrap().keys().cloned().collect()
}

// ==================== Pipeline ====================

#[test]
fn test_pipeline_tracks_identities() {
    init_logging();
    let report = engine(config()).run(&corpus()).unwrap();
    let evolution = &report.evolution;

    assert_eq!(evolution.years().collect::<Vec<_>>(), vec![2011, 2012, 2013]);
    assert!(report.skipped.is_empty());
    assert_eq!(report.selections[&2011].best, 2);
    assert_eq!(report.selections[&2012].best, 3);

    // 2011: two groups born.
    let first = ids(evolution, 2011);
    assert_eq!(first.len(), 2);
    assert!(first.iter().all(|id| id.as_str().ends_with("_2011")));

    // 2012: both persist, the q group is born.
    let second = ids(evolution, 2012);
    assert_eq!(second.len(), 3);
    for id in &first {
        assert!(second.contains(id));
    }
    assert_eq!(report.births[&2012].len(), 1);
    assert!(report.births[&2012][0].as_str().ends_with("_2012"));
    let born = evolution.slice(2012).unwrap()[&report.births[&2012][0]].clone();
    assert_eq!(born, vec!["q1", "q2", "q3"]);

    // 2013 adds nothing and keeps every identity.
    assert_eq!(ids(evolution, 2013), second);
    assert_eq!(report.links[&2013].len(), 3);
    assert!(report.links[&2013].iter().all(|m| m.similarity == 1.0));
}

#[test]
fn test_pipeline_slices_are_partitions() {
    let engine = engine(config());
    let corpus = corpus();
    let report = engine.run(&corpus).unwrap();
    for slice in engine.slices(&corpus) {
        let clusters = report.evolution.slice(slice.year).unwrap();
        let mut covered: Vec<&String> = clusters.values().flatten().collect();
        covered.sort();
        let before = covered.len();
        covered.dedup();
        assert_eq!(before, covered.len(), "clusters overlap in {}", slice.year);
        let expected: Vec<&String> = slice.entities.iter().collect();
        assert_eq!(covered, expected);
        assert!(clusters.values().all(|m| !m.is_empty()));
    }
}

#[test]
fn test_pipeline_names_are_unique() {
    let report = engine(config()).run(&corpus()).unwrap();
    let identities = report.evolution.identities();
    assert_eq!(report.names.len(), identities.len());
    let mut names: Vec<&String> = report.names.values().collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), identities.len());
    assert!(report.names.values().any(|n| n == "q1-q2-q3"));
}

#[test]
fn test_pipeline_is_deterministic() {
    let a = engine(config()).run(&corpus()).unwrap();
    let b = engine(config()).run(&corpus()).unwrap();
    assert_eq!(a.evolution, b.evolution);
    assert_eq!(a.names, b.names);
}

#[test]
fn test_empty_leading_slice_is_skipped() {
    init_logging();
    let mut config = config();
    config.slices.start_year = 2009;
    let report = engine(config).run(&corpus()).unwrap();

    assert_eq!(report.skipped.len(), 2);
    assert_eq!(report.skipped[0].year, 2009);
    assert_eq!(report.skipped[1].year, 2010);
    assert_eq!(report.evolution.years().next(), Some(2011));
}

#[test]
fn test_insufficient_data_everywhere_fails() {
    let mut config = config();
    config.clustering.candidate_k = CandidateRange::new(10, 20, 5);
    config.clustering.narrow_candidates = false;
    let err = engine(config).run(&corpus()).unwrap_err();
    assert!(matches!(
        err,
        LineageError::NoUsableSlices {
            start: 2011,
            end: 2013
        }
    ));
}

#[test]
fn test_narrowing_rescues_small_slices() {
    let mut config = config();
    config.clustering.candidate_k = CandidateRange::new(10, 20, 5);
    let report = engine(config).run(&corpus()).unwrap();
    // Four entities in 2011 narrow the search to k = 2.
    assert_eq!(report.selections[&2011].best, 2);
    assert_eq!(report.evolution.len(), 3);
}

/// 2011 and 2013 cluster cleanly; 2012 holds only an entity with no embedding.
fn gapped_slices() -> Vec<TimeSlice> {
    let slice = |year: i32, entities: &[&str]| TimeSlice {
        year,
        entities: entities.iter().map(|e| e.to_string()).collect(),
    };
    vec![
        slice(2011, &["g1", "g2", "p1", "p2"]),
        slice(2012, &["unembedded"]),
        slice(2013, &["g1", "g2", "g3", "p1", "p2", "p3"]),
    ]
}

#[test]
fn test_skipped_middle_slice_breaks_the_chain() {
    let report = engine(config()).run_slices(&gapped_slices()).unwrap();

    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].year, 2012);
    assert_eq!(report.evolution.years().collect::<Vec<_>>(), vec![2011, 2013]);

    // Every 2013 cluster is a fresh birth.
    let first = ids(&report.evolution, 2011);
    let last = ids(&report.evolution, 2013);
    assert_eq!(last.len(), 2);
    assert!(last.iter().all(|id| id.as_str().ends_with("_2013")));
    assert!(last.iter().all(|id| !first.contains(id)));
    assert_eq!(report.births[&2013], last);
    assert!(!report.links.contains_key(&2013));
}

#[test]
fn test_bridged_middle_slice_inherits_from_last_clustered_year() {
    init_logging();
    let mut config = config();
    config.propagation.bridge_skipped_slices = true;
    let report = engine(config).run_slices(&gapped_slices()).unwrap();

    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].year, 2012);
    assert!(report.evolution.slice(2012).is_none());

    // 2013 matches straight back to 2011.
    let first = ids(&report.evolution, 2011);
    assert_eq!(first.len(), 2);
    assert_eq!(ids(&report.evolution, 2013), first);
    assert!(report.births[&2013].is_empty());
    assert_eq!(report.links[&2013].len(), 2);

    let grown = report.evolution.slice(2013).unwrap();
    let g = grown.values().find(|m| m.contains(&"g1".to_string())).unwrap();
    assert_eq!(g, &vec!["g1", "g2", "g3"]);
}

#[test]
fn test_missing_embeddings_are_excluded() {
    let mut cache = embeddings();
    cache.insert("zzz", vec![50.0, 50.0]).unwrap();
    let mut partial = EmbeddingCache::new(2);
    for (entity, vector) in cache.iter().filter(|(e, _)| *e != "q3") {
        partial.insert(entity, vector.to_vec()).unwrap();
    }
    let engine = EvolutionEngine::new(EvolutionContext::new(config(), partial)).unwrap();
    let report = engine.run(&corpus()).unwrap();

    let lookup = report.evolution.entity_lookup(2012);
    assert!(!lookup.contains_key("q3"));
    assert!(lookup.contains_key("q2"));
    // The malformed-date document never reaches a slice.
    assert!(!lookup.contains_key("zzz"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut config = config();
    config.propagation.similarity_threshold = 2.0;
    let context = EvolutionContext::new(config, embeddings());
    assert!(EvolutionEngine::new(context).is_err());
}

#[test]
fn test_pipeline_with_hashed_embeddings() {
    let corpus = Corpus::new(vec![SourceTable::new("grants")
        .with_document("a", "2014-01-10", &["gene expression", "gene expression profiling"])
        .with_document("b", "2014-05-10", &["protein folding", "protein structure"])
        .with_document("c", "2015-02-01", &["crispr editing", "crispr screening"])
        .with_document("d", "2015-03-01", &["gene expression atlas", "protein folding dynamics"])]);
    let mut config = EvolutionConfig::default();
    config.slices.start_year = 2015;
    config.slices.end_year = Some(2016);

    let provider = HashedNgramEmbedding::new(64);
    let context = EvolutionContext::embed_corpus(config, &corpus, &provider).unwrap();
    assert_eq!(context.embeddings.len(), 8);

    let engine = EvolutionEngine::new(context).unwrap();
    let report = engine.run(&corpus).unwrap();
    for slice in engine.slices(&corpus) {
        let clusters = report.evolution.slice(slice.year).unwrap();
        let count: usize = clusters.values().map(|m| m.len()).sum();
        assert_eq!(count, slice.len());
    }
}

// ==================== Summaries and vectors ====================

#[test]
fn test_lineage_summary() {
    let report = engine(config()).run(&corpus()).unwrap();
    let summaries = summarize(&report.evolution, &report.names);
    assert_eq!(summaries.len(), 3);

    let born_2011: Vec<_> = summaries.iter().filter(|s| s.born == 2011).collect();
    assert_eq!(born_2011.len(), 2);
    for s in &born_2011 {
        assert_eq!(s.last_seen, 2013);
        assert_eq!(s.span(), 3);
        assert!(!s.has_gaps());
        assert_eq!(s.sizes, vec![(2011, 2), (2012, 3), (2013, 3)]);
        assert!(s.name.is_some());
    }
    // Ordered by birth year.
    assert_eq!(summaries[2].born, 2012);
}

#[test]
fn test_document_cluster_vectors() {
    let report = engine(config()).run(&corpus()).unwrap();
    let corpus = corpus();
    let (columns, vectors) = document_cluster_vectors(&corpus.sources[0], &report.evolution, 2013);
    assert_eq!(columns.len(), 3);

    let lookup = report.evolution.entity_lookup(2013);
    let col = |entity: &str| columns.iter().position(|c| c == lookup[entity]).unwrap();

    let d3 = &vectors["d3"];
    assert_eq!(d3.iter().sum::<u32>(), 2);
    assert_eq!(d3[col("g3")], 1);
    assert_eq!(d3[col("p3")], 1);
    assert_eq!(vectors["d1"][col("g1")], 2);
    // Entities outside every cluster are ignored.
    assert_eq!(vectors["d5"].iter().sum::<u32>(), 0);

    let (none, empty) = document_cluster_vectors(&corpus.sources[0], &report.evolution, 1999);
    assert!(none.is_empty() && empty.is_empty());
}

#[test]
fn test_evolution_file_round_trip() {
    let report = engine(config()).run(&corpus()).unwrap();
    let file = NamedTempFile::new().unwrap();
    report.evolution.save(file.path(), true).unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(file.path()).unwrap()).unwrap();
    assert!(raw.get("2012").is_some());

    let loaded = Evolution::load(file.path()).unwrap();
    assert_eq!(loaded, report.evolution);
}
