//! Phase 1 tests: document tables, time slicing, frequency filtering, config.

use chrono::NaiveDate;
use tempfile::NamedTempFile;

use topic_lineage::config::{EvolutionConfig, FrequencyBound, MatchingStrategy};
use topic_lineage::engine::{EntityFrequencyFilter, TimeSliceBuilder};
use topic_lineage::index::DocumentTimeline;
use topic_lineage::types::{parse_document_date, Corpus, DocumentRecord, SourceTable};
use topic_lineage::LineageError;

// ==================== Helpers ====================

fn patents() -> SourceTable {
    SourceTable::new("patents")
        .with_document("p1", "2011-06-01", &["genome", "dna"])
        .with_document("p2", "2012-12-31", &["crispr"])
        .with_document("p3", "2013-01-01", &["rna", "genome"])
}

fn papers() -> SourceTable {
    SourceTable::new("papers")
        .with_document("w1", "2010-02-14", &["sequencing"])
        .with_document("w2", "2012-07-01", &[])
        .with_document("w3", "not a date", &["bogus"])
}

fn corpus() -> Corpus {
    Corpus::new(vec![patents(), papers()])
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// ==================== Dates ====================

#[test]
fn test_parse_document_date_formats() {
    assert_eq!(parse_document_date("2015-03-09"), Some(date(2015, 3, 9)));
    assert_eq!(
        parse_document_date("2015-03-09 12:30:00"),
        Some(date(2015, 3, 9))
    );
    assert_eq!(
        parse_document_date("2015-03-09T23:59:59+02:00"),
        Some(date(2015, 3, 9))
    );
    assert_eq!(parse_document_date("2015-03"), Some(date(2015, 3, 1)));
    assert_eq!(parse_document_date("2015"), Some(date(2015, 1, 1)));
}

#[test]
fn test_parse_document_date_rejects_garbage() {
    assert_eq!(parse_document_date(""), None);
    assert_eq!(parse_document_date("   "), None);
    assert_eq!(parse_document_date("yesterday"), None);
    assert_eq!(parse_document_date("2015-13-40"), None);
    assert_eq!(DocumentRecord::undated("x").parsed_date(), None);
}

#[test]
fn test_timeline_strict_boundary() {
    let (timeline, rejected) = DocumentTimeline::build(&patents());
    assert!(rejected.is_empty());
    assert_eq!(timeline.len(), 3);

    // p3 is dated exactly on the boundary and must be excluded.
    assert_eq!(timeline.before(date(2013, 1, 1)), vec![0, 1]);
    assert_eq!(timeline.between(date(2012, 1, 1), date(2013, 1, 1)), vec![1]);
    assert_eq!(timeline.earliest(), Some(date(2011, 6, 1)));
    assert_eq!(timeline.latest(), Some(date(2013, 1, 1)));
}

#[test]
fn test_timeline_reports_malformed() {
    let (timeline, rejected) = DocumentTimeline::build(&papers());
    assert_eq!(rejected, vec![2]);
    assert_eq!(timeline.len(), 2);
}

// ==================== Time slices ====================

#[test]
fn test_slices_are_cumulative_with_strict_boundary() {
    let slices = TimeSliceBuilder::new(2011).end_year(2014).build(&corpus());
    let years: Vec<i32> = slices.iter().map(|s| s.year).collect();
    assert_eq!(years, vec![2011, 2012, 2013, 2014]);

    // Before 2011-01-01: only w1.
    assert_eq!(slices[0].entities, vec!["sequencing"]);
    // Before 2012-01-01: adds p1.
    assert_eq!(slices[1].entities, vec!["dna", "genome", "sequencing"]);
    // Before 2013-01-01: adds p2 (2012-12-31) but not p3 (2013-01-01).
    assert_eq!(
        slices[2].entities,
        vec!["crispr", "dna", "genome", "sequencing"]
    );
    // Before 2014-01-01: p3 now included.
    assert_eq!(
        slices[3].entities,
        vec!["crispr", "dna", "genome", "rna", "sequencing"]
    );
}

#[test]
fn test_slices_are_monotone() {
    let slices = TimeSliceBuilder::new(2009).end_year(2015).build(&corpus());
    for pair in slices.windows(2) {
        for e in &pair[0].entities {
            assert!(pair[1].entities.contains(e));
        }
    }
    assert!(slices[0].is_empty());
}

#[test]
fn test_malformed_dates_and_empty_lists_are_dropped() {
    let slices = TimeSliceBuilder::new(2020).end_year(2020).build(&corpus());
    assert_eq!(slices.len(), 1);
    assert!(!slices[0].entities.iter().any(|e| e == "bogus"));
}

#[test]
fn test_end_year_defaults_to_latest_data() {
    let builder = TimeSliceBuilder::new(2010);
    assert_eq!(builder.year_range(&corpus()), Some((2010, 2013)));
    assert_eq!(builder.build(&corpus()).len(), 4);
}

#[test]
fn test_start_after_data_yields_nothing() {
    let slices = TimeSliceBuilder::new(2030).build(&corpus());
    assert!(slices.is_empty());
}

#[test]
fn test_source_without_documents_contributes_nothing() {
    let corpus = Corpus::new(vec![patents(), SourceTable::new("grants")]);
    let slices = TimeSliceBuilder::new(2012).end_year(2012).build(&corpus);
    assert_eq!(slices[0].entities, vec!["dna", "genome"]);
}

// ==================== Corpus JSON ====================

#[test]
fn test_corpus_json_strips_scores() {
    let json = r#"{
        "sources": [{
            "name": "papers",
            "documents": [{"id": "d1", "date": "2015-03-01"}, {"id": "d2"}],
            "entities": {"d1": [["genome", 0.93], "dna", ["rna", {"score": 0.5}]]}
        }]
    }"#;
    let file = NamedTempFile::new().unwrap();
    std::fs::write(file.path(), json).unwrap();

    let corpus = Corpus::load(file.path()).unwrap();
    let source = &corpus.sources[0];
    assert_eq!(source.entities_of("d1"), ["genome", "dna", "rna"]);
    assert!(source.entities_of("d2").is_empty());
    assert_eq!(source.documents[1].date, None);
    assert_eq!(corpus.latest_year(), Some(2015));
}

// ==================== Frequency filter ====================

#[test]
fn test_filter_by_count() {
    let filter = EntityFrequencyFilter::new(Some(FrequencyBound::Count(2)), None);
    let filtered = filter.apply(&corpus());
    let p = &filtered.sources[0];
    // "genome" appears twice; everything else once.
    assert_eq!(p.entities_of("p1"), ["genome"]);
    assert!(p.entities_of("p2").is_empty());
    assert_eq!(p.entities_of("p3"), ["genome"]);
}

#[test]
fn test_filter_by_max_percentile() {
    let filter = EntityFrequencyFilter::new(None, Some(FrequencyBound::Percentile(50.0)));
    let corpus_data = corpus();
    let counts = EntityFrequencyFilter::counts(&corpus_data);
    let (lo, hi) = filter.resolve(&counts).unwrap();
    assert_eq!(lo, 1.0);
    assert_eq!(hi, 1.0);

    let filtered = filter.apply(&corpus());
    assert_eq!(filtered.sources[0].entities_of("p1"), ["dna"]);
}

#[test]
fn test_noop_filter_keeps_everything() {
    let filter = EntityFrequencyFilter::default();
    assert!(filter.is_noop());
    let filtered = filter.apply(&corpus());
    assert_eq!(filtered.sources[0].entities, corpus().sources[0].entities);
}

// ==================== Config ====================

#[test]
fn test_config_defaults() {
    let config = EvolutionConfig::default();
    assert_eq!(config.slices.start_year, 2010);
    assert_eq!(config.slices.end_year, None);
    assert_eq!(
        config.clustering.candidate_k.candidates(),
        vec![10, 15, 20, 25, 30, 35, 40, 45, 50, 55, 60, 65]
    );
    assert_eq!(config.propagation.similarity_threshold, 0.5);
    assert_eq!(config.propagation.strategy, MatchingStrategy::Greedy);
    assert_eq!(config.naming.top_n_terms, 3);
    config.validate().unwrap();
}

#[test]
fn test_config_toml_round_trip() {
    let mut config = EvolutionConfig::default();
    config.slices.end_year = Some(2022);
    config.filter.min_entity_frequency = Some(FrequencyBound::Count(3));
    config.filter.max_entity_frequency = Some(FrequencyBound::Percentile(99.0));
    config.propagation.strategy = MatchingStrategy::OptimalBipartite;
    config.propagation.similarity_threshold = 0.7;

    let file = NamedTempFile::new().unwrap();
    config.save(file.path()).unwrap();
    let loaded = EvolutionConfig::load(file.path()).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_config_partial_toml_uses_defaults() {
    let file = NamedTempFile::new().unwrap();
    std::fs::write(
        file.path(),
        "[propagation]\nsimilarity_threshold = 0.7\nstrategy = \"optimal_bipartite\"\n",
    )
    .unwrap();
    let config = EvolutionConfig::load(file.path()).unwrap();
    assert_eq!(config.propagation.similarity_threshold, 0.7);
    assert_eq!(config.propagation.strategy, MatchingStrategy::OptimalBipartite);
    assert_eq!(config.clustering.seed, 42);
}

#[test]
fn test_config_validation() {
    let mut config = EvolutionConfig::default();
    config.propagation.similarity_threshold = 1.0;
    assert!(matches!(
        config.validate(),
        Err(LineageError::InvalidThreshold(_))
    ));

    let mut config = EvolutionConfig::default();
    config.clustering.candidate_k.step = 0;
    assert!(matches!(
        config.validate(),
        Err(LineageError::InvalidCandidateRange(_))
    ));

    let mut config = EvolutionConfig::default();
    config.clustering.candidate_k.low = 70;
    assert!(config.validate().is_err());

    let mut config = EvolutionConfig::default();
    config.naming.top_n_terms = 0;
    assert!(config.validate().is_err());

    let mut config = EvolutionConfig::default();
    config.slices.end_year = Some(2000);
    assert!(config.validate().is_err());
}
