//! Evolution engine: slices, per-slice clustering, chronological identity
//! propagation and naming.

use std::collections::BTreeMap;

use serde::Serialize;

use super::clusterer::{EmbeddedSlice, SliceClusterer};
use super::filter::EntityFrequencyFilter;
use super::naming::TfIdfNamer;
use super::propagate::{ClusterMatch, IdentityPropagator};
use super::selector::{ClusterCountSelector, Selection};
use super::slices::{TimeSlice, TimeSliceBuilder};
use crate::config::EvolutionConfig;
use crate::embed::{EmbeddingCache, EmbeddingProvider};
use crate::index::KMeansParams;
use crate::types::{ClusterId, Corpus, Evolution, LineageError, LineageResult, SliceClusters};

/// Configuration and embeddings shared read-only by every stage of a run.
#[derive(Debug, Clone)]
pub struct EvolutionContext {
    pub config: EvolutionConfig,
    pub embeddings: EmbeddingCache,
}

impl EvolutionContext {
    pub fn new(config: EvolutionConfig, embeddings: EmbeddingCache) -> Self {
        Self { config, embeddings }
    }

    /// Build a context by embedding every distinct entity of `corpus` once.
    pub fn embed_corpus(
        config: EvolutionConfig,
        corpus: &Corpus,
        provider: &dyn EmbeddingProvider,
    ) -> LineageResult<Self> {
        let mut embeddings = EmbeddingCache::new(provider.dimension());
        embeddings.populate(
            provider,
            corpus.entity_lists().flat_map(|l| l.iter().map(|e| e.as_str())),
        )?;
        Ok(Self::new(config, embeddings))
    }
}

/// A slice that produced no clusters, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedSlice {
    pub year: i32,
    pub reason: String,
}

/// Everything one run produces.
#[derive(Debug, Clone, Serialize)]
pub struct EvolutionReport {
    /// Propagated clusters per year.
    pub evolution: Evolution,
    /// Unique derived name per identity.
    pub names: BTreeMap<ClusterId, String>,
    /// Cluster-count search per clustered year.
    pub selections: BTreeMap<i32, Selection>,
    /// Accepted cross-slice matches, keyed by the later year.
    pub links: BTreeMap<i32, Vec<ClusterMatch>>,
    /// Identities born per year.
    pub births: BTreeMap<i32, Vec<ClusterId>>,
    pub skipped: Vec<SkippedSlice>,
}

/// Runs the full pipeline over a corpus.
pub struct EvolutionEngine {
    context: EvolutionContext,
    selector: ClusterCountSelector,
    clusterer: SliceClusterer,
    propagator: IdentityPropagator,
    namer: TfIdfNamer,
}

impl EvolutionEngine {
    pub fn new(context: EvolutionContext) -> LineageResult<Self> {
        context.config.validate()?;
        let clustering = &context.config.clustering;
        let selector = ClusterCountSelector::from_config(clustering);
        let clusterer = SliceClusterer::new(KMeansParams {
            seed: clustering.seed,
            max_iterations: clustering.max_iterations,
            n_init: clustering.n_init,
        });
        let propagator = IdentityPropagator::from_config(&context.config.propagation)?;
        let namer = TfIdfNamer::from_config(&context.config.naming)?;
        Ok(Self {
            context,
            selector,
            clusterer,
            propagator,
            namer,
        })
    }

    pub fn context(&self) -> &EvolutionContext {
        &self.context
    }

    /// Build the slices the run would cluster, after frequency filtering.
    pub fn slices(&self, corpus: &Corpus) -> Vec<TimeSlice> {
        let filter = EntityFrequencyFilter::from_config(&self.context.config.filter);
        let builder = TimeSliceBuilder::from_config(&self.context.config.slices);
        if filter.is_noop() {
            builder.build(corpus)
        } else {
            builder.build(&filter.apply(corpus))
        }
    }

    /// Cluster one slice with the best-scoring cluster count.
    pub fn cluster_slice(&self, slice: &TimeSlice) -> LineageResult<(Selection, SliceClusters)> {
        let embedded = EmbeddedSlice::lookup(slice, &self.context.embeddings);
        if embedded.is_empty() {
            return Err(LineageError::EmptySlice(slice.year));
        }
        let selection = self.selector.select(&embedded.points)?;
        let clusters = self.clusterer.cluster(&embedded, selection.best)?;
        Ok((selection, clusters))
    }

    /// Run every stage over the slices built from `corpus`.
    pub fn run(&self, corpus: &Corpus) -> LineageResult<EvolutionReport> {
        self.run_slices(&self.slices(corpus))
    }

    /// Cluster, propagate and name prepared slices.
    ///
    /// Slices are processed in the given order, which must be increasing by
    /// year; each propagation step reads the relabelled output of the one
    /// before. A slice that cannot be clustered is recorded in `skipped` and
    /// breaks the identity chain unless bridging is enabled. Fails only when
    /// no slice can be clustered at all.
    pub fn run_slices(&self, slices: &[TimeSlice]) -> LineageResult<EvolutionReport> {
        let bridge = self.context.config.propagation.bridge_skipped_slices;

        let mut report = EvolutionReport {
            evolution: Evolution::new(),
            names: BTreeMap::new(),
            selections: BTreeMap::new(),
            links: BTreeMap::new(),
            births: BTreeMap::new(),
            skipped: Vec::new(),
        };
        let mut previous: Option<SliceClusters> = None;

        for slice in slices {
            let (selection, clusters) = match self.cluster_slice(slice) {
                Ok(done) => done,
                Err(e) => {
                    log::warn!("Skipping slice {}: {}", slice.year, e);
                    report.skipped.push(SkippedSlice {
                        year: slice.year,
                        reason: e.to_string(),
                    });
                    if !bridge {
                        previous = None;
                    }
                    continue;
                }
            };
            report.selections.insert(slice.year, selection);

            let current = match &previous {
                Some(prev) => {
                    let step = self.propagator.propagate(prev, &clusters);
                    report.links.insert(slice.year, step.matches);
                    report.births.insert(slice.year, step.births);
                    step.slice
                }
                None => {
                    report
                        .births
                        .insert(slice.year, clusters.clusters.keys().cloned().collect());
                    clusters
                }
            };
            report.evolution.insert(current.clone());
            previous = Some(current);
        }

        if report.evolution.is_empty() {
            let start = self.context.config.slices.start_year;
            let end = slices.last().map_or(start, |s| s.year);
            return Err(LineageError::NoUsableSlices { start, end });
        }

        report.names = self.namer.name_evolution(&report.evolution);
        log::info!(
            "Evolution complete: {} years, {} identities, {} slices skipped",
            report.evolution.len(),
            report.names.len(),
            report.skipped.len()
        );
        Ok(report)
    }
}
