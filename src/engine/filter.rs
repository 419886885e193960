//! Entity frequency pre-filter: drops entities too rare or too common to make
//! meaningful cluster members.

use std::collections::HashMap;

use crate::config::{FilterConfig, FrequencyBound};
use crate::types::{Corpus, SourceTable};

/// Inclusive frequency window over entity occurrence counts.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityFrequencyFilter {
    min: Option<FrequencyBound>,
    max: Option<FrequencyBound>,
}

impl EntityFrequencyFilter {
    pub fn new(min: Option<FrequencyBound>, max: Option<FrequencyBound>) -> Self {
        Self { min, max }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(config.min_entity_frequency, config.max_entity_frequency)
    }

    /// Whether the filter would keep every entity.
    pub fn is_noop(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// Occurrences of each entity across every document of every source.
    pub fn counts(corpus: &Corpus) -> HashMap<&str, u64> {
        let mut counts: HashMap<&str, u64> = HashMap::new();
        for list in corpus.entity_lists() {
            for e in list {
                *counts.entry(e.as_str()).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Resolve the bounds against the observed counts. Missing bounds default
    /// to the observed minimum and maximum.
    pub fn resolve(&self, counts: &HashMap<&str, u64>) -> Option<(f64, f64)> {
        let mut values: Vec<u64> = counts.values().copied().collect();
        if values.is_empty() {
            return None;
        }
        values.sort_unstable();
        let lo = self
            .min
            .map_or(values[0] as f64, |b| resolve_bound(b, &values));
        let hi = self
            .max
            .map_or(values[values.len() - 1] as f64, |b| resolve_bound(b, &values));
        Some((lo, hi))
    }

    /// Copy of `corpus` with out-of-window entities removed from every document.
    pub fn apply(&self, corpus: &Corpus) -> Corpus {
        if self.is_noop() {
            return corpus.clone();
        }
        let counts = Self::counts(corpus);
        let Some((lo, hi)) = self.resolve(&counts) else {
            return corpus.clone();
        };
        let keep = |e: &str| {
            let c = counts.get(e).copied().unwrap_or(0) as f64;
            lo <= c && c <= hi
        };

        let sources: Vec<SourceTable> = corpus
            .sources
            .iter()
            .map(|s| SourceTable {
                name: s.name.clone(),
                documents: s.documents.clone(),
                entities: s
                    .entities
                    .iter()
                    .map(|(id, list)| {
                        let kept = list.iter().filter(|e| keep(e.as_str())).cloned().collect();
                        (id.clone(), kept)
                    })
                    .collect(),
            })
            .collect();

        let dropped = counts.keys().filter(|e| !keep(**e)).count();
        log::info!(
            "Frequency filter [{:.1}, {:.1}] dropped {} of {} entities",
            lo,
            hi,
            dropped,
            counts.len()
        );
        Corpus::new(sources)
    }
}

fn resolve_bound(bound: FrequencyBound, sorted: &[u64]) -> f64 {
    match bound {
        FrequencyBound::Count(c) => c as f64,
        FrequencyBound::Percentile(p) => percentile(sorted, p),
    }
}

/// Linearly interpolated percentile of sorted values.
fn percentile(sorted: &[u64], p: f64) -> f64 {
    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f64;
    sorted[lower] as f64 + (sorted[upper] as f64 - sorted[lower] as f64) * frac
}
