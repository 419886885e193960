//! Run configuration with TOML persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::types::{
    LineageError, LineageResult, DEFAULT_SIMILARITY_THRESHOLD, DEFAULT_START_YEAR,
    DEFAULT_TOP_N_TERMS,
};

/// Complete configuration for one evolution run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Time slicing
    pub slices: SliceConfig,

    /// Entity frequency pre-filter
    pub filter: FilterConfig,

    /// Per-slice clustering
    pub clustering: ClusteringConfig,

    /// Cross-slice identity propagation
    pub propagation: PropagationConfig,

    /// Cluster naming
    pub naming: NamingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SliceConfig {
    /// First slice year.
    pub start_year: i32,

    /// Last slice year. Derived from the latest dated document when absent.
    pub end_year: Option<i32>,
}

/// A frequency bound: an absolute count, or a percentile (0-100) of the
/// entity frequency distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyBound {
    Count(u64),
    Percentile(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FilterConfig {
    /// Entities seen fewer times than this are dropped.
    pub min_entity_frequency: Option<FrequencyBound>,

    /// Entities seen more times than this are dropped.
    pub max_entity_frequency: Option<FrequencyBound>,
}

/// Inclusive candidate cluster-count range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRange {
    pub low: usize,
    pub high: usize,
    pub step: usize,
}

impl CandidateRange {
    pub fn new(low: usize, high: usize, step: usize) -> Self {
        Self { low, high, step }
    }

    /// Expand into the list of candidate counts.
    pub fn candidates(&self) -> Vec<usize> {
        if self.step == 0 {
            return Vec::new();
        }
        (self.low..=self.high).step_by(self.step).collect()
    }
}

impl Default for CandidateRange {
    fn default() -> Self {
        Self::new(10, 65, 5)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Cluster counts searched by the quality sweep.
    pub candidate_k: CandidateRange,

    /// Shrink the search space for small slices instead of failing.
    pub narrow_candidates: bool,

    /// Seed for centroid initialization.
    pub seed: u64,

    /// Lloyd iterations per k-means run.
    pub max_iterations: usize,

    /// Independent k-means restarts; the lowest-inertia run wins.
    pub n_init: usize,

    /// Worker threads for the quality sweep (1 = sequential).
    pub threads: usize,
}

/// How clusters are matched across a slice boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatchingStrategy {
    /// Highest-similarity pair first, no backtracking.
    #[default]
    Greedy,
    /// Maximum total similarity assignment.
    OptimalBipartite,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationConfig {
    /// A match needs Jaccard similarity strictly above this.
    pub similarity_threshold: f64,

    /// Matching strategy.
    pub strategy: MatchingStrategy,

    /// After a skipped slice, propagate from the last clustered slice instead
    /// of treating every cluster in the next slice as newly born.
    pub bridge_skipped_slices: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Terms joined into a cluster name.
    pub top_n_terms: usize,

    /// Separator between name terms and before disambiguating suffixes.
    pub separator: String,
}

impl Default for SliceConfig {
    fn default() -> Self {
        Self {
            start_year: DEFAULT_START_YEAR,
            end_year: None,
        }
    }
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            candidate_k: CandidateRange::default(),
            narrow_candidates: true,
            seed: 42,
            max_iterations: 300,
            n_init: 4,
            threads: 1,
        }
    }
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            strategy: MatchingStrategy::Greedy,
            bridge_skipped_slices: false,
        }
    }
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            top_n_terms: DEFAULT_TOP_N_TERMS,
            separator: "-".to_string(),
        }
    }
}

impl EvolutionConfig {
    /// Load from a TOML file and validate.
    pub fn load(path: &Path) -> LineageResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| LineageError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> LineageResult<()> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> LineageResult<String> {
        toml::to_string_pretty(self).map_err(|e| LineageError::Config(e.to_string()))
    }

    /// Load from `path` when given, otherwise `./lineage.toml` if present,
    /// otherwise defaults.
    pub fn load_or_default(path: Option<&Path>) -> LineageResult<Self> {
        if let Some(p) = path {
            return Self::load(p);
        }
        let local = PathBuf::from("lineage.toml");
        if local.exists() {
            Self::load(&local)
        } else {
            Ok(Self::default())
        }
    }

    /// Reject settings no run could use.
    pub fn validate(&self) -> LineageResult<()> {
        let k = &self.clustering.candidate_k;
        if k.step == 0 {
            return Err(LineageError::InvalidCandidateRange("step must be > 0".into()));
        }
        if k.low < 2 {
            return Err(LineageError::InvalidCandidateRange(format!(
                "low must be >= 2, got {}",
                k.low
            )));
        }
        if k.low > k.high {
            return Err(LineageError::InvalidCandidateRange(format!(
                "low {} exceeds high {}",
                k.low, k.high
            )));
        }

        let t = self.propagation.similarity_threshold;
        if !(0.0..1.0).contains(&t) {
            return Err(LineageError::InvalidThreshold(t));
        }

        if self.naming.top_n_terms == 0 {
            return Err(LineageError::Config("top_n_terms must be > 0".into()));
        }
        if self.clustering.n_init == 0 || self.clustering.max_iterations == 0 {
            return Err(LineageError::Config(
                "n_init and max_iterations must be > 0".into(),
            ));
        }

        for bound in [
            self.filter.min_entity_frequency,
            self.filter.max_entity_frequency,
        ]
        .into_iter()
        .flatten()
        {
            if let FrequencyBound::Percentile(p) = bound {
                if !(0.0..=100.0).contains(&p) {
                    return Err(LineageError::Config(format!(
                        "percentile bound out of range [0, 100]: {p}"
                    )));
                }
            }
        }

        if let Some(end) = self.slices.end_year {
            if end < self.slices.start_year {
                return Err(LineageError::Config(format!(
                    "end_year {end} precedes start_year {}",
                    self.slices.start_year
                )));
            }
        }
        Ok(())
    }
}
