//! Document timeline: sorted (date, document index) pairs for cumulative slicing.

use chrono::NaiveDate;

use crate::types::SourceTable;

/// Sorted list of (date, document index) pairs for one source.
///
/// Documents without a parseable date are not indexed; `rebuild` reports them.
pub struct DocumentTimeline {
    /// Sorted by date ascending, then by document index.
    entries: Vec<(NaiveDate, usize)>,
}

impl DocumentTimeline {
    /// Create a new, empty timeline.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Build a timeline for a source. Returns it together with the indices of
    /// documents whose date is missing or unparseable.
    pub fn build(source: &SourceTable) -> (Self, Vec<usize>) {
        let mut timeline = Self::new();
        let rejected = timeline.rebuild(source);
        (timeline, rejected)
    }

    /// Rebuild the timeline from a source's documents.
    pub fn rebuild(&mut self, source: &SourceTable) -> Vec<usize> {
        self.entries.clear();
        self.entries.reserve(source.documents.len());
        let mut rejected = Vec::new();
        for (idx, doc) in source.documents.iter().enumerate() {
            match doc.parsed_date() {
                Some(date) => self.entries.push((date, idx)),
                None => rejected.push(idx),
            }
        }
        self.entries.sort_unstable();
        rejected
    }

    /// Document indices dated strictly before `boundary`.
    pub fn before(&self, boundary: NaiveDate) -> Vec<usize> {
        let hi = self.entries.partition_point(|(d, _)| *d < boundary);
        self.entries[..hi].iter().map(|(_, idx)| *idx).collect()
    }

    /// Document indices dated in `[start, end)`.
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> Vec<usize> {
        let lo = self.entries.partition_point(|(d, _)| *d < start);
        let hi = self.entries.partition_point(|(d, _)| *d < end);
        if lo >= hi {
            return Vec::new();
        }
        self.entries[lo..hi].iter().map(|(_, idx)| *idx).collect()
    }

    /// Earliest indexed date.
    pub fn earliest(&self) -> Option<NaiveDate> {
        self.entries.first().map(|(d, _)| *d)
    }

    /// Latest indexed date.
    pub fn latest(&self) -> Option<NaiveDate> {
        self.entries.last().map(|(d, _)| *d)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the timeline is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for DocumentTimeline {
    fn default() -> Self {
        Self::new()
    }
}
