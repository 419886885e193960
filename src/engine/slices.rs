//! Time-slice builder: cumulative yearly entity vocabularies.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::config::SliceConfig;
use crate::index::DocumentTimeline;
use crate::types::{Corpus, LineageError};

/// A year paired with the distinct entities seen in documents dated strictly
/// before 1 January of that year.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSlice {
    pub year: i32,
    /// Sorted, distinct.
    pub entities: Vec<String>,
}

impl TimeSlice {
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Builds cumulative time slices from any number of sources.
#[derive(Debug, Clone, Copy)]
pub struct TimeSliceBuilder {
    start_year: i32,
    end_year: Option<i32>,
}

impl TimeSliceBuilder {
    pub fn new(start_year: i32) -> Self {
        Self {
            start_year,
            end_year: None,
        }
    }

    pub fn from_config(config: &SliceConfig) -> Self {
        Self {
            start_year: config.start_year,
            end_year: config.end_year,
        }
    }

    /// Fix the last slice year instead of deriving it from the data.
    pub fn end_year(mut self, year: i32) -> Self {
        self.end_year = Some(year);
        self
    }

    /// The slice year range this builder will produce for `corpus`.
    pub fn year_range(&self, corpus: &Corpus) -> Option<(i32, i32)> {
        let end = self.end_year.or_else(|| corpus.latest_year())?;
        (end >= self.start_year).then_some((self.start_year, end))
    }

    /// Build one slice per year from the start year to the end year.
    ///
    /// Documents with a missing or unparseable date are logged and skipped.
    /// Documents without entities, and sources with no documents before a
    /// boundary, simply contribute nothing.
    pub fn build(&self, corpus: &Corpus) -> Vec<TimeSlice> {
        let Some((start, end)) = self.year_range(corpus) else {
            log::warn!(
                "No slice years to build: start {} has no dated data at or after it",
                self.start_year
            );
            return Vec::new();
        };

        let timelines: Vec<DocumentTimeline> = corpus
            .sources
            .iter()
            .map(|source| {
                let (timeline, rejected) = DocumentTimeline::build(source);
                for &idx in &rejected {
                    let doc = &source.documents[idx];
                    let err = LineageError::MalformedDate {
                        document_id: doc.id.clone(),
                        raw: doc.date.clone().unwrap_or_default(),
                    };
                    log::debug!("{}: {}", source.name, err);
                }
                if !rejected.is_empty() {
                    log::warn!(
                        "Source {}: dropped {} documents with missing or malformed dates",
                        source.name,
                        rejected.len()
                    );
                }
                timeline
            })
            .collect();

        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let mut previous: Option<NaiveDate> = None;
        let mut slices = Vec::with_capacity((end - start + 1) as usize);

        for year in start..=end {
            let Some(boundary) = NaiveDate::from_ymd_opt(year, 1, 1) else {
                log::warn!("Year {} is outside the representable date range", year);
                continue;
            };
            for (source, timeline) in corpus.sources.iter().zip(&timelines) {
                let docs = match previous {
                    None => timeline.before(boundary),
                    Some(prev) => timeline.between(prev, boundary),
                };
                for idx in docs {
                    let doc_id = &source.documents[idx].id;
                    seen.extend(source.entities_of(doc_id).iter().map(|e| e.as_str()));
                }
            }
            previous = Some(boundary);

            log::debug!("Slice {}: {} cumulative entities", year, seen.len());
            slices.push(TimeSlice {
                year,
                entities: seen.iter().map(|e| e.to_string()).collect(),
            });
        }
        slices
    }
}
