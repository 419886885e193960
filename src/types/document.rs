//! Document tables consumed by the time-slice builder.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::types::error::LineageResult;

/// Minimal projection of a document: enough to bucket it in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Document identifier, unique within its source.
    pub id: String,
    /// Raw date string as provided upstream. Missing dates are allowed.
    #[serde(default)]
    pub date: Option<String>,
}

impl DocumentRecord {
    pub fn new(id: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            date: Some(date.into()),
        }
    }

    /// A record with no date at all.
    pub fn undated(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            date: None,
        }
    }

    /// The parsed date, or `None` when missing or unparseable.
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        self.date.as_deref().and_then(parse_document_date)
    }
}

/// One data source: its dated documents plus the entities tagged on each.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceTable {
    /// Source name, e.g. "patents" or "openalex".
    pub name: String,
    /// Documents with their dates.
    #[serde(default)]
    pub documents: Vec<DocumentRecord>,
    /// document id -> ordered entity list (scores stripped on load).
    #[serde(default, deserialize_with = "strip_scores")]
    pub entities: BTreeMap<String, Vec<String>>,
}

impl SourceTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add a document together with its entities.
    pub fn with_document(
        mut self,
        id: impl Into<String>,
        date: impl Into<String>,
        entities: &[&str],
    ) -> Self {
        let id = id.into();
        self.entities
            .insert(id.clone(), entities.iter().map(|e| e.to_string()).collect());
        self.documents.push(DocumentRecord::new(id, date));
        self
    }

    /// Entities tagged on a document; empty when the document has none.
    pub fn entities_of(&self, document_id: &str) -> &[String] {
        self.entities
            .get(document_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

/// All sources analyzed together.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Corpus {
    pub sources: Vec<SourceTable>,
}

impl Corpus {
    pub fn new(sources: Vec<SourceTable>) -> Self {
        Self { sources }
    }

    /// Load a corpus from a JSON file.
    pub fn load(path: &Path) -> LineageResult<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Year of the most recent parseable document date across all sources.
    pub fn latest_year(&self) -> Option<i32> {
        self.sources
            .iter()
            .flat_map(|s| s.documents.iter())
            .filter_map(|d| d.parsed_date())
            .map(|d| d.year())
            .max()
    }

    /// Every document's entity list, across all sources.
    pub fn entity_lists(&self) -> impl Iterator<Item = &Vec<String>> {
        self.sources.iter().flat_map(|s| s.entities.values())
    }
}

/// Entity lists arrive either as bare strings or as `[entity, score]` pairs.
#[derive(Deserialize)]
#[serde(untagged)]
enum EntityMention {
    Bare(String),
    Scored(String, serde_json::Value),
}

fn strip_scores<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: BTreeMap<String, Vec<EntityMention>> = BTreeMap::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(id, mentions)| {
            let names = mentions
                .into_iter()
                .map(|m| match m {
                    EntityMention::Bare(name) | EntityMention::Scored(name, _) => name,
                })
                .collect();
            (id, names)
        })
        .collect())
}

/// Parse a document date in any of the formats upstream tables use.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`,
/// RFC 3339, `YYYY-MM` and a bare `YYYY` (the latter two resolve to the
/// first day of the period).
pub fn parse_document_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d") {
        return Some(d);
    }
    if raw.len() == 4 && raw.chars().all(|c| c.is_ascii_digit()) {
        let year: i32 = raw.parse().ok()?;
        return NaiveDate::from_ymd_opt(year, 1, 1);
    }
    None
}
