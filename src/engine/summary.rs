//! Per-identity lineage summaries and document cluster vectors.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::{ClusterId, Evolution, SourceTable};

/// The life of one cluster identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineageSummary {
    pub id: ClusterId,
    pub name: Option<String>,
    pub born: i32,
    pub last_seen: i32,
    /// (year, size), ascending by year.
    pub sizes: Vec<(i32, usize)>,
}

impl LineageSummary {
    /// Years between birth and last sighting, inclusive.
    pub fn span(&self) -> i32 {
        self.last_seen - self.born + 1
    }

    /// Whether the identity is absent from some year inside its span.
    pub fn has_gaps(&self) -> bool {
        self.sizes.len() as i32 != self.span()
    }
}

/// Summarize every identity in an evolution, ordered by birth year then id.
pub fn summarize(
    evolution: &Evolution,
    names: &BTreeMap<ClusterId, String>,
) -> Vec<LineageSummary> {
    let mut out: Vec<LineageSummary> = evolution
        .identities()
        .into_iter()
        .filter_map(|id| {
            let sizes = evolution.sizes(id);
            let born = sizes.first()?.0;
            let last_seen = sizes.last()?.0;
            Some(LineageSummary {
                id: id.clone(),
                name: names.get(id).cloned(),
                born,
                last_seen,
                sizes,
            })
        })
        .collect();
    out.sort_by(|a, b| a.born.cmp(&b.born).then_with(|| a.id.cmp(&b.id)));
    out
}

/// Cluster occurrence counts for every document of a source.
///
/// Clusters are indexed by their position in `evolution`'s slice for `year`
/// (identity order). Entities with no cluster that year are ignored.
pub fn document_cluster_vectors(
    source: &SourceTable,
    evolution: &Evolution,
    year: i32,
) -> (Vec<ClusterId>, BTreeMap<String, Vec<u32>>) {
    let Some(slice) = evolution.slice(year) else {
        return (Vec::new(), BTreeMap::new());
    };
    let columns: Vec<ClusterId> = slice.keys().cloned().collect();
    let position: BTreeMap<&ClusterId, usize> =
        columns.iter().enumerate().map(|(i, id)| (id, i)).collect();
    let lookup = evolution.entity_lookup(year);

    let vectors = source
        .documents
        .iter()
        .map(|doc| {
            let mut counts = vec![0u32; columns.len()];
            for entity in source.entities_of(&doc.id) {
                if let Some(col) = lookup.get(entity.as_str()).and_then(|id| position.get(id)) {
                    counts[*col] += 1;
                }
            }
            (doc.id.clone(), counts)
        })
        .collect();
    (columns, vectors)
}
