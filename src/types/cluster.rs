//! Cluster identities, per-slice clusterings and the full evolution.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::error::LineageResult;

/// A propagated cluster label: the unit of continuity across time slices.
///
/// Freshly minted identities have the form `{local}_{year}`; an inherited
/// identity keeps the form it was born with.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterId(String);

impl ClusterId {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// Identity for a cluster born in `year` with slice-local index `local`.
    pub fn minted(local: usize, year: i32) -> Self {
        Self(format!("{local}_{year}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClusterId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The clusters of one time slice, keyed by identity.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SliceClusters {
    pub year: i32,
    pub clusters: BTreeMap<ClusterId, Vec<String>>,
}

impl SliceClusters {
    pub fn new(year: i32) -> Self {
        Self {
            year,
            clusters: BTreeMap::new(),
        }
    }

    /// Build from slice-local partition groups, minting a fresh identity per group.
    pub fn from_partition(year: i32, groups: Vec<Vec<String>>) -> Self {
        let clusters = groups
            .into_iter()
            .enumerate()
            .map(|(local, mut members)| {
                members.sort();
                (ClusterId::minted(local, year), members)
            })
            .collect();
        Self { year, clusters }
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn get(&self, id: &ClusterId) -> Option<&[String]> {
        self.clusters.get(id).map(|v| v.as_slice())
    }

    /// Union of all member entities.
    pub fn entities(&self) -> BTreeSet<&str> {
        self.clusters
            .values()
            .flat_map(|m| m.iter().map(|e| e.as_str()))
            .collect()
    }

    /// Whether the clusters are pairwise disjoint, non-empty and cover `entities` exactly.
    pub fn is_partition_of(&self, entities: &[String]) -> bool {
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        for members in self.clusters.values() {
            if members.is_empty() {
                return false;
            }
            for e in members {
                if !seen.insert(e.as_str()) {
                    return false;
                }
            }
        }
        let expected: BTreeSet<&str> = entities.iter().map(|e| e.as_str()).collect();
        seen == expected
    }
}

/// Propagated clusters for every processed year.
///
/// Serializes as `{ "<year>": { "<identity>": [entities...] } }`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Evolution {
    slices: BTreeMap<i32, BTreeMap<ClusterId, Vec<String>>>,
}

impl Evolution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, slice: SliceClusters) {
        self.slices.insert(slice.year, slice.clusters);
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.slices.keys().copied()
    }

    pub fn slice(&self, year: i32) -> Option<&BTreeMap<ClusterId, Vec<String>>> {
        self.slices.get(&year)
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    /// Every identity appearing in any year, sorted.
    pub fn identities(&self) -> BTreeSet<&ClusterId> {
        self.slices.values().flat_map(|s| s.keys()).collect()
    }

    /// Membership of an identity at the latest year it appears in.
    pub fn final_membership(&self, id: &ClusterId) -> Option<(i32, &[String])> {
        self.slices
            .iter()
            .rev()
            .find_map(|(year, s)| s.get(id).map(|m| (*year, m.as_slice())))
    }

    /// (year, size) for each year an identity appears in, ascending.
    pub fn sizes(&self, id: &ClusterId) -> Vec<(i32, usize)> {
        self.slices
            .iter()
            .filter_map(|(year, s)| s.get(id).map(|m| (*year, m.len())))
            .collect()
    }

    /// Flat entity -> identity lookup for one year.
    pub fn entity_lookup(&self, year: i32) -> BTreeMap<&str, &ClusterId> {
        self.slices
            .get(&year)
            .map(|s| {
                s.iter()
                    .flat_map(|(id, members)| members.iter().map(move |e| (e.as_str(), id)))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn load(path: &Path) -> LineageResult<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn save(&self, path: &Path, pretty: bool) -> LineageResult<()> {
        let data = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        std::fs::write(path, data)?;
        Ok(())
    }
}
