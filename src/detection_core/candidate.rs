//! Accepted dip detections and the append-only table that collects them

use super::series::TargetId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DipCandidate {
    pub target_id: TargetId,
    pub egress_time: f64,
    pub min_relative_flux: f64,
}

/// Ordered, append-only collection of candidates for one target or a whole batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateTable {
    rows: Vec<DipCandidate>,
}

impl CandidateTable {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn push(&mut self, candidate: DipCandidate) {
        self.rows.push(candidate);
    }

    /// Move every row of `other` to the end of this table, leaving `other` empty
    pub fn append(&mut self, other: &mut CandidateTable) {
        self.rows.append(&mut other.rows);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DipCandidate> {
        self.rows.iter()
    }

    pub fn as_slice(&self) -> &[DipCandidate] {
        &self.rows
    }

    /// Number of distinct targets with at least one row
    pub fn target_count(&self) -> usize {
        self.rows
            .iter()
            .map(|row| &row.target_id)
            .collect::<HashSet<_>>()
            .len()
    }
}

impl Extend<DipCandidate> for CandidateTable {
    fn extend<I: IntoIterator<Item = DipCandidate>>(&mut self, iter: I) {
        self.rows.extend(iter);
    }
}

impl FromIterator<DipCandidate> for CandidateTable {
    fn from_iter<I: IntoIterator<Item = DipCandidate>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for CandidateTable {
    type Item = DipCandidate;
    type IntoIter = std::vec::IntoIter<DipCandidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a CandidateTable {
    type Item = &'a DipCandidate;
    type IntoIter = std::slice::Iter<'a, DipCandidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
