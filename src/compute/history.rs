//! Selection history - best selection and error for each keyframe count.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::SelectionError;

/// One recorded selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Ordered keyframe indices.
    pub selection: Vec<usize>,
    /// Worst-case error of the selection.
    pub error: f32,
}

/// Ordered map from keyframe count to the selection recorded for it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionHistory {
    entries: BTreeMap<usize, HistoryEntry>,
}

impl SelectionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a selection under its own length, replacing any earlier entry.
    pub fn record(&mut self, selection: Vec<usize>, error: f32) {
        self.entries
            .insert(selection.len(), HistoryEntry { selection, error });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Smallest recorded keyframe count (0 when empty).
    pub fn min_keyframes(&self) -> usize {
        self.entries.keys().next().copied().unwrap_or(0)
    }

    /// Largest recorded keyframe count (0 when empty).
    pub fn max_keyframes(&self) -> usize {
        self.entries.keys().next_back().copied().unwrap_or(0)
    }

    pub fn entry(&self, n: usize) -> Result<&HistoryEntry, SelectionError> {
        self.entries
            .get(&n)
            .ok_or_else(|| SelectionError::KeyframesOutOfRange {
                requested: n,
                min: self.min_keyframes(),
                max: self.max_keyframes(),
            })
    }

    pub fn selection_by_n_keyframes(&self, n: usize) -> Result<&[usize], SelectionError> {
        self.entry(n).map(|e| e.selection.as_slice())
    }

    pub fn error_by_n_keyframes(&self, n: usize) -> Result<f32, SelectionError> {
        self.entry(n).map(|e| e.error)
    }

    /// Entries in ascending keyframe count.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &HistoryEntry)> {
        self.entries.iter().map(|(&n, e)| (n, e))
    }
}
