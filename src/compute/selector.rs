//! Selector - optimal keyframes for a single segment.
//!
//! For a keyframe budget `k` the selector finds the `k` frames (always including
//! both segment endpoints) that minimize the largest error-table value between
//! consecutive chosen frames. This is a bottleneck shortest path, solved one
//! budget at a time:
//!
//! ```text
//! best_k(e) = min over p in [k-2, e) of max(best_{k-1}(p), table(p, e))
//! ```

use std::sync::Arc;

use rayon::prelude::*;

use super::{AnimationSeries, ErrorTable, PairwiseErrorBackend, SelectionError, SelectionHistory};
use crate::schema::ErrorMetric;

/// DP frontier for a fixed keyframe count.
///
/// Maps every feasible end frame `e >= keyframes - 1` to the best error of a
/// `keyframes`-frame path from frame 0 to `e`, and the path itself.
#[derive(Debug, Clone)]
pub struct SelectionRow {
    keyframes: usize,
    /// Error per end frame, indexed by `e - (keyframes - 1)`.
    errors: Vec<f32>,
    /// Path per end frame, same indexing.
    selections: Vec<Vec<usize>>,
}

impl SelectionRow {
    /// Two-keyframe row: every end frame is reached directly from frame 0.
    fn initial(table: &ErrorTable) -> Self {
        let n = table.n_frames();
        Self {
            keyframes: 2,
            errors: (1..n).map(|e| table.error_value(0, e)).collect(),
            selections: (1..n).map(|e| vec![0, e]).collect(),
        }
    }

    /// Row for one more keyframe. End frames are independent and solved in parallel.
    fn advance(&self, table: &ErrorTable) -> Self {
        let keyframes = self.keyframes + 1;
        let n = table.n_frames();

        let cells: Vec<(f32, Vec<usize>)> = (keyframes - 1..n)
            .into_par_iter()
            .map(|e| {
                let mut best_value = f32::INFINITY;
                let mut best_p = keyframes - 2;
                for p in keyframes - 2..e {
                    let value = self.error_value(p).max(table.error_value(p, e));
                    if value < best_value {
                        best_value = value;
                        best_p = p;
                    }
                }

                let mut selection = Vec::with_capacity(keyframes);
                selection.extend_from_slice(self.selection(best_p));
                selection.push(e);
                (best_value, selection)
            })
            .collect();

        let (errors, selections) = cells.into_iter().unzip();
        Self {
            keyframes,
            errors,
            selections,
        }
    }

    #[inline]
    pub fn keyframes(&self) -> usize {
        self.keyframes
    }

    /// First end frame this row covers.
    #[inline]
    pub fn first_end_frame(&self) -> usize {
        self.keyframes - 1
    }

    /// Best error for paths ending at `e`; requires `e >= first_end_frame()`.
    #[inline]
    pub fn error_value(&self, e: usize) -> f32 {
        self.errors[e - self.first_end_frame()]
    }

    /// Best path ending at `e`; requires `e >= first_end_frame()`.
    #[inline]
    pub fn selection(&self, e: usize) -> &[usize] {
        &self.selections[e - self.first_end_frame()]
    }
}

/// Single-segment keyframe selector.
///
/// Starts at two keyframes (the segment endpoints) and grows one keyframe per
/// [`Selector::next`] call up to one keyframe per frame.
#[derive(Debug, Clone)]
pub struct Selector {
    table: ErrorTable,
    frontier: SelectionRow,
    history: SelectionHistory,
}

impl Selector {
    pub fn new(table: ErrorTable) -> Self {
        let last = table.n_frames() - 1;
        let frontier = SelectionRow::initial(&table);

        let mut history = SelectionHistory::new();
        history.record(vec![0, last], table.error_value(0, last));

        Self {
            table,
            frontier,
            history,
        }
    }

    /// Build the error table for `series` with `backend` and wrap it in a selector.
    pub fn from_series(
        series: impl Into<Arc<AnimationSeries>>,
        metric: ErrorMetric,
        backend: &dyn PairwiseErrorBackend,
    ) -> Result<Self, SelectionError> {
        let table = ErrorTable::build(series.into(), metric, backend)?;
        Ok(Self::new(table))
    }

    /// Advance the frontier by one keyframe.
    pub fn next(&mut self) -> Result<(), SelectionError> {
        let max = self.maximum_keyframes();
        if self.keyframes() >= max {
            return Err(SelectionError::KeyframesOutOfRange {
                requested: self.keyframes() + 1,
                min: 2,
                max,
            });
        }

        self.frontier = self.frontier.advance(&self.table);

        let selection = self.frontier.selection(max - 1).to_vec();
        let error = self.table.error_for_selection(&selection);
        self.history.record(selection, error);
        Ok(())
    }

    /// Advance until `n` keyframes are available.
    pub fn up_to(&mut self, n: usize) -> Result<(), SelectionError> {
        while self.keyframes() < n {
            self.next()?;
        }
        Ok(())
    }

    /// Keyframe count of the current frontier.
    #[inline]
    pub fn keyframes(&self) -> usize {
        self.frontier.keyframes()
    }

    /// One keyframe per frame.
    #[inline]
    pub fn maximum_keyframes(&self) -> usize {
        self.table.n_frames()
    }

    #[inline]
    pub fn min_keyframes(&self) -> usize {
        self.history.min_keyframes()
    }

    /// Largest keyframe count computed so far.
    #[inline]
    pub fn max_keyframes(&self) -> usize {
        self.history.max_keyframes()
    }

    pub fn selection_by_n_keyframes(&self, n: usize) -> Result<&[usize], SelectionError> {
        self.history.selection_by_n_keyframes(n)
    }

    pub fn error_by_n_keyframes(&self, n: usize) -> Result<f32, SelectionError> {
        self.history.error_by_n_keyframes(n)
    }

    pub fn last_selection(&self) -> &[usize] {
        self.frontier.selection(self.maximum_keyframes() - 1)
    }

    /// Error of [`Self::last_selection`] read back from the table.
    pub fn last_error(&self) -> f32 {
        self.table.error_for_selection(self.last_selection())
    }

    pub fn history(&self) -> &SelectionHistory {
        &self.history
    }

    pub fn table(&self) -> &ErrorTable {
        &self.table
    }

    pub fn frontier(&self) -> &SelectionRow {
        &self.frontier
    }
}
