//! Error table - reconstruction cost of every candidate segment `[i, j]`.
//!
//! Each cell holds the cost of representing frames `i..=j` with a single
//! primitive (a line or a cubic) plus the interior frame where that primitive
//! deviates most. Only the upper triangle (`i < j`) is defined.

use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;

use super::cubic::distance;
use super::{AnimationSeries, HighDimCubic, SAMPLES_PER_CURVE, SelectionError};
use crate::schema::ErrorMetric;

/// Sentinel stored for cells without a split index.
pub const NO_INDEX: i32 = -1;

/// One error table entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorCell {
    /// Interior frame of maximum deviation, if any.
    pub index: Option<usize>,
    /// Cost of representing the segment as one primitive.
    pub value: f32,
}

impl ErrorCell {
    pub const ZERO: ErrorCell = ErrorCell {
        index: None,
        value: 0.0,
    };

    #[inline]
    fn encoded_index(&self) -> i32 {
        self.index.map_or(NO_INDEX, |k| k as i32)
    }
}

/// Maximum perpendicular distance from frames strictly between `i` and `j`
/// to the straight line through pose(i) and pose(j).
///
/// When both endpoint poses coincide the line degenerates to a point and the
/// distance to that point is used.
pub fn line_cell(series: &AnimationSeries, i: usize, j: usize) -> ErrorCell {
    let a = series.pose(i);
    let b = series.pose(j);
    let chord: Vec<f32> = b.iter().zip(a).map(|(&b, &a)| b - a).collect();
    let length = chord.iter().map(|v| v * v).sum::<f32>().sqrt();

    let mut best = ErrorCell::ZERO;
    for k in i + 1..j {
        let c = series.pose(k);
        let dist = if length > f32::EPSILON {
            let dot = c
                .iter()
                .zip(a)
                .zip(&chord)
                .map(|((&c, &a), &n)| (c - a) * n)
                .sum::<f32>()
                / length;
            c.iter()
                .zip(a)
                .zip(&chord)
                .map(|((&c, &a), &n)| {
                    let projected = a + dot * n / length;
                    (projected - c) * (projected - c)
                })
                .sum::<f32>()
                .sqrt()
        } else {
            distance(c, a)
        };

        if dist > best.value {
            best = ErrorCell {
                index: Some(k),
                value: dist,
            };
        }
    }
    best
}

/// Sum of squared distances between a fitted cubic and the raw series.
///
/// Segments of two to four frames are reproduced exactly by a cubic and are
/// given zero error with a fixed split index without running the fit.
pub fn curve_cell(series: &AnimationSeries, i: usize, j: usize) -> ErrorCell {
    match j - i + 1 {
        2 => ErrorCell {
            index: Some(i),
            value: 0.0,
        },
        3 | 4 => ErrorCell {
            index: Some(i + 1),
            value: 0.0,
        },
        _ => {
            let cubic = HighDimCubic::fit_to_curve(series, i, j);
            let mut on_curve = vec![0.0; series.n_dims()];
            let mut raw = vec![0.0; series.n_dims()];

            let mut sum_squared = 0.0f32;
            let mut max_dist = 0.0f32;
            let mut max_index = None;
            for s in 0..SAMPLES_PER_CURVE {
                let u = s as f32 / (SAMPLES_PER_CURVE - 1) as f32;
                let x = i as f32 + (j - i) as f32 * u;
                cubic.sample_into(u, &mut on_curve);
                series.sample_into(x, &mut raw);

                let dist = distance(&on_curve, &raw);
                sum_squared += dist * dist;
                if dist > max_dist {
                    max_dist = dist;
                    max_index = Some(x.round() as usize);
                }
            }

            ErrorCell {
                index: max_index,
                value: sum_squared,
            }
        }
    }
}

/// Cell for `(i, j)` under `metric`.
#[inline]
pub fn pairwise_cell(series: &AnimationSeries, metric: ErrorMetric, i: usize, j: usize) -> ErrorCell {
    match metric {
        ErrorMetric::Line => line_cell(series, i, j),
        ErrorMetric::Curve => curve_cell(series, i, j),
    }
}

/// Strategy computing every `(i, j) -> (index, value)` cell of a table.
///
/// Implementations fill row-major `n_frames x n_frames` buffers for all `i < j`,
/// writing [`NO_INDEX`] where a cell has no split index. Cells with `i >= j` are
/// never read.
pub trait PairwiseErrorBackend: Send + Sync {
    /// Human-readable backend name for logging.
    fn name(&self) -> &'static str;

    fn fill(
        &self,
        series: &AnimationSeries,
        metric: ErrorMetric,
        indices: &mut [i32],
        values: &mut [f32],
    ) -> Result<(), SelectionError>;
}

/// Reference backend: rows of the table are filled in parallel on the CPU.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuBackend;

impl PairwiseErrorBackend for CpuBackend {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn fill(
        &self,
        series: &AnimationSeries,
        metric: ErrorMetric,
        indices: &mut [i32],
        values: &mut [f32],
    ) -> Result<(), SelectionError> {
        fill_parallel(series.n_frames(), indices, values, |i, j| {
            pairwise_cell(series, metric, i, j)
        });
        Ok(())
    }
}

/// Fan out cell computation over rows; returns once every row is written.
fn fill_parallel<F>(n_frames: usize, indices: &mut [i32], values: &mut [f32], cell: F)
where
    F: Fn(usize, usize) -> ErrorCell + Sync,
{
    indices
        .par_chunks_mut(n_frames)
        .zip(values.par_chunks_mut(n_frames))
        .enumerate()
        .for_each(|(i, (index_row, value_row))| {
            for j in i + 1..n_frames {
                let c = cell(i, j);
                index_row[j] = c.encoded_index();
                value_row[j] = c.value;
            }
        });
}

/// Precomputed pairwise errors for one animation segment.
#[derive(Debug, Clone)]
pub struct ErrorTable {
    series: Arc<AnimationSeries>,
    metric: ErrorMetric,
    /// Row-major split indices, `NO_INDEX` where undefined.
    indices: Vec<i32>,
    /// Row-major error values.
    values: Vec<f32>,
}

impl ErrorTable {
    /// Build a table for `series` with the given backend.
    pub fn build(
        series: Arc<AnimationSeries>,
        metric: ErrorMetric,
        backend: &dyn PairwiseErrorBackend,
    ) -> Result<Self, SelectionError> {
        let n = Self::check_frames(&series)?;
        let start = Instant::now();

        let mut indices = vec![NO_INDEX; n * n];
        let mut values = vec![0.0f32; n * n];
        backend.fill(&series, metric, &mut indices, &mut values)?;

        log::debug!(
            "Built {:?} error table for {} frames on {} backend in {:.2?}",
            metric,
            n,
            backend.name(),
            start.elapsed()
        );

        Ok(Self {
            series,
            metric,
            indices,
            values,
        })
    }

    /// Build a table from an arbitrary `(i, j) -> cell` function.
    pub fn from_fn<F>(
        series: Arc<AnimationSeries>,
        metric: ErrorMetric,
        cell: F,
    ) -> Result<Self, SelectionError>
    where
        F: Fn(usize, usize) -> ErrorCell + Sync,
    {
        let n = Self::check_frames(&series)?;
        let mut indices = vec![NO_INDEX; n * n];
        let mut values = vec![0.0f32; n * n];
        fill_parallel(n, &mut indices, &mut values, cell);

        Ok(Self {
            series,
            metric,
            indices,
            values,
        })
    }

    /// Line-based table on the CPU backend.
    pub fn using_line_based_error(
        series: impl Into<Arc<AnimationSeries>>,
    ) -> Result<Self, SelectionError> {
        Self::build(series.into(), ErrorMetric::Line, &CpuBackend)
    }

    /// Curve-based table on the CPU backend.
    pub fn using_curve_based_error(
        series: impl Into<Arc<AnimationSeries>>,
    ) -> Result<Self, SelectionError> {
        Self::build(series.into(), ErrorMetric::Curve, &CpuBackend)
    }

    fn check_frames(series: &AnimationSeries) -> Result<usize, SelectionError> {
        let n = series.n_frames();
        if n < 2 {
            return Err(SelectionError::InvalidSegment {
                from: 0,
                to: n.saturating_sub(1),
            });
        }
        Ok(n)
    }

    #[inline]
    pub fn n_frames(&self) -> usize {
        self.series.n_frames()
    }

    #[inline]
    pub fn metric(&self) -> ErrorMetric {
        self.metric
    }

    /// The series segment this table was built from.
    #[inline]
    pub fn series(&self) -> &Arc<AnimationSeries> {
        &self.series
    }

    /// Checked lookup of cell `(i, j)`.
    pub fn cell(&self, i: usize, j: usize) -> Result<ErrorCell, SelectionError> {
        let n = self.n_frames();
        if i >= j || j >= n {
            return Err(SelectionError::CellOutOfRange { i, j, n_frames: n });
        }
        Ok(ErrorCell {
            index: self.error_index(i, j),
            value: self.error_value(i, j),
        })
    }

    /// Error value of `(i, j)`; requires `i < j < n_frames`.
    #[inline]
    pub fn error_value(&self, i: usize, j: usize) -> f32 {
        debug_assert!(i < j && j < self.n_frames());
        self.values[i * self.n_frames() + j]
    }

    /// Split index of `(i, j)`; requires `i < j < n_frames`.
    #[inline]
    pub fn error_index(&self, i: usize, j: usize) -> Option<usize> {
        debug_assert!(i < j && j < self.n_frames());
        let k = self.indices[i * self.n_frames() + j];
        (k >= 0).then_some(k as usize)
    }

    /// All defined cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, ErrorCell)> + '_ {
        let n = self.n_frames();
        (0..n).flat_map(move |i| {
            (i + 1..n).map(move |j| {
                (
                    i,
                    j,
                    ErrorCell {
                        index: self.error_index(i, j),
                        value: self.error_value(i, j),
                    },
                )
            })
        })
    }

    /// Largest error along consecutive frames of `selection`.
    pub fn error_for_selection(&self, selection: &[usize]) -> f32 {
        selection
            .windows(2)
            .map(|w| self.error_value(w[0], w[1]))
            .fold(0.0, f32::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bump() -> AnimationSeries {
        AnimationSeries::from_poses(&[vec![0.0], vec![1.0], vec![2.0], vec![1.0], vec![0.0]])
            .unwrap()
    }

    #[test]
    fn test_line_error_bump() {
        let table = ErrorTable::using_line_based_error(bump()).unwrap();
        let cell = table.cell(0, 4).unwrap();
        assert!((cell.value - 2.0).abs() < 1e-6);
        assert_eq!(cell.index, Some(2));
    }

    #[test]
    fn test_line_error_adjacent_frames() {
        let table = ErrorTable::using_line_based_error(bump()).unwrap();
        for i in 0..4 {
            let cell = table.cell(i, i + 1).unwrap();
            assert_eq!(cell.index, None);
            assert_eq!(cell.value, 0.0);
        }
    }

    #[test]
    fn test_line_error_perpendicular_distance() {
        // Frame 1 sits 1 unit above the chord from (0,0) to (2,0)
        let series =
            AnimationSeries::from_poses(&[vec![0.0, 0.0], vec![1.0, 1.0], vec![2.0, 0.0]]).unwrap();
        let cell = line_cell(&series, 0, 2);
        assert!((cell.value - 1.0).abs() < 1e-6);
        assert_eq!(cell.index, Some(1));
    }

    #[test]
    fn test_line_error_linear_motion_is_zero() {
        let poses: Vec<Vec<f32>> = (0..8).map(|f| vec![f as f32, 2.0 * f as f32]).collect();
        let table = ErrorTable::using_line_based_error(AnimationSeries::from_poses(&poses).unwrap())
            .unwrap();
        for (_, _, cell) in table.cells() {
            assert!(cell.value < 1e-5);
        }
    }

    #[test]
    fn test_curve_error_short_segments() {
        // Wild data would give a large error if a fit were attempted
        let series = AnimationSeries::from_poses(&[
            vec![0.0, 0.0],
            vec![1.0, 100.0],
            vec![2.0, -100.0],
            vec![3.0, 50.0],
            vec![4.0, 0.0],
        ])
        .unwrap();
        let table = ErrorTable::using_curve_based_error(series).unwrap();

        assert_eq!(table.cell(0, 1).unwrap(), ErrorCell { index: Some(0), value: 0.0 });
        assert_eq!(table.cell(1, 3).unwrap(), ErrorCell { index: Some(2), value: 0.0 });
        assert_eq!(table.cell(0, 3).unwrap(), ErrorCell { index: Some(1), value: 0.0 });
        assert!(table.cell(0, 4).unwrap().value > 1.0);
    }

    #[test]
    fn test_curve_error_three_frame_series() {
        let series =
            AnimationSeries::from_poses(&[vec![0.0, 5.0], vec![1.0, -9.0], vec![2.0, 3.0]]).unwrap();
        let table = ErrorTable::using_curve_based_error(series).unwrap();
        assert_eq!(table.cell(0, 2).unwrap(), ErrorCell { index: Some(1), value: 0.0 });
    }

    #[test]
    fn test_curve_error_smooth_motion_is_small() {
        let poses: Vec<Vec<f32>> = (0..9).map(|f| vec![f as f32, 0.5 * f as f32]).collect();
        let table =
            ErrorTable::using_curve_based_error(AnimationSeries::from_poses(&poses).unwrap())
                .unwrap();
        assert!(table.error_value(0, 8) < 1e-4);
    }

    #[test]
    fn test_curve_error_interior_spike() {
        // One spike at frame 2 over seven flat frames
        let poses: Vec<Vec<f32>> = (0..7)
            .map(|f| vec![f as f32, if f == 2 { 5.0 } else { 0.0 }])
            .collect();
        let table =
            ErrorTable::using_curve_based_error(AnimationSeries::from_poses(&poses).unwrap())
                .unwrap();

        let cell = table.cell(0, 6).unwrap();
        assert_eq!(cell.index, Some(2));
        assert!(
            (cell.value - 12.4031).abs() < 1e-2,
            "Spike curve error: {}",
            cell.value
        );
    }

    #[test]
    fn test_invalid_lookups() {
        let table = ErrorTable::using_line_based_error(bump()).unwrap();
        assert!(matches!(table.cell(2, 2), Err(SelectionError::CellOutOfRange { .. })));
        assert!(matches!(table.cell(3, 1), Err(SelectionError::CellOutOfRange { .. })));
        assert!(matches!(table.cell(0, 5), Err(SelectionError::CellOutOfRange { .. })));
    }

    #[test]
    fn test_single_frame_rejected() {
        let series = AnimationSeries::from_poses(&[vec![1.0, 2.0]]).unwrap();
        let result = ErrorTable::using_line_based_error(series);
        assert!(matches!(result, Err(SelectionError::InvalidSegment { .. })));
    }

    #[test]
    fn test_from_fn_matches_backend() {
        let series = Arc::new(bump());
        let by_backend = ErrorTable::using_line_based_error(series.clone()).unwrap();
        let by_fn = ErrorTable::from_fn(series.clone(), ErrorMetric::Line, |i, j| {
            line_cell(&series, i, j)
        })
        .unwrap();

        for ((_, _, a), (_, _, b)) in by_backend.cells().zip(by_fn.cells()) {
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_error_for_selection() {
        let table = ErrorTable::using_line_based_error(bump()).unwrap();
        assert!((table.error_for_selection(&[0, 4]) - 2.0).abs() < 1e-6);
        assert_eq!(table.error_for_selection(&[0, 2, 4]), table.error_value(0, 2).max(table.error_value(2, 4)));
    }
}
