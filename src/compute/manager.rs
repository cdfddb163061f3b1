//! Selection manager - keyframe budget allocation across fixed-keyframe segments.
//!
//! Fixed keyframes split the animation into independent segments, each with its
//! own error table and [`Selector`]. The global budget grows one keyframe at a
//! time, always granted to the segment whose error drops the most.

use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;

use super::{
    AnimationSeries, CpuBackend, PairwiseErrorBackend, SelectionError, SelectionHistory, Selector,
};
use crate::schema::ErrorMetric;

/// One independent segment between two fixed keyframes.
#[derive(Debug, Clone)]
struct Segment {
    /// First frame of the segment in the full animation.
    start: usize,
    selector: Selector,
    /// Keyframes currently granted to this segment.
    keyframes: usize,
}

impl Segment {
    #[inline]
    fn end(&self) -> usize {
        self.start + self.selector.maximum_keyframes() - 1
    }

    #[inline]
    fn is_saturated(&self) -> bool {
        self.keyframes >= self.selector.maximum_keyframes()
    }

    /// Error reduction from granting one more keyframe, or `None` when saturated.
    fn candidate_delta(&mut self) -> Result<Option<f32>, SelectionError> {
        if self.is_saturated() {
            return Ok(None);
        }
        self.selector.up_to(self.keyframes + 1)?;
        let now = self.selector.error_by_n_keyframes(self.keyframes)?;
        let next = self.selector.error_by_n_keyframes(self.keyframes + 1)?;
        Ok(Some(now - next))
    }

    fn selection(&self) -> Result<&[usize], SelectionError> {
        self.selector.selection_by_n_keyframes(self.keyframes)
    }

    fn error(&self) -> Result<f32, SelectionError> {
        self.selector.error_by_n_keyframes(self.keyframes)
    }
}

/// Greedy keyframe allocator over fixed-keyframe segments.
#[derive(Debug, Clone)]
pub struct SelectionManager {
    segments: Vec<Segment>,
    history: SelectionHistory,
}

impl SelectionManager {
    /// Partition `series` at `fixed_keyframes` and build one selector per segment
    /// on the CPU backend.
    pub fn new(
        series: &AnimationSeries,
        metric: ErrorMetric,
        fixed_keyframes: &[usize],
    ) -> Result<Self, SelectionError> {
        Self::with_backend(series, metric, fixed_keyframes, &CpuBackend)
    }

    /// Partition `series` at `fixed_keyframes` and build one selector per segment.
    ///
    /// Fixed keyframes are sorted and de-duplicated; the first and last frame are
    /// always added.
    pub fn with_backend(
        series: &AnimationSeries,
        metric: ErrorMetric,
        fixed_keyframes: &[usize],
        backend: &dyn PairwiseErrorBackend,
    ) -> Result<Self, SelectionError> {
        let n_frames = series.n_frames();
        if n_frames < 2 {
            return Err(SelectionError::InvalidSegment {
                from: 0,
                to: n_frames.saturating_sub(1),
            });
        }
        let last = n_frames - 1;
        if let Some(&frame) = fixed_keyframes.iter().find(|&&f| f > last) {
            return Err(SelectionError::InvalidSegment {
                from: frame,
                to: last,
            });
        }

        let bounds = segment_bounds(fixed_keyframes, last);
        let start = Instant::now();

        let segments = bounds
            .windows(2)
            .map(|w| {
                let sub = series.sub_animation(w[0], w[1])?;
                let selector = Selector::from_series(Arc::new(sub), metric, backend)?;
                Ok(Segment {
                    start: w[0],
                    selector,
                    keyframes: 2,
                })
            })
            .collect::<Result<Vec<_>, SelectionError>>()?;

        log::info!(
            "Prepared {} segment(s) over {} frames ({:?} error, {} backend) in {:.2?}",
            segments.len(),
            n_frames,
            metric,
            backend.name(),
            start.elapsed()
        );

        let mut manager = Self {
            segments,
            history: SelectionHistory::new(),
        };
        manager.record()?;
        Ok(manager)
    }

    /// Grow the combined selection one keyframe at a time until it holds `n` frames.
    ///
    /// Each step grants a keyframe to the unsaturated segment with the largest
    /// error reduction. Segments are scanned in order and a later segment with an
    /// equal reduction replaces an earlier one. Returns
    /// [`SelectionError::AllocationExhausted`] when every segment is saturated
    /// before `n` is reached; the manager stays usable.
    pub fn increment_until_n_keyframes(&mut self, n: usize) -> Result<(), SelectionError> {
        let start = Instant::now();

        while self.total_keyframes() < n {
            let deltas = self
                .segments
                .par_iter_mut()
                .map(Segment::candidate_delta)
                .collect::<Result<Vec<_>, SelectionError>>()?;

            let mut best: Option<(usize, f32)> = None;
            for (ix, delta) in deltas.into_iter().enumerate() {
                let Some(delta) = delta else { continue };
                match best {
                    Some((_, best_delta)) if delta < best_delta => {}
                    _ => best = Some((ix, delta)),
                }
            }

            let Some((ix, delta)) = best else {
                let reached = self.total_keyframes();
                log::warn!(
                    "All segments saturated at {} keyframes, {} requested",
                    reached,
                    n
                );
                return Err(SelectionError::AllocationExhausted {
                    requested: n,
                    reached,
                });
            };

            log::trace!("Granting keyframe to segment {} (error -{})", ix, delta);
            self.segments[ix].keyframes += 1;
            self.record()?;
        }

        log::info!(
            "Reached {} keyframes (max error {}) in {:.2?}",
            self.total_keyframes(),
            self.max_error_across_segments()?,
            start.elapsed()
        );
        Ok(())
    }

    /// Combined keyframe count; shared segment boundaries count once.
    pub fn total_keyframes(&self) -> usize {
        let granted: usize = self.segments.iter().map(|s| s.keyframes).sum();
        granted - (self.segments.len() - 1)
    }

    /// Upper bound on the combined keyframe count (every frame a keyframe).
    pub fn maximum_keyframes(&self) -> usize {
        self.segments.last().map_or(0, |s| s.end() + 1)
    }

    /// Current best selection of every segment in animation frame indices.
    pub fn combined_selection(&self) -> Result<Vec<usize>, SelectionError> {
        let mut combined = Vec::with_capacity(self.total_keyframes());
        let last = self.segments.len() - 1;
        for (ix, segment) in self.segments.iter().enumerate() {
            let selection = segment.selection()?;
            // The next segment starts with this segment's last keyframe
            let keep = if ix < last {
                &selection[..selection.len() - 1]
            } else {
                selection
            };
            combined.extend(keep.iter().map(|&f| segment.start + f));
        }
        Ok(combined)
    }

    /// Largest current error over all segments.
    pub fn max_error_across_segments(&self) -> Result<f32, SelectionError> {
        self.segments
            .iter()
            .try_fold(0.0f32, |max, segment| Ok::<_, SelectionError>(max.max(segment.error()?)))
    }

    /// `(start, end)` frames of every segment.
    pub fn segment_bounds(&self) -> Vec<(usize, usize)> {
        self.segments.iter().map(|s| (s.start, s.end())).collect()
    }

    /// Keyframes currently granted to each segment.
    pub fn segment_allocations(&self) -> Vec<usize> {
        self.segments.iter().map(|s| s.keyframes).collect()
    }

    /// Selector of segment `ix`.
    pub fn selector(&self, ix: usize) -> Option<&Selector> {
        self.segments.get(ix).map(|s| &s.selector)
    }

    /// Combined selections and errors recorded after every allocation step.
    pub fn history(&self) -> &SelectionHistory {
        &self.history
    }

    pub fn selection_by_n_keyframes(&self, n: usize) -> Result<&[usize], SelectionError> {
        self.history.selection_by_n_keyframes(n)
    }

    pub fn error_by_n_keyframes(&self, n: usize) -> Result<f32, SelectionError> {
        self.history.error_by_n_keyframes(n)
    }

    pub fn min_keyframes(&self) -> usize {
        self.history.min_keyframes()
    }

    pub fn max_keyframes(&self) -> usize {
        self.history.max_keyframes()
    }

    fn record(&mut self) -> Result<(), SelectionError> {
        let selection = self.combined_selection()?;
        let error = self.max_error_across_segments()?;
        self.history.record(selection, error);
        Ok(())
    }
}

/// Sorted, de-duplicated segment boundaries including frame 0 and `last`.
fn segment_bounds(fixed_keyframes: &[usize], last: usize) -> Vec<usize> {
    let mut bounds: Vec<usize> = fixed_keyframes.to_vec();
    bounds.push(0);
    bounds.push(last);
    bounds.sort_unstable();
    bounds.dedup();
    bounds
}
