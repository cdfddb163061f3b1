//! Interpolator - cubic segments between consecutive keyframes.

use serde::{Deserialize, Serialize};

use super::{AnimationSeries, HighDimCubic, SelectionError};

/// Piecewise cubic reconstruction of an animation from a keyframe selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interpolator {
    keyframes: Vec<usize>,
    segments: Vec<HighDimCubic>,
}

impl Interpolator {
    /// Fit one cubic per consecutive keyframe pair of `keyframes`.
    ///
    /// Keyframes must be strictly increasing, at least two, and inside the series.
    pub fn fit(series: &AnimationSeries, keyframes: &[usize]) -> Result<Self, SelectionError> {
        validate_keyframes(series, keyframes)?;

        let segments = keyframes
            .windows(2)
            .map(|w| HighDimCubic::fit_to_curve(series, w[0], w[1]))
            .collect();

        Ok(Self {
            keyframes: keyframes.to_vec(),
            segments,
        })
    }

    pub fn keyframes(&self) -> &[usize] {
        &self.keyframes
    }

    /// One cubic per keyframe pair, in frame order.
    pub fn segments(&self) -> &[HighDimCubic] {
        &self.segments
    }

    /// Evaluate the reconstruction at a (fractional) frame position.
    ///
    /// Positions outside the keyframe range are clamped to the first or last key.
    pub fn sample_at_frame(&self, frame: f32) -> Vec<f32> {
        let first = self.keyframes[0] as f32;
        let last = self.keyframes[self.keyframes.len() - 1] as f32;
        let frame = frame.clamp(first, last);

        // Segment whose window contains the frame, the last one at the end key
        let ix = self
            .keyframes
            .windows(2)
            .position(|w| frame < w[1] as f32)
            .unwrap_or(self.segments.len() - 1);

        let from = self.keyframes[ix] as f32;
        let to = self.keyframes[ix + 1] as f32;
        self.segments[ix].sample_at((frame - from) / (to - from))
    }
}

/// Fit cubics to the 2-channel curve `[frame, channel dim]` of `series`.
pub fn reduce_channel(
    series: &AnimationSeries,
    dim: usize,
    keyframes: &[usize],
) -> Result<Interpolator, SelectionError> {
    let curve = series.curve_by_index(dim)?;
    Interpolator::fit(&curve, keyframes)
}

fn validate_keyframes(series: &AnimationSeries, keyframes: &[usize]) -> Result<(), SelectionError> {
    let (Some(&first), Some(&last)) = (keyframes.first(), keyframes.last()) else {
        return Err(SelectionError::InvalidSegment { from: 0, to: 0 });
    };
    if keyframes.len() < 2 {
        return Err(SelectionError::InvalidSegment {
            from: first,
            to: last,
        });
    }
    if let Some(w) = keyframes.windows(2).find(|w| w[0] >= w[1]) {
        return Err(SelectionError::InvalidSegment {
            from: w[0],
            to: w[1],
        });
    }
    if last >= series.n_frames() {
        return Err(SelectionError::InvalidSegment {
            from: first,
            to: last,
        });
    }
    Ok(())
}
