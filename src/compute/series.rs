//! Animation series - immutable matrix of per-frame samples.
//!
//! Data is stored frame-major as a flat array with indexing `[frame * n_dims + dim]`,
//! so each pose is a contiguous slice.

use super::SelectionError;

/// Immutable `n_dims x n_frames` matrix of samples.
///
/// Channel 0 is conventionally a time/index channel.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationSeries {
    data: Vec<f32>,
    n_frames: usize,
    n_dims: usize,
}

impl AnimationSeries {
    /// Create a series from flat frame-major data (`[frame * n_dims + dim]`).
    pub fn from_flat(data: Vec<f32>, n_dims: usize) -> Result<Self, SelectionError> {
        if n_dims == 0 || data.is_empty() || data.len() % n_dims != 0 {
            return Err(SelectionError::InvalidSeries {
                values: data.len(),
                n_dims,
            });
        }
        let n_frames = data.len() / n_dims;
        Ok(Self {
            data,
            n_frames,
            n_dims,
        })
    }

    /// Create a series from one pose per row (`n_frames x n_dims`).
    pub fn from_poses(poses: &[Vec<f32>]) -> Result<Self, SelectionError> {
        let n_dims = poses.first().map_or(0, Vec::len);
        if poses.iter().any(|p| p.len() != n_dims) {
            return Err(SelectionError::InvalidSeries {
                values: poses.iter().map(Vec::len).sum(),
                n_dims,
            });
        }
        Self::from_flat(poses.concat(), n_dims)
    }

    /// Create a series from channels (`n_dims x n_frames`).
    pub fn from_channels(channels: &[Vec<f32>]) -> Result<Self, SelectionError> {
        let n_frames = channels.first().map_or(0, Vec::len);
        if channels.iter().any(|c| c.len() != n_frames) {
            return Err(SelectionError::InvalidSeries {
                values: channels.iter().map(Vec::len).sum(),
                n_dims: channels.len(),
            });
        }
        let data = (0..n_frames)
            .flat_map(|f| channels.iter().map(move |c| c[f]))
            .collect();
        Self::from_flat(data, channels.len())
    }

    #[inline]
    pub fn n_frames(&self) -> usize {
        self.n_frames
    }

    #[inline]
    pub fn n_dims(&self) -> usize {
        self.n_dims
    }

    /// Flat frame-major sample buffer.
    #[inline]
    pub fn as_flat(&self) -> &[f32] {
        &self.data
    }

    /// All channels of one frame.
    #[inline]
    pub fn pose(&self, frame: usize) -> &[f32] {
        let start = frame * self.n_dims;
        &self.data[start..start + self.n_dims]
    }

    #[inline]
    pub fn value(&self, frame: usize, dim: usize) -> f32 {
        self.data[frame * self.n_dims + dim]
    }

    /// Copy of frames `from..=to` as a new series.
    pub fn sub_animation(&self, from: usize, to: usize) -> Result<Self, SelectionError> {
        if from > to || to >= self.n_frames {
            return Err(SelectionError::InvalidSegment { from, to });
        }
        let data = self.data[from * self.n_dims..(to + 1) * self.n_dims].to_vec();
        Self::from_flat(data, self.n_dims)
    }

    /// Two-channel series `[frame index, channel dim]` for reducing a single attribute.
    pub fn curve_by_index(&self, dim: usize) -> Result<Self, SelectionError> {
        if dim >= self.n_dims {
            return Err(SelectionError::InvalidChannel {
                dim,
                n_dims: self.n_dims,
            });
        }
        let data = (0..self.n_frames)
            .flat_map(|f| [f as f32, self.value(f, dim)])
            .collect();
        Self::from_flat(data, 2)
    }

    /// Linearly interpolate the pose at fractional frame `x` into `out`.
    ///
    /// `x` is clamped to `[0, n_frames - 1]`.
    pub fn sample_into(&self, x: f32, out: &mut [f32]) {
        let x = x.clamp(0.0, (self.n_frames - 1) as f32);
        let left = x.floor() as usize;
        let right = x.ceil() as usize;
        if left == right {
            out.copy_from_slice(self.pose(left));
            return;
        }
        let t = x - left as f32;
        let a = self.pose(left);
        let b = self.pose(right);
        for ((o, &a), &b) in out.iter_mut().zip(a).zip(b) {
            *o = a + (b - a) * t;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> AnimationSeries {
        AnimationSeries::from_poses(&[
            vec![0.0, 10.0],
            vec![1.0, 20.0],
            vec![2.0, 40.0],
            vec![3.0, 80.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_shape_and_access() {
        let series = ramp();
        assert_eq!(series.n_frames(), 4);
        assert_eq!(series.n_dims(), 2);
        assert_eq!(series.pose(2), &[2.0, 40.0]);
        assert_eq!(series.value(3, 1), 80.0);
    }

    #[test]
    fn test_from_channels_matches_poses() {
        let by_channel = AnimationSeries::from_channels(&[
            vec![0.0, 1.0, 2.0, 3.0],
            vec![10.0, 20.0, 40.0, 80.0],
        ])
        .unwrap();
        assert_eq!(by_channel, ramp());
    }

    #[test]
    fn test_ragged_rejected() {
        let result = AnimationSeries::from_poses(&[vec![0.0, 1.0], vec![2.0]]);
        assert!(matches!(result, Err(SelectionError::InvalidSeries { .. })));
        assert!(AnimationSeries::from_flat(Vec::new(), 3).is_err());
    }

    #[test]
    fn test_sub_animation() {
        let sub = ramp().sub_animation(1, 2).unwrap();
        assert_eq!(sub.n_frames(), 2);
        assert_eq!(sub.pose(0), &[1.0, 20.0]);
        assert_eq!(sub.pose(1), &[2.0, 40.0]);

        assert!(ramp().sub_animation(2, 1).is_err());
        assert!(ramp().sub_animation(0, 4).is_err());
    }

    #[test]
    fn test_curve_by_index() {
        let curve = ramp().curve_by_index(1).unwrap();
        assert_eq!(curve.n_dims(), 2);
        assert_eq!(curve.pose(3), &[3.0, 80.0]);
        assert!(ramp().curve_by_index(2).is_err());
    }

    #[test]
    fn test_sample_into_interpolates() {
        let series = ramp();
        let mut out = [0.0f32; 2];

        series.sample_into(1.0, &mut out);
        assert_eq!(out, [1.0, 20.0]);

        series.sample_into(1.25, &mut out);
        assert!((out[0] - 1.25).abs() < 1e-6);
        assert!((out[1] - 25.0).abs() < 1e-6);

        // Clamped beyond the last frame
        series.sample_into(7.0, &mut out);
        assert_eq!(out, [3.0, 80.0]);
    }
}
