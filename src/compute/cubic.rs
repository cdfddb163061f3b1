//! Cubic Bezier segments and the iterative least-squares curve fitter.
//!
//! A segment `[from, to]` of an animation series is approximated by a cubic whose
//! endpoints are pinned to the samples at `from` and `to`. The two interior
//! control points are found by alternating between:
//!
//! 1. Resampling the series at `from + (to - from) * u` for the per-sample curve
//!    parameters `u`, then a linear least-squares solve for the interior points.
//! 2. Re-estimating each sample's `u` by exhaustive search over a fixed grid,
//!    against the samples at evenly spaced frame positions.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use super::AnimationSeries;

/// Raw samples taken along each fitted segment.
pub const SAMPLES_PER_CURVE: usize = 10;

/// Outer fit/reparameterize iterations.
pub const FITTING_ITERATIONS: usize = 4;

/// Candidate parameter values tried when re-estimating `u`.
pub const FITTING_RESOLUTION: usize = 100;

/// Singular values below this are treated as zero in the least-squares solve.
const RANK_EPSILON: f32 = 1e-6;

/// Cubic Bernstein weights at `u`.
#[inline]
pub fn bernstein(u: f32) -> [f32; 4] {
    let v = 1.0 - u;
    [v * v * v, 3.0 * v * v * u, 3.0 * v * u * u, u * u * u]
}

/// Euclidean distance between two poses.
#[inline]
pub(crate) fn distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(&a, &b)| (a - b) * (a - b))
        .sum::<f32>()
        .sqrt()
}

/// One cubic Bezier segment in channel space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighDimCubic {
    pub p1: Vec<f32>,
    pub p2: Vec<f32>,
    pub p3: Vec<f32>,
    pub p4: Vec<f32>,
}

impl HighDimCubic {
    pub fn new(p1: Vec<f32>, p2: Vec<f32>, p3: Vec<f32>, p4: Vec<f32>) -> Self {
        debug_assert!(p2.len() == p1.len() && p3.len() == p1.len() && p4.len() == p1.len());
        Self { p1, p2, p3, p4 }
    }

    #[inline]
    pub fn n_dims(&self) -> usize {
        self.p1.len()
    }

    /// Evaluate the curve at `u` into `out`.
    pub fn sample_into(&self, u: f32, out: &mut [f32]) {
        let [b1, b2, b3, b4] = bernstein(u);
        for (d, o) in out.iter_mut().enumerate() {
            *o = self.p1[d] * b1 + self.p2[d] * b2 + self.p3[d] * b3 + self.p4[d] * b4;
        }
    }

    /// Evaluate the curve at `u`.
    pub fn sample_at(&self, u: f32) -> Vec<f32> {
        let mut out = vec![0.0; self.n_dims()];
        self.sample_into(u, &mut out);
        out
    }

    /// Fit a cubic to frames `from..=to` of `series`.
    ///
    /// Each iteration samples the series at `from + (to - from) * u_j` for the
    /// current parameters, pins the endpoints to the first and last of those
    /// samples, and solves for the interior points. The parameters are then
    /// re-estimated against the raw samples at the evenly spaced positions.
    ///
    /// Zero-length ranges collapse onto the single sample. Rank-deficient designs
    /// (duplicate poses, collapsed parameters) keep the last good fit, falling
    /// back to the chord thirds.
    pub fn fit_to_curve(series: &AnimationSeries, from: usize, to: usize) -> Self {
        let n_dims = series.n_dims();

        if to <= from {
            let p = series.pose(from.min(series.n_frames() - 1)).to_vec();
            return Self::new(p.clone(), p.clone(), p.clone(), p);
        }

        let denom = (SAMPLES_PER_CURVE - 1) as f32;
        let span = (to - from) as f32;
        let sample_at = |x: f32| -> Vec<f32> {
            let mut sample = vec![0.0; n_dims];
            series.sample_into(x, &mut sample);
            sample
        };

        // Re-estimation targets at evenly spaced positions along [from, to]
        let targets: Vec<Vec<f32>> = (0..SAMPLES_PER_CURVE)
            .map(|j| sample_at(from as f32 + span * (j as f32 / denom)))
            .collect();

        let mut params: Vec<f32> = (0..SAMPLES_PER_CURVE).map(|j| j as f32 / denom).collect();
        let mut fitted: Option<Self> = None;
        let mut point = vec![0.0; n_dims];

        for _ in 0..FITTING_ITERATIONS {
            let basis: Vec<[f32; 4]> = params.iter().map(|&u| bernstein(u)).collect();
            let rows: Vec<Vec<f32>> = params
                .iter()
                .map(|&u| sample_at(from as f32 + span * u))
                .collect();
            let p1 = &rows[0];
            let p4 = &rows[SAMPLES_PER_CURVE - 1];

            // R23 * C23 = A - R14 * C14
            let r23 = DMatrix::from_fn(SAMPLES_PER_CURVE, 2, |r, c| basis[r][c + 1]);
            let b = DMatrix::from_fn(SAMPLES_PER_CURVE, n_dims, |r, c| {
                rows[r][c] - basis[r][0] * p1[c] - basis[r][3] * p4[c]
            });

            let svd = r23.svd(true, true);
            if svd.rank(RANK_EPSILON) < 2 {
                break;
            }
            let Ok(c23) = svd.solve(&b, RANK_EPSILON) else {
                break;
            };

            let p2: Vec<f32> = c23.row(0).iter().copied().collect();
            let p3: Vec<f32> = c23.row(1).iter().copied().collect();
            let cubic = Self::new(p1.clone(), p2, p3, p4.clone());

            // Re-estimate each sample's parameter against its evenly spaced target
            for (u_j, target) in params.iter_mut().zip(&targets) {
                let mut best_dist = f32::INFINITY;
                for k in 0..FITTING_RESOLUTION {
                    let u = k as f32 / (FITTING_RESOLUTION - 1) as f32;
                    cubic.sample_into(u, &mut point);
                    let dist = distance(&point, target);
                    if dist < best_dist {
                        best_dist = dist;
                        *u_j = u;
                    }
                }
            }

            fitted = Some(cubic);
        }

        fitted.unwrap_or_else(|| {
            let p1 = series.pose(from).to_vec();
            let p4 = series.pose(to).to_vec();
            let (p2, p3) = chord_thirds(&p1, &p4);
            Self::new(p1, p2, p3, p4)
        })
    }
}

/// Interior control points placing the cubic on the straight chord.
fn chord_thirds(p1: &[f32], p4: &[f32]) -> (Vec<f32>, Vec<f32>) {
    let lerp = |t: f32| -> Vec<f32> { p1.iter().zip(p4).map(|(&a, &b)| a + (b - a) * t).collect() };
    (lerp(1.0 / 3.0), lerp(2.0 / 3.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn max_reprojection_error(series: &AnimationSeries, cubic: &HighDimCubic, from: usize, to: usize) -> f32 {
        let mut raw = vec![0.0; series.n_dims()];
        (0..SAMPLES_PER_CURVE)
            .map(|s| {
                let u = s as f32 / (SAMPLES_PER_CURVE - 1) as f32;
                series.sample_into(from as f32 + (to - from) as f32 * u, &mut raw);
                distance(&cubic.sample_at(u), &raw)
            })
            .fold(0.0, f32::max)
    }

    #[test]
    fn test_bernstein_partition_of_unity() {
        for k in 0..=20 {
            let u = k as f32 / 20.0;
            let sum: f32 = bernstein(u).iter().sum();
            assert!((sum - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_sample_endpoints() {
        let cubic = HighDimCubic::new(vec![0.0, 1.0], vec![2.0, 3.0], vec![4.0, 5.0], vec![6.0, 7.0]);
        assert_eq!(cubic.sample_at(0.0), vec![0.0, 1.0]);
        assert_eq!(cubic.sample_at(1.0), vec![6.0, 7.0]);
    }

    #[test]
    fn test_colinear_points_fit_exactly() {
        let series = AnimationSeries::from_poses(&[
            vec![0.0, 0.0],
            vec![1.0, 2.0],
            vec![2.0, 4.0],
            vec![3.0, 6.0],
        ])
        .unwrap();

        let cubic = HighDimCubic::fit_to_curve(&series, 0, 3);
        assert_eq!(cubic.p1, vec![0.0, 0.0]);
        assert_eq!(cubic.p4, vec![3.0, 6.0]);

        let error = max_reprojection_error(&series, &cubic, 0, 3);
        assert!(error < 1e-4, "Colinear fit error too large: {}", error);
    }

    #[test]
    fn test_endpoints_pinned_on_curved_data() {
        let poses: Vec<Vec<f32>> = (0..12)
            .map(|f| {
                let t = f as f32 / 11.0;
                vec![f as f32, (t * std::f32::consts::PI).sin() * 5.0]
            })
            .collect();
        let series = AnimationSeries::from_poses(&poses).unwrap();

        let cubic = HighDimCubic::fit_to_curve(&series, 2, 9);
        assert_eq!(cubic.p1, series.pose(2).to_vec());
        assert_eq!(cubic.p4, series.pose(9).to_vec());

        // A half sine over a short window is well approximated by a cubic
        let error = max_reprojection_error(&series, &cubic, 2, 9);
        assert!(error < 1.0, "Fit error too large: {}", error);
    }

    #[test]
    fn test_interior_points_follow_resampled_rows() {
        let poses: Vec<Vec<f32>> = (0..7)
            .map(|f| vec![f as f32, if f == 2 { 5.0 } else { 0.0 }])
            .collect();
        let series = AnimationSeries::from_poses(&poses).unwrap();

        let cubic = HighDimCubic::fit_to_curve(&series, 0, 6);
        let expected = [(&cubic.p2, [2.0, 5.4029]), (&cubic.p3, [4.0, -2.0753])];
        for (point, want) in expected {
            assert!(distance(point, &want) < 1e-2, "{:?} != {:?}", point, want);
        }
    }

    #[test]
    fn test_zero_length_range() {
        let series = AnimationSeries::from_poses(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let cubic = HighDimCubic::fit_to_curve(&series, 1, 1);
        assert_eq!(cubic.p1, vec![3.0, 4.0]);
        assert_eq!(cubic.p2, vec![3.0, 4.0]);
        assert_eq!(cubic.p3, vec![3.0, 4.0]);
        assert_eq!(cubic.p4, vec![3.0, 4.0]);
    }

    #[test]
    fn test_duplicate_points_stay_finite() {
        let series = AnimationSeries::from_poses(&vec![vec![2.0, -1.0]; 6]).unwrap();
        let cubic = HighDimCubic::fit_to_curve(&series, 0, 5);

        for p in [&cubic.p1, &cubic.p2, &cubic.p3, &cubic.p4] {
            assert!(p.iter().all(|v| v.is_finite()));
            assert!(distance(p, &[2.0, -1.0]) < 1e-4);
        }
    }
}
