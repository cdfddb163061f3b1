//! Configuration types for keyframe reduction parameters.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Segment error metric used to build error tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMetric {
    /// Perpendicular distance to the chord between the segment endpoints.
    #[default]
    Line,
    /// Squared deviation from a least-squares cubic fit.
    Curve,
}

/// Top-level reduction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReductionConfig {
    /// Segment error metric.
    #[serde(default)]
    pub metric: ErrorMetric,
    /// Target number of keyframes in the combined selection.
    pub keyframes: usize,
    /// Frames that must always be keyframes. Endpoints are added automatically.
    #[serde(default)]
    pub fixed_keyframes: Vec<usize>,
    /// Pairwise error backend.
    #[serde(default)]
    pub backend: BackendConfig,
    /// Optional result files.
    #[serde(default)]
    pub output: OutputConfig,
}

impl Default for ReductionConfig {
    fn default() -> Self {
        Self {
            metric: ErrorMetric::Line,
            keyframes: 10,
            fixed_keyframes: Vec::new(),
            backend: BackendConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

/// Which backend computes the error tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Cpu,
    Gpu,
}

/// Backend selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,
    /// Directory holding `line_error.wgsl`; the embedded shader is used when unset.
    #[serde(default)]
    pub shader_dir: Option<PathBuf>,
}

/// Output files written after the reduction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Selection history CSV (`n_keyframes,error,k1,...`).
    #[serde(default)]
    pub selections_csv: Option<PathBuf>,
    /// Error table CSV of the first segment (`i,j,errorIndex,errorValue`).
    #[serde(default)]
    pub error_table_csv: Option<PathBuf>,
    /// Copy of the input series.
    #[serde(default)]
    pub series_csv: Option<PathBuf>,
    /// Channel to reduce separately as a `[frame, value]` curve.
    #[serde(default)]
    pub curve_channel: Option<usize>,
}

impl ReductionConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.keyframes < 2 {
            return Err(ConfigError::TooFewKeyframes(self.keyframes));
        }
        let mut seen = HashSet::new();
        for &frame in &self.fixed_keyframes {
            if !seen.insert(frame) {
                return Err(ConfigError::DuplicateFixedKeyframe(frame));
            }
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Keyframe target must be at least 2, got {0}")]
    TooFewKeyframes(usize),
    #[error("Fixed keyframe {0} is listed more than once")]
    DuplicateFixedKeyframe(usize),
}
