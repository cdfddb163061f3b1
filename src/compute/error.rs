//! Error type for keyframe selection.

use super::gpu::GpuError;

/// Failure kinds of the selection engine.
#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    #[error("Series needs at least one frame of {n_dims} channels (got {values} values)")]
    InvalidSeries { values: usize, n_dims: usize },

    #[error("Channel {dim} out of range for a series with {n_dims} channels")]
    InvalidChannel { dim: usize, n_dims: usize },

    #[error("Invalid segment [{from}, {to}]: a segment needs at least two frames")]
    InvalidSegment { from: usize, to: usize },

    #[error("Keyframe count {requested} outside [{min}, {max}]")]
    KeyframesOutOfRange {
        requested: usize,
        min: usize,
        max: usize,
    },

    #[error("Error table cell ({i}, {j}) undefined: requires i < j < {n_frames}")]
    CellOutOfRange { i: usize, j: usize, n_frames: usize },

    #[error("Every segment is saturated at {reached} keyframes ({requested} requested)")]
    AllocationExhausted { requested: usize, reached: usize },

    #[error(transparent)]
    Gpu(#[from] GpuError),
}
