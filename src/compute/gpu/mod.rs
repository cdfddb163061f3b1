//! GPU compute backend for the pairwise error table.
//!
//! Runs the line-based metric on a WebGPU (wgpu) compute shader.

mod line_error;

pub use line_error::{GpuBackend, LINE_ERROR_SHADER_FILE};

use std::path::PathBuf;

/// Error type for GPU operations.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("No suitable GPU adapter found")]
    NoAdapter,

    #[error("Failed to request GPU device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    #[error("Buffer mapping failed: {0}")]
    BufferMap(#[from] wgpu::BufferAsyncError),

    #[error("Buffer readback channel closed before mapping completed")]
    ReadbackClosed,

    #[error("Failed to read shader {path}: {source}")]
    ShaderLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error table for {n_frames} frames needs {bytes} bytes, device limit is {limit}")]
    TableTooLarge { n_frames: usize, bytes: u64, limit: u64 },
}
