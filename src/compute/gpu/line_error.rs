//! GPU line-error backend - fills the pairwise table with one invocation per cell.

use std::path::Path;
use std::time::Instant;

use super::GpuError;
use crate::compute::{AnimationSeries, CpuBackend, PairwiseErrorBackend, SelectionError};
use crate::schema::ErrorMetric;

/// File name looked up in a shader directory override.
pub const LINE_ERROR_SHADER_FILE: &str = "line_error.wgsl";

// Embed shader source at compile time
const LINE_ERROR_SHADER: &str = include_str!("shaders/line_error.wgsl");

const WORKGROUP_SIZE: u32 = 16;

/// Uniform buffer struct for the line error shader.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct LineErrorParams {
    n_frames: u32,
    n_dims: u32,
    _pad0: u32,
    _pad1: u32,
}

/// wgpu implementation of [`PairwiseErrorBackend`].
///
/// Only the line metric runs on the device; curve tables are delegated to
/// [`CpuBackend`].
pub struct GpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl GpuBackend {
    /// Create a GPU backend.
    ///
    /// With `shader_dir` set, the shader is loaded from
    /// `shader_dir/line_error.wgsl` instead of the embedded copy.
    pub async fn new(shader_dir: Option<&Path>) -> Result<Self, GpuError> {
        let source = match shader_dir {
            Some(dir) => {
                let path = dir.join(LINE_ERROR_SHADER_FILE);
                std::fs::read_to_string(&path)
                    .map_err(|source| GpuError::ShaderLoad { path, source })?
            }
            None => LINE_ERROR_SHADER.to_string(),
        };

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| GpuError::NoAdapter)?;

        let (device, queue): (wgpu::Device, wgpu::Queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Keyframe Reduce GPU"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                ..Default::default()
            })
            .await?;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Line Error Shader"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let bind_group_layout = create_line_error_bind_group_layout(&device);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Line Error Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            ..Default::default()
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Line Error Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        log::debug!("GPU backend ready on {:?}", adapter.get_info().name);

        Ok(Self {
            device,
            queue,
            pipeline,
            bind_group_layout,
        })
    }

    /// Blocking constructor for synchronous callers.
    pub fn blocking(shader_dir: Option<&Path>) -> Result<Self, GpuError> {
        pollster::block_on(Self::new(shader_dir))
    }

    /// Compute the full line-error table for `series`.
    fn fill_line(
        &self,
        series: &AnimationSeries,
        indices: &mut [i32],
        values: &mut [f32],
    ) -> Result<(), GpuError> {
        let n_frames = series.n_frames();
        let table_size = (n_frames * n_frames * std::mem::size_of::<f32>()) as u64;
        let limits = self.device.limits();
        let limit = u64::from(limits.max_storage_buffer_binding_size).min(limits.max_buffer_size);
        if table_size > limit {
            return Err(GpuError::TableTooLarge {
                n_frames,
                bytes: table_size,
                limit,
            });
        }

        let params = LineErrorParams {
            n_frames: n_frames as u32,
            n_dims: series.n_dims() as u32,
            _pad0: 0,
            _pad1: 0,
        };
        let params_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Line Error Params"),
            size: std::mem::size_of::<LineErrorParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.queue
            .write_buffer(&params_buffer, 0, bytemuck::bytes_of(&params));

        let series_data = series.as_flat();
        let series_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Series Buffer"),
            size: std::mem::size_of_val(series_data) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.queue
            .write_buffer(&series_buffer, 0, bytemuck::cast_slice(series_data));

        let values_buffer = self.create_output_buffer("Values Buffer", table_size);
        let indices_buffer = self.create_output_buffer("Indices Buffer", table_size);
        let values_staging = self.create_staging_buffer("Values Staging Buffer", table_size);
        let indices_staging = self.create_staging_buffer("Indices Staging Buffer", table_size);

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Line Error Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: series_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: values_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: indices_buffer.as_entire_binding(),
                },
            ],
        });

        let workgroups = (n_frames as u32).div_ceil(WORKGROUP_SIZE);
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Line Error Encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Line Error Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(workgroups, workgroups, 1);
        }
        encoder.copy_buffer_to_buffer(&values_buffer, 0, &values_staging, 0, table_size);
        encoder.copy_buffer_to_buffer(&indices_buffer, 0, &indices_staging, 0, table_size);
        self.queue.submit(std::iter::once(encoder.finish()));

        self.read_back(&values_staging, values)?;
        self.read_back(&indices_staging, indices)?;
        Ok(())
    }

    fn create_output_buffer(&self, label: &str, size: u64) -> wgpu::Buffer {
        self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        })
    }

    fn create_staging_buffer(&self, label: &str, size: u64) -> wgpu::Buffer {
        self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Synchronous readback of a staging buffer into `out`.
    fn read_back<T: bytemuck::Pod>(&self, staging: &wgpu::Buffer, out: &mut [T]) -> Result<(), GpuError> {
        let buffer_slice = staging.slice(..);

        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });

        self.device.poll(wgpu::PollType::wait_indefinitely()).ok();
        rx.recv().map_err(|_| GpuError::ReadbackClosed)??;

        {
            let data = buffer_slice.get_mapped_range();
            out.copy_from_slice(bytemuck::cast_slice(&data));
        }

        staging.unmap();
        Ok(())
    }
}

impl PairwiseErrorBackend for GpuBackend {
    fn name(&self) -> &'static str {
        "gpu"
    }

    fn fill(
        &self,
        series: &AnimationSeries,
        metric: ErrorMetric,
        indices: &mut [i32],
        values: &mut [f32],
    ) -> Result<(), SelectionError> {
        match metric {
            ErrorMetric::Line => {
                let start = Instant::now();
                self.fill_line(series, indices, values)?;
                log::debug!(
                    "GPU line table for {} frames in {:.2?}",
                    series.n_frames(),
                    start.elapsed()
                );
                Ok(())
            }
            ErrorMetric::Curve => {
                log::warn!("Curve error has no GPU kernel, falling back to CPU backend");
                CpuBackend.fill(series, metric, indices, values)
            }
        }
    }
}

fn create_line_error_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Line Error Bind Group Layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: false },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 3,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: false },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
    })
}
