//! wgpu GPU backend implementation.
//!
//! wgpu reports invalid descriptors through its own error handling rather
//! than a null return. To keep the [`GpuBackend`] contract, descriptors are
//! checked against the device limits (and WGSL is parsed with naga) before
//! anything reaches wgpu; a rejected descriptor records
//! [`last_error`](GpuBackend::last_error) and yields `None`.

mod conversion;
mod resources;

use std::time::Duration;

use mosaic_core::Rect;
use parking_lot::Mutex;

use crate::error::GraphicsError;
use crate::parameters::ContextParameters;
use crate::types::{
    BufferDescriptor, ComputePipelineDescriptor, GraphicsPipelineDescriptor, SamplerDescriptor,
    ShaderDescriptor, TextureDescriptor, TextureTransferInfo, TransferBufferDescriptor,
};

use super::{
    DeviceLimits, GpuBackend, GpuBuffer, GpuComputePipeline, GpuGraphicsPipeline, GpuSampler,
    GpuShader, GpuTexture, GpuTransferBuffer,
};

/// wgpu-based GPU backend.
pub struct WgpuBackend {
    #[allow(dead_code)]
    instance: wgpu::Instance,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    last_error: Mutex<String>,
}

impl std::fmt::Debug for WgpuBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuBackend")
            .field("adapter", &self.adapter.get_info().name)
            .finish()
    }
}

impl WgpuBackend {
    /// Create a new wgpu backend.
    pub fn new(params: &ContextParameters) -> Result<Self, GraphicsError> {
        let mut flags = wgpu::InstanceFlags::default();
        if params.validation {
            flags |= wgpu::InstanceFlags::VALIDATION;
            flags |= wgpu::InstanceFlags::DEBUG;
        }

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags,
            backend_options: wgpu::BackendOptions::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| {
            GraphicsError::InitializationFailed(format!("No compatible GPU adapter: {e}"))
        })?;

        log::info!("wgpu adapter: {:?}", adapter.get_info());

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some(params.label.as_str()),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::default(),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| GraphicsError::InitializationFailed(format!("Device creation failed: {e}")))?;

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            last_error: Mutex::new(String::new()),
        })
    }

    /// Get the wgpu device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Get the wgpu queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Record a creation failure.
    fn fail<T>(&self, message: impl Into<String>) -> Option<T> {
        let message = message.into();
        log::debug!("WgpuBackend: {message}");
        *self.last_error.lock() = message;
        None
    }
}

impl GpuBackend for WgpuBackend {
    fn name(&self) -> &'static str {
        "wgpu Backend"
    }

    fn limits(&self) -> DeviceLimits {
        let limits = self.device.limits();
        DeviceLimits {
            max_texture_dimension_2d: limits.max_texture_dimension_2d,
            max_buffer_size: limits.max_buffer_size,
        }
    }

    fn last_error(&self) -> String {
        self.last_error.lock().clone()
    }

    fn copy_row_alignment(&self) -> u32 {
        wgpu::COPY_BYTES_PER_ROW_ALIGNMENT
    }

    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Option<GpuSampler> {
        self.create_sampler_checked(descriptor)
    }

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Option<GpuTexture> {
        self.create_texture_checked(descriptor)
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Option<GpuBuffer> {
        self.create_buffer_checked(descriptor)
    }

    fn create_shader(&self, descriptor: &ShaderDescriptor) -> Option<GpuShader> {
        self.create_shader_checked(descriptor)
    }

    fn create_graphics_pipeline(
        &self,
        descriptor: &GraphicsPipelineDescriptor<'_>,
    ) -> Option<GpuGraphicsPipeline> {
        self.create_graphics_pipeline_checked(descriptor)
    }

    fn create_compute_pipeline(
        &self,
        descriptor: &ComputePipelineDescriptor<'_>,
    ) -> Option<GpuComputePipeline> {
        self.create_compute_pipeline_checked(descriptor)
    }

    fn create_transfer_buffer(
        &self,
        descriptor: &TransferBufferDescriptor,
    ) -> Option<GpuTransferBuffer> {
        self.create_transfer_buffer_checked(descriptor)
    }

    fn release_sampler(&self, sampler: GpuSampler) {
        match sampler {
            GpuSampler::Wgpu(sampler) => drop(sampler),
            other => log::warn!("WgpuBackend: cannot release foreign sampler {other:?}"),
        }
    }

    fn release_texture(&self, texture: GpuTexture) {
        match texture {
            GpuTexture::Wgpu { texture, view } => {
                drop(view);
                texture.destroy();
            }
            other => log::warn!("WgpuBackend: cannot release foreign texture {other:?}"),
        }
    }

    fn release_buffer(&self, buffer: GpuBuffer) {
        match buffer {
            GpuBuffer::Wgpu(buffer) => buffer.destroy(),
            other => log::warn!("WgpuBackend: cannot release foreign buffer {other:?}"),
        }
    }

    fn release_shader(&self, shader: GpuShader) {
        match shader {
            GpuShader::Wgpu { module, .. } => drop(module),
            other => log::warn!("WgpuBackend: cannot release foreign shader {other:?}"),
        }
    }

    fn release_graphics_pipeline(&self, pipeline: GpuGraphicsPipeline) {
        match pipeline {
            GpuGraphicsPipeline::Wgpu(pipeline) => drop(pipeline),
            other => log::warn!("WgpuBackend: cannot release foreign pipeline {other:?}"),
        }
    }

    fn release_compute_pipeline(&self, pipeline: GpuComputePipeline) {
        match pipeline {
            GpuComputePipeline::Wgpu(pipeline) => drop(pipeline),
            other => log::warn!("WgpuBackend: cannot release foreign pipeline {other:?}"),
        }
    }

    fn release_transfer_buffer(&self, buffer: GpuTransferBuffer) {
        match buffer {
            GpuTransferBuffer::Wgpu(buffer) => buffer.destroy(),
            other => log::warn!("WgpuBackend: cannot release foreign transfer buffer {other:?}"),
        }
    }

    fn write_transfer_buffer(
        &self,
        buffer: &GpuTransferBuffer,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GraphicsError> {
        let GpuTransferBuffer::Wgpu(buffer) = buffer else {
            return Err(GraphicsError::InvalidParameter(
                "transfer buffer belongs to another backend".into(),
            ));
        };
        if offset % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "transfer buffer offset {offset} is not 4-byte aligned"
            )));
        }
        let padded_len = (data.len() as u64).next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
        if offset + padded_len > buffer.size() {
            return Err(GraphicsError::InvalidParameter(format!(
                "write of {} bytes at offset {offset} overruns a {} byte transfer buffer",
                data.len(),
                buffer.size()
            )));
        }
        if padded_len == data.len() as u64 {
            self.queue.write_buffer(buffer, offset, data);
        } else {
            let mut padded = data.to_vec();
            padded.resize(padded_len as usize, 0);
            self.queue.write_buffer(buffer, offset, &padded);
        }
        Ok(())
    }

    fn upload_to_texture(
        &self,
        source: &GpuTransferBuffer,
        layout: TextureTransferInfo,
        destination: &GpuTexture,
        region: Rect,
    ) -> Result<(), GraphicsError> {
        let (GpuTransferBuffer::Wgpu(buffer), GpuTexture::Wgpu { texture, .. }) =
            (source, destination)
        else {
            return Err(GraphicsError::InvalidParameter(
                "upload handles belong to another backend".into(),
            ));
        };
        let bounds = Rect::from_size(texture.width(), texture.height());
        if !bounds.contains_rect(&region) {
            return Err(GraphicsError::InvalidParameter(format!(
                "region {region:?} is outside the {}x{} texture",
                bounds.width, bounds.height
            )));
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Mosaic Upload Encoder"),
            });
        encoder.copy_buffer_to_texture(
            wgpu::TexelCopyBufferInfo {
                buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: layout.offset,
                    bytes_per_row: Some(layout.bytes_per_row),
                    rows_per_image: None,
                },
            },
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: region.x,
                    y: region.y,
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::Extent3d {
                width: region.width,
                height: region.height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn wait_idle(&self) -> Result<(), GraphicsError> {
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map(|_| ())
            .map_err(|e| GraphicsError::Internal(format!("device poll failed: {e}")))
    }

    fn wait_idle_timeout(&self, timeout: Duration) -> bool {
        match self.device.poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: Some(timeout),
        }) {
            Ok(status) => status.is_queue_empty(),
            Err(e) => {
                log::debug!("WgpuBackend: bounded poll ended: {e}");
                false
            }
        }
    }

    fn destroy_device(&self) {
        log::info!("WgpuBackend: destroying device");
        self.device.destroy();
    }
}
