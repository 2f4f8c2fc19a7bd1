//! GPU backend abstraction layer.
//!
//! Each backend implements the [`GpuBackend`] trait, which mirrors a native
//! GPU API: creation functions hand back a raw handle or nothing (with the
//! reason available from [`GpuBackend::last_error`]), and every raw handle has
//! a matching release function.
//!
//! # Available Backends
//!
//! - [`DummyBackend`](dummy::DummyBackend): CPU-side simulation used for tests
//! - `wgpu-backend`: Cross-platform backend using wgpu
//!
//! Raw handles are plain values. Ownership and release ordering are handled by
//! [`ResourceHandle`](crate::ResourceHandle) and the
//! [`DeviceContext`](crate::DeviceContext).

pub mod dummy;

#[cfg(feature = "wgpu-backend")]
pub mod wgpu_impl;

use std::fmt;
use std::time::Duration;

use mosaic_core::Rect;

use crate::error::GraphicsError;
use crate::parameters::{BackendType, ContextParameters};
use crate::types::{
    BufferDescriptor, ComputePipelineDescriptor, GraphicsPipelineDescriptor, SamplerDescriptor,
    ShaderDescriptor, TextureDescriptor, TextureTransferInfo, TransferBufferDescriptor,
};

use dummy::DummyId;

/// Handle to a GPU sampler.
#[derive(Debug)]
pub enum GpuSampler {
    /// Dummy backend sampler.
    Dummy(DummyId),
    /// wgpu backend sampler.
    #[cfg(feature = "wgpu-backend")]
    Wgpu(wgpu::Sampler),
}

/// Handle to a GPU texture.
#[derive(Debug)]
pub enum GpuTexture {
    /// Dummy backend texture.
    Dummy(DummyId),
    /// wgpu backend texture.
    #[cfg(feature = "wgpu-backend")]
    Wgpu {
        texture: wgpu::Texture,
        view: wgpu::TextureView,
    },
}

/// Handle to a GPU buffer.
#[derive(Debug)]
pub enum GpuBuffer {
    /// Dummy backend buffer.
    Dummy(DummyId),
    /// wgpu backend buffer.
    #[cfg(feature = "wgpu-backend")]
    Wgpu(wgpu::Buffer),
}

/// Handle to a compiled shader module.
#[derive(Debug)]
pub enum GpuShader {
    /// Dummy backend shader.
    Dummy(DummyId),
    /// wgpu backend shader module.
    #[cfg(feature = "wgpu-backend")]
    Wgpu {
        module: wgpu::ShaderModule,
        stage: crate::types::ShaderStage,
        entry_point: String,
    },
}

/// Handle to a graphics pipeline.
#[derive(Debug)]
pub enum GpuGraphicsPipeline {
    /// Dummy backend pipeline.
    Dummy(DummyId),
    /// wgpu backend render pipeline.
    #[cfg(feature = "wgpu-backend")]
    Wgpu(wgpu::RenderPipeline),
}

/// Handle to a compute pipeline.
#[derive(Debug)]
pub enum GpuComputePipeline {
    /// Dummy backend pipeline.
    Dummy(DummyId),
    /// wgpu backend compute pipeline.
    #[cfg(feature = "wgpu-backend")]
    Wgpu(wgpu::ComputePipeline),
}

/// Handle to a CPU-visible staging buffer.
#[derive(Debug)]
pub enum GpuTransferBuffer {
    /// Dummy backend transfer buffer.
    Dummy(DummyId),
    /// wgpu backend staging buffer.
    #[cfg(feature = "wgpu-backend")]
    Wgpu(wgpu::Buffer),
}

macro_rules! dummy_id_accessor {
    ($($raw:ident),* $(,)?) => {
        $(
            impl $raw {
                /// The dummy backend id, if this handle came from the dummy backend.
                pub fn dummy_id(&self) -> Option<DummyId> {
                    match self {
                        Self::Dummy(id) => Some(*id),
                        #[cfg(feature = "wgpu-backend")]
                        _ => None,
                    }
                }
            }
        )*
    };
}

dummy_id_accessor!(
    GpuSampler,
    GpuTexture,
    GpuBuffer,
    GpuShader,
    GpuGraphicsPipeline,
    GpuComputePipeline,
    GpuTransferBuffer,
);

/// Resource limits reported by a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceLimits {
    /// Largest width or height of a 2D texture.
    pub max_texture_dimension_2d: u32,
    /// Largest buffer size in bytes.
    pub max_buffer_size: u64,
}

impl Default for DeviceLimits {
    fn default() -> Self {
        Self {
            max_texture_dimension_2d: 8192,
            max_buffer_size: 256 << 20,
        }
    }
}

/// GPU backend trait for abstracting different GPU APIs.
///
/// Creation functions return `None` on failure and record a message that
/// [`last_error`](GpuBackend::last_error) returns until the next failure.
/// Release functions must only be called once the device no longer uses the
/// resource; [`DeviceContext::flush`](crate::DeviceContext::flush) guarantees
/// this.
pub trait GpuBackend: Send + Sync + 'static {
    /// Get the backend name.
    fn name(&self) -> &'static str;

    /// Limits of the underlying device.
    fn limits(&self) -> DeviceLimits;

    /// Message describing the most recent failure.
    fn last_error(&self) -> String;

    /// Required alignment of `bytes_per_row` for buffer-to-texture copies.
    fn copy_row_alignment(&self) -> u32 {
        1
    }

    /// Create a sampler.
    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Option<GpuSampler>;

    /// Create a texture.
    fn create_texture(&self, descriptor: &TextureDescriptor) -> Option<GpuTexture>;

    /// Create a buffer.
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Option<GpuBuffer>;

    /// Compile a shader module.
    fn create_shader(&self, descriptor: &ShaderDescriptor) -> Option<GpuShader>;

    /// Create a graphics pipeline.
    fn create_graphics_pipeline(
        &self,
        descriptor: &GraphicsPipelineDescriptor<'_>,
    ) -> Option<GpuGraphicsPipeline>;

    /// Create a compute pipeline.
    fn create_compute_pipeline(
        &self,
        descriptor: &ComputePipelineDescriptor<'_>,
    ) -> Option<GpuComputePipeline>;

    /// Create a transfer buffer.
    fn create_transfer_buffer(
        &self,
        descriptor: &TransferBufferDescriptor,
    ) -> Option<GpuTransferBuffer>;

    /// Release a sampler.
    fn release_sampler(&self, sampler: GpuSampler);

    /// Release a texture.
    fn release_texture(&self, texture: GpuTexture);

    /// Release a buffer.
    fn release_buffer(&self, buffer: GpuBuffer);

    /// Release a shader module.
    fn release_shader(&self, shader: GpuShader);

    /// Release a graphics pipeline.
    fn release_graphics_pipeline(&self, pipeline: GpuGraphicsPipeline);

    /// Release a compute pipeline.
    fn release_compute_pipeline(&self, pipeline: GpuComputePipeline);

    /// Release a transfer buffer.
    fn release_transfer_buffer(&self, buffer: GpuTransferBuffer);

    /// Copy bytes into a transfer buffer.
    fn write_transfer_buffer(
        &self,
        buffer: &GpuTransferBuffer,
        offset: u64,
        data: &[u8],
    ) -> Result<(), GraphicsError>;

    /// Record and submit a copy from a transfer buffer into a texture region.
    fn upload_to_texture(
        &self,
        source: &GpuTransferBuffer,
        layout: TextureTransferInfo,
        destination: &GpuTexture,
        region: Rect,
    ) -> Result<(), GraphicsError>;

    /// Block until all submitted work has completed.
    fn wait_idle(&self) -> Result<(), GraphicsError>;

    /// Wait up to `timeout` for submitted work; returns whether the device is idle.
    fn wait_idle_timeout(&self, timeout: Duration) -> bool;

    /// Destroy the underlying device. No further calls are made afterwards.
    fn destroy_device(&self);
}

impl fmt::Debug for dyn GpuBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuBackend")
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}

/// Select and create a backend for the given parameters.
pub fn create_backend(params: &ContextParameters) -> Result<Box<dyn GpuBackend>, GraphicsError> {
    match params.backend {
        BackendType::Dummy => {
            log::info!("Using dummy backend");
            Ok(Box::new(dummy::DummyBackend::with_limits(params.limits)))
        }
        BackendType::Wgpu => create_wgpu_backend(params),
        BackendType::Auto => match create_wgpu_backend(params) {
            Ok(backend) => Ok(backend),
            Err(e) => {
                log::warn!("Failed to create wgpu backend: {e}");
                log::info!("Using dummy backend");
                Ok(Box::new(dummy::DummyBackend::with_limits(params.limits)))
            }
        },
    }
}

#[cfg(feature = "wgpu-backend")]
fn create_wgpu_backend(params: &ContextParameters) -> Result<Box<dyn GpuBackend>, GraphicsError> {
    let backend = wgpu_impl::WgpuBackend::new(params)?;
    log::info!("Using wgpu backend");
    Ok(Box::new(backend))
}

#[cfg(not(feature = "wgpu-backend"))]
fn create_wgpu_backend(_params: &ContextParameters) -> Result<Box<dyn GpuBackend>, GraphicsError> {
    Err(GraphicsError::InitializationFailed(
        "built without the `wgpu-backend` feature".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_dummy_backend() {
        let params = ContextParameters::new().with_backend(BackendType::Dummy);
        let backend = create_backend(&params).unwrap();
        assert_eq!(backend.name(), "Dummy Backend");
        assert_eq!(backend.limits(), DeviceLimits::default());
    }

    #[cfg(not(feature = "wgpu-backend"))]
    #[test]
    fn test_wgpu_requires_feature() {
        let params = ContextParameters::new().with_backend(BackendType::Wgpu);
        let err = create_backend(&params).unwrap_err();
        assert!(matches!(err, GraphicsError::InitializationFailed(_)));
    }

    #[cfg(not(feature = "wgpu-backend"))]
    #[test]
    fn test_auto_falls_back_to_dummy() {
        let backend = create_backend(&ContextParameters::new()).unwrap();
        assert_eq!(backend.name(), "Dummy Backend");
    }
}
