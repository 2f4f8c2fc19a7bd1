//! # Mosaic Graphics
//!
//! GPU side of Mosaic: texture atlases and ownership of device resources.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`DeviceContext`] - Owns a GPU device and creates resources on it
//! - [`ResourceHandle`] - Move-only owner of one GPU object
//! - [`DeferredReleaseQueue`] - Releases objects only after the device is idle
//! - [`TextureAtlas`] - Packs small images into one sampled texture
//! - [`GpuBackend`] - Trait for backend implementations (dummy and wgpu)
//!
//! ## Example
//!
//! ```
//! use mosaic_core::CpuImage;
//! use mosaic_graphics::{BackendType, ContextParameters, DeviceContext, TextureAtlas};
//!
//! let context = DeviceContext::with_parameters(
//!     ContextParameters::new().with_backend(BackendType::Dummy),
//! )
//! .unwrap();
//!
//! let mut atlas = TextureAtlas::new(&context, 256, 256).unwrap();
//! let icon = CpuImage::solid(16, 16, [255, 0, 0, 255]);
//! let placed = atlas.add(&icon, 1).unwrap();
//! assert!(placed.is_some());
//!
//! // Staging buffers used by the uploads are released here.
//! context.flush().unwrap();
//! ```

pub mod atlas;
pub mod backend;
pub mod deferred;
pub mod device;
pub mod error;
pub mod parameters;
pub mod resources;
pub mod types;
pub mod upload;

// Re-export main types for convenience
pub use atlas::{DEFAULT_ATLAS_SIZE, TextureAtlas};
pub use backend::dummy::{DummyBackend, DummyEvent, DummyId, DummyProbe};
pub use backend::{
    DeviceLimits, GpuBackend, GpuBuffer, GpuComputePipeline, GpuGraphicsPipeline, GpuSampler,
    GpuShader, GpuTexture, GpuTransferBuffer,
};
pub use deferred::DeferredReleaseQueue;
pub use device::DeviceContext;
pub use error::GraphicsError;
pub use parameters::{BackendType, ContextParameters};
pub use resources::{
    Buffer, ComputePipeline, DeviceResource, GraphicsPipeline, ResourceHandle, ResourceKind,
    Sampler, Shader, Texture, TransferBuffer,
};
pub use types::{
    AddressMode, BlendMode, BufferDescriptor, BufferUsage, ComputePipelineDescriptor, FilterMode,
    GraphicsPipelineDescriptor, PrimitiveTopology, SamplerDescriptor, ShaderDescriptor,
    ShaderFormat, ShaderStage, TextureDescriptor, TextureFormat, TextureTransferInfo,
    TextureUsage, TransferBufferDescriptor, TransferBufferUsage,
};
pub use upload::upload_texture;

#[cfg(feature = "wgpu-backend")]
pub use backend::wgpu_impl::WgpuBackend;

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the graphics library version.
pub fn init() {
    log::info!("Mosaic Graphics v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_dummy_backend() {
        let backend = DummyBackend::new();
        assert_eq!(backend.name(), "Dummy Backend");
    }
}
