//! GPU resources.
//!
//! Every resource created by a [`DeviceContext`] is owned by exactly one
//! [`ResourceHandle`]. Handles are move-only; dropping or resetting one hands
//! the raw object to the context's deferred release queue, and the object is
//! released on the next [`DeviceContext::flush`].
//!
//! [`DeviceContext`]: crate::DeviceContext
//! [`DeviceContext::flush`]: crate::DeviceContext::flush

mod handle;

use std::fmt;

pub use handle::{DeviceResource, ResourceHandle};

use crate::backend::{
    GpuBuffer, GpuComputePipeline, GpuGraphicsPipeline, GpuSampler, GpuShader, GpuTexture,
    GpuTransferBuffer,
};

/// The kinds of GPU objects a backend can create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Sampler,
    Texture,
    Buffer,
    Shader,
    GraphicsPipeline,
    ComputePipeline,
    TransferBuffer,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sampler => "sampler",
            Self::Texture => "texture",
            Self::Buffer => "buffer",
            Self::Shader => "shader",
            Self::GraphicsPipeline => "graphics pipeline",
            Self::ComputePipeline => "compute pipeline",
            Self::TransferBuffer => "transfer buffer",
        })
    }
}

/// An owned sampler.
pub type Sampler = ResourceHandle<GpuSampler>;
/// An owned texture.
pub type Texture = ResourceHandle<GpuTexture>;
/// An owned buffer.
pub type Buffer = ResourceHandle<GpuBuffer>;
/// An owned shader module.
pub type Shader = ResourceHandle<GpuShader>;
/// An owned graphics pipeline.
pub type GraphicsPipeline = ResourceHandle<GpuGraphicsPipeline>;
/// An owned compute pipeline.
pub type ComputePipeline = ResourceHandle<GpuComputePipeline>;
/// An owned transfer buffer.
pub type TransferBuffer = ResourceHandle<GpuTransferBuffer>;
