//! Common types and descriptors for graphics resources.
//!
//! This module contains format enums, usage flags, and descriptor structs
//! used throughout the graphics system.

mod buffer;
mod pipeline;
mod sampler;
mod shader;
mod texture;
mod transfer;

pub use buffer::{BufferDescriptor, BufferUsage};
pub use pipeline::{
    BlendMode, ComputePipelineDescriptor, GraphicsPipelineDescriptor, PrimitiveTopology,
};
pub use sampler::{AddressMode, FilterMode, SamplerDescriptor};
pub use shader::{ShaderDescriptor, ShaderFormat, ShaderStage};
pub use texture::{TextureDescriptor, TextureFormat, TextureUsage};
pub use transfer::{TextureTransferInfo, TransferBufferDescriptor, TransferBufferUsage};
