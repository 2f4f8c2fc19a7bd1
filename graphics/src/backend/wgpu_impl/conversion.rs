//! Type conversions between Mosaic types and wgpu types.

use crate::types::{
    AddressMode, BlendMode, BufferUsage, FilterMode, PrimitiveTopology, ShaderStage,
    TextureFormat, TextureUsage, TransferBufferUsage,
};

/// Convert BufferUsage flags to wgpu buffer usages.
pub fn convert_buffer_usage(usage: BufferUsage) -> wgpu::BufferUsages {
    [
        (BufferUsage::COPY_SRC, wgpu::BufferUsages::COPY_SRC),
        (BufferUsage::COPY_DST, wgpu::BufferUsages::COPY_DST),
        (BufferUsage::UNIFORM, wgpu::BufferUsages::UNIFORM),
        (BufferUsage::STORAGE, wgpu::BufferUsages::STORAGE),
    ]
    .into_iter()
    .filter(|(flag, _)| usage.contains(*flag))
    .fold(wgpu::BufferUsages::empty(), |acc, (_, wgpu_flag)| acc | wgpu_flag)
}

/// Usages of a staging buffer for the given transfer direction.
pub fn convert_transfer_usage(usage: TransferBufferUsage) -> wgpu::BufferUsages {
    match usage {
        TransferBufferUsage::Upload => wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST,
        TransferBufferUsage::Download => {
            wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ
        }
    }
}

/// Convert TextureFormat to wgpu format.
pub fn convert_texture_format(format: TextureFormat) -> wgpu::TextureFormat {
    match format {
        TextureFormat::R8Unorm => wgpu::TextureFormat::R8Unorm,
        TextureFormat::Rg8Unorm => wgpu::TextureFormat::Rg8Unorm,
        TextureFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        TextureFormat::Rgba8UnormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
        TextureFormat::Bgra8Unorm => wgpu::TextureFormat::Bgra8Unorm,
        TextureFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
        TextureFormat::Depth32Float => wgpu::TextureFormat::Depth32Float,
    }
}

/// Convert TextureUsage flags to wgpu texture usages.
pub fn convert_texture_usage(usage: TextureUsage) -> wgpu::TextureUsages {
    let mut result = wgpu::TextureUsages::empty();

    if usage.contains(TextureUsage::COPY_SRC) {
        result |= wgpu::TextureUsages::COPY_SRC;
    }
    if usage.contains(TextureUsage::COPY_DST) {
        result |= wgpu::TextureUsages::COPY_DST;
    }
    if usage.contains(TextureUsage::SAMPLER) {
        result |= wgpu::TextureUsages::TEXTURE_BINDING;
    }
    if usage.contains(TextureUsage::STORAGE) {
        result |= wgpu::TextureUsages::STORAGE_BINDING;
    }
    if usage.contains(TextureUsage::RENDER_ATTACHMENT) {
        result |= wgpu::TextureUsages::RENDER_ATTACHMENT;
    }

    result
}

/// Convert AddressMode to wgpu address mode.
pub fn convert_address_mode(mode: AddressMode) -> wgpu::AddressMode {
    match mode {
        AddressMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        AddressMode::Repeat => wgpu::AddressMode::Repeat,
    }
}

/// Convert FilterMode to wgpu filter mode.
pub fn convert_filter_mode(mode: FilterMode) -> wgpu::FilterMode {
    match mode {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Linear => wgpu::FilterMode::Linear,
    }
}

/// Convert FilterMode to wgpu mipmap filter mode.
pub fn convert_mipmap_filter_mode(mode: FilterMode) -> wgpu::MipmapFilterMode {
    match mode {
        FilterMode::Nearest => wgpu::MipmapFilterMode::Nearest,
        FilterMode::Linear => wgpu::MipmapFilterMode::Linear,
    }
}

/// Convert PrimitiveTopology to wgpu primitive topology.
pub fn convert_topology(topology: PrimitiveTopology) -> wgpu::PrimitiveTopology {
    match topology {
        PrimitiveTopology::PointList => wgpu::PrimitiveTopology::PointList,
        PrimitiveTopology::LineList => wgpu::PrimitiveTopology::LineList,
        PrimitiveTopology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
        PrimitiveTopology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
    }
}

/// Convert BlendMode to a wgpu blend state.
pub fn convert_blend_mode(blend: BlendMode) -> wgpu::BlendState {
    match blend {
        BlendMode::Replace => wgpu::BlendState::REPLACE,
        BlendMode::Alpha => wgpu::BlendState::ALPHA_BLENDING,
    }
}

/// Convert ShaderStage to the naga stage used for entry point lookup.
pub fn convert_shader_stage(stage: ShaderStage) -> naga::ShaderStage {
    match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
        ShaderStage::Compute => naga::ShaderStage::Compute,
    }
}
