//! Texture types and descriptors.

use bitflags::bitflags;

/// Texture format enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum TextureFormat {
    /// 8-bit red channel, unsigned normalized.
    R8Unorm,
    /// 8-bit RG channels, unsigned normalized.
    Rg8Unorm,
    /// 8-bit RGBA channels, unsigned normalized.
    #[default]
    Rgba8Unorm,
    /// 8-bit RGBA channels, sRGB.
    Rgba8UnormSrgb,
    /// 8-bit BGRA channels, unsigned normalized.
    Bgra8Unorm,
    /// 16-bit RGBA channels, float.
    Rgba16Float,
    /// 32-bit depth, float.
    Depth32Float,
}

impl TextureFormat {
    /// Returns true if this is a depth format.
    pub fn is_depth(&self) -> bool {
        matches!(self, Self::Depth32Float)
    }

    /// Returns the size in bytes per pixel.
    pub fn block_size(&self) -> u32 {
        match self {
            Self::R8Unorm => 1,
            Self::Rg8Unorm => 2,
            Self::Rgba8Unorm | Self::Rgba8UnormSrgb | Self::Bgra8Unorm | Self::Depth32Float => 4,
            Self::Rgba16Float => 8,
        }
    }
}

bitflags! {
    /// Usage flags for textures.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        /// Texture can be copied from.
        const COPY_SRC = 1 << 0;
        /// Texture can be copied to.
        const COPY_DST = 1 << 1;
        /// Texture can be sampled in a shader.
        const SAMPLER = 1 << 2;
        /// Texture can be used as a storage texture.
        const STORAGE = 1 << 3;
        /// Texture can be used as a render attachment.
        const RENDER_ATTACHMENT = 1 << 4;
    }
}

impl Default for TextureUsage {
    fn default() -> Self {
        Self::empty()
    }
}

/// Descriptor for creating a texture.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureDescriptor {
    /// Debug label for the texture.
    pub label: Option<String>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Depth for 3D textures or layer count for arrays.
    pub depth_or_layers: u32,
    /// Mip level count.
    pub mip_level_count: u32,
    /// Texture format.
    pub format: TextureFormat,
    /// Usage flags.
    pub usage: TextureUsage,
}

impl TextureDescriptor {
    /// Create a new 2D texture descriptor.
    pub fn new_2d(width: u32, height: u32, format: TextureFormat, usage: TextureUsage) -> Self {
        Self {
            label: None,
            width,
            height,
            depth_or_layers: 1,
            mip_level_count: 1,
            format,
            usage,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the mip level count.
    pub fn with_mip_levels(mut self, count: u32) -> Self {
        self.mip_level_count = count;
        self
    }

    /// Size in bytes of the base mip level.
    pub fn byte_size(&self) -> u64 {
        self.width as u64
            * self.height as u64
            * self.depth_or_layers as u64
            * self.format.block_size() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_2d() {
        let desc = TextureDescriptor::new_2d(
            64,
            32,
            TextureFormat::Rgba8Unorm,
            TextureUsage::SAMPLER | TextureUsage::COPY_DST,
        )
        .with_label("atlas");
        assert_eq!(desc.depth_or_layers, 1);
        assert_eq!(desc.mip_level_count, 1);
        assert_eq!(desc.byte_size(), 64 * 32 * 4);
        assert_eq!(desc.label.as_deref(), Some("atlas"));
    }

    #[test]
    fn test_block_size() {
        assert_eq!(TextureFormat::R8Unorm.block_size(), 1);
        assert_eq!(TextureFormat::Rgba16Float.block_size(), 8);
        assert!(TextureFormat::Depth32Float.is_depth());
        assert!(!TextureFormat::Bgra8Unorm.is_depth());
    }
}
