//! Sampler descriptors.

/// Texel filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    #[default]
    Nearest,
    Linear,
}

/// What happens to coordinates outside `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    /// Clamp to the edge texel.
    #[default]
    ClampToEdge,
    Repeat,
}

/// Descriptor for creating a sampler.
///
/// The same address mode applies on every axis, and `filter` is used for
/// both magnification and minification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SamplerDescriptor {
    pub label: Option<String>,
    pub address_mode: AddressMode,
    pub filter: FilterMode,
    pub mipmap_filter: FilterMode,
}

impl SamplerDescriptor {
    /// Bilinear filtering with linear mip blending.
    pub fn linear() -> Self {
        Self {
            filter: FilterMode::Linear,
            mipmap_filter: FilterMode::Linear,
            ..Default::default()
        }
    }

    /// Point sampling.
    pub fn nearest() -> Self {
        Self::default()
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_address_mode(mut self, mode: AddressMode) -> Self {
        self.address_mode = mode;
        self
    }
}
