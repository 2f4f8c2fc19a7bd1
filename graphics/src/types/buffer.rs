//! Device-local buffer descriptors.

use bitflags::bitflags;

bitflags! {
    /// How shaders and copies may access a device buffer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        const COPY_SRC = 1 << 0;
        const COPY_DST = 1 << 1;
        /// Bound as a uniform block.
        const UNIFORM = 1 << 2;
        /// Bound as read/write shader storage.
        const STORAGE = 1 << 3;
    }
}

/// Descriptor for a buffer that lives in device memory.
///
/// CPU data reaches it through a transfer buffer; see
/// [`TransferBufferDescriptor`](super::TransferBufferDescriptor).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BufferDescriptor {
    pub label: Option<String>,
    /// Size in bytes. Must be non-zero.
    pub size: u64,
    pub usage: BufferUsage,
}

impl BufferDescriptor {
    /// Shader storage that copies can fill.
    pub fn storage(size: u64) -> Self {
        Self {
            label: None,
            size,
            usage: BufferUsage::STORAGE | BufferUsage::COPY_DST,
        }
    }

    /// A uniform block that copies can fill.
    pub fn uniform(size: u64) -> Self {
        Self {
            label: None,
            size,
            usage: BufferUsage::UNIFORM | BufferUsage::COPY_DST,
        }
    }

    pub fn with_usage(mut self, usage: BufferUsage) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_presets() {
        let storage = BufferDescriptor::storage(64).with_label("particles");
        assert_eq!(storage.usage, BufferUsage::STORAGE | BufferUsage::COPY_DST);
        assert_eq!(storage.label.as_deref(), Some("particles"));

        let readback = BufferDescriptor::uniform(16).with_usage(BufferUsage::COPY_SRC);
        assert_eq!(readback.size, 16);
        assert_eq!(readback.usage, BufferUsage::COPY_SRC);
    }
}
