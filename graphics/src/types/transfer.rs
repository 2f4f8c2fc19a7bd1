//! Transfer buffer types and copy layouts.

/// Direction of a transfer buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransferBufferUsage {
    /// CPU writes, GPU reads.
    #[default]
    Upload,
    /// GPU writes, CPU reads.
    Download,
}

/// Descriptor for creating a transfer (staging) buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TransferBufferDescriptor {
    /// Debug label for the buffer.
    pub label: Option<String>,
    /// Size in bytes.
    pub size: u64,
    /// Transfer direction.
    pub usage: TransferBufferUsage,
}

impl TransferBufferDescriptor {
    /// Create an upload buffer descriptor.
    pub fn upload(size: u64) -> Self {
        Self {
            label: None,
            size,
            usage: TransferBufferUsage::Upload,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Layout of pixel rows inside a transfer buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureTransferInfo {
    /// Byte offset of the first row.
    pub offset: u64,
    /// Distance in bytes between the starts of two rows.
    pub bytes_per_row: u32,
}
