//! Shader types and descriptors.

/// Pipeline stage a shader module is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex stage.
    Vertex,
    /// Fragment stage.
    Fragment,
    /// Compute stage.
    Compute,
}

/// Encoding of the shader code blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShaderFormat {
    /// WGSL source text.
    #[default]
    Wgsl,
    /// SPIR-V binary.
    SpirV,
}

/// Descriptor for creating a shader module.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderDescriptor {
    /// Debug label for the shader.
    pub label: Option<String>,
    /// Stage the module is used for.
    pub stage: ShaderStage,
    /// Code encoding.
    pub format: ShaderFormat,
    /// Shader code.
    pub code: Vec<u8>,
    /// Entry point function name.
    pub entry_point: String,
}

impl ShaderDescriptor {
    /// Create a descriptor from WGSL source.
    pub fn wgsl(stage: ShaderStage, source: &str, entry_point: impl Into<String>) -> Self {
        Self {
            label: None,
            stage,
            format: ShaderFormat::Wgsl,
            code: source.as_bytes().to_vec(),
            entry_point: entry_point.into(),
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}
