//! Pipeline descriptors.
//!
//! Pipelines reference shader handles; both must be created on the same
//! [`DeviceContext`](crate::DeviceContext).

use super::TextureFormat;
use crate::resources::Shader;

/// How vertices are assembled into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    /// Each vertex is a point.
    PointList,
    /// Every two vertices form a line.
    LineList,
    /// Every three vertices form a triangle.
    #[default]
    TriangleList,
    /// Each vertex after the first two forms a triangle.
    TriangleStrip,
}

/// Color blending applied to every color target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// Overwrite the destination.
    #[default]
    Replace,
    /// Standard alpha blending.
    Alpha,
}

/// Descriptor for creating a graphics pipeline.
#[derive(Debug)]
pub struct GraphicsPipelineDescriptor<'a> {
    /// Debug label for the pipeline.
    pub label: Option<String>,
    /// Vertex stage shader.
    pub vertex_shader: &'a Shader,
    /// Optional fragment stage shader.
    pub fragment_shader: Option<&'a Shader>,
    /// Formats of the color targets.
    pub color_formats: Vec<TextureFormat>,
    /// Format of the depth target, if any.
    pub depth_format: Option<TextureFormat>,
    /// Primitive topology.
    pub topology: PrimitiveTopology,
    /// Blend mode for color targets.
    pub blend: BlendMode,
}

impl<'a> GraphicsPipelineDescriptor<'a> {
    /// Create a descriptor rendering into a single color target.
    pub fn new(
        vertex_shader: &'a Shader,
        fragment_shader: &'a Shader,
        color: TextureFormat,
    ) -> Self {
        Self {
            label: None,
            vertex_shader,
            fragment_shader: Some(fragment_shader),
            color_formats: vec![color],
            depth_format: None,
            topology: PrimitiveTopology::default(),
            blend: BlendMode::default(),
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the depth target format.
    pub fn with_depth(mut self, format: TextureFormat) -> Self {
        self.depth_format = Some(format);
        self
    }

    /// Set the blend mode.
    pub fn with_blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }
}

/// Descriptor for creating a compute pipeline.
#[derive(Debug)]
pub struct ComputePipelineDescriptor<'a> {
    /// Debug label for the pipeline.
    pub label: Option<String>,
    /// Compute stage shader.
    pub shader: &'a Shader,
}

impl<'a> ComputePipelineDescriptor<'a> {
    /// Create a compute pipeline descriptor.
    pub fn new(shader: &'a Shader) -> Self {
        Self {
            label: None,
            shader,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}
