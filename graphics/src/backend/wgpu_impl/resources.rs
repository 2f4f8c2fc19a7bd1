//! Resource creation for the wgpu backend.

use crate::types::{
    BufferDescriptor, ComputePipelineDescriptor, GraphicsPipelineDescriptor, SamplerDescriptor,
    ShaderDescriptor, ShaderFormat, ShaderStage, TextureDescriptor, TransferBufferDescriptor,
};

use super::super::{
    GpuBackend, GpuBuffer, GpuComputePipeline, GpuGraphicsPipeline, GpuSampler, GpuShader,
    GpuTexture, GpuTransferBuffer,
};
use super::WgpuBackend;
use super::conversion::{
    convert_address_mode, convert_blend_mode, convert_buffer_usage, convert_filter_mode,
    convert_mipmap_filter_mode, convert_shader_stage, convert_texture_format,
    convert_texture_usage, convert_topology, convert_transfer_usage,
};

impl WgpuBackend {
    pub(super) fn create_sampler_checked(
        &self,
        descriptor: &SamplerDescriptor,
    ) -> Option<GpuSampler> {
        let address_mode = convert_address_mode(descriptor.address_mode);
        let filter = convert_filter_mode(descriptor.filter);
        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: descriptor.label.as_deref(),
            address_mode_u: address_mode,
            address_mode_v: address_mode,
            address_mode_w: address_mode,
            mag_filter: filter,
            min_filter: filter,
            mipmap_filter: convert_mipmap_filter_mode(descriptor.mipmap_filter),
            ..Default::default()
        });

        Some(GpuSampler::Wgpu(sampler))
    }

    pub(super) fn create_texture_checked(
        &self,
        descriptor: &TextureDescriptor,
    ) -> Option<GpuTexture> {
        let (width, height) = (descriptor.width, descriptor.height);
        if width == 0 || height == 0 || descriptor.depth_or_layers == 0 {
            return self.fail(format!(
                "texture size {width}x{height}x{} must be non-zero",
                descriptor.depth_or_layers
            ));
        }
        let limits = self.limits();
        if width > limits.max_texture_dimension_2d || height > limits.max_texture_dimension_2d {
            return self.fail(format!(
                "texture size {width}x{height} exceeds the maximum dimension {}",
                limits.max_texture_dimension_2d
            ));
        }
        if descriptor.mip_level_count == 0 {
            return self.fail("texture mip level count must be at least 1");
        }
        if descriptor.usage.is_empty() {
            return self.fail("texture usage must not be empty");
        }

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: descriptor.label.as_deref(),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: descriptor.depth_or_layers,
            },
            mip_level_count: descriptor.mip_level_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: convert_texture_format(descriptor.format),
            usage: convert_texture_usage(descriptor.usage),
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Some(GpuTexture::Wgpu { texture, view })
    }

    pub(super) fn create_buffer_checked(&self, descriptor: &BufferDescriptor) -> Option<GpuBuffer> {
        self.check_buffer_size("buffer", descriptor.size)?;
        if descriptor.usage.is_empty() {
            return self.fail("buffer usage must not be empty");
        }

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: descriptor.label.as_deref(),
            size: descriptor.size,
            usage: convert_buffer_usage(descriptor.usage),
            mapped_at_creation: false,
        });

        Some(GpuBuffer::Wgpu(buffer))
    }

    pub(super) fn create_transfer_buffer_checked(
        &self,
        descriptor: &TransferBufferDescriptor,
    ) -> Option<GpuTransferBuffer> {
        self.check_buffer_size("transfer buffer", descriptor.size)?;

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: descriptor.label.as_deref(),
            size: descriptor.size.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT),
            usage: convert_transfer_usage(descriptor.usage),
            mapped_at_creation: false,
        });

        Some(GpuTransferBuffer::Wgpu(buffer))
    }

    fn check_buffer_size(&self, what: &str, size: u64) -> Option<()> {
        if size == 0 {
            return self.fail(format!("{what} size must be non-zero"));
        }
        let max = self.limits().max_buffer_size;
        if size > max {
            return self.fail(format!("{what} size {size} exceeds the maximum of {max}"));
        }
        Some(())
    }

    pub(super) fn create_shader_checked(&self, descriptor: &ShaderDescriptor) -> Option<GpuShader> {
        if descriptor.format != ShaderFormat::Wgsl {
            return self.fail(format!(
                "{:?} shaders are not supported by the wgpu backend",
                descriptor.format
            ));
        }
        let Ok(source) = std::str::from_utf8(&descriptor.code) else {
            return self.fail("WGSL source is not valid UTF-8");
        };
        if source.is_empty() {
            return self.fail("shader code is empty");
        }

        let module = match naga::front::wgsl::parse_str(source) {
            Ok(module) => module,
            Err(e) => return self.fail(e.emit_to_string(source)),
        };
        let stage = convert_shader_stage(descriptor.stage);
        if !module
            .entry_points
            .iter()
            .any(|ep| ep.name == descriptor.entry_point && ep.stage == stage)
        {
            return self.fail(format!(
                "no {:?} entry point named {:?}",
                descriptor.stage, descriptor.entry_point
            ));
        }

        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: descriptor.label.as_deref(),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });

        Some(GpuShader::Wgpu {
            module,
            stage: descriptor.stage,
            entry_point: descriptor.entry_point.clone(),
        })
    }

    pub(super) fn create_graphics_pipeline_checked(
        &self,
        descriptor: &GraphicsPipelineDescriptor<'_>,
    ) -> Option<GpuGraphicsPipeline> {
        let Some(GpuShader::Wgpu {
            module: vertex_module,
            stage: ShaderStage::Vertex,
            entry_point: vertex_entry,
        }) = descriptor.vertex_shader.raw()
        else {
            return self.fail("vertex shader is not a live vertex stage module");
        };
        let fragment = match descriptor.fragment_shader.map(|shader| shader.raw()) {
            None => None,
            Some(Some(GpuShader::Wgpu {
                module,
                stage: ShaderStage::Fragment,
                entry_point,
            })) => Some((module, entry_point.as_str())),
            Some(_) => return self.fail("fragment shader is not a live fragment stage module"),
        };
        if descriptor.color_formats.is_empty() && descriptor.depth_format.is_none() {
            return self.fail("pipeline has no render targets");
        }
        if descriptor.color_formats.iter().any(|f| f.is_depth()) {
            return self.fail("depth format used as a color target");
        }
        if let Some(depth) = descriptor.depth_format
            && !depth.is_depth()
        {
            return self.fail(format!("{depth:?} is not a depth format"));
        }

        let blend = convert_blend_mode(descriptor.blend);
        let color_targets: Vec<Option<wgpu::ColorTargetState>> = descriptor
            .color_formats
            .iter()
            .map(|&format| {
                Some(wgpu::ColorTargetState {
                    format: convert_texture_format(format),
                    blend: Some(blend),
                    write_mask: wgpu::ColorWrites::ALL,
                })
            })
            .collect();

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: descriptor.label.as_deref(),
                layout: None,
                vertex: wgpu::VertexState {
                    module: vertex_module,
                    entry_point: Some(vertex_entry.as_str()),
                    buffers: &[],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: fragment.map(|(module, entry_point)| wgpu::FragmentState {
                    module,
                    entry_point: Some(entry_point),
                    targets: &color_targets,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: convert_topology(descriptor.topology),
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: descriptor
                    .depth_format
                    .map(|format| wgpu::DepthStencilState {
                        format: convert_texture_format(format),
                        depth_write_enabled: true,
                        depth_compare: wgpu::CompareFunction::LessEqual,
                        stencil: wgpu::StencilState::default(),
                        bias: wgpu::DepthBiasState::default(),
                    }),
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            });

        Some(GpuGraphicsPipeline::Wgpu(pipeline))
    }

    pub(super) fn create_compute_pipeline_checked(
        &self,
        descriptor: &ComputePipelineDescriptor<'_>,
    ) -> Option<GpuComputePipeline> {
        let Some(GpuShader::Wgpu {
            module,
            stage: ShaderStage::Compute,
            entry_point,
        }) = descriptor.shader.raw()
        else {
            return self.fail("compute shader is not a live compute stage module");
        };

        let pipeline = self
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: descriptor.label.as_deref(),
                layout: None,
                module,
                entry_point: Some(entry_point.as_str()),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                cache: None,
            });

        Some(GpuComputePipeline::Wgpu(pipeline))
    }
}
