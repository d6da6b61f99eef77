use std::borrow::Cow;

use wgpu::naga::ShaderStage;

use crate::error::RenderError;
use crate::types::TextureSlot;

use super::geometry::GeometryBuffer;
use super::textures::TextureSlots;
use super::uniforms::UniformBuffer;

pub(crate) const PARAMS_BINDING: u32 = 0;
pub(crate) const TOP_TEXTURE_BINDING: u32 = 1;
pub(crate) const BOTTOM_TEXTURE_BINDING: u32 = 2;
pub(crate) const SAMPLER_BINDING: u32 = 3;

const VERTEX_SHADER_GLSL: &str = include_str!("../../shaders/flip.vert");
const FRAGMENT_SHADER_GLSL: &str = include_str!("../../shaders/flip.frag");

/// GLSL 450 sources for the flip program.
///
/// Replacement sources must keep the interface of the bundled ones: `aPos` at
/// location 0, the `FlipParams` block at binding 0, `sTop`/`sBottom` textures
/// at bindings 1 and 2 and the sampler at binding 3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSources {
    pub vertex: Cow<'static, str>,
    pub fragment: Cow<'static, str>,
}

impl ShaderSources {
    pub fn builtin() -> Self {
        Self {
            vertex: Cow::Borrowed(VERTEX_SHADER_GLSL),
            fragment: Cow::Borrowed(FRAGMENT_SHADER_GLSL),
        }
    }
}

impl Default for ShaderSources {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Linked flip pipeline and the bind group layout its resources follow.
pub(crate) struct ShaderProgram {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
}

impl ShaderProgram {
    /// Compiles both stages and links them into a render pipeline.
    ///
    /// Errors are collected through wgpu error scopes so a broken shader
    /// disables the renderer instead of tearing down the device.
    pub fn link(
        device: &wgpu::Device,
        sources: &ShaderSources,
        target_format: wgpu::TextureFormat,
    ) -> Result<Self, RenderError> {
        let vertex = compile(device, "vertex", ShaderStage::Vertex, &sources.vertex)?;
        let fragment = compile(device, "fragment", ShaderStage::Fragment, &sources.fragment)?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("flip bind group layout"),
            entries: &layout_entries(),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("flip pipeline layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("flip pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex,
                entry_point: Some("main"),
                buffers: &[GeometryBuffer::layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: GeometryBuffer::TOPOLOGY,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &fragment,
                entry_point: Some("main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(RenderError::ShaderLink(err.to_string()));
        }

        tracing::debug!(?target_format, "linked flip program");
        Ok(Self { pipeline, layout })
    }

    pub fn pipeline(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }

    /// Resolves the program's inputs against the current resources.
    ///
    /// Must be redone after every relink and every texture reallocation.
    pub fn bind(
        &self,
        device: &wgpu::Device,
        uniforms: &UniformBuffer,
        textures: &TextureSlots,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("flip bind group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: PARAMS_BINDING,
                    resource: uniforms.buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: TOP_TEXTURE_BINDING,
                    resource: wgpu::BindingResource::TextureView(textures.view(TextureSlot::Top)),
                },
                wgpu::BindGroupEntry {
                    binding: BOTTOM_TEXTURE_BINDING,
                    resource: wgpu::BindingResource::TextureView(
                        textures.view(TextureSlot::Bottom),
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: SAMPLER_BINDING,
                    resource: wgpu::BindingResource::Sampler(&textures.sampler),
                },
            ],
        })
    }
}

fn compile(
    device: &wgpu::Device,
    label: &'static str,
    stage: ShaderStage,
    source: &str,
) -> Result<wgpu::ShaderModule, RenderError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(source),
            stage,
            defines: &[],
        },
    });
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(RenderError::ShaderCompile {
            stage: label,
            message: err.to_string(),
        }),
        None => Ok(module),
    }
}

fn layout_entries() -> [wgpu::BindGroupLayoutEntry; 4] {
    let texture = |binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    };
    [
        wgpu::BindGroupLayoutEntry {
            binding: PARAMS_BINDING,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        },
        texture(TOP_TEXTURE_BINDING),
        texture(BOTTOM_TEXTURE_BINDING),
        wgpu::BindGroupLayoutEntry {
            binding: SAMPLER_BINDING,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        },
    ]
}
