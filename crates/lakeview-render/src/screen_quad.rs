//! Debug overlay: one offscreen target drawn into a corner of the output.

use lakeview_core::frame::Viewport;
use lakeview_core::screen_quad::{QuadVertex, ScreenQuad, ScreenRect, TexelConvention, QUAD_INDICES, QUAD_STATE};
use lakeview_core::state::DeviceState;
use wgpu::util::DeviceExt;

use crate::engine::RenderEngine;
use crate::error::{RenderError, RenderResult};
use crate::pipeline::{PipelineCache, PipelineKey};
use crate::samplers::{is_non_filtering, SamplerCache};

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2];

pub struct ScreenQuadRenderer {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    shader: wgpu::ShaderModule,
    texture_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: PipelineCache<PipelineKey>,
    convention: TexelConvention,
}

impl ScreenQuadRenderer {
    pub fn new(device: &wgpu::Device, convention: TexelConvention) -> RenderResult<Self> {
        let vertex_buffer = RenderEngine::checked_allocation(
            device,
            "screen quad vertices",
            RenderError::BufferCreationFailed,
            || {
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("Screen Quad Vertex Buffer"),
                    size: std::mem::size_of::<[QuadVertex; 4]>() as u64,
                    usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                })
            },
        )?;
        let index_buffer = RenderEngine::checked_allocation(
            device,
            "screen quad indices",
            RenderError::BufferCreationFailed,
            || {
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Screen Quad Index Buffer"),
                    contents: bytemuck::cast_slice(&QUAD_INDICES),
                    usage: wgpu::BufferUsages::INDEX,
                })
            },
        )?;

        // Non-filterable so float depth targets can be shown too
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Screen Quad Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering),
                    count: None,
                },
            ],
        });
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Screen Quad Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/quad.wgsl").into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Screen Quad Pipeline Layout"),
            bind_group_layouts: &[&texture_layout],
            push_constant_ranges: &[],
        });

        Ok(Self {
            vertex_buffer,
            index_buffer,
            shader,
            texture_layout,
            pipeline_layout,
            pipelines: PipelineCache::default(),
            convention,
        })
    }

    /// Draws `source` into `rect` of `output`, keeping the output's contents elsewhere.
    pub fn draw(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        output: &wgpu::TextureView,
        format: wgpu::TextureFormat,
        extent: Viewport,
        source: &wgpu::TextureView,
        rect: ScreenRect,
        samplers: &mut SamplerCache,
    ) -> RenderResult<()> {
        let state = QUAD_STATE.apply_to(&DeviceState::default());
        if !is_non_filtering(state.samplers[0]) {
            return Err(RenderError::StateContractViolation(
                "screen quad needs a point sampler".to_string(),
            ));
        }

        let quad = ScreenQuad::new(extent.width, extent.height, self.convention);
        let vertices = quad.vertices(rect.min, rect.max);
        queue.write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&vertices));

        let sampler = samplers.get(device, state.samplers[0]);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Screen Quad Bind Group"),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(source),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        let key = PipelineKey::new(format, &state);
        let pipeline = self.pipelines.get_or_create(key, |key| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Screen Quad Pipeline"),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &self.shader,
                    entry_point: Some("vs_main"),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<QuadVertex>() as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &VERTEX_ATTRIBUTES,
                    }],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &self.shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(key.color_target())],
                    compilation_options: Default::default(),
                }),
                primitive: key.primitive(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Debug Overlay Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            ..Default::default()
        });
        pass.set_pipeline(&pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        pass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, 0..1);
        Ok(())
    }
}
