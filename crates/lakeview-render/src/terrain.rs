//! Terrain mesh rendering with per-part shaders.

use lakeview_core::frame::TerrainShading;
use lakeview_core::model::{MeshPart, Model, ShaderKind, TerrainMesh, TerrainVertex};
use lakeview_core::state::DeviceState;
use wgpu::util::DeviceExt;

use crate::engine::RenderEngine;
use crate::error::{RenderError, RenderResult};
use crate::pipeline::{PipelineCache, PipelineKey};

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

fn fragment_entry(shader: ShaderKind) -> &'static str {
    match shader {
        ShaderKind::Lit => "fs_lit",
        ShaderKind::SceneDepth => "fs_depth",
    }
}

struct TerrainGpu {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    shader: wgpu::ShaderModule,
    pipeline_layout: wgpu::PipelineLayout,
}

impl TerrainGpu {
    fn create_pipeline(
        &self,
        device: &wgpu::Device,
        shader: ShaderKind,
        key: &PipelineKey,
    ) -> wgpu::RenderPipeline {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(match shader {
                ShaderKind::Lit => "Terrain Lit Pipeline",
                ShaderKind::SceneDepth => "Terrain Depth Pipeline",
            }),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &self.shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<TerrainVertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &VERTEX_ATTRIBUTES,
                }],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &self.shader,
                entry_point: Some(fragment_entry(shader)),
                targets: &[Some(key.color_target())],
                compilation_options: Default::default(),
            }),
            primitive: key.primitive(),
            depth_stencil: Some(key.depth_stencil()),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }
}

/// GPU copy of the terrain mesh and the pipelines of its parts' shaders.
pub struct TerrainRenderer {
    gpu: TerrainGpu,
    model: Model,
    pipelines: PipelineCache<(ShaderKind, PipelineKey)>,
}

impl TerrainRenderer {
    /// Uploads `mesh`. `uniform_layout` is the layout of the per-draw uniform group.
    pub fn new(
        device: &wgpu::Device,
        mesh: &TerrainMesh,
        uniform_layout: &wgpu::BindGroupLayout,
    ) -> RenderResult<Self> {
        let vertex_buffer = RenderEngine::checked_allocation(
            device,
            "terrain vertices",
            RenderError::BufferCreationFailed,
            || {
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Terrain Vertex Buffer"),
                    contents: bytemuck::cast_slice(&mesh.vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                })
            },
        )?;
        let index_buffer = RenderEngine::checked_allocation(
            device,
            "terrain indices",
            RenderError::BufferCreationFailed,
            || {
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Terrain Index Buffer"),
                    contents: bytemuck::cast_slice(&mesh.indices),
                    usage: wgpu::BufferUsages::INDEX,
                })
            },
        )?;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Terrain Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/terrain.wgsl").into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Terrain Pipeline Layout"),
            bind_group_layouts: &[uniform_layout],
            push_constant_ranges: &[],
        });

        log::debug!(
            "terrain uploaded: {} vertices, {} triangles, {} parts",
            mesh.vertices.len(),
            mesh.indices.len() / 3,
            mesh.model.parts().len()
        );

        Ok(Self {
            gpu: TerrainGpu {
                vertex_buffer,
                index_buffer,
                shader,
                pipeline_layout,
            },
            model: mesh.model.clone(),
            pipelines: PipelineCache::default(),
        })
    }

    #[must_use]
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Draws every part. Depth shading substitutes the depth shader for each part
    /// for the duration of the draw only.
    pub fn draw(
        &mut self,
        device: &wgpu::Device,
        pass: &mut wgpu::RenderPass<'static>,
        format: wgpu::TextureFormat,
        state: &DeviceState,
        shading: &TerrainShading,
        uniforms: (&wgpu::BindGroup, u32),
    ) {
        let key = PipelineKey::new(format, state);
        pass.set_bind_group(0, uniforms.0, &[uniforms.1]);
        pass.set_vertex_buffer(0, self.gpu.vertex_buffer.slice(..));
        pass.set_index_buffer(self.gpu.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

        match shading.substitute() {
            Some(shader) => {
                let substituted = self.model.substitute(shader);
                draw_parts(device, &self.gpu, &mut self.pipelines, pass, key, substituted.parts());
            }
            None => draw_parts(device, &self.gpu, &mut self.pipelines, pass, key, self.model.parts()),
        }
    }
}

fn draw_parts(
    device: &wgpu::Device,
    gpu: &TerrainGpu,
    pipelines: &mut PipelineCache<(ShaderKind, PipelineKey)>,
    pass: &mut wgpu::RenderPass<'static>,
    key: PipelineKey,
    parts: &[MeshPart],
) {
    for part in parts {
        let pipeline = pipelines.get_or_create((part.shader, key), |(shader, key)| {
            gpu.create_pipeline(device, *shader, key)
        });
        pass.set_pipeline(&pipeline);
        pass.draw_indexed(part.indices.clone(), 0, 0..1);
    }
}
