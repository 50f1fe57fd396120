//! Sky cube rendering.

use glam::Mat4;
use lakeview_core::frame::CameraMatrices;
use lakeview_core::skybox::{sky_view_projection, SKY_INDICES, SKY_VERTICES};
use lakeview_core::state::DeviceState;
use wgpu::util::DeviceExt;

use crate::engine::RenderEngine;
use crate::error::{RenderError, RenderResult};
use crate::pipeline::{PipelineCache, PipelineKey};
use crate::samplers::SamplerCache;
use crate::texture::{create_cube_texture, ImageData};
use crate::uniforms::DrawUniforms;

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];

pub struct SkyboxRenderer {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    shader: wgpu::ShaderModule,
    texture_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: PipelineCache<PipelineKey>,
}

impl SkyboxRenderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        faces: &[ImageData; 6],
        uniform_layout: &wgpu::BindGroupLayout,
    ) -> RenderResult<Self> {
        let (texture, view) = create_cube_texture(device, queue, "Sky Cube Texture", faces)?;

        let vertex_buffer = RenderEngine::checked_allocation(
            device,
            "sky vertices",
            RenderError::BufferCreationFailed,
            || {
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Sky Vertex Buffer"),
                    contents: bytemuck::cast_slice(&SKY_VERTICES),
                    usage: wgpu::BufferUsages::VERTEX,
                })
            },
        )?;
        let index_buffer = RenderEngine::checked_allocation(
            device,
            "sky indices",
            RenderError::BufferCreationFailed,
            || {
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Sky Index Buffer"),
                    contents: bytemuck::cast_slice(&SKY_INDICES),
                    usage: wgpu::BufferUsages::INDEX,
                })
            },
        )?;

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Sky Texture Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::Cube,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Sky Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/sky.wgsl").into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Sky Pipeline Layout"),
            bind_group_layouts: &[uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        Ok(Self {
            vertex_buffer,
            index_buffer,
            _texture: texture,
            view,
            shader,
            texture_layout,
            pipeline_layout,
            pipelines: PipelineCache::default(),
        })
    }

    /// Uniforms for a sky draw: the translation-free view-projection rides in `world`.
    #[must_use]
    pub fn uniforms(camera: &CameraMatrices, state: &DeviceState) -> DrawUniforms {
        DrawUniforms::camera(
            sky_view_projection(camera.view, camera.projection),
            Mat4::IDENTITY,
            Mat4::IDENTITY,
            state.clip_plane,
        )
    }

    /// Draws the cube with the sampler of slot 0.
    pub fn draw(
        &mut self,
        device: &wgpu::Device,
        pass: &mut wgpu::RenderPass<'static>,
        format: wgpu::TextureFormat,
        state: &DeviceState,
        samplers: &mut SamplerCache,
        uniforms: (&wgpu::BindGroup, u32),
    ) {
        let sampler = samplers.get(device, state.samplers[0]);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Sky Texture Bind Group"),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&self.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        let key = PipelineKey::new(format, state);
        let pipeline = self.pipelines.get_or_create(key, |key| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Sky Pipeline"),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &self.shader,
                    entry_point: Some("vs_main"),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<[f32; 3]>() as u64,
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
                depth_stencil: Some(key.depth_stencil()),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        });

        pass.set_pipeline(&pipeline);
        pass.set_bind_group(0, uniforms.0, &[uniforms.1]);
        pass.set_bind_group(1, &bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        pass.draw_indexed(0..SKY_INDICES.len() as u32, 0, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_sky_uniforms_drop_translation() {
        let eye = Vec3::new(10.0, 50.0, -3.0);
        let projection = Mat4::perspective_rh(1.0, 1.5, 0.1, 1000.0);
        let camera = CameraMatrices {
            view: Mat4::look_at_rh(eye, eye + Vec3::X, Vec3::Y),
            projection,
            position: eye,
        };
        let uniforms = SkyboxRenderer::uniforms(&camera, &DeviceState::default());
        let world = Mat4::from_cols_array_2d(&uniforms.world);
        let centered = projection * Mat4::look_at_rh(Vec3::ZERO, Vec3::X, Vec3::Y);
        assert!(world.abs_diff_eq(centered, 1e-5));
        assert_eq!(uniforms.params[3], 0.0);
    }
}
