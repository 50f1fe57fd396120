//! The planar water composite.
//!
//! [`PlanarWater`] owns the water grid, its two surface maps and the composite
//! shader. A draw fuses five textures into the water surface:
//!
//! | slot | texture | sampler |
//! |------|---------|---------|
//! | 0 | scene depth (`R32Float`) | point clamp, non-filtering |
//! | 1 | reflection | linear clamp |
//! | 2 | scene color | linear clamp |
//! | 3 | offset (DUDV) map | linear wrap |
//! | 4 | normal map | linear wrap |
//!
//! Samplers come from the [`DeviceState`] the draw receives, so the composite never
//! changes state on its own; the caller scopes the state around the draw.

use lakeview_core::frame::CompositeInputs;
use lakeview_core::state::DeviceState;
use lakeview_core::water_grid::{
    WaterGrid, WaterTransform, WaterVertex, SLOT_NORMAL_MAP, SLOT_OFFSET_MAP, SLOT_REFLECTION,
    SLOT_SCENE_COLOR, SLOT_SCENE_DEPTH,
};
use wgpu::util::DeviceExt;

use crate::engine::RenderEngine;
use crate::error::{RenderError, RenderResult};
use crate::pipeline::{PipelineCache, PipelineKey};
use crate::samplers::{is_non_filtering, SamplerCache};
use crate::texture::{create_texture_2d, ImageData};
use crate::uniforms::{dynamic_uniform_entry, WaterSurface, WaterUniforms};

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 3] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

/// Texture slots in binding order.
const SLOTS: [usize; 5] = [
    SLOT_SCENE_DEPTH,
    SLOT_REFLECTION,
    SLOT_SCENE_COLOR,
    SLOT_OFFSET_MAP,
    SLOT_NORMAL_MAP,
];

/// The three captured targets read by the composite.
#[derive(Clone, Copy)]
pub struct CompositeTargets<'a> {
    pub scene_depth: &'a wgpu::TextureView,
    pub reflection: &'a wgpu::TextureView,
    pub scene_color: &'a wgpu::TextureView,
}

pub struct PlanarWater {
    vertex_buffer: wgpu::Buffer,
    vertex_count: u32,
    transform: WaterTransform,
    surface: WaterSurface,
    _offset_texture: wgpu::Texture,
    offset_view: wgpu::TextureView,
    _normal_texture: wgpu::Texture,
    normal_view: wgpu::TextureView,
    shader: wgpu::ShaderModule,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: PipelineCache<PipelineKey>,
}

impl PlanarWater {
    /// Uploads the grid and the two surface maps. The maps hold vectors, not colors,
    /// so they are stored linear.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        offset_map: &ImageData,
        normal_map: &ImageData,
        grid: &WaterGrid,
        transform: WaterTransform,
        surface: WaterSurface,
    ) -> RenderResult<Self> {
        let (offset_texture, offset_view) = create_texture_2d(
            device,
            queue,
            "Water Offset Map",
            offset_map,
            wgpu::TextureFormat::Rgba8Unorm,
        )?;
        let (normal_texture, normal_view) = create_texture_2d(
            device,
            queue,
            "Water Normal Map",
            normal_map,
            wgpu::TextureFormat::Rgba8Unorm,
        )?;

        let vertex_buffer = RenderEngine::checked_allocation(
            device,
            "water grid vertices",
            RenderError::BufferCreationFailed,
            || {
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Water Vertex Buffer"),
                    contents: bytemuck::cast_slice(grid.vertices()),
                    usage: wgpu::BufferUsages::VERTEX,
                })
            },
        )?;
        let vertex_count = u32::try_from(grid.vertex_count()).map_err(|_| {
            RenderError::BufferCreationFailed(format!(
                "water grid of {} vertices",
                grid.vertex_count()
            ))
        })?;

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Water Uniform Bind Group Layout"),
            entries: &[dynamic_uniform_entry::<WaterUniforms>(
                0,
                wgpu::ShaderStages::VERTEX_FRAGMENT,
            )],
        });
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Water Texture Bind Group Layout"),
            entries: &texture_layout_entries(),
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Water Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/water.wgsl").into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Water Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        log::debug!(
            "water grid uploaded: tessellation {}, {} vertices",
            grid.tessellation(),
            vertex_count
        );

        Ok(Self {
            vertex_buffer,
            vertex_count,
            transform,
            surface,
            _offset_texture: offset_texture,
            offset_view,
            _normal_texture: normal_texture,
            normal_view,
            shader,
            uniform_layout,
            texture_layout,
            pipeline_layout,
            pipelines: PipelineCache::default(),
        })
    }

    /// Layout of the composite's uniform group, for the caller's arena bind group.
    #[must_use]
    pub fn uniform_layout(&self) -> &wgpu::BindGroupLayout {
        &self.uniform_layout
    }

    #[must_use]
    pub fn transform(&self) -> WaterTransform {
        self.transform
    }

    #[must_use]
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    #[must_use]
    pub fn uniforms(&self, inputs: &CompositeInputs) -> WaterUniforms {
        WaterUniforms::new(self.transform.world_matrix(), inputs, self.surface)
    }

    /// Draws the water surface into the current pass.
    ///
    /// Fails with [`RenderError::StateContractViolation`] when slot 0 would filter the
    /// float depth target.
    pub fn draw(
        &mut self,
        device: &wgpu::Device,
        pass: &mut wgpu::RenderPass<'static>,
        format: wgpu::TextureFormat,
        state: &DeviceState,
        samplers: &mut SamplerCache,
        targets: CompositeTargets<'_>,
        uniforms: (&wgpu::BindGroup, u32),
    ) -> RenderResult<()> {
        check_composite_state(state)?;

        let views = [
            targets.scene_depth,
            targets.reflection,
            targets.scene_color,
            &self.offset_view,
            &self.normal_view,
        ];
        let slot_samplers: Vec<wgpu::Sampler> = SLOTS
            .iter()
            .map(|&slot| samplers.get(device, state.samplers[slot]))
            .collect();
        let mut entries = Vec::with_capacity(2 * SLOTS.len());
        for (index, (view, sampler)) in views.into_iter().zip(&slot_samplers).enumerate() {
            let binding = 2 * index as u32;
            entries.push(wgpu::BindGroupEntry {
                binding,
                resource: wgpu::BindingResource::TextureView(view),
            });
            entries.push(wgpu::BindGroupEntry {
                binding: binding + 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            });
        }
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Water Texture Bind Group"),
            layout: &self.texture_layout,
            entries: &entries,
        });

        let key = PipelineKey::new(format, state);
        let pipeline = self.pipelines.get_or_create(key, |key| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Water Pipeline"),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &self.shader,
                    entry_point: Some("vs_main"),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<WaterVertex>() as u64,
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
        pass.draw(0..self.vertex_count, 0..1);
        Ok(())
    }
}

/// Rejects device state the composite cannot sample with.
pub fn check_composite_state(state: &DeviceState) -> RenderResult<()> {
    let depth_sampler = state.samplers[SLOT_SCENE_DEPTH];
    if !is_non_filtering(depth_sampler) {
        return Err(RenderError::StateContractViolation(format!(
            "scene depth slot {SLOT_SCENE_DEPTH} needs point filtering, found {depth_sampler:?}"
        )));
    }
    Ok(())
}

fn texture_layout_entries() -> Vec<wgpu::BindGroupLayoutEntry> {
    SLOTS
        .iter()
        .enumerate()
        .flat_map(|(index, &slot)| {
            // R32Float is not filterable without an optional feature
            let filterable = slot != SLOT_SCENE_DEPTH;
            let binding = 2 * index as u32;
            [
                wgpu::BindGroupLayoutEntry {
                    binding,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: binding + 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(if filterable {
                        wgpu::SamplerBindingType::Filtering
                    } else {
                        wgpu::SamplerBindingType::NonFiltering
                    }),
                    count: None,
                },
            ]
        })
        .collect()
}
