//! Per-draw uniform blocks and the arena they are streamed through.

use glam::{Mat4, Vec4};

use lakeview_core::frame::{CameraMatrices, CompositeInputs, TerrainShading};

use crate::engine::RenderEngine;
use crate::error::{RenderError, RenderResult};

/// Stride between arena slots. A multiple of every adapter's
/// `min_uniform_buffer_offset_alignment` (at most 256) that fits the largest block.
pub const SLOT_STRIDE: u64 = 512;

/// Slots available per frame: three terrain draws, two sky draws, one water draw
/// and the debug overlay, with headroom.
pub const DEFAULT_SLOTS: u32 = 16;

/// Uniforms of the terrain and sky shaders.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawUniforms {
    pub world: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    /// Clip-space plane; ignored unless `params.w` is 1.
    pub clip_plane: [f32; 4],
    pub light_direction: [f32; 4],
    /// x: ambient, y: diffuse.
    pub lighting: [f32; 4],
    pub fog_color: [f32; 4],
    /// xyz: camera position.
    pub eye: [f32; 4],
    /// x: fog start (or near plane), y: fog end (or depth range), w: clip enabled.
    pub params: [f32; 4],
}

impl DrawUniforms {
    /// Uniforms for a terrain draw.
    #[must_use]
    pub fn terrain(shading: &TerrainShading, camera: &CameraMatrices, clip_plane: Option<Vec4>) -> Self {
        let mut uniforms = Self::camera(Mat4::IDENTITY, camera.view, camera.projection, clip_plane);
        match shading {
            TerrainShading::Lit(lighting) => {
                uniforms.light_direction = lighting.light_direction.extend(0.0).to_array();
                uniforms.lighting = [lighting.ambient, lighting.diffuse, 0.0, 0.0];
                uniforms.fog_color = lighting.fog_color.extend(1.0).to_array();
                uniforms.params[0] = lighting.fog_start;
                uniforms.params[1] = lighting.fog_end;
            }
            TerrainShading::Depth { near, depth_range } => {
                uniforms.params[0] = *near;
                uniforms.params[1] = *depth_range;
            }
        }
        uniforms.eye = camera.position.extend(1.0).to_array();
        uniforms
    }

    /// Uniforms for a draw that only needs matrices and the clip plane.
    #[must_use]
    pub fn camera(world: Mat4, view: Mat4, projection: Mat4, clip_plane: Option<Vec4>) -> Self {
        Self {
            world: world.to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
            clip_plane: clip_plane.unwrap_or(Vec4::ZERO).to_array(),
            light_direction: [0.0; 4],
            lighting: [0.0; 4],
            fog_color: [0.0; 4],
            eye: [0.0, 0.0, 0.0, 1.0],
            params: [0.0, 0.0, 0.0, if clip_plane.is_some() { 1.0 } else { 0.0 }],
        }
    }
}

/// Uniforms of the water composite.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct WaterUniforms {
    pub world: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub reflection_view_projection: [[f32; 4]; 4],
    /// xyz: camera position, w: time in seconds.
    pub camera_position: [f32; 4],
    pub light_direction: [f32; 4],
    /// x: depth range, y: wave speed, z: distortion strength, w: near plane.
    pub params: [f32; 4],
}

/// Surface animation settings of the water composite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaterSurface {
    pub wave_speed: f32,
    pub distortion: f32,
    pub near: f32,
}

impl WaterUniforms {
    #[must_use]
    pub fn new(world: Mat4, inputs: &CompositeInputs, surface: WaterSurface) -> Self {
        Self {
            world: world.to_cols_array_2d(),
            view: inputs.view.to_cols_array_2d(),
            projection: inputs.projection.to_cols_array_2d(),
            reflection_view_projection: inputs.reflection_view_projection.to_cols_array_2d(),
            camera_position: inputs.camera_position.extend(inputs.time_seconds).to_array(),
            light_direction: inputs.light_direction.extend(0.0).to_array(),
            params: [
                inputs.depth_range,
                surface.wave_speed,
                surface.distortion,
                surface.near,
            ],
        }
    }
}

/// A uniform buffer handing out one fixed-stride slot per draw, bound through a
/// dynamic offset. Reset at the start of every frame.
pub struct UniformArena {
    buffer: wgpu::Buffer,
    capacity: u32,
    next: u32,
}

impl UniformArena {
    pub fn new(device: &wgpu::Device, label: &str, capacity: u32) -> RenderResult<Self> {
        let buffer = RenderEngine::checked_allocation(
            device,
            label,
            RenderError::BufferCreationFailed,
            || {
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(label),
                    size: SLOT_STRIDE * u64::from(capacity.max(1)),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                })
            },
        )?;
        Ok(Self {
            buffer,
            capacity: capacity.max(1),
            next: 0,
        })
    }

    #[must_use]
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Binding covering exactly one slot of `T`, for use with dynamic offsets.
    #[must_use]
    pub fn binding<T>(&self) -> wgpu::BindingResource<'_> {
        wgpu::BindingResource::Buffer(wgpu::BufferBinding {
            buffer: &self.buffer,
            offset: 0,
            size: wgpu::BufferSize::new(std::mem::size_of::<T>() as u64),
        })
    }

    #[must_use]
    pub fn used(&self) -> u32 {
        self.next
    }

    pub fn reset(&mut self) {
        self.next = 0;
    }

    /// Writes `value` to the next free slot and returns its dynamic offset.
    pub fn push<T: bytemuck::Pod>(&mut self, queue: &wgpu::Queue, value: &T) -> RenderResult<u32> {
        let offset = next_offset(self.next, self.capacity)?;
        queue.write_buffer(&self.buffer, u64::from(offset), bytemuck::bytes_of(value));
        self.next += 1;
        Ok(offset)
    }
}

fn next_offset(next: u32, capacity: u32) -> RenderResult<u32> {
    if next >= capacity {
        return Err(RenderError::UniformArenaExhausted { capacity });
    }
    // SLOT_STRIDE * capacity fits in u32 for any arena we create
    Ok(next * SLOT_STRIDE as u32)
}

/// Layout entry for a dynamic-offset uniform block of type `T`.
#[must_use]
pub fn dynamic_uniform_entry<T>(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: true,
            min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<T>() as u64),
        },
        count: None,
    }
}
