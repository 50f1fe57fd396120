//! The water scene: GPU resources for every pass, driven by the frame pipeline.

use std::path::Path;

use lakeview_core::camera::FlyCamera;
use lakeview_core::config::SceneConfig;
use lakeview_core::frame::{
    CameraMatrices, CompositeInputs, FlareOcclusion, FrameBackend, FrameOutcome, FramePipeline,
    PassDescriptor, TerrainShading, Viewport,
};
use lakeview_core::model::TerrainMesh;
use lakeview_core::screen_quad::{ScreenRect, TexelConvention};
use lakeview_core::state::{DeviceState, RenderTargetId};
use lakeview_core::water_grid::{WaterGrid, WaterTransform};

use crate::engine::RenderEngine;
use crate::error::{RenderError, RenderResult};
use crate::planar_water::{CompositeTargets, PlanarWater};
use crate::samplers::SamplerCache;
use crate::screen_quad::ScreenQuadRenderer;
use crate::screenshot::{save_image, ChannelOrder};
use crate::skybox::SkyboxRenderer;
use crate::targets::OffscreenTargets;
use crate::terrain::TerrainRenderer;
use crate::texture::ImageData;
use crate::uniforms::{dynamic_uniform_entry, DrawUniforms, UniformArena, WaterSurface, WaterUniforms, DEFAULT_SLOTS};

/// Fraction of each screen axis covered by the debug overlay.
const OVERLAY_FRACTION: f32 = 0.3;

/// CPU-side content of the scene.
#[derive(Debug, Clone)]
pub struct SceneAssets {
    pub terrain: TerrainMesh,
    /// DUDV map: red and green hold signed offsets around 0.5.
    pub water_offset_map: ImageData,
    /// Tangent-space normal map of the water surface.
    pub water_normal_map: ImageData,
    /// Sky cube faces in +X, -X, +Y, -Y, +Z, -Z order.
    pub sky_faces: [ImageData; 6],
}

/// Everything needed to draw the water scene into an output view.
pub struct WaterScene {
    pipeline: FramePipeline,
    viewport: Viewport,
    targets: OffscreenTargets,
    terrain: TerrainRenderer,
    skybox: SkyboxRenderer,
    water: PlanarWater,
    overlay: ScreenQuadRenderer,
    samplers: SamplerCache,
    arena: UniformArena,
    draw_bind_group: wgpu::BindGroup,
    water_bind_group: wgpu::BindGroup,
}

impl WaterScene {
    pub fn new(engine: &RenderEngine, config: SceneConfig, assets: &SceneAssets) -> RenderResult<Self> {
        config.validate()?;
        let device = &engine.device;
        let queue = &engine.queue;
        let viewport = Viewport::new(engine.width, engine.height);

        let targets = OffscreenTargets::new(device, viewport, config.scene_color_divisor)?;
        let arena = UniformArena::new(device, "Per-Draw Uniform Arena", DEFAULT_SLOTS)?;

        let draw_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Draw Uniform Bind Group Layout"),
            entries: &[dynamic_uniform_entry::<DrawUniforms>(
                0,
                wgpu::ShaderStages::VERTEX_FRAGMENT,
            )],
        });
        let draw_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Draw Uniform Bind Group"),
            layout: &draw_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: arena.binding::<DrawUniforms>(),
            }],
        });

        let terrain = TerrainRenderer::new(device, &assets.terrain, &draw_layout)?;
        let skybox = SkyboxRenderer::new(device, queue, &assets.sky_faces, &draw_layout)?;

        let grid = WaterGrid::new(config.water.tessellation)?;
        let water = PlanarWater::new(
            device,
            queue,
            &assets.water_offset_map,
            &assets.water_normal_map,
            &grid,
            WaterTransform::from(&config.water),
            WaterSurface {
                wave_speed: config.water.wave_speed,
                distortion: config.water.distortion,
                near: config.camera.near,
            },
        )?;
        let water_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Water Uniform Bind Group"),
            layout: water.uniform_layout(),
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: arena.binding::<WaterUniforms>(),
            }],
        });

        let overlay = ScreenQuadRenderer::new(device, TexelConvention::PixelCenters)?;

        log::info!(
            "water scene ready: {}x{}, water at height {}",
            viewport.width,
            viewport.height,
            config.water.height
        );

        Ok(Self {
            pipeline: FramePipeline::new(config),
            viewport,
            targets,
            terrain,
            skybox,
            water,
            overlay,
            samplers: SamplerCache::new(),
            arena,
            draw_bind_group,
            water_bind_group,
        })
    }

    #[must_use]
    pub fn config(&self) -> &SceneConfig {
        self.pipeline.config()
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[must_use]
    pub fn targets(&self) -> &OffscreenTargets {
        &self.targets
    }

    /// Follows a back buffer resize. A zero size is recorded so frames are skipped,
    /// and the targets are kept until the size is usable again.
    pub fn resize(&mut self, device: &wgpu::Device, viewport: Viewport) -> RenderResult<()> {
        if viewport == self.viewport {
            return Ok(());
        }
        self.viewport = viewport;
        if viewport.is_empty() || self.targets.extent(RenderTargetId::BackBuffer) == viewport {
            return Ok(());
        }
        self.targets = OffscreenTargets::new(device, viewport, self.config().scene_color_divisor)?;
        Ok(())
    }

    /// Records and submits one frame into `output`. Nothing is submitted when a
    /// pass fails.
    pub fn render_frame(
        &mut self,
        engine: &RenderEngine,
        output: &wgpu::TextureView,
        camera: &FlyCamera,
        time_seconds: f32,
        flare: &mut dyn FlareOcclusion,
    ) -> RenderResult<FrameOutcome> {
        let engine_viewport = Viewport::new(engine.width, engine.height);
        if !self.viewport.is_empty() && engine_viewport != self.viewport {
            self.resize(&engine.device, engine_viewport)?;
        }
        self.arena.reset();
        let mut encoder = engine
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Water Frame Encoder"),
            });

        let outcome = {
            let mut frame = WgpuFrame {
                device: &engine.device,
                queue: &engine.queue,
                encoder: &mut encoder,
                output,
                output_format: engine.output_format(),
                viewport: self.viewport,
                targets: &self.targets,
                terrain: &mut self.terrain,
                skybox: &mut self.skybox,
                water: &mut self.water,
                samplers: &mut self.samplers,
                arena: &mut self.arena,
                draw_bind_group: &self.draw_bind_group,
                water_bind_group: &self.water_bind_group,
                pass: None,
                format: engine.output_format(),
            };
            self.pipeline
                .render_frame(&mut frame, camera, time_seconds, flare)?
        };

        if let FrameOutcome::Rendered(report) = &outcome {
            engine.queue.submit(std::iter::once(encoder.finish()));
            log::trace!(
                "frame submitted: {} passes, {} draws, {} uniform slots",
                report.passes.len(),
                report.draws.len(),
                self.arena.used()
            );
        }
        Ok(outcome)
    }

    /// Draws one offscreen target into the bottom-right corner of `output`.
    pub fn render_debug_overlay(
        &mut self,
        engine: &RenderEngine,
        output: &wgpu::TextureView,
        target: RenderTargetId,
    ) -> RenderResult<()> {
        let Some(source) = self.targets.get(target) else {
            return Ok(());
        };
        if self.viewport.is_empty() {
            return Ok(());
        }
        let mut encoder = engine
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Debug Overlay Encoder"),
            });
        self.overlay.draw(
            &engine.device,
            &engine.queue,
            &mut encoder,
            output,
            engine.output_format(),
            self.viewport,
            &source.view,
            ScreenRect::bottom_right(OVERLAY_FRACTION),
            &mut self.samplers,
        )?;
        engine.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    /// Renders a frame offscreen and returns it with its tightly packed pixels.
    pub fn render_to_image(
        &mut self,
        engine: &RenderEngine,
        camera: &FlyCamera,
        time_seconds: f32,
        flare: &mut dyn FlareOcclusion,
    ) -> RenderResult<(FrameOutcome, Vec<u8>)> {
        let texture = engine.create_output_texture();
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let outcome = self.render_frame(engine, &view, camera, time_seconds, flare)?;
        let pixels = engine.read_texture(&texture)?;
        Ok((outcome, pixels))
    }

    /// Renders a frame offscreen and saves it to `path`.
    pub fn save_screenshot(
        &mut self,
        engine: &RenderEngine,
        path: &Path,
        camera: &FlyCamera,
        time_seconds: f32,
        flare: &mut dyn FlareOcclusion,
    ) -> RenderResult<FrameOutcome> {
        let (outcome, pixels) = self.render_to_image(engine, camera, time_seconds, flare)?;
        save_image(
            path,
            &pixels,
            engine.width,
            engine.height,
            ChannelOrder::of(engine.output_format()),
        )?;
        Ok(outcome)
    }
}

/// [`FrameBackend`] recording into one command encoder.
struct WgpuFrame<'a> {
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
    encoder: &'a mut wgpu::CommandEncoder,
    output: &'a wgpu::TextureView,
    output_format: wgpu::TextureFormat,
    viewport: Viewport,
    targets: &'a OffscreenTargets,
    terrain: &'a mut TerrainRenderer,
    skybox: &'a mut SkyboxRenderer,
    water: &'a mut PlanarWater,
    samplers: &'a mut SamplerCache,
    arena: &'a mut UniformArena,
    draw_bind_group: &'a wgpu::BindGroup,
    water_bind_group: &'a wgpu::BindGroup,
    pass: Option<wgpu::RenderPass<'static>>,
    /// Color format of the pass being recorded.
    format: wgpu::TextureFormat,
}

impl WgpuFrame<'_> {
    fn active_pass<'p>(
        pass: &'p mut Option<wgpu::RenderPass<'static>>,
    ) -> RenderResult<&'p mut wgpu::RenderPass<'static>> {
        pass.as_mut().ok_or(RenderError::NoActivePass)
    }
}

fn color_attachment<'t>(
    targets: &'t OffscreenTargets,
    output: &'t wgpu::TextureView,
    output_format: wgpu::TextureFormat,
    target: RenderTargetId,
) -> (&'t wgpu::TextureView, wgpu::TextureFormat) {
    match targets.get(target) {
        Some(render_target) => (&render_target.view, render_target.format),
        None => (output, output_format),
    }
}

fn to_wgpu_color(color: glam::Vec4) -> wgpu::Color {
    wgpu::Color {
        r: f64::from(color.x),
        g: f64::from(color.y),
        b: f64::from(color.z),
        a: f64::from(color.w),
    }
}

impl FrameBackend for WgpuFrame<'_> {
    type Error = RenderError;

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn target_extent(&self, target: RenderTargetId) -> Viewport {
        self.targets.extent(target)
    }

    fn begin_pass(&mut self, pass: &PassDescriptor, state: &DeviceState) -> RenderResult<()> {
        if state.target != pass.target {
            return Err(RenderError::StateContractViolation(format!(
                "{} begins with the {} target bound",
                pass.kind.label(),
                state.target.name()
            )));
        }
        // A pass still open from an aborted sequence is closed first
        self.pass = None;

        let targets = self.targets;
        let (view, format) = color_attachment(targets, self.output, self.output_format, pass.target);
        let depth = &targets.depth_for(pass.target).view;
        let render_pass = self
            .encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(pass.kind.label()),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(to_wgpu_color(pass.clear_color)),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(pass.clear_depth),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            })
            .forget_lifetime();
        self.pass = Some(render_pass);
        self.format = format;
        Ok(())
    }

    fn draw_terrain(
        &mut self,
        shading: &TerrainShading,
        camera: &CameraMatrices,
        state: &DeviceState,
    ) -> RenderResult<()> {
        let offset = self.arena.push(
            self.queue,
            &DrawUniforms::terrain(shading, camera, state.clip_plane),
        )?;
        let pass = Self::active_pass(&mut self.pass)?;
        self.terrain.draw(
            self.device,
            pass,
            self.format,
            state,
            shading,
            (self.draw_bind_group, offset),
        );
        Ok(())
    }

    fn draw_sky(&mut self, camera: &CameraMatrices, state: &DeviceState) -> RenderResult<()> {
        let offset = self
            .arena
            .push(self.queue, &SkyboxRenderer::uniforms(camera, state))?;
        let pass = Self::active_pass(&mut self.pass)?;
        self.skybox.draw(
            self.device,
            pass,
            self.format,
            state,
            self.samplers,
            (self.draw_bind_group, offset),
        );
        Ok(())
    }

    fn draw_water(&mut self, inputs: &CompositeInputs, state: &DeviceState) -> RenderResult<()> {
        if state.target != RenderTargetId::BackBuffer {
            return Err(RenderError::StateContractViolation(format!(
                "water composite drawn into the {} target it samples",
                state.target.name()
            )));
        }
        let offset = self.arena.push(self.queue, &self.water.uniforms(inputs))?;
        let offscreen = self.targets;
        let targets = CompositeTargets {
            scene_depth: &offscreen.scene_depth.view,
            reflection: &offscreen.reflection.view,
            scene_color: &offscreen.scene_color.view,
        };
        let pass = Self::active_pass(&mut self.pass)?;
        self.water.draw(
            self.device,
            pass,
            self.format,
            state,
            self.samplers,
            targets,
            (self.water_bind_group, offset),
        )
    }

    fn end_pass(&mut self) -> RenderResult<()> {
        match self.pass.take() {
            Some(pass) => {
                drop(pass);
                Ok(())
            }
            None => Err(RenderError::NoActivePass),
        }
    }
}
