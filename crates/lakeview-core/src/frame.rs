//! Per-frame pass choreography.
//!
//! [`FramePipeline::render_frame`] runs the four passes in their fixed order:
//!
//! 1. half-resolution scene color (lit terrain)
//! 2. reflection (sky and lit terrain from the mirrored camera, clipped at the water plane)
//! 3. scene depth (terrain with the depth shader substituted per part)
//! 4. back buffer (sky, lit terrain, then the water composite reading the three targets)
//!
//! The GPU work is delegated to a [`FrameBackend`]; this module only decides what is
//! drawn, where, and with which [`DeviceState`].

use glam::{Mat4, Vec3, Vec4};

use crate::camera::FlyCamera;
use crate::config::SceneConfig;
use crate::model::ShaderKind;
use crate::reflection::ReflectionView;
use crate::skybox::SKY_STATE;
use crate::state::{DeviceState, RenderTargetId, StateOverlay, StateTracker};
use crate::water_grid::COMPOSITE_STATE;

/// Size of a viewport or target in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width over height, or `None` for an empty viewport.
    #[must_use]
    pub fn aspect_ratio(&self) -> Option<f32> {
        (!self.is_empty()).then(|| self.width as f32 / self.height as f32)
    }

    /// The viewport divided on each axis, never below one pixel.
    #[must_use]
    pub fn scaled_down(&self, divisor: u32) -> Self {
        let divisor = divisor.max(1);
        Self {
            width: (self.width / divisor).max(1),
            height: (self.height / divisor).max(1),
        }
    }
}

/// The passes of a frame, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    SceneColor,
    Reflection,
    SceneDepth,
    Final,
}

impl PassKind {
    pub const ORDER: [PassKind; 4] = [
        PassKind::SceneColor,
        PassKind::Reflection,
        PassKind::SceneDepth,
        PassKind::Final,
    ];

    #[must_use]
    pub fn target(self) -> RenderTargetId {
        match self {
            PassKind::SceneColor => RenderTargetId::SceneColor,
            PassKind::Reflection => RenderTargetId::Reflection,
            PassKind::SceneDepth => RenderTargetId::SceneDepth,
            PassKind::Final => RenderTargetId::BackBuffer,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            PassKind::SceneColor => "Scene Color Pass",
            PassKind::Reflection => "Reflection Pass",
            PassKind::SceneDepth => "Scene Depth Pass",
            PassKind::Final => "Final Pass",
        }
    }
}

/// Target binding and clear values for one pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassDescriptor {
    pub kind: PassKind,
    pub target: RenderTargetId,
    pub clear_color: Vec4,
    pub clear_depth: f32,
}

/// View and projection of the camera a draw is seen through.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraMatrices {
    pub view: Mat4,
    pub projection: Mat4,
    pub position: Vec3,
}

impl CameraMatrices {
    #[must_use]
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }
}

/// Lighting of the standard terrain shader.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneLighting {
    /// Direction the light travels (from the sun towards the scene).
    pub light_direction: Vec3,
    pub ambient: f32,
    pub diffuse: f32,
    pub fog_start: f32,
    pub fog_end: f32,
    pub fog_color: Vec3,
}

/// How terrain is shaded in a pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TerrainShading {
    /// The parts' own shaders with ambient, one directional light and fog.
    Lit(SceneLighting),
    /// Every part substituted with the depth shader, writing
    /// `(distance - near) / depth_range`.
    Depth { near: f32, depth_range: f32 },
}

impl TerrainShading {
    /// Shader every part is drawn with, or `None` when parts keep their own.
    #[must_use]
    pub fn substitute(&self) -> Option<ShaderKind> {
        match self {
            TerrainShading::Lit(_) => None,
            TerrainShading::Depth { .. } => Some(ShaderKind::SceneDepth),
        }
    }
}

/// Per-frame uniforms of the water composite. The three captured targets are
/// implied: the backend binds its scene depth, reflection and scene color targets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeInputs {
    pub reflection_view_projection: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
    pub time_seconds: f32,
    pub camera_position: Vec3,
    pub light_direction: Vec3,
    pub depth_range: f32,
}

/// Sun light source and lens-flare effect living outside the water pipeline.
pub trait FlareOcclusion {
    /// Direction the sun light travels.
    fn light_direction(&self) -> Vec3;

    /// Receives the primary camera matrices once the frame is drawn.
    fn update_camera(&mut self, view: Mat4, projection: Mat4);
}

/// GPU side of a frame.
///
/// Calls arrive as `begin_pass`, any number of draws, `end_pass`, four times per frame.
/// Every draw receives the complete device state it must render with.
pub trait FrameBackend {
    type Error;

    /// Size of the back buffer.
    fn viewport(&self) -> Viewport;

    /// Size of an offscreen target.
    fn target_extent(&self, target: RenderTargetId) -> Viewport;

    fn begin_pass(&mut self, pass: &PassDescriptor, state: &DeviceState) -> Result<(), Self::Error>;

    fn draw_terrain(
        &mut self,
        shading: &TerrainShading,
        camera: &CameraMatrices,
        state: &DeviceState,
    ) -> Result<(), Self::Error>;

    fn draw_sky(&mut self, camera: &CameraMatrices, state: &DeviceState) -> Result<(), Self::Error>;

    fn draw_water(&mut self, inputs: &CompositeInputs, state: &DeviceState) -> Result<(), Self::Error>;

    fn end_pass(&mut self) -> Result<(), Self::Error>;
}

/// What was drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawItem {
    Terrain(Option<ShaderKind>),
    Sky,
    Water,
}

/// One draw issued during a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawRecord {
    pub pass: PassKind,
    pub item: DrawItem,
    /// Whether a clip plane was active for the draw.
    pub clipped: bool,
}

/// Summary of a rendered frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub passes: Vec<PassKind>,
    pub draws: Vec<DrawRecord>,
    pub clip_enables: u32,
    pub clip_disables: u32,
    pub camera: CameraMatrices,
    pub reflection: ReflectionView,
}

/// Why a frame was not drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    ZeroViewport(Viewport),
    ZeroTarget(RenderTargetId),
}

/// Result of [`FramePipeline::render_frame`].
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    Rendered(Box<FrameReport>),
    Skipped(SkipReason),
}

impl FrameOutcome {
    #[must_use]
    pub fn report(&self) -> Option<&FrameReport> {
        match self {
            FrameOutcome::Rendered(report) => Some(report),
            FrameOutcome::Skipped(_) => None,
        }
    }
}

/// Sequences the passes of a frame and owns the device state they run with.
#[derive(Debug)]
pub struct FramePipeline {
    config: SceneConfig,
    tracker: StateTracker,
}

impl FramePipeline {
    #[must_use]
    pub fn new(config: SceneConfig) -> Self {
        Self {
            config,
            tracker: StateTracker::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Device state outside of any component scope.
    #[must_use]
    pub fn device_state(&self) -> &DeviceState {
        self.tracker.current()
    }

    /// Mirrored camera for `camera` at the given aspect ratio.
    #[must_use]
    pub fn compute_reflection(&self, camera: &FlyCamera, aspect: f32) -> ReflectionView {
        let cam = &self.config.camera;
        ReflectionView::compute(
            camera,
            self.config.water.height,
            aspect,
            cam.reflection_fov_y,
            cam.near,
            cam.far,
        )
    }

    /// Draws one frame. Returns `Skipped` without touching the backend's passes when
    /// the viewport or any offscreen target is empty.
    pub fn render_frame<B: FrameBackend>(
        &mut self,
        backend: &mut B,
        camera: &FlyCamera,
        time_seconds: f32,
        flare: &mut dyn FlareOcclusion,
    ) -> Result<FrameOutcome, B::Error> {
        let viewport = backend.viewport();
        let Some(aspect) = viewport.aspect_ratio() else {
            log::debug!(
                "skipping frame: viewport is {}x{}",
                viewport.width,
                viewport.height
            );
            return Ok(FrameOutcome::Skipped(SkipReason::ZeroViewport(viewport)));
        };
        for target in [
            RenderTargetId::SceneColor,
            RenderTargetId::Reflection,
            RenderTargetId::SceneDepth,
        ] {
            if backend.target_extent(target).is_empty() {
                log::debug!("skipping frame: {} target is empty", target.name());
                return Ok(FrameOutcome::Skipped(SkipReason::ZeroTarget(target)));
            }
        }

        let cam = self.config.camera.clone();
        let main = CameraMatrices {
            view: camera.view_matrix(),
            projection: FlyCamera::projection_matrix(cam.fov_y, aspect, cam.near, cam.far),
            position: camera.position(),
        };
        let light_direction = flare.light_direction();
        let lit = TerrainShading::Lit(self.lighting(light_direction));

        self.tracker.reset_counters();
        let mut frame = FrameRecorder::default();

        // 1. Half-resolution scene color
        self.begin(backend, &mut frame, PassKind::SceneColor)?;
        self.draw_terrain(backend, &mut frame, &lit, &main)?;
        backend.end_pass()?;

        // 2. Reflection, clipped to the half space above the water
        let reflection = self.compute_reflection(camera, aspect);
        let mirrored = CameraMatrices {
            view: reflection.view,
            projection: reflection.projection,
            position: reflection.camera.position(),
        };
        self.begin(backend, &mut frame, PassKind::Reflection)?;
        {
            let mut clipped = self.tracker.clip_to(reflection.clip_plane);
            clipped.scoped(&SKY_STATE, |state| {
                frame.record(DrawItem::Sky, state);
                backend.draw_sky(&mirrored, state)
            })?;
            clipped.scoped(&StateOverlay::NONE, |state| {
                frame.record(DrawItem::Terrain(None), state);
                backend.draw_terrain(&lit, &mirrored, state)
            })?;
        }
        backend.end_pass()?;

        // 3. Linear scene depth
        let depth = TerrainShading::Depth {
            near: cam.near,
            depth_range: cam.depth_range(),
        };
        self.begin(backend, &mut frame, PassKind::SceneDepth)?;
        self.draw_terrain(backend, &mut frame, &depth, &main)?;
        backend.end_pass()?;

        // 4. Back buffer: sky, terrain, water
        self.begin(backend, &mut frame, PassKind::Final)?;
        self.tracker.scoped(&SKY_STATE, |state| {
            frame.record(DrawItem::Sky, state);
            backend.draw_sky(&main, state)
        })?;
        self.draw_terrain(backend, &mut frame, &lit, &main)?;
        let composite = CompositeInputs {
            reflection_view_projection: reflection.view_projection,
            view: main.view,
            projection: main.projection,
            time_seconds,
            camera_position: camera.position(),
            light_direction,
            depth_range: cam.depth_range(),
        };
        self.tracker.scoped(&COMPOSITE_STATE, |state| {
            frame.record(DrawItem::Water, state);
            backend.draw_water(&composite, state)
        })?;
        backend.end_pass()?;

        // 5. Hand the primary camera to the flare
        flare.update_camera(main.view, main.projection);

        Ok(FrameOutcome::Rendered(Box::new(FrameReport {
            passes: frame.passes,
            draws: frame.draws,
            clip_enables: self.tracker.clip_enables(),
            clip_disables: self.tracker.clip_disables(),
            camera: main,
            reflection,
        })))
    }

    fn lighting(&self, light_direction: Vec3) -> SceneLighting {
        let lighting = &self.config.lighting;
        SceneLighting {
            light_direction,
            ambient: lighting.ambient,
            diffuse: lighting.diffuse,
            fog_start: lighting.fog_start,
            fog_end: lighting.fog_end,
            fog_color: lighting.fog_color,
        }
    }

    fn begin<B: FrameBackend>(
        &mut self,
        backend: &mut B,
        frame: &mut FrameRecorder,
        kind: PassKind,
    ) -> Result<(), B::Error> {
        let target = kind.target();
        self.tracker.bind_target(target);
        frame.begin(kind);

        let clear_color = if target == RenderTargetId::SceneDepth {
            Vec4::splat(self.config.depth_clear)
        } else {
            self.config.clear_color
        };
        let pass = PassDescriptor {
            kind,
            target,
            clear_color,
            clear_depth: 1.0,
        };
        backend.begin_pass(&pass, self.tracker.current())
    }

    fn draw_terrain<B: FrameBackend>(
        &self,
        backend: &mut B,
        frame: &mut FrameRecorder,
        shading: &TerrainShading,
        camera: &CameraMatrices,
    ) -> Result<(), B::Error> {
        let state = *self.tracker.current();
        frame.record(DrawItem::Terrain(shading.substitute()), &state);
        backend.draw_terrain(shading, camera, &state)
    }
}

#[derive(Debug, Default)]
struct FrameRecorder {
    passes: Vec<PassKind>,
    draws: Vec<DrawRecord>,
}

impl FrameRecorder {
    fn begin(&mut self, kind: PassKind) {
        self.passes.push(kind);
    }

    fn record(&mut self, item: DrawItem, state: &DeviceState) {
        let Some(&pass) = self.passes.last() else {
            return;
        };
        self.draws.push(DrawRecord {
            pass,
            item,
            clipped: state.clip_plane.is_some(),
        });
    }
}
