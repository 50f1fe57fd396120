//! Pass ordering and device-state discipline of the frame pipeline, checked
//! against a recording backend.

use lakeview_core::camera::FlyCamera;
use lakeview_core::config::SceneConfig;
use lakeview_core::frame::{
    CameraMatrices, CompositeInputs, DrawItem, FlareOcclusion, FrameBackend, FrameOutcome,
    FramePipeline, PassDescriptor, PassKind, SkipReason, TerrainShading, Viewport,
};
use lakeview_core::glam::{Mat4, Vec3};
use lakeview_core::model::ShaderKind;
use lakeview_core::state::{DepthMode, DeviceState, RenderTargetId, SamplerState};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Begin(PassDescriptor),
    Terrain(Option<ShaderKind>, DeviceState),
    Sky(DeviceState),
    Water(CompositeInputs, DeviceState),
    End,
}

struct RecordingBackend {
    viewport: Viewport,
    calls: Vec<Call>,
    fail_on_sky: bool,
    // Target reported as unallocated
    empty_target: Option<RenderTargetId>,
}

impl RecordingBackend {
    fn new(width: u32, height: u32) -> Self {
        Self {
            viewport: Viewport::new(width, height),
            calls: Vec::new(),
            fail_on_sky: false,
            empty_target: None,
        }
    }
}

impl FrameBackend for RecordingBackend {
    type Error = String;

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn target_extent(&self, target: RenderTargetId) -> Viewport {
        if self.empty_target == Some(target) {
            return Viewport::new(0, 0);
        }
        match target {
            RenderTargetId::SceneColor => self.viewport.scaled_down(2),
            _ => self.viewport,
        }
    }

    fn begin_pass(&mut self, pass: &PassDescriptor, state: &DeviceState) -> Result<(), String> {
        assert_eq!(pass.target, state.target);
        self.calls.push(Call::Begin(*pass));
        Ok(())
    }

    fn draw_terrain(
        &mut self,
        shading: &TerrainShading,
        _camera: &CameraMatrices,
        state: &DeviceState,
    ) -> Result<(), String> {
        self.calls.push(Call::Terrain(shading.substitute(), *state));
        Ok(())
    }

    fn draw_sky(&mut self, _camera: &CameraMatrices, state: &DeviceState) -> Result<(), String> {
        self.calls.push(Call::Sky(*state));
        if self.fail_on_sky {
            return Err("sky draw failed".to_string());
        }
        Ok(())
    }

    fn draw_water(&mut self, inputs: &CompositeInputs, state: &DeviceState) -> Result<(), String> {
        self.calls.push(Call::Water(*inputs, *state));
        Ok(())
    }

    fn end_pass(&mut self) -> Result<(), String> {
        self.calls.push(Call::End);
        Ok(())
    }
}

#[derive(Default)]
struct TestFlare {
    received: Option<(Mat4, Mat4)>,
}

impl FlareOcclusion for TestFlare {
    fn light_direction(&self) -> Vec3 {
        Vec3::new(-0.5, -0.3, 0.2).normalize()
    }

    fn update_camera(&mut self, view: Mat4, projection: Mat4) {
        self.received = Some((view, projection));
    }
}

fn start_camera() -> FlyCamera {
    FlyCamera::new(Vec3::new(-200.0, 50.0, 0.0), Vec3::X).unwrap()
}

fn render(backend: &mut RecordingBackend, pipeline: &mut FramePipeline) -> FrameOutcome {
    let mut flare = TestFlare::default();
    pipeline
        .render_frame(backend, &start_camera(), 1.5, &mut flare)
        .unwrap()
}

#[test]
fn test_passes_run_in_order() {
    let mut backend = RecordingBackend::new(1280, 720);
    let mut pipeline = FramePipeline::new(SceneConfig::default());
    let outcome = render(&mut backend, &mut pipeline);

    let report = outcome.report().unwrap();
    assert_eq!(report.passes, PassKind::ORDER.to_vec());

    let begins: Vec<RenderTargetId> = backend
        .calls
        .iter()
        .filter_map(|c| match c {
            Call::Begin(pass) => Some(pass.target),
            _ => None,
        })
        .collect();
    assert_eq!(
        begins,
        vec![
            RenderTargetId::SceneColor,
            RenderTargetId::Reflection,
            RenderTargetId::SceneDepth,
            RenderTargetId::BackBuffer,
        ]
    );
    let ends = backend.calls.iter().filter(|c| **c == Call::End).count();
    assert_eq!(ends, 4);
}

#[test]
fn test_draw_sequence() {
    let mut backend = RecordingBackend::new(1280, 720);
    let mut pipeline = FramePipeline::new(SceneConfig::default());
    let outcome = render(&mut backend, &mut pipeline);
    let report = outcome.report().unwrap();

    let items: Vec<(PassKind, DrawItem)> = report.draws.iter().map(|d| (d.pass, d.item)).collect();
    assert_eq!(
        items,
        vec![
            (PassKind::SceneColor, DrawItem::Terrain(None)),
            (PassKind::Reflection, DrawItem::Sky),
            (PassKind::Reflection, DrawItem::Terrain(None)),
            (PassKind::SceneDepth, DrawItem::Terrain(Some(ShaderKind::SceneDepth))),
            (PassKind::Final, DrawItem::Sky),
            (PassKind::Final, DrawItem::Terrain(None)),
            (PassKind::Final, DrawItem::Water),
        ]
    );
}

#[test]
fn test_clip_plane_only_in_reflection_pass() {
    let mut backend = RecordingBackend::new(1280, 720);
    let mut pipeline = FramePipeline::new(SceneConfig::default());
    let outcome = render(&mut backend, &mut pipeline);
    let report = outcome.report().unwrap();

    for draw in &report.draws {
        assert_eq!(draw.clipped, draw.pass == PassKind::Reflection, "{draw:?}");
    }
    assert_eq!(report.clip_enables, 1);
    assert_eq!(report.clip_disables, 1);
    assert!(pipeline.device_state().clip_plane.is_none());
}

#[test]
fn test_clip_plane_balanced_across_frames() {
    let mut backend = RecordingBackend::new(800, 600);
    let mut pipeline = FramePipeline::new(SceneConfig::default());
    for _ in 0..3 {
        let outcome = render(&mut backend, &mut pipeline);
        let report = outcome.report().unwrap();
        assert_eq!(report.clip_enables, report.clip_disables);
        assert_eq!(report.clip_enables, 1);
    }
    // The first draw of every frame sees no stale plane
    let first_draws = backend.calls.iter().filter_map(|c| match c {
        Call::Terrain(_, state) if state.target == RenderTargetId::SceneColor => Some(state),
        _ => None,
    });
    for state in first_draws {
        assert!(state.clip_plane.is_none());
    }
}

#[test]
fn test_depth_pass_clears_to_far_sentinel() {
    let mut backend = RecordingBackend::new(1280, 720);
    let mut pipeline = FramePipeline::new(SceneConfig::default());
    render(&mut backend, &mut pipeline);

    let depth_pass = backend
        .calls
        .iter()
        .find_map(|c| match c {
            Call::Begin(pass) if pass.kind == PassKind::SceneDepth => Some(*pass),
            _ => None,
        })
        .unwrap();
    assert_eq!(depth_pass.clear_color.x, 1.0);
}

#[test]
fn test_sky_state_is_scoped() {
    let mut backend = RecordingBackend::new(1280, 720);
    let mut pipeline = FramePipeline::new(SceneConfig::default());
    render(&mut backend, &mut pipeline);

    let mut saw_sky = false;
    for call in &backend.calls {
        match call {
            Call::Sky(state) => {
                saw_sky = true;
                assert_eq!(state.depth, DepthMode::Disabled);
            }
            Call::Terrain(_, state) => assert_eq!(state.depth, DepthMode::Default),
            _ => {}
        }
    }
    assert!(saw_sky);
    assert_eq!(*pipeline.device_state(), DeviceState::default());
}

#[test]
fn test_water_receives_composite_inputs() {
    let mut backend = RecordingBackend::new(1280, 720);
    let mut pipeline = FramePipeline::new(SceneConfig::default());
    let outcome = render(&mut backend, &mut pipeline);
    let report = outcome.report().unwrap();

    let (inputs, state) = backend
        .calls
        .iter()
        .find_map(|c| match c {
            Call::Water(inputs, state) => Some((*inputs, *state)),
            _ => None,
        })
        .unwrap();
    assert_eq!(inputs.reflection_view_projection, report.reflection.view_projection);
    assert_eq!(inputs.view, report.camera.view);
    assert_eq!(inputs.time_seconds, 1.5);
    assert_eq!(inputs.camera_position, Vec3::new(-200.0, 50.0, 0.0));
    assert_eq!(state.target, RenderTargetId::BackBuffer);
    assert_eq!(state.samplers[0], SamplerState::POINT_CLAMP);
    assert_eq!(state.samplers[1], SamplerState::LINEAR_CLAMP);
    assert_eq!(state.samplers[2], SamplerState::LINEAR_CLAMP);
    assert!(state.clip_plane.is_none());

    // Restored once the composite returns
    assert_eq!(pipeline.device_state().samplers[0], SamplerState::LINEAR_WRAP);
}

#[test]
fn test_reflection_scenario() {
    let mut backend = RecordingBackend::new(1280, 720);
    let mut pipeline = FramePipeline::new(SceneConfig::default());
    let outcome = render(&mut backend, &mut pipeline);
    let reflection = outcome.report().unwrap().reflection;

    assert!(reflection
        .camera
        .position()
        .abs_diff_eq(Vec3::new(-200.0, -2.0, 0.0), 1e-5));
    assert!(reflection.camera.forward().abs_diff_eq(Vec3::X, 1e-6));
}

#[test]
fn test_flare_receives_primary_camera() {
    let mut backend = RecordingBackend::new(1280, 720);
    let mut pipeline = FramePipeline::new(SceneConfig::default());
    let mut flare = TestFlare::default();
    let outcome = pipeline
        .render_frame(&mut backend, &start_camera(), 0.0, &mut flare)
        .unwrap();
    let report = outcome.report().unwrap();
    assert_eq!(flare.received, Some((report.camera.view, report.camera.projection)));
}

#[test]
fn test_zero_viewport_is_a_no_op() {
    let mut backend = RecordingBackend::new(0, 720);
    let mut pipeline = FramePipeline::new(SceneConfig::default());
    let mut flare = TestFlare::default();
    let outcome = pipeline
        .render_frame(&mut backend, &start_camera(), 0.0, &mut flare)
        .unwrap();

    assert_eq!(
        outcome,
        FrameOutcome::Skipped(SkipReason::ZeroViewport(Viewport::new(0, 720)))
    );
    assert!(backend.calls.is_empty());
    assert!(flare.received.is_none());
}

#[test]
fn test_empty_target_is_a_no_op() {
    let mut backend = RecordingBackend::new(1280, 720);
    backend.empty_target = Some(RenderTargetId::SceneColor);
    let mut pipeline = FramePipeline::new(SceneConfig::default());
    let mut flare = TestFlare::default();
    let outcome = pipeline
        .render_frame(&mut backend, &start_camera(), 0.0, &mut flare)
        .unwrap();

    assert_eq!(
        outcome,
        FrameOutcome::Skipped(SkipReason::ZeroTarget(RenderTargetId::SceneColor))
    );
    assert!(backend.calls.is_empty());
    assert!(flare.received.is_none());
    assert!(pipeline.device_state().clip_plane.is_none());
}

#[test]
fn test_any_empty_target_skips_the_frame() {
    for target in [RenderTargetId::Reflection, RenderTargetId::SceneDepth] {
        let mut backend = RecordingBackend::new(1280, 720);
        backend.empty_target = Some(target);
        let mut pipeline = FramePipeline::new(SceneConfig::default());
        let outcome = render(&mut backend, &mut pipeline);
        assert_eq!(outcome, FrameOutcome::Skipped(SkipReason::ZeroTarget(target)));
        assert!(backend.calls.is_empty());
    }
}

#[test]
fn test_failed_draw_leaves_state_clean() {
    let mut backend = RecordingBackend::new(1280, 720);
    backend.fail_on_sky = true;
    let mut pipeline = FramePipeline::new(SceneConfig::default());
    let mut flare = TestFlare::default();

    let result = pipeline.render_frame(&mut backend, &start_camera(), 0.0, &mut flare);
    assert_eq!(result.unwrap_err(), "sky draw failed");

    let state = pipeline.device_state();
    assert!(state.clip_plane.is_none());
    assert_eq!(state.depth, DepthMode::Default);
}
