//! Window, event loop and per-frame driving of the water scene.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use lakeview_core::camera::FlyCamera;
use lakeview_core::config::SceneConfig;
use lakeview_core::frame::{FrameOutcome, Viewport};
use lakeview_core::state::RenderTargetId;
use lakeview_render::{RenderEngine, SceneAssets, WaterScene};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::args::Args;
use crate::error::{AppError, AppResult};
use crate::flare::SunFlare;
use crate::input::{CameraInput, FreeCameraController};

/// Offscreen target shown by a debug overlay key, if `code` is one.
#[must_use]
pub fn overlay_for_key(code: KeyCode) -> Option<RenderTargetId> {
    match code {
        KeyCode::F1 => Some(RenderTargetId::SceneDepth),
        KeyCode::F2 => Some(RenderTargetId::Reflection),
        KeyCode::F3 => Some(RenderTargetId::SceneColor),
        _ => None,
    }
}

/// Pressing the key of the shown overlay hides it; any other overlay key switches.
#[must_use]
pub fn toggle_overlay(current: Option<RenderTargetId>, pressed: RenderTargetId) -> Option<RenderTargetId> {
    if current == Some(pressed) {
        None
    } else {
        Some(pressed)
    }
}

/// Whether a frame with this outcome goes to the screen. A skipped frame drew
/// nothing, so its surface texture is dropped instead.
#[must_use]
pub fn should_present(outcome: &FrameOutcome) -> bool {
    matches!(outcome, FrameOutcome::Rendered(_))
}

/// GPU state that only exists once the window does.
struct Windowed {
    window: Arc<Window>,
    engine: RenderEngine,
    scene: WaterScene,
}

/// The lakeview application state.
pub struct App {
    args: Args,
    config: SceneConfig,
    assets: SceneAssets,
    windowed: Option<Windowed>,
    controller: FreeCameraController,
    camera: FlyCamera,
    sun: SunFlare,
    // Keys currently held, for camera movement
    keys_down: HashSet<KeyCode>,
    overlay: Option<RenderTargetId>,
    screenshot_pending: Option<PathBuf>,
    screenshot_counter: u32,
    started: Instant,
    last_frame_time: Option<Instant>,
    frames: u64,
    close_requested: bool,
    error: Option<AppError>,
}

impl App {
    pub fn new(args: Args, config: SceneConfig, assets: SceneAssets) -> AppResult<Self> {
        let controller = FreeCameraController::new(config.camera.clone());
        let camera = controller.initial_camera()?;
        Ok(Self {
            args,
            config,
            assets,
            windowed: None,
            controller,
            camera,
            sun: SunFlare::default(),
            keys_down: HashSet::new(),
            overlay: None,
            screenshot_pending: None,
            screenshot_counter: 0,
            started: Instant::now(),
            last_frame_time: None,
            frames: 0,
            close_requested: false,
            error: None,
        })
    }

    /// Requests a screenshot with an auto-generated filename.
    pub fn request_auto_screenshot(&mut self) {
        let filename = format!("lakeview_{:04}.png", self.screenshot_counter);
        self.screenshot_counter += 1;
        self.screenshot_pending = Some(PathBuf::from(filename));
    }

    /// The error that ended the event loop, if any.
    pub fn take_error(&mut self) -> Option<AppError> {
        self.error.take()
    }

    fn fail(&mut self, error: AppError) {
        log::error!("{error}");
        self.error = Some(error);
        self.close_requested = true;
    }

    fn init_window(&mut self, event_loop: &ActiveEventLoop) -> AppResult<()> {
        let window_attributes = Window::default_attributes()
            .with_title("lakeview")
            .with_inner_size(LogicalSize::new(self.args.width, self.args.height));
        let window = Arc::new(event_loop.create_window(window_attributes)?);

        let engine = pollster::block_on(RenderEngine::new_windowed(window.clone()))?;
        let scene = WaterScene::new(&engine, self.config.clone(), &self.assets)?;

        window.request_redraw();
        self.windowed = Some(Windowed {
            window,
            engine,
            scene,
        });
        Ok(())
    }

    fn handle_key(&mut self, code: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                self.keys_down.insert(code);
                match code {
                    KeyCode::Escape => self.close_requested = true,
                    KeyCode::F12 => {
                        self.request_auto_screenshot();
                        log::info!("screenshot requested (F12)");
                    }
                    _ => {
                        if let Some(target) = overlay_for_key(code) {
                            self.overlay = toggle_overlay(self.overlay, target);
                            log::info!("debug overlay: {:?}", self.overlay);
                        }
                    }
                }
            }
            ElementState::Released => {
                self.keys_down.remove(&code);
            }
        }
    }

    fn resize(&mut self, width: u32, height: u32) -> AppResult<()> {
        let Some(windowed) = &mut self.windowed else {
            return Ok(());
        };
        windowed.engine.resize(width, height);
        let viewport = Viewport::new(width, height);
        windowed.scene.resize(&windowed.engine.device, viewport)?;
        // Redraws stop while minimized; restoring the window starts them again
        if !viewport.is_empty() {
            windowed.window.request_redraw();
        }
        Ok(())
    }

    /// Moves the camera, then renders and presents one frame.
    fn redraw(&mut self) -> AppResult<()> {
        let now = Instant::now();
        let elapsed_ms = self
            .last_frame_time
            .map_or(0.0, |last| now.duration_since(last).as_secs_f32() * 1000.0);
        self.last_frame_time = Some(now);

        let input = CameraInput::from_keys(&self.keys_down);
        self.controller.update(&mut self.camera, input, elapsed_ms)?;

        let Some(windowed) = &mut self.windowed else {
            return Ok(());
        };
        let time = now.duration_since(self.started).as_secs_f32();

        let size = windowed.window.inner_size();
        if Viewport::new(size.width, size.height).is_empty() {
            log::trace!("window is minimized, waiting for a resize");
            return Ok(());
        }

        if let Some(path) = self.screenshot_pending.take() {
            // A failed screenshot is not worth stopping the scene for
            if let Err(e) = windowed.scene.save_screenshot(
                &windowed.engine,
                &path,
                &self.camera,
                time,
                &mut self.sun,
            ) {
                log::error!("screenshot {} failed: {e}", path.display());
            }
        }

        let Some(frame) = windowed.engine.acquire_frame()? else {
            windowed.window.request_redraw();
            return Ok(());
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let outcome = windowed.scene.render_frame(
            &windowed.engine,
            &view,
            &self.camera,
            time,
            &mut self.sun,
        )?;
        if !should_present(&outcome) {
            log::trace!("frame skipped: {outcome:?}");
            return Ok(());
        }
        if let Some(target) = self.overlay {
            windowed
                .scene
                .render_debug_overlay(&windowed.engine, &view, target)?;
        }
        frame.present();

        self.frames += 1;
        if self.args.max_frames.is_some_and(|max| self.frames >= max) {
            log::info!("rendered {} frames, exiting", self.frames);
            self.close_requested = true;
        } else {
            windowed.window.request_redraw();
        }
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.windowed.is_some() {
            return;
        }
        if let Err(e) = self.init_window(event_loop) {
            self.fail(e);
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let result = match event {
            WindowEvent::CloseRequested => {
                self.close_requested = true;
                Ok(())
            }
            WindowEvent::Resized(size) => self.resize(size.width, size.height),
            WindowEvent::RedrawRequested => self.redraw(),
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    self.handle_key(code, event.state);
                }
                Ok(())
            }
            _ => Ok(()),
        };

        if let Err(e) = result {
            self.fail(e);
        }
        if self.close_requested {
            event_loop.exit();
        }
    }
}

/// Opens the window and runs until it is closed or a frame fails.
pub fn run_app(args: Args, config: SceneConfig, assets: SceneAssets) -> AppResult<()> {
    let event_loop = EventLoop::new()?;
    let mut app = App::new(args, config, assets)?;
    event_loop.run_app(&mut app)?;
    match app.take_error() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

/// Renders one frame without a window and saves it to `path`.
pub fn render_screenshot(
    args: &Args,
    config: SceneConfig,
    assets: &SceneAssets,
    path: &std::path::Path,
) -> AppResult<()> {
    let engine = pollster::block_on(RenderEngine::new_headless(args.width, args.height))?;
    let controller = FreeCameraController::new(config.camera.clone());
    let camera = controller.initial_camera()?;
    let mut scene = WaterScene::new(&engine, config, assets)?;
    let mut sun = SunFlare::default();

    match scene.save_screenshot(&engine, path, &camera, args.time, &mut sun)? {
        FrameOutcome::Rendered(report) => {
            log::info!(
                "rendered {} passes, {} draws into {}",
                report.passes.len(),
                report.draws.len(),
                path.display()
            );
            Ok(())
        }
        FrameOutcome::Skipped(reason) => Err(AppError::NothingRendered(format!("{reason:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_keys() {
        assert_eq!(overlay_for_key(KeyCode::F1), Some(RenderTargetId::SceneDepth));
        assert_eq!(overlay_for_key(KeyCode::F2), Some(RenderTargetId::Reflection));
        assert_eq!(overlay_for_key(KeyCode::F3), Some(RenderTargetId::SceneColor));
        assert_eq!(overlay_for_key(KeyCode::F12), None);
    }

    #[test]
    fn test_overlay_toggle() {
        let shown = toggle_overlay(None, RenderTargetId::Reflection);
        assert_eq!(shown, Some(RenderTargetId::Reflection));
        let switched = toggle_overlay(shown, RenderTargetId::SceneDepth);
        assert_eq!(switched, Some(RenderTargetId::SceneDepth));
        assert_eq!(toggle_overlay(switched, RenderTargetId::SceneDepth), None);
    }

    #[test]
    fn test_skipped_frames_are_not_presented() {
        use lakeview_core::frame::SkipReason;

        let skipped = FrameOutcome::Skipped(SkipReason::ZeroViewport(Viewport::new(0, 0)));
        assert!(!should_present(&skipped));
        let empty_target = FrameOutcome::Skipped(SkipReason::ZeroTarget(RenderTargetId::Reflection));
        assert!(!should_present(&empty_target));
    }
}
