//! lakeview: a lake scene with a planar water surface.
//!
//! The binary wires [`lakeview_render::WaterScene`] to a winit window, a keyboard
//! driven free camera and assets loaded from disk or generated on the fly.

// Graphics code commonly uses casts between numeric types
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod app;
pub mod args;
pub mod assets;
pub mod error;
pub mod flare;
pub mod input;

pub use args::Args;
pub use error::{AppError, AppResult};

use lakeview_core::config::SceneConfig;

/// Loads the configuration and assets, then renders headless when a screenshot
/// path is given and opens the window otherwise.
pub fn run(args: Args) -> AppResult<()> {
    let config = match &args.config {
        Some(path) => {
            log::info!("loading configuration from {}", path.display());
            SceneConfig::load(path)?
        }
        None => SceneConfig::default(),
    };
    config.validate()?;
    let assets = assets::load_assets(&args)?;

    match args.screenshot.clone() {
        Some(path) => app::render_screenshot(&args, config, &assets, &path),
        None => app::run_app(args, config, assets),
    }
}
