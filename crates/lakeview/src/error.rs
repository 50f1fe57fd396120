//! Application error type.

use lakeview_core::LakeviewError;
use lakeview_render::RenderError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Scene(#[from] LakeviewError),

    #[error(transparent)]
    Render(#[from] RenderError),

    /// Terrain model could not be loaded.
    #[error("failed to load terrain {path}: {source}")]
    Terrain {
        path: String,
        #[source]
        source: tobj::LoadError,
    },

    /// Texture image could not be loaded.
    #[error("failed to load image {path}: {source}")]
    Image {
        path: String,
        #[source]
        source: image::ImageError,
    },

    /// An asset was found but has unusable content.
    #[error("invalid asset: {0}")]
    InvalidAsset(String),

    /// The headless frame was skipped.
    #[error("nothing rendered: {0}")]
    NothingRendered(String),

    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("window creation failed: {0}")]
    Window(#[from] winit::error::OsError),
}

pub type AppResult<T> = std::result::Result<T, AppError>;
