//! Rendering error types.

use lakeview_core::LakeviewError;
use thiserror::Error;

use crate::screenshot::ScreenshotError;

/// Errors that can occur during rendering operations.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Failed to create wgpu adapter.
    #[error("failed to create graphics adapter")]
    AdapterCreationFailed,

    /// Failed to create wgpu device.
    #[error("failed to create graphics device: {0}")]
    DeviceCreationFailed(#[from] wgpu::RequestDeviceError),

    /// Failed to create surface.
    #[error("failed to create surface: {0}")]
    SurfaceCreationFailed(#[from] wgpu::CreateSurfaceError),

    /// Buffer creation failed.
    #[error("buffer creation failed: {0}")]
    BufferCreationFailed(String),

    /// Texture creation failed.
    #[error("texture creation failed: {0}")]
    TextureCreationFailed(String),

    /// More per-draw uniform blocks were requested in one frame than the arena holds.
    #[error("uniform arena exhausted: {capacity} slots per frame")]
    UniformArenaExhausted { capacity: u32 },

    /// A draw was issued with device state its bind group layout cannot honor.
    #[error("device state contract violated: {0}")]
    StateContractViolation(String),

    /// A draw was issued outside of a render pass.
    #[error("no active render pass")]
    NoActivePass,

    /// Surface lost.
    #[error("surface lost")]
    SurfaceLost,

    /// Out of memory.
    #[error("out of memory")]
    OutOfMemory,

    /// Reading back or saving a frame failed.
    #[error("screenshot failed: {0}")]
    Screenshot(#[from] ScreenshotError),

    /// Error from the scene model.
    #[error(transparent)]
    Core(#[from] LakeviewError),
}

/// A specialized Result type for rendering operations.
pub type RenderResult<T> = std::result::Result<T, RenderError>;
