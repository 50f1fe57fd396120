//! Core model for lakeview.
//!
//! This crate holds everything about the water scene that does not touch the GPU:
//! - The flying camera and its pitch lock
//! - Planar reflection math (mirrored camera, clip planes)
//! - Water grid, skybox and screen quad geometry
//! - The device-state model and its scoped tracker
//! - The per-frame pass choreography, driven through [`frame::FrameBackend`]

// Graphics code commonly uses casts between numeric types
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
// Documentation lints - internal functions don't need exhaustive docs
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]

pub mod camera;
pub mod config;
pub mod error;
pub mod frame;
pub mod model;
pub mod reflection;
pub mod screen_quad;
pub mod skybox;
pub mod state;
pub mod water_grid;

pub use camera::FlyCamera;
pub use config::SceneConfig;
pub use error::{LakeviewError, Result};
pub use frame::{FrameBackend, FrameOutcome, FramePipeline, FrameReport};
pub use reflection::{Plane, ReflectionView};
pub use state::{DeviceState, RenderTargetId, SamplerState, StateTracker};
pub use water_grid::{WaterGrid, WaterTransform};

/// Re-export glam for convenience.
pub use glam;
