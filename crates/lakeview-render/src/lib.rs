//! Rendering backend for lakeview.
//!
//! This crate provides the wgpu implementation of the water scene:
//! - Device and surface management
//! - Offscreen targets (scene depth, reflection, half-resolution scene color)
//! - Terrain, skybox, planar water and screen-quad renderers
//! - [`scene::WaterScene`], which owns all of the above and drives
//!   [`lakeview_core::FramePipeline`] through its [`lakeview_core::FrameBackend`]

// Graphics code commonly uses casts between numeric types
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
// Documentation lints - internal functions don't need exhaustive docs
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
// Constructors with many GPU handles
#![allow(clippy::too_many_arguments)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]

pub mod engine;
pub mod error;
pub mod pipeline;
pub mod planar_water;
pub mod samplers;
pub mod scene;
pub mod screen_quad;
pub mod screenshot;
pub mod skybox;
pub mod targets;
pub mod terrain;
pub mod texture;
pub mod uniforms;

pub use engine::RenderEngine;
pub use error::{RenderError, RenderResult};
pub use scene::{SceneAssets, WaterScene};
