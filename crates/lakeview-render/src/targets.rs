//! Offscreen render targets sampled by the water composite.

use lakeview_core::frame::Viewport;
use lakeview_core::state::RenderTargetId;

use crate::engine::RenderEngine;
use crate::error::{RenderError, RenderResult};

/// Format of the scene color and reflection targets.
pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
/// Format of the normalized scene depth target.
pub const SCENE_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R32Float;
/// Format of the depth-test attachments.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// A texture and its default view.
pub struct RenderTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
}

impl RenderTarget {
    fn new(
        device: &wgpu::Device,
        label: &str,
        extent: Viewport,
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
    ) -> RenderResult<Self> {
        let texture = RenderEngine::checked_allocation(
            device,
            label,
            RenderError::TextureCreationFailed,
            || {
                device.create_texture(&wgpu::TextureDescriptor {
                    label: Some(label),
                    size: wgpu::Extent3d {
                        width: extent.width,
                        height: extent.height,
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format,
                    usage,
                    view_formats: &[],
                })
            },
        )?;
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(Self {
            texture,
            view,
            width: extent.width,
            height: extent.height,
            format,
        })
    }

    #[must_use]
    pub fn extent(&self) -> Viewport {
        Viewport::new(self.width, self.height)
    }
}

/// Sizes of the offscreen targets for a back buffer of `viewport`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetExtents {
    pub full: Viewport,
    pub scene_color: Viewport,
}

impl TargetExtents {
    #[must_use]
    pub fn for_viewport(viewport: Viewport, scene_color_divisor: u32) -> Self {
        Self {
            full: viewport,
            scene_color: viewport.scaled_down(scene_color_divisor),
        }
    }
}

/// The three captured targets plus the depth attachments their passes test against.
pub struct OffscreenTargets {
    pub scene_color: RenderTarget,
    pub reflection: RenderTarget,
    pub scene_depth: RenderTarget,
    /// Depth attachment for full-resolution passes.
    pub full_depth: RenderTarget,
    /// Depth attachment for the scene color pass.
    pub half_depth: RenderTarget,
}

impl OffscreenTargets {
    /// Allocates targets for a back buffer of `viewport`. Fails when the viewport is
    /// empty or larger than the device allows.
    pub fn new(device: &wgpu::Device, viewport: Viewport, scene_color_divisor: u32) -> RenderResult<Self> {
        let max = device.limits().max_texture_dimension_2d;
        if viewport.is_empty() || viewport.width > max || viewport.height > max {
            return Err(RenderError::TextureCreationFailed(format!(
                "offscreen targets of {}x{} (device limit {max})",
                viewport.width, viewport.height
            )));
        }

        let extents = TargetExtents::for_viewport(viewport, scene_color_divisor);
        let sampled = wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC;
        let attachment = wgpu::TextureUsages::RENDER_ATTACHMENT;

        let targets = Self {
            scene_color: RenderTarget::new(
                device,
                "Scene Color Target",
                extents.scene_color,
                COLOR_FORMAT,
                sampled,
            )?,
            reflection: RenderTarget::new(device, "Reflection Target", extents.full, COLOR_FORMAT, sampled)?,
            scene_depth: RenderTarget::new(
                device,
                "Scene Depth Target",
                extents.full,
                SCENE_DEPTH_FORMAT,
                sampled,
            )?,
            full_depth: RenderTarget::new(device, "Depth Attachment", extents.full, DEPTH_FORMAT, attachment)?,
            half_depth: RenderTarget::new(
                device,
                "Half Depth Attachment",
                extents.scene_color,
                DEPTH_FORMAT,
                attachment,
            )?,
        };
        log::debug!(
            "offscreen targets allocated: {}x{} full, {}x{} scene color",
            extents.full.width,
            extents.full.height,
            extents.scene_color.width,
            extents.scene_color.height
        );
        Ok(targets)
    }

    /// The color target behind `id`, or `None` for the back buffer.
    #[must_use]
    pub fn get(&self, id: RenderTargetId) -> Option<&RenderTarget> {
        match id {
            RenderTargetId::BackBuffer => None,
            RenderTargetId::SceneColor => Some(&self.scene_color),
            RenderTargetId::Reflection => Some(&self.reflection),
            RenderTargetId::SceneDepth => Some(&self.scene_depth),
        }
    }

    /// Depth attachment matching the size of `id`.
    #[must_use]
    pub fn depth_for(&self, id: RenderTargetId) -> &RenderTarget {
        match id {
            RenderTargetId::SceneColor => &self.half_depth,
            _ => &self.full_depth,
        }
    }

    /// Size of `id`'s target. The back buffer shares the full-resolution extent.
    #[must_use]
    pub fn extent(&self, id: RenderTargetId) -> Viewport {
        self.get(id).map_or(self.full_depth.extent(), RenderTarget::extent)
    }
}
