//! Translation of device state into wgpu pipeline state, and a pipeline cache
//! keyed by that state.

use std::collections::HashMap;
use std::hash::Hash;

use lakeview_core::state::{BlendMode, CullMode, DepthMode, DeviceState};

use crate::targets::DEPTH_FORMAT;

/// The parts of a [`DeviceState`] baked into a render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub format: wgpu::TextureFormat,
    pub depth: DepthMode,
    pub cull: CullMode,
    pub blend: BlendMode,
}

impl PipelineKey {
    #[must_use]
    pub fn new(format: wgpu::TextureFormat, state: &DeviceState) -> Self {
        Self {
            format,
            depth: state.depth,
            cull: state.cull,
            blend: state.blend,
        }
    }

    #[must_use]
    pub fn primitive(&self) -> wgpu::PrimitiveState {
        wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: match self.cull {
                CullMode::None => None,
                CullMode::Back => Some(wgpu::Face::Back),
                CullMode::Front => Some(wgpu::Face::Front),
            },
            ..Default::default()
        }
    }

    /// Depth state against the pass's depth attachment. Every pass of a frame carries
    /// one, so disabled depth still needs an always-passing state.
    #[must_use]
    pub fn depth_stencil(&self) -> wgpu::DepthStencilState {
        let (depth_write_enabled, depth_compare) = match self.depth {
            DepthMode::Default => (true, wgpu::CompareFunction::LessEqual),
            DepthMode::ReadOnly => (false, wgpu::CompareFunction::LessEqual),
            DepthMode::Disabled => (false, wgpu::CompareFunction::Always),
        };
        wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled,
            depth_compare,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }
    }

    #[must_use]
    pub fn color_target(&self) -> wgpu::ColorTargetState {
        wgpu::ColorTargetState {
            format: self.format,
            blend: match self.blend {
                BlendMode::Opaque => None,
                BlendMode::AlphaBlend => Some(wgpu::BlendState::ALPHA_BLENDING),
            },
            write_mask: wgpu::ColorWrites::ALL,
        }
    }
}

/// Render pipelines created on first use.
pub struct PipelineCache<K> {
    pipelines: HashMap<K, wgpu::RenderPipeline>,
}

impl<K> Default for PipelineCache<K> {
    fn default() -> Self {
        Self {
            pipelines: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Copy + std::fmt::Debug> PipelineCache<K> {
    /// The pipeline for `key`, built by `create` when missing.
    pub fn get_or_create(
        &mut self,
        key: K,
        create: impl FnOnce(&K) -> wgpu::RenderPipeline,
    ) -> wgpu::RenderPipeline {
        self.pipelines
            .entry(key)
            .or_insert_with(|| {
                log::debug!("creating pipeline for {key:?}");
                create(&key)
            })
            .clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }
}
