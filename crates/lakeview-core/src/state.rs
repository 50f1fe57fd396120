//! Device state model.
//!
//! Every draw receives an immutable [`DeviceState`] describing the target, blend,
//! depth, cull, per-slot sampler state and the optional user clip plane. Components
//! that need different state push a [`StateOverlay`] through [`StateTracker::scoped`],
//! which restores the previous state before returning.

use std::ops::{Deref, DerefMut};

use glam::Vec4;

/// Number of texture/sampler slots tracked.
pub const MAX_SAMPLER_SLOTS: usize = 8;

/// Texture coordinate addressing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    Clamp,
    #[default]
    Wrap,
}

/// Texture filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    Point,
    #[default]
    Linear,
}

/// Sampler state of one texture slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SamplerState {
    pub address: AddressMode,
    pub filter: FilterMode,
}

impl SamplerState {
    pub const POINT_CLAMP: Self = Self::new(AddressMode::Clamp, FilterMode::Point);
    pub const POINT_WRAP: Self = Self::new(AddressMode::Wrap, FilterMode::Point);
    pub const LINEAR_CLAMP: Self = Self::new(AddressMode::Clamp, FilterMode::Linear);
    pub const LINEAR_WRAP: Self = Self::new(AddressMode::Wrap, FilterMode::Linear);

    #[must_use]
    pub const fn new(address: AddressMode, filter: FilterMode) -> Self {
        Self { address, filter }
    }
}

/// Color blending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    #[default]
    Opaque,
    AlphaBlend,
}

/// Depth testing and writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DepthMode {
    /// Test and write.
    #[default]
    Default,
    /// Test without writing.
    ReadOnly,
    /// Neither test nor write.
    Disabled,
}

/// Face culling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    None,
    #[default]
    Back,
    Front,
}

/// The surfaces a pass can render into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderTargetId {
    /// The presented frame.
    #[default]
    BackBuffer,
    /// Half-resolution refraction source.
    SceneColor,
    /// Mirrored view of the scene above the water.
    Reflection,
    /// Normalized camera distance of the opaque scene.
    SceneDepth,
}

impl RenderTargetId {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            RenderTargetId::BackBuffer => "back buffer",
            RenderTargetId::SceneColor => "scene color",
            RenderTargetId::Reflection => "reflection",
            RenderTargetId::SceneDepth => "scene depth",
        }
    }
}

/// Full device state seen by a draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceState {
    pub target: RenderTargetId,
    pub blend: BlendMode,
    pub depth: DepthMode,
    pub cull: CullMode,
    pub samplers: [SamplerState; MAX_SAMPLER_SLOTS],
    /// Clip-space plane; fragments with `dot(plane, clip_pos) < 0` are discarded.
    pub clip_plane: Option<Vec4>,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            target: RenderTargetId::BackBuffer,
            blend: BlendMode::Opaque,
            depth: DepthMode::Default,
            cull: CullMode::Back,
            samplers: [SamplerState::LINEAR_WRAP; MAX_SAMPLER_SLOTS],
            clip_plane: None,
        }
    }
}

impl DeviceState {
    #[must_use]
    pub fn sampler(&self, slot: usize) -> Option<SamplerState> {
        self.samplers.get(slot).copied()
    }

    #[must_use]
    pub fn with_target(mut self, target: RenderTargetId) -> Self {
        self.target = target;
        self
    }
}

/// A partial state change. Fields left `None` keep the current value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateOverlay {
    pub blend: Option<BlendMode>,
    pub depth: Option<DepthMode>,
    pub cull: Option<CullMode>,
    pub samplers: &'static [(usize, SamplerState)],
}

impl StateOverlay {
    /// Changes nothing.
    pub const NONE: Self = Self {
        blend: None,
        depth: None,
        cull: None,
        samplers: &[],
    };

    /// `base` with this overlay applied. Slots past [`MAX_SAMPLER_SLOTS`] are ignored.
    #[must_use]
    pub fn apply_to(&self, base: &DeviceState) -> DeviceState {
        let mut state = *base;
        if let Some(blend) = self.blend {
            state.blend = blend;
        }
        if let Some(depth) = self.depth {
            state.depth = depth;
        }
        if let Some(cull) = self.cull {
            state.cull = cull;
        }
        for &(slot, sampler) in self.samplers {
            if let Some(s) = state.samplers.get_mut(slot) {
                *s = sampler;
            }
        }
        state
    }
}

/// Which parts of the device state differ between two states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StateDiff {
    pub target: bool,
    pub blend: bool,
    pub depth: bool,
    pub cull: bool,
    /// Bit `i` set when sampler slot `i` changed.
    pub samplers: u8,
    pub clip_plane: bool,
}

impl StateDiff {
    #[must_use]
    pub fn between(from: &DeviceState, to: &DeviceState) -> Self {
        let mut samplers = 0u8;
        for (slot, (a, b)) in from.samplers.iter().zip(to.samplers.iter()).enumerate() {
            if a != b {
                samplers |= 1 << slot;
            }
        }
        Self {
            target: from.target != to.target,
            blend: from.blend != to.blend,
            depth: from.depth != to.depth,
            cull: from.cull != to.cull,
            samplers,
            clip_plane: from.clip_plane != to.clip_plane,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Number of individual changes.
    #[must_use]
    pub fn change_count(&self) -> u32 {
        u32::from(self.target)
            + u32::from(self.blend)
            + u32::from(self.depth)
            + u32::from(self.cull)
            + self.samplers.count_ones()
            + u32::from(self.clip_plane)
    }
}

/// Owns the current device state and applies changes as diffs.
#[derive(Debug, Default)]
pub struct StateTracker {
    current: DeviceState,
    clip_enables: u32,
    clip_disables: u32,
}

impl StateTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn current(&self) -> &DeviceState {
        &self.current
    }

    /// Makes `next` current and returns what changed.
    pub fn apply(&mut self, next: DeviceState) -> StateDiff {
        let diff = StateDiff::between(&self.current, &next);
        if !diff.is_empty() {
            log::trace!("device state: {} change(s) {:?}", diff.change_count(), diff);
        }
        self.current = next;
        diff
    }

    pub fn bind_target(&mut self, target: RenderTargetId) -> StateDiff {
        self.apply(self.current.with_target(target))
    }

    /// Runs `f` with `overlay` applied, then restores the previous state.
    ///
    /// The restore happens whatever `f` returns, so a draw that fails with an `Err`
    /// still leaves the device state as it found it.
    pub fn scoped<R>(&mut self, overlay: &StateOverlay, f: impl FnOnce(&DeviceState) -> R) -> R {
        let saved = self.current;
        self.apply(overlay.apply_to(&saved));
        let result = f(&self.current);
        self.apply(saved);
        result
    }

    /// Enables the user clip plane until the returned scope is dropped.
    pub fn clip_to(&mut self, plane: Vec4) -> ClipPlaneScope<'_> {
        let previous = self.current.clip_plane;
        let mut next = self.current;
        next.clip_plane = Some(plane);
        self.apply(next);
        self.clip_enables += 1;
        log::trace!("clip plane enabled: {plane}");
        ClipPlaneScope {
            tracker: self,
            previous,
        }
    }

    #[must_use]
    pub fn clip_enables(&self) -> u32 {
        self.clip_enables
    }

    #[must_use]
    pub fn clip_disables(&self) -> u32 {
        self.clip_disables
    }

    pub fn reset_counters(&mut self) {
        self.clip_enables = 0;
        self.clip_disables = 0;
    }
}

/// Keeps the clip plane enabled while alive. Dereferences to the tracker so draws
/// can be issued through it.
#[derive(Debug)]
pub struct ClipPlaneScope<'a> {
    tracker: &'a mut StateTracker,
    previous: Option<Vec4>,
}

impl Deref for ClipPlaneScope<'_> {
    type Target = StateTracker;

    fn deref(&self) -> &StateTracker {
        self.tracker
    }
}

impl DerefMut for ClipPlaneScope<'_> {
    fn deref_mut(&mut self) -> &mut StateTracker {
        self.tracker
    }
}

impl Drop for ClipPlaneScope<'_> {
    fn drop(&mut self) {
        let mut next = self.tracker.current;
        next.clip_plane = self.previous;
        self.tracker.apply(next);
        self.tracker.clip_disables += 1;
        log::trace!("clip plane disabled");
    }
}
