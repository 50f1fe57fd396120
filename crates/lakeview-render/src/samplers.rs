//! wgpu samplers for the device-state sampler model.

use std::collections::HashMap;

use lakeview_core::state::{AddressMode, FilterMode, SamplerState};

/// Lazily created samplers, one per distinct [`SamplerState`].
#[derive(Default)]
pub struct SamplerCache {
    samplers: HashMap<SamplerState, wgpu::Sampler>,
}

impl SamplerCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The sampler for `state`, created on first use.
    pub fn get(&mut self, device: &wgpu::Device, state: SamplerState) -> wgpu::Sampler {
        self.samplers
            .entry(state)
            .or_insert_with(|| {
                log::trace!("creating sampler {state:?}");
                device.create_sampler(&descriptor(state))
            })
            .clone()
    }

    /// Number of samplers created so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samplers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samplers.is_empty()
    }
}

/// Whether a sampler with `state` may be bound to a non-filtering binding.
#[must_use]
pub fn is_non_filtering(state: SamplerState) -> bool {
    state.filter == FilterMode::Point
}

fn address_mode(mode: AddressMode) -> wgpu::AddressMode {
    match mode {
        AddressMode::Clamp => wgpu::AddressMode::ClampToEdge,
        AddressMode::Wrap => wgpu::AddressMode::Repeat,
    }
}

fn filter_mode(mode: FilterMode) -> wgpu::FilterMode {
    match mode {
        FilterMode::Point => wgpu::FilterMode::Nearest,
        FilterMode::Linear => wgpu::FilterMode::Linear,
    }
}

fn descriptor(state: SamplerState) -> wgpu::SamplerDescriptor<'static> {
    let address = address_mode(state.address);
    let filter = filter_mode(state.filter);
    wgpu::SamplerDescriptor {
        label: Some(match (state.address, state.filter) {
            (AddressMode::Clamp, FilterMode::Point) => "Point Clamp Sampler",
            (AddressMode::Clamp, FilterMode::Linear) => "Linear Clamp Sampler",
            (AddressMode::Wrap, FilterMode::Point) => "Point Wrap Sampler",
            (AddressMode::Wrap, FilterMode::Linear) => "Linear Wrap Sampler",
        }),
        address_mode_u: address,
        address_mode_v: address,
        address_mode_w: address,
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_clamp_descriptor() {
        let desc = descriptor(SamplerState::POINT_CLAMP);
        assert_eq!(desc.address_mode_u, wgpu::AddressMode::ClampToEdge);
        assert_eq!(desc.mag_filter, wgpu::FilterMode::Nearest);
        assert_eq!(desc.label, Some("Point Clamp Sampler"));
    }

    #[test]
    fn test_linear_wrap_descriptor() {
        let desc = descriptor(SamplerState::LINEAR_WRAP);
        assert_eq!(desc.address_mode_v, wgpu::AddressMode::Repeat);
        assert_eq!(desc.min_filter, wgpu::FilterMode::Linear);
    }

    #[test]
    fn test_non_filtering() {
        assert!(is_non_filtering(SamplerState::POINT_CLAMP));
        assert!(is_non_filtering(SamplerState::POINT_WRAP));
        assert!(!is_non_filtering(SamplerState::LINEAR_CLAMP));
    }
}
