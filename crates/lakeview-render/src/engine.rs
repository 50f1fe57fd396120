//! Device, queue and presentation surface.

use std::sync::Arc;

use crate::error::{RenderError, RenderResult};
use crate::screenshot::ScreenshotError;

/// Format of headless output images.
pub const HEADLESS_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// The wgpu device and, when windowed, the surface it presents to.
pub struct RenderEngine {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    /// Presentation surface; `None` when rendering offscreen only.
    pub surface: Option<wgpu::Surface<'static>>,
    /// Output configuration. Headless engines keep one too, for the output format.
    pub surface_config: wgpu::SurfaceConfiguration,
    /// Output size in pixels.
    pub width: u32,
    pub height: u32,
}

impl RenderEngine {
    /// Opens a device presenting to `window`, preferring an sRGB surface format.
    pub async fn new_windowed(window: Arc<winit::window::Window>) -> RenderResult<Self> {
        let instance = Self::create_instance();
        let surface = instance.create_surface(window.clone())?;
        let adapter = Self::request_adapter(&instance, Some(&surface)).await?;
        let (device, queue) = Self::request_device(&adapter, "lakeview device").await?;

        let size = window.inner_size();
        let (width, height) = (size.width.max(1), size.height.max(1));

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(wgpu::TextureFormat::is_srgb)
            .or_else(|| caps.formats.first().copied())
            .ok_or(RenderError::AdapterCreationFailed)?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        Self::log_ready(&adapter, "window", width, height, format);
        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            surface: Some(surface),
            surface_config,
            width,
            height,
        })
    }

    /// Opens a device that renders into offscreen `HEADLESS_FORMAT` images.
    pub async fn new_headless(width: u32, height: u32) -> RenderResult<Self> {
        let instance = Self::create_instance();
        let adapter = Self::request_adapter(&instance, None).await?;
        let (device, queue) = Self::request_device(&adapter, "lakeview device (headless)").await?;

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            format: HEADLESS_FORMAT,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        Self::log_ready(&adapter, "headless", width, height, HEADLESS_FORMAT);
        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            surface: None,
            surface_config,
            width,
            height,
        })
    }

    fn create_instance() -> wgpu::Instance {
        wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        })
    }

    async fn request_adapter(
        instance: &wgpu::Instance,
        surface: Option<&wgpu::Surface<'static>>,
    ) -> RenderResult<wgpu::Adapter> {
        instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: surface,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| {
                log::error!("no suitable graphics adapter: {e}");
                RenderError::AdapterCreationFailed
            })
    }

    fn log_ready(
        adapter: &wgpu::Adapter,
        mode: &str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) {
        let info = adapter.get_info();
        log::info!(
            "render engine ready ({mode}): {} ({:?}), {width}x{height} {format:?}",
            info.name,
            info.backend
        );
    }

    async fn request_device(
        adapter: &wgpu::Adapter,
        label: &str,
    ) -> RenderResult<(wgpu::Device, wgpu::Queue)> {
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some(label),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                trace: Default::default(),
                experimental_features: Default::default(),
            })
            .await?;
        Ok((device, queue))
    }

    /// Format of the final color output.
    #[must_use]
    pub fn output_format(&self) -> wgpu::TextureFormat {
        self.surface_config.format
    }

    /// Resizes the surface. Zero sizes are ignored; the frame pipeline skips until
    /// the window has pixels again.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            log::debug!("ignoring resize to {width}x{height}");
            return false;
        }

        self.width = width;
        self.height = height;
        self.surface_config.width = width;
        self.surface_config.height = height;

        if let Some(surface) = &self.surface {
            surface.configure(&self.device, &self.surface_config);
        }
        log::debug!("surface resized to {width}x{height}");
        true
    }

    /// Acquires the next surface texture. Returns `Ok(None)` when the frame should
    /// be skipped (timeout, or the surface was reconfigured).
    pub fn acquire_frame(&self) -> RenderResult<Option<wgpu::SurfaceTexture>> {
        let Some(surface) = &self.surface else {
            return Ok(None);
        };
        match surface.get_current_texture() {
            Ok(frame) => Ok(Some(frame)),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("surface lost or outdated, reconfiguring");
                surface.configure(&self.device, &self.surface_config);
                Ok(None)
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("surface timeout, skipping frame");
                Ok(None)
            }
            Err(wgpu::SurfaceError::OutOfMemory) => Err(RenderError::OutOfMemory),
            Err(e) => {
                log::error!("surface error: {e:?}");
                Err(RenderError::SurfaceLost)
            }
        }
    }

    /// Runs `create` inside out-of-memory and validation error scopes. A captured
    /// validation error is reported through `failed`.
    pub fn checked_allocation<T>(
        device: &wgpu::Device,
        what: &str,
        failed: fn(String) -> RenderError,
        create: impl FnOnce() -> T,
    ) -> RenderResult<T> {
        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = create();
        let validation = pollster::block_on(device.pop_error_scope());
        let oom = pollster::block_on(device.pop_error_scope());

        if let Some(error) = oom {
            log::error!("out of memory allocating {what}: {error}");
            return Err(RenderError::OutOfMemory);
        }
        if let Some(error) = validation {
            return Err(failed(format!("{what}: {error}")));
        }
        Ok(value)
    }

    /// Creates an offscreen color texture matching the output format, for headless
    /// rendering and screenshots.
    #[must_use]
    pub fn create_output_texture(&self) -> wgpu::Texture {
        self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Offscreen Output Texture"),
            size: wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.output_format(),
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        })
    }

    /// Row pitch of a 4-byte-per-pixel copy, padded to the copy alignment.
    fn aligned_bytes_per_row(width: u32) -> u32 {
        (width * 4).next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
    }

    /// Copies a 4-byte-per-pixel texture back to the CPU, removing row padding.
    pub fn read_texture(&self, texture: &wgpu::Texture) -> Result<Vec<u8>, ScreenshotError> {
        let width = texture.width();
        let height = texture.height();
        let bytes_per_row = Self::aligned_bytes_per_row(width);

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Buffer"),
            size: u64::from(bytes_per_row * height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = self.device.poll(wgpu::PollType::wait_indefinitely());
        rx.recv()
            .map_err(|_| ScreenshotError::BufferMapFailed)?
            .map_err(|_| ScreenshotError::BufferMapFailed)?;

        let data = buffer_slice.get_mapped_range();
        let row_bytes = (width * 4) as usize;
        let mut result = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height {
            let start = (row * bytes_per_row) as usize;
            result.extend_from_slice(&data[start..start + row_bytes]);
        }
        drop(data);
        buffer.unmap();

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aligned_bytes_per_row() {
        assert_eq!(RenderEngine::aligned_bytes_per_row(64), 256);
        assert_eq!(RenderEngine::aligned_bytes_per_row(65), 512);
        assert_eq!(RenderEngine::aligned_bytes_per_row(1280), 5120);
    }
}
