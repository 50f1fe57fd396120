//! CPU images and their upload to GPU textures.

use crate::engine::RenderEngine;
use crate::error::{RenderError, RenderResult};

/// An 8-bit RGBA image in CPU memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl ImageData {
    /// Wraps raw RGBA bytes, checking the length.
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> RenderResult<Self> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || rgba.len() != expected {
            return Err(RenderError::TextureCreationFailed(format!(
                "{width}x{height} image needs {expected} bytes, got {}",
                rgba.len()
            )));
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    /// Builds an image by evaluating `pixel(x, y)` everywhere.
    pub fn from_fn(width: u32, height: u32, mut pixel: impl FnMut(u32, u32) -> [u8; 4]) -> Self {
        let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
        for y in 0..height {
            for x in 0..width {
                rgba.extend_from_slice(&pixel(x, y));
            }
        }
        Self {
            width,
            height,
            rgba,
        }
    }

    #[must_use]
    pub fn from_image(image: &image::DynamicImage) -> Self {
        let rgba = image.to_rgba8();
        Self {
            width: rgba.width(),
            height: rgba.height(),
            rgba: rgba.into_raw(),
        }
    }

    fn extent(&self, layers: u32) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: layers,
        }
    }
}

/// Uploads `image` as a sampled 2D texture.
pub fn create_texture_2d(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    image: &ImageData,
    format: wgpu::TextureFormat,
) -> RenderResult<(wgpu::Texture, wgpu::TextureView)> {
    let texture = RenderEngine::checked_allocation(
        device,
        label,
        RenderError::TextureCreationFailed,
        || {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: image.extent(1),
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            })
        },
    )?;

    write_layer(queue, &texture, image, 0);
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    Ok((texture, view))
}

/// Uploads six square faces (+X, -X, +Y, -Y, +Z, -Z) as a cube texture.
pub fn create_cube_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    faces: &[ImageData; 6],
) -> RenderResult<(wgpu::Texture, wgpu::TextureView)> {
    let size = faces[0].width;
    if faces
        .iter()
        .any(|face| face.width != size || face.height != size)
    {
        return Err(RenderError::TextureCreationFailed(format!(
            "{label}: cube faces must be square and equally sized"
        )));
    }

    let texture = RenderEngine::checked_allocation(
        device,
        label,
        RenderError::TextureCreationFailed,
        || {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: faces[0].extent(6),
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            })
        },
    )?;

    for (layer, face) in faces.iter().enumerate() {
        write_layer(queue, &texture, face, layer as u32);
    }

    let view = texture.create_view(&wgpu::TextureViewDescriptor {
        label: Some(label),
        dimension: Some(wgpu::TextureViewDimension::Cube),
        ..Default::default()
    });
    Ok((texture, view))
}

fn write_layer(queue: &wgpu::Queue, texture: &wgpu::Texture, image: &ImageData, layer: u32) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d {
                x: 0,
                y: 0,
                z: layer,
            },
            aspect: wgpu::TextureAspect::All,
        },
        &image.rgba,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * image.width),
            rows_per_image: Some(image.height),
        },
        image.extent(1),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_data_length_checked() {
        assert!(ImageData::new(2, 2, vec![0; 16]).is_ok());
        assert!(ImageData::new(2, 2, vec![0; 15]).is_err());
        assert!(ImageData::new(0, 2, vec![]).is_err());
    }

    #[test]
    fn test_from_fn_row_major() {
        let image = ImageData::from_fn(2, 1, |x, _| [x as u8, 0, 0, 255]);
        assert_eq!(image.rgba, vec![0, 0, 0, 255, 1, 0, 0, 255]);
    }

    #[test]
    fn test_from_dynamic_image() {
        let dynamic = image::DynamicImage::new_rgb8(3, 2);
        let image = ImageData::from_image(&dynamic);
        assert_eq!((image.width, image.height), (3, 2));
        assert_eq!(image.rgba.len(), 24);
    }
}
