//! Saving rendered frames to image files.

use std::path::Path;

use image::{ImageBuffer, Rgba};

/// Channel order of raw pixel data read back from a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
    Rgba,
    Bgra,
}

impl ChannelOrder {
    /// Channel order of a 4-byte color format (BGRA surfaces are common on desktop).
    #[must_use]
    pub fn of(format: wgpu::TextureFormat) -> Self {
        match format {
            wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb => {
                ChannelOrder::Bgra
            }
            _ => ChannelOrder::Rgba,
        }
    }
}

/// Converts raw pixels to an RGBA image buffer.
pub fn to_rgba_image(
    data: &[u8],
    width: u32,
    height: u32,
    order: ChannelOrder,
) -> Result<ImageBuffer<Rgba<u8>, Vec<u8>>, ScreenshotError> {
    let mut pixels = data.to_vec();
    if order == ChannelOrder::Bgra {
        pixels.chunks_exact_mut(4).for_each(|px| px.swap(0, 2));
    }

    // top-left origin on both sides, no flip
    ImageBuffer::from_raw(width, height, pixels).ok_or(ScreenshotError::InvalidImageData)
}

/// Saves raw pixel data to a PNG or JPEG file, chosen by extension.
pub fn save_image(
    path: &Path,
    data: &[u8],
    width: u32,
    height: u32,
    order: ChannelOrder,
) -> Result<(), ScreenshotError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let img = to_rgba_image(data, width, height, order)?;

    match extension.as_str() {
        "png" => img.save_with_format(path, image::ImageFormat::Png)?,
        // JPEG has no alpha channel
        "jpg" | "jpeg" => image::DynamicImage::ImageRgba8(img)
            .to_rgb8()
            .save_with_format(path, image::ImageFormat::Jpeg)?,
        _ => return Err(ScreenshotError::UnsupportedFormat(extension)),
    }

    log::info!("saved {}x{} frame to {}", width, height, path.display());
    Ok(())
}

/// Why a frame could not be read back or written out.
#[derive(Debug, thiserror::Error)]
pub enum ScreenshotError {
    #[error("encoding the image failed: {0}")]
    Encode(#[from] image::ImageError),

    /// Only png, jpg and jpeg are written.
    #[error("unsupported image extension '{0}'")]
    UnsupportedFormat(String),

    /// Pixel data does not match the image size.
    #[error("pixel data does not match the image size")]
    InvalidImageData,

    #[error("mapping the readback buffer failed")]
    BufferMapFailed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_order() {
        assert_eq!(
            ChannelOrder::of(wgpu::TextureFormat::Bgra8UnormSrgb),
            ChannelOrder::Bgra
        );
        assert_eq!(
            ChannelOrder::of(wgpu::TextureFormat::Rgba8UnormSrgb),
            ChannelOrder::Rgba
        );
    }

    #[test]
    fn test_bgra_is_swizzled() {
        let img = to_rgba_image(&[10, 20, 30, 255], 1, 1, ChannelOrder::Bgra).unwrap();
        assert_eq!(img.get_pixel(0, 0).0, [30, 20, 10, 255]);
    }

    #[test]
    fn test_short_data_rejected() {
        let result = to_rgba_image(&[0; 12], 2, 2, ChannelOrder::Rgba);
        assert!(matches!(result, Err(ScreenshotError::InvalidImageData)));
    }

    #[test]
    fn test_unsupported_extension() {
        let path = std::env::temp_dir().join("lakeview_screenshot_test.bmpx");
        let result = save_image(&path, &[0; 4], 1, 1, ChannelOrder::Rgba);
        assert!(matches!(result, Err(ScreenshotError::UnsupportedFormat(_))));
    }
}
