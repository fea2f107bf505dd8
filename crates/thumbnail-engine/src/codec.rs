//! Decoding of uploaded images and PNG encoding of results.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, ImageReader};
use tracing::debug;

use crate::{Result, Size, ThumbnailError};

/// Bounds applied to an upload before its pixels are decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_pixels: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_pixels: crate::DEFAULT_MAX_PIXELS,
        }
    }
}

impl Limits {
    pub fn with_max_pixels(mut self, max_pixels: u64) -> Self {
        self.max_pixels = max_pixels;
        self
    }
}

fn reader(bytes: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ThumbnailError::InvalidImage(format!("unreadable input: {e}")))
}

/// Decode an encoded PNG/JPEG buffer into an 8-bit RGB or RGBA bitmap.
///
/// Dimensions are read from the header first so oversized images are
/// rejected before any pixel data is decoded.
pub fn decode(bytes: &[u8], limits: &Limits) -> Result<DynamicImage> {
    if bytes.is_empty() {
        return Err(ThumbnailError::InvalidImage("empty input buffer".into()));
    }

    let (width, height) = reader(bytes)?
        .into_dimensions()
        .map_err(|e| ThumbnailError::InvalidImage(e.to_string()))?;
    let size = Size::new(width, height);
    if size.is_empty() {
        return Err(ThumbnailError::InvalidImage(format!("zero-area image ({size})")));
    }
    if size.pixel_count() > limits.max_pixels {
        return Err(ThumbnailError::ResourceExceeded {
            width,
            height,
            max_pixels: limits.max_pixels,
        });
    }

    let img = reader(bytes)?
        .decode()
        .map_err(|e| ThumbnailError::InvalidImage(e.to_string()))?;
    debug!(width, height, color = ?img.color(), "Decoded source image");
    Ok(normalize(img))
}

/// Convert any decoded layout to 8-bit RGB, or RGBA when alpha is present.
pub fn normalize(img: DynamicImage) -> DynamicImage {
    match img {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => img,
        other if other.color().has_alpha() => DynamicImage::ImageRgba8(other.into_rgba8()),
        other => DynamicImage::ImageRgb8(other.into_rgb8()),
    }
}

/// Encode a bitmap as PNG.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    img.write_to(&mut cursor, ImageFormat::Png)
        .map_err(|e| ThumbnailError::Encode(format!("failed to encode thumbnail: {e}")))?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};

    fn gradient_rgb(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(w, h, |x, y| {
            Rgb([(x * 7) as u8, (y * 11) as u8, ((x + y) * 3) as u8])
        }))
    }

    #[test]
    fn png_round_trip_is_lossless() {
        let img = gradient_rgb(37, 23);
        let bytes = encode_png(&img).unwrap();
        let back = decode(&bytes, &Limits::default()).unwrap();
        assert_eq!(back.to_rgb8(), img.to_rgb8());
    }

    #[test]
    fn png_round_trip_keeps_alpha() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(5, 5, Rgba([1, 2, 3, 99])));
        let back = decode(&encode_png(&img).unwrap(), &Limits::default()).unwrap();
        assert!(matches!(back, DynamicImage::ImageRgba8(_)));
        assert_eq!(back.to_rgba8(), img.to_rgba8());
    }

    #[test]
    fn grayscale_is_normalized_to_rgb() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(3, 3, Luma([90])));
        let back = decode(&encode_png(&img).unwrap(), &Limits::default()).unwrap();
        assert!(matches!(back, DynamicImage::ImageRgb8(_)));
        assert_eq!(back.to_rgb8().get_pixel(1, 1), &Rgb([90, 90, 90]));
    }

    #[test]
    fn garbage_is_invalid_image() {
        let err = decode(b"definitely not an image", &Limits::default()).unwrap_err();
        assert!(matches!(err, ThumbnailError::InvalidImage(_)));
        let err = decode(&[], &Limits::default()).unwrap_err();
        assert!(matches!(err, ThumbnailError::InvalidImage(_)));
    }

    #[test]
    fn oversized_image_is_rejected_before_decode() {
        let bytes = encode_png(&gradient_rgb(100, 100)).unwrap();
        let limits = Limits::default().with_max_pixels(50 * 50);
        match decode(&bytes, &limits) {
            Err(ThumbnailError::ResourceExceeded {
                width,
                height,
                max_pixels,
            }) => {
                assert_eq!((width, height, max_pixels), (100, 100, 2500));
            }
            other => panic!("expected ResourceExceeded, got {other:?}"),
        }
    }
}
