//! Full-canvas background synthesis.
//!
//! Backgrounds are either flat fills from a sampled color, two flat bands,
//! a vertical color gradient (text-only thumbnails), or a blurred and
//! darkened full-bleed copy of the source image.

use image::{DynamicImage, Rgb, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::color::Color;
use crate::resize::{RESAMPLE_FILTER, center_crop, cover_window};
use crate::{Result, Size, ensure_non_empty};

/// Enlargement over the target applied before blurring, so the crop
/// never reaches the blur's clamped border.
pub const BLUR_ENLARGE_FACTOR: f64 = 1.2;

/// Radii above this are blurred on a downscaled copy.
const FAST_BLUR_THRESHOLD: f32 = 5.0;

/// Downscale factor for the fast blur path.
const FAST_BLUR_SCALE: u32 = 4;

/// Top color of the text-only gradient canvas.
pub const TEXT_CANVAS_TOP: [u8; 3] = [33, 150, 243];

/// Bottom color of the text-only gradient canvas.
pub const TEXT_CANVAS_BOTTOM: [u8; 3] = [0, 100, 160];

/// Blur parameters for the full-bleed background.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlurStyle {
    /// Gaussian sigma in pixels of the enlarged image.
    pub radius: f32,
    /// Number of blur passes.
    pub passes: u32,
    /// RGB multiplier applied after the crop (0.0..=1.0).
    pub darken: f32,
}

impl Default for BlurStyle {
    fn default() -> Self {
        Self {
            radius: 30.0,
            passes: 1,
            darken: 0.6,
        }
    }
}

impl BlurStyle {
    pub fn new(radius: f32, passes: u32, darken: f32) -> Self {
        Self {
            radius,
            passes,
            darken,
        }
    }
}

/// Which axis a two-band background is split along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitAxis {
    /// Top half / bottom half.
    Horizontal,
    /// Left half / right half.
    Vertical,
}

/// Canvas of the given size filled with `color`.
///
/// RGBA colors produce an RGBA canvas; RGB colors an RGB one.
pub fn flat_background(color: Color, width: u32, height: u32) -> DynamicImage {
    debug!(width, height, ?color, "Filling flat background");
    match color {
        Color::Rgb(c) => DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(c))),
        Color::Rgba(_) => {
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, color.to_rgba()))
        }
    }
}

/// Canvas split into two flat bands.
///
/// `first` fills the top (or left) half, `second` the rest.
pub fn split_background(
    first: Color,
    second: Color,
    width: u32,
    height: u32,
    axis: SplitAxis,
) -> DynamicImage {
    debug!(width, height, ?axis, ?first, ?second, "Filling split background");
    let (a, b) = (first.to_rgba(), second.to_rgba());
    let canvas = RgbaImage::from_fn(width, height, |x, y| {
        let in_first = match axis {
            SplitAxis::Horizontal => y < height / 2,
            SplitAxis::Vertical => x < width / 2,
        };
        if in_first { a } else { b }
    });
    if first.has_alpha() || second.has_alpha() {
        DynamicImage::ImageRgba8(canvas)
    } else {
        DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).into_rgb8())
    }
}

/// Vertical gradient canvas used behind text-only thumbnails.
///
/// Row `y` gets `start - trunc((start - end) * y / height)` per channel,
/// so row 0 is exactly `start`.
pub fn gradient_canvas(width: u32, height: u32, start: [u8; 3], end: [u8; 3]) -> DynamicImage {
    debug!(width, height, ?start, ?end, "Building gradient canvas");
    let h = height.max(1) as f32;
    let canvas = RgbImage::from_fn(width, height, |_, y| {
        let t = y as f32 / h;
        let mut px = [0u8; 3];
        for c in 0..3 {
            let delta = (f32::from(start[c]) - f32::from(end[c])) * t;
            px[c] = (i32::from(start[c]) - delta as i32).clamp(0, 255) as u8;
        }
        Rgb(px)
    });
    DynamicImage::ImageRgb8(canvas)
}

/// Multiply the RGB channels by `factor`, leaving alpha untouched.
pub fn darken(img: &DynamicImage, factor: f32) -> DynamicImage {
    let factor = factor.max(0.0);
    let scale = |v: u8| (f32::from(v) * factor).round().clamp(0.0, 255.0) as u8;
    match img {
        DynamicImage::ImageRgb8(rgb) => {
            let mut out = rgb.clone();
            for p in out.pixels_mut() {
                p.0 = [scale(p[0]), scale(p[1]), scale(p[2])];
            }
            DynamicImage::ImageRgb8(out)
        }
        other => {
            let mut out = other.to_rgba8();
            for p in out.pixels_mut() {
                p.0 = [scale(p[0]), scale(p[1]), scale(p[2]), p[3]];
            }
            DynamicImage::ImageRgba8(out)
        }
    }
}

/// Gaussian blur, optionally repeated.
///
/// Large radii are blurred on a copy downscaled by `FAST_BLUR_SCALE`
/// and scaled back up, which keeps the kernel small.
pub fn gaussian_blur(img: &DynamicImage, radius: f32, passes: u32) -> DynamicImage {
    // NaN and infinite radii mean no blur; the filter panics on them.
    if !(radius.is_finite() && radius > 0.0) || passes == 0 {
        return img.clone();
    }
    let (width, height) = (img.width(), img.height());
    debug!(width, height, radius, passes, "Applying gaussian blur");

    let (mut work, sigma) = if radius > FAST_BLUR_THRESHOLD {
        let small_w = (width / FAST_BLUR_SCALE).max(1);
        let small_h = (height / FAST_BLUR_SCALE).max(1);
        (
            img.resize_exact(small_w, small_h, RESAMPLE_FILTER),
            radius / FAST_BLUR_SCALE as f32,
        )
    } else {
        (img.clone(), radius)
    };

    for _ in 0..passes {
        work = match work {
            DynamicImage::ImageRgb8(rgb) => {
                DynamicImage::ImageRgb8(imageproc::filter::gaussian_blur_f32(&rgb, sigma))
            }
            other => {
                DynamicImage::ImageRgba8(imageproc::filter::gaussian_blur_f32(&other.to_rgba8(), sigma))
            }
        };
    }

    if work.width() != width || work.height() != height {
        work = work.resize_exact(width, height, RESAMPLE_FILTER);
    }
    work
}

/// Blurred, darkened, full-bleed copy of `source` at exactly `width` x `height`.
///
/// The target-aspect window of the source is scaled to `BLUR_ENLARGE_FACTOR`
/// times the target, blurred, center-cropped and finally darkened. Blurring
/// before cropping keeps the crop edges soft.
pub fn blurred_background(
    source: &DynamicImage,
    width: u32,
    height: u32,
    blur_radius: f32,
    darken_factor: f32,
) -> Result<DynamicImage> {
    blurred_background_with(
        source,
        width,
        height,
        BlurStyle::new(blur_radius, 1, darken_factor),
    )
}

/// Size the cover window is scaled to before blurring.
pub fn blur_working_size(target: Size) -> Size {
    let enlarge = |v: u32| ((f64::from(v) * BLUR_ENLARGE_FACTOR).round() as u32).max(v);
    Size::new(enlarge(target.width), enlarge(target.height))
}

/// `blurred_background` with an explicit pass count.
pub fn blurred_background_with(
    source: &DynamicImage,
    width: u32,
    height: u32,
    style: BlurStyle,
) -> Result<DynamicImage> {
    ensure_non_empty(source)?;
    let target = Size::new(width.max(1), height.max(1));
    let window = cover_window(Size::of(source), target);
    let working = blur_working_size(target);

    debug!(
        src = %Size::of(source),
        window = %window.size,
        working = %working,
        target = %target,
        "Building blurred background"
    );

    let enlarged = source
        .crop_imm(window.x, window.y, window.size.width, window.size.height)
        .resize_exact(working.width, working.height, RESAMPLE_FILTER);
    let blurred = gaussian_blur(&enlarged, style.radius, style.passes);
    let cropped = center_crop(&blurred, target.width, target.height);
    Ok(darken(&cropped, style.darken))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba};

    #[test]
    fn flat_background_matches_color_and_size() {
        let bg = flat_background(Color::Rgb([9, 8, 7]), 30, 20);
        assert_eq!(bg.dimensions(), (30, 20));
        assert!(bg.to_rgb8().pixels().all(|p| *p == Rgb([9, 8, 7])));
        assert!(matches!(bg, DynamicImage::ImageRgb8(_)));
    }

    #[test]
    fn flat_background_keeps_alpha() {
        let bg = flat_background(Color::Rgba([1, 2, 3, 4]), 2, 2);
        assert_eq!(bg.get_pixel(1, 1), Rgba([1, 2, 3, 4]));
    }

    #[test]
    fn split_background_horizontal_bands() {
        let bg = split_background(
            Color::Rgb([255, 0, 0]),
            Color::Rgb([0, 0, 255]),
            10,
            10,
            SplitAxis::Horizontal,
        );
        assert_eq!(bg.get_pixel(5, 0), Rgba([255, 0, 0, 255]));
        assert_eq!(bg.get_pixel(5, 4), Rgba([255, 0, 0, 255]));
        assert_eq!(bg.get_pixel(5, 5), Rgba([0, 0, 255, 255]));
        assert_eq!(bg.get_pixel(5, 9), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn split_background_vertical_bands() {
        let bg = split_background(
            Color::Rgb([255, 0, 0]),
            Color::Rgb([0, 0, 255]),
            10,
            4,
            SplitAxis::Vertical,
        );
        assert_eq!(bg.get_pixel(0, 2), Rgba([255, 0, 0, 255]));
        assert_eq!(bg.get_pixel(9, 2), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn gradient_canvas_matches_reference_formula() {
        let canvas = gradient_canvas(4, 600, TEXT_CANVAS_TOP, TEXT_CANVAS_BOTTOM).to_rgb8();
        assert_eq!(canvas.get_pixel(0, 0), &Rgb([33, 150, 243]));
        // y = 300: 33 - 16, 150 - 25, 243 - 41
        assert_eq!(canvas.get_pixel(3, 300), &Rgb([17, 125, 202]));
        let last = canvas.get_pixel(0, 599);
        assert!(last[0] <= 1 && last[1] <= 101 && last[2] <= 161);
    }

    #[test]
    fn darken_scales_rgb_but_not_alpha() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([200, 100, 10, 77])));
        let out = darken(&img, 0.5);
        assert_eq!(out.get_pixel(0, 0), Rgba([100, 50, 5, 77]));
    }

    #[test]
    fn blurred_background_has_exact_target_size() {
        let src = DynamicImage::ImageRgb8(RgbImage::from_pixel(200, 100, Rgb([100, 100, 100])));
        for (w, h) in [(230, 300), (120, 60), (64, 64)] {
            let bg = blurred_background(&src, w, h, 20.0, 0.5).unwrap();
            assert_eq!(bg.dimensions(), (w, h));
        }
    }

    #[test]
    fn blurred_background_darkens_uniform_source() {
        let src = DynamicImage::ImageRgb8(RgbImage::from_pixel(80, 40, Rgb([200, 200, 200])));
        let bg = blurred_background_with(&src, 60, 60, BlurStyle::new(10.0, 3, 0.5))
            .unwrap()
            .to_rgb8();
        for p in bg.pixels() {
            for c in 0..3 {
                assert!((98..=102).contains(&p[c]), "got {p:?}");
            }
        }
    }

    #[test]
    fn blurred_background_softens_hard_edges() {
        let mut src = RgbImage::from_pixel(100, 100, Rgb([0, 0, 0]));
        for y in 0..100 {
            for x in 50..100 {
                src.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        let bg = blurred_background(&DynamicImage::ImageRgb8(src), 100, 100, 8.0, 1.0)
            .unwrap()
            .to_rgb8();
        let mid = bg.get_pixel(50, 50)[0];
        assert!(mid > 40 && mid < 215, "edge should be blended, got {mid}");
    }

    #[test]
    fn blur_working_size_is_bounded_by_target() {
        assert_eq!(blur_working_size(Size::new(230, 300)), Size::new(276, 360));
        assert_eq!(blur_working_size(Size::new(1200, 600)), Size::new(1440, 720));
        assert_eq!(blur_working_size(Size::new(1, 1)), Size::new(1, 1));
    }

    #[test]
    fn blurred_background_handles_extreme_aspect_sources() {
        for (sw, sh) in [(2000, 5), (5, 2000), (4000, 4)] {
            let src = DynamicImage::ImageRgb8(RgbImage::from_pixel(sw, sh, Rgb([200, 0, 0])));
            for (w, h) in [(230, 300), (1200, 600)] {
                let bg = blurred_background_with(&src, w, h, BlurStyle::default()).unwrap();
                assert_eq!(bg.dimensions(), (w, h), "{sw}x{sh} -> {w}x{h}");
                let center = bg.to_rgb8().get_pixel(w / 2, h / 2).0;
                assert!((117..=121).contains(&center[0]) && center[1] < 3, "got {center:?}");
            }
        }
    }

    #[test]
    fn invalid_blur_radius_leaves_image_unchanged() {
        let src = DynamicImage::ImageRgb8(RgbImage::from_fn(8, 8, |x, _| Rgb([(x * 30) as u8, 0, 0])));
        for radius in [f32::NAN, f32::INFINITY, -1.0, 0.0] {
            assert_eq!(gaussian_blur(&src, radius, 2).to_rgb8(), src.to_rgb8());
        }
        let bg = blurred_background_with(&src, 8, 8, BlurStyle::new(f32::NAN, 1, 1.0)).unwrap();
        assert_eq!(bg.dimensions(), (8, 8));
    }

    #[test]
    fn blurred_background_rejects_zero_area() {
        let src = DynamicImage::ImageRgb8(RgbImage::new(0, 5));
        assert!(blurred_background(&src, 10, 10, 5.0, 0.5).is_err());
    }
}
