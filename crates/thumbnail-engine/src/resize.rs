//! Aspect-ratio-preserving resize policies.
//!
//! `resize_fit` letterboxes (no cropping), `resize_fill` covers the target
//! and leaves cropping to `center_crop`. Both use Lanczos3 filtering, which
//! widens its support when downscaling and so does not alias.

use image::DynamicImage;
use image::imageops::FilterType;
use tracing::debug;

use crate::{Result, Size, ensure_non_empty};

/// Filter used for every foreground and background resample.
pub const RESAMPLE_FILTER: FilterType = FilterType::Lanczos3;

/// Which side of the output is pinned to its target length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pin {
    Width,
    Height,
}

/// Scale so the pinned side equals `len`; the free side follows the
/// source aspect ratio, rounded and at least 1px.
fn scale_pinned(img: &DynamicImage, pin: Pin, len: u32) -> DynamicImage {
    let src = Size::of(img);
    let (pinned, free) = match pin {
        Pin::Width => (src.width, src.height),
        Pin::Height => (src.height, src.width),
    };
    if pinned == len {
        debug!(?pin, len, "Already at target length");
        return img.clone();
    }

    let free_len = ((f64::from(free) * f64::from(len) / f64::from(pinned)).round() as u32).max(1);
    let out = match pin {
        Pin::Width => Size::new(len, free_len),
        Pin::Height => Size::new(free_len, len),
    };
    debug!(src = %src, out = %out, ?pin, "Scaling image");
    img.resize_exact(out.width, out.height, RESAMPLE_FILTER)
}

/// Whether `src` is strictly wider (relative to its height) than `target`.
fn is_relatively_wider(src: Size, target: Size) -> bool {
    u64::from(src.width) * u64::from(target.height)
        > u64::from(src.height) * u64::from(target.width)
}

/// Scale so the whole image fits inside `width` x `height`.
///
/// One output dimension equals the target; the other never exceeds it.
pub fn resize_fit(img: &DynamicImage, width: u32, height: u32) -> Result<DynamicImage> {
    ensure_non_empty(img)?;
    let target = Size::new(width.max(1), height.max(1));

    let resized = if is_relatively_wider(Size::of(img), target) {
        scale_pinned(img, Pin::Width, target.width)
    } else {
        scale_pinned(img, Pin::Height, target.height)
    };

    // Rounding may overshoot the free side by a pixel.
    if resized.width() > target.width || resized.height() > target.height {
        let (w, h) = (
            resized.width().min(target.width),
            resized.height().min(target.height),
        );
        return Ok(resized.resize_exact(w, h, RESAMPLE_FILTER));
    }
    Ok(resized)
}

/// Scale so the image covers `width` x `height` entirely.
///
/// Both output dimensions are at least the target; the overflowing axis is
/// left for the caller to crop. The overflow grows with the source's aspect
/// mismatch, so pipelines use `resize_cover` instead.
pub fn resize_fill(img: &DynamicImage, width: u32, height: u32) -> Result<DynamicImage> {
    ensure_non_empty(img)?;
    let target = Size::new(width.max(1), height.max(1));

    let resized = if is_relatively_wider(Size::of(img), target) {
        scale_pinned(img, Pin::Height, target.height)
    } else {
        scale_pinned(img, Pin::Width, target.width)
    };

    if resized.width() < target.width || resized.height() < target.height {
        let (w, h) = (
            resized.width().max(target.width),
            resized.height().max(target.height),
        );
        return Ok(resized.resize_exact(w, h, RESAMPLE_FILTER));
    }
    Ok(resized)
}

/// Region of an image, in that image's pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub x: u32,
    pub y: u32,
    pub size: Size,
}

/// Largest centered window of `src` with the aspect ratio of `target`.
///
/// Scaling this window to `target` shows exactly what `resize_fill`
/// followed by `center_crop` would, without materializing the overflow.
pub fn cover_window(src: Size, target: Size) -> Window {
    let target = Size::new(target.width.max(1), target.height.max(1));
    let size = if is_relatively_wider(src, target) {
        let w = (u64::from(src.height) * u64::from(target.width) + u64::from(target.height) / 2)
            / u64::from(target.height);
        Size::new((w as u32).clamp(1, src.width), src.height)
    } else {
        let h = (u64::from(src.width) * u64::from(target.height) + u64::from(target.width) / 2)
            / u64::from(target.width);
        Size::new(src.width, (h as u32).clamp(1, src.height))
    };
    Window {
        x: (src.width - size.width) / 2,
        y: (src.height - size.height) / 2,
        size,
    }
}

/// Cover `width` x `height` exactly: crop the source to the target aspect
/// ratio, then scale. No intermediate is larger than the crop or the target.
pub fn resize_cover(img: &DynamicImage, width: u32, height: u32) -> Result<DynamicImage> {
    ensure_non_empty(img)?;
    let target = Size::new(width.max(1), height.max(1));
    let window = cover_window(Size::of(img), target);
    debug!(
        src = %Size::of(img),
        window = %window.size,
        x = window.x,
        y = window.y,
        target = %target,
        "Cover-resizing image"
    );
    Ok(img
        .crop_imm(window.x, window.y, window.size.width, window.size.height)
        .resize_exact(target.width, target.height, RESAMPLE_FILTER))
}

/// Crop the centered `width` x `height` window.
///
/// If the image is smaller than the window on an axis, that axis is kept whole.
pub fn center_crop(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    let w = width.min(img.width());
    let h = height.min(img.height());
    let x = (img.width() - w) / 2;
    let y = (img.height() - h) / 2;
    debug!(
        src_w = img.width(),
        src_h = img.height(),
        x,
        y,
        w,
        h,
        "Center-cropping image"
    );
    img.crop_imm(x, y, w, h)
}
