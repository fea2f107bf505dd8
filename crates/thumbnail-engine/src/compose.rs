//! Layer composition: alpha blits and gradient overlays.
//!
//! Every function here returns a freshly allocated canvas; inputs are
//! never modified.

use image::{DynamicImage, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Offset, Size};

/// Peak gradient alpha used by the compact preset.
pub const GRADIENT_MAX_ALPHA_SOFT: u8 = 100;

/// Peak gradient alpha used by the square preset.
pub const GRADIENT_MAX_ALPHA_STRONG: u8 = 128;

/// Direction in which a gradient runs from its start to its end values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradientDirection {
    /// Start values at the top row.
    #[default]
    TopToBottom,
    /// Start values at the bottom row.
    BottomToTop,
}

/// Gradient overlay parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradientStyle {
    pub direction: GradientDirection,
    pub start_color: [u8; 3],
    pub end_color: [u8; 3],
    pub start_alpha: u8,
    pub end_alpha: u8,
}

impl GradientStyle {
    /// Black, transparent at the top and `max_alpha` at the bottom.
    pub fn darken_downward(max_alpha: u8) -> Self {
        Self {
            direction: GradientDirection::TopToBottom,
            start_color: [0, 0, 0],
            end_color: [0, 0, 0],
            start_alpha: 0,
            end_alpha: max_alpha,
        }
    }
}

impl Default for GradientStyle {
    fn default() -> Self {
        Self::darken_downward(GRADIENT_MAX_ALPHA_SOFT)
    }
}

/// Offset that centers `fg` on `bg`, using floor division.
pub fn center_offset(bg: Size, fg: Size) -> Offset {
    let dx = i64::from(bg.width) - i64::from(fg.width);
    let dy = i64::from(bg.height) - i64::from(fg.height);
    Offset::new(dx.div_euclid(2), dy.div_euclid(2))
}

/// Alpha-composite `foreground` onto a copy of `background` at `offset`.
///
/// Per channel `out = bg * (1 - a) + fg * a`, where `a` is the foreground
/// alpha (opaque when the foreground has none). Only the overlap is touched;
/// the parts of the foreground outside the canvas are dropped.
pub fn composite(background: &DynamicImage, foreground: &DynamicImage, offset: Offset) -> DynamicImage {
    let mut canvas = background.to_rgba8();
    let fg = foreground.to_rgba8();
    let (bw, bh) = (i64::from(canvas.width()), i64::from(canvas.height()));

    debug!(
        bg_w = bw,
        bg_h = bh,
        fg_w = fg.width(),
        fg_h = fg.height(),
        x = offset.x,
        y = offset.y,
        "Compositing foreground"
    );

    for (dx, dy, pixel) in fg.enumerate_pixels() {
        let tx = offset.x + i64::from(dx);
        let ty = offset.y + i64::from(dy);
        if tx < 0 || ty < 0 || tx >= bw || ty >= bh {
            continue;
        }
        let (tx, ty) = (tx as u32, ty as u32);
        match pixel[3] {
            255 => canvas.put_pixel(tx, ty, *pixel),
            0 => {}
            alpha => {
                let bg = canvas.get_pixel(tx, ty);
                let blended = blend_pixel(bg, pixel, f32::from(alpha) / 255.0);
                canvas.put_pixel(tx, ty, blended);
            }
        }
    }

    DynamicImage::ImageRgba8(canvas)
}

/// Color and alpha of gradient row `y` out of `height`.
///
/// `t = y / height` along the gradient direction, so row 0 (in the
/// direction of travel) is exactly the start values and the last row stops
/// one step short of the end values.
pub fn gradient_row_color(style: &GradientStyle, y: u32, height: u32) -> Rgba<u8> {
    let h = height.max(1);
    let step = match style.direction {
        GradientDirection::TopToBottom => y,
        GradientDirection::BottomToTop => h.saturating_sub(1).saturating_sub(y),
    };
    let t = step as f32 / h as f32;
    let lerp = |a: u8, b: u8| {
        (f32::from(a) + (f32::from(b) - f32::from(a)) * t)
            .round()
            .clamp(0.0, 255.0) as u8
    };
    Rgba([
        lerp(style.start_color[0], style.end_color[0]),
        lerp(style.start_color[1], style.end_color[1]),
        lerp(style.start_color[2], style.end_color[2]),
        lerp(style.start_alpha, style.end_alpha),
    ])
}

/// Blend a per-row color gradient over the whole image.
pub fn overlay_gradient(
    image: &DynamicImage,
    direction: GradientDirection,
    start_color: [u8; 3],
    end_color: [u8; 3],
    start_alpha: u8,
    end_alpha: u8,
) -> DynamicImage {
    overlay_gradient_style(
        image,
        &GradientStyle {
            direction,
            start_color,
            end_color,
            start_alpha,
            end_alpha,
        },
    )
}

/// `overlay_gradient` taking a prepared style.
pub fn overlay_gradient_style(image: &DynamicImage, style: &GradientStyle) -> DynamicImage {
    let mut canvas = image.to_rgba8();
    let (width, height) = canvas.dimensions();
    debug!(width, height, ?style, "Overlaying gradient");

    for y in 0..height {
        let row = gradient_row_color(style, y, height);
        let alpha = row[3];
        if alpha == 0 {
            continue;
        }
        let a = f32::from(alpha) / 255.0;
        for x in 0..width {
            let bg = canvas.get_pixel(x, y);
            let blended = blend_pixel(bg, &row, a);
            canvas.put_pixel(x, y, blended);
        }
    }

    DynamicImage::ImageRgba8(canvas)
}

/// Straight-alpha "over" for one pixel.
fn blend_pixel(bg: &Rgba<u8>, fg: &Rgba<u8>, alpha: f32) -> Rgba<u8> {
    let inv = 1.0 - alpha;
    let mix = |b: u8, f: u8| (f32::from(f) * alpha + f32::from(b) * inv).round() as u8;
    let out_alpha = alpha + f32::from(bg[3]) / 255.0 * inv;
    Rgba([
        mix(bg[0], fg[0]),
        mix(bg[1], fg[1]),
        mix(bg[2], fg[2]),
        (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

/// Average luma of the rows in `rows`, used to check gradient direction.
#[cfg(test)]
pub(crate) fn mean_row_brightness(img: &RgbaImage, rows: std::ops::Range<u32>) -> f32 {
    let mut sum = 0.0f64;
    let mut count = 0u64;
    for y in rows.filter(|&y| y < img.height()) {
        for x in 0..img.width() {
            let p = img.get_pixel(x, y);
            sum += 0.299 * f64::from(p[0]) + 0.587 * f64::from(p[1]) + 0.114 * f64::from(p[2]);
            count += 1;
        }
    }
    if count == 0 { 0.0 } else { (sum / count as f64) as f32 }
}
