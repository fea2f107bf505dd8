//! Static text overlay for text-style thumbnails.
//!
//! Title, subtitle, bulleted tech items and a duration line are drawn at
//! fixed fractions of the canvas. A scalable TTF/OTF font is used when one
//! can be loaded; otherwise glyphs come from a fixed-size 8x8 bitmap font.

use std::borrow::Cow;
use std::path::Path;

use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Bullet placed before each tech item.
pub const BULLET: char = '•';

/// Appended to lines cut short at the right margin.
const ELLIPSIS: &str = "...";

/// Integer upscale applied to the 8x8 fallback glyphs.
pub const FALLBACK_GLYPH_SCALE: u32 = 2;

/// Text fields drawn on a text-style thumbnail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayFields {
    /// May contain newlines; each line is drawn below the previous one.
    pub title: String,
    pub subtitle: String,
    pub tech_stack: Vec<String>,
    pub duration: String,
}

impl OverlayFields {
    /// Split a newline-delimited tech list, dropping blank lines.
    pub fn parse_tech_list(raw: &str) -> Vec<String> {
        raw.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.subtitle.is_empty()
            && self.tech_stack.is_empty()
            && self.duration.is_empty()
    }
}

/// Font size tier, as a fraction of canvas height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontTier {
    /// Title: height / 10.
    Large,
    /// Subtitle: height / 20.
    Medium,
    /// Tech items and duration: height / 30.
    Small,
}

impl FontTier {
    pub fn px(self, canvas_height: u32) -> f32 {
        let divisor = match self {
            Self::Large => 10.0,
            Self::Medium => 20.0,
            Self::Small => 30.0,
        };
        (canvas_height as f32 / divisor).max(1.0)
    }
}

/// Result of a font lookup. Never an error: a missing or unreadable font
/// degrades to the bitmap fallback.
pub enum OverlayFont {
    Scalable(FontVec),
    Fallback,
}

impl std::fmt::Debug for OverlayFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scalable(_) => f.write_str("OverlayFont::Scalable"),
            Self::Fallback => f.write_str("OverlayFont::Fallback"),
        }
    }
}

impl OverlayFont {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback)
    }

    fn line_height(&self, tier: FontTier, canvas_height: u32) -> u32 {
        match self {
            Self::Scalable(font) => line_height(font, PxScale::from(tier.px(canvas_height))),
            Self::Fallback => 8 * FALLBACK_GLYPH_SCALE + 2,
        }
    }

    /// Rendered width of `text` at `tier` on a canvas `canvas_height` tall.
    pub fn text_width(&self, tier: FontTier, canvas_height: u32, text: &str) -> u32 {
        match self {
            Self::Scalable(font) => {
                measure_text_width(font, PxScale::from(tier.px(canvas_height)), text)
            }
            Self::Fallback => bitmap_text_width(text),
        }
    }

    /// `text` unchanged if it fits in `max_width`, otherwise its longest
    /// prefix that fits with `...` appended (empty if nothing fits).
    pub fn fit_line<'a>(
        &self,
        tier: FontTier,
        canvas_height: u32,
        text: &'a str,
        max_width: u32,
    ) -> Cow<'a, str> {
        if self.text_width(tier, canvas_height, text) <= max_width {
            return Cow::Borrowed(text);
        }
        let chars: Vec<char> = text.chars().collect();
        for keep in (0..chars.len()).rev() {
            let mut candidate: String = chars[..keep].iter().collect();
            candidate.push_str(ELLIPSIS);
            if self.text_width(tier, canvas_height, &candidate) <= max_width {
                debug!(original = text, kept = keep, "Clipped overlay line");
                return Cow::Owned(candidate);
            }
        }
        Cow::Borrowed("")
    }

    /// Draw one line starting at `x`, clipped to a right margin equal to `x`.
    fn draw(&self, img: &mut RgbaImage, x: i32, y: i32, tier: FontTier, text: &str) {
        let max_width = (img.width() as i32 - 2 * x).max(0) as u32;
        let line = self.fit_line(tier, img.height(), text, max_width);
        if line.is_empty() {
            return;
        }
        match self {
            Self::Scalable(font) => {
                let scale = PxScale::from(tier.px(img.height()));
                draw_text_mut(img, WHITE, x, y, scale, font, &line);
            }
            Self::Fallback => draw_bitmap_text(img, x, y, &line, WHITE),
        }
    }
}

/// Parse font bytes, falling back to the bitmap font on failure.
pub fn font_from_bytes(data: Vec<u8>) -> OverlayFont {
    match FontVec::try_from_vec(data) {
        Ok(font) => OverlayFont::Scalable(font),
        Err(e) => {
            warn!("Font data could not be parsed ({e}), using bitmap fallback");
            OverlayFont::Fallback
        }
    }
}

/// Try each candidate path in order and return the first parseable font.
pub fn load_font<P: AsRef<Path>>(candidates: &[P]) -> OverlayFont {
    for path in candidates {
        let path = path.as_ref();
        let Ok(data) = std::fs::read(path) else {
            debug!(path = %path.display(), "Font candidate not readable");
            continue;
        };
        if let Ok(font) = FontVec::try_from_vec(data) {
            info!(path = %path.display(), "Using font for text overlay");
            return OverlayFont::Scalable(font);
        }
        debug!(path = %path.display(), "Font candidate is not a TTF/OTF font");
    }
    warn!("No usable font found, using bitmap fallback");
    OverlayFont::Fallback
}

/// Well-known system font locations for the current platform.
pub fn system_font_candidates() -> &'static [&'static str] {
    #[cfg(target_os = "macos")]
    {
        &[
            "/System/Library/Fonts/Supplemental/Arial.ttf",
            "/System/Library/Fonts/Supplemental/Arial Unicode.ttf",
            "/System/Library/Fonts/Supplemental/Helvetica.ttf",
            "/System/Library/Fonts/AppleSDGothicNeo.ttc",
        ]
    }
    #[cfg(target_os = "windows")]
    {
        &[
            "C:\\Windows\\Fonts\\arial.ttf",
            "C:\\Windows\\Fonts\\malgun.ttf",
        ]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        &[
            "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/truetype/nanum/NanumGothic.ttf",
            "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
        ]
    }
}

/// Measure the pixel width of a string at the given font and scale.
pub fn measure_text_width<F: Font>(font: &F, scale: PxScale, text: &str) -> u32 {
    let scaled = font.as_scaled(scale);
    let mut width = 0.0f32;
    let mut prev_glyph: Option<ab_glyph::GlyphId> = None;

    for ch in text.chars() {
        let glyph_id = scaled.glyph_id(ch);
        if let Some(prev) = prev_glyph {
            width += scaled.kern(prev, glyph_id);
        }
        width += scaled.h_advance(glyph_id);
        prev_glyph = Some(glyph_id);
    }

    width.ceil() as u32
}

/// Compute the line height for the given font and scale.
pub fn line_height<F: Font>(font: &F, scale: PxScale) -> u32 {
    let scaled = font.as_scaled(scale);
    (scaled.ascent() - scaled.descent() + scaled.line_gap()).ceil() as u32
}

fn fallback_glyph(ch: char) -> [u8; 8] {
    let substitute = if ch == BULLET { '*' } else { '?' };
    BASIC_FONTS
        .get(ch)
        .or_else(|| BASIC_FONTS.get(substitute))
        .unwrap_or([0; 8])
}

/// Width in pixels of `text` drawn with the bitmap fallback.
pub fn bitmap_text_width(text: &str) -> u32 {
    let n = text.chars().count() as u32;
    if n == 0 {
        return 0;
    }
    let glyph = 8 * FALLBACK_GLYPH_SCALE;
    n * glyph + (n - 1) * FALLBACK_GLYPH_SCALE
}

/// Draw `text` with the 8x8 bitmap font, nearest-neighbor upscaled.
pub fn draw_bitmap_text(img: &mut RgbaImage, x: i32, y: i32, text: &str, color: Rgba<u8>) {
    let scale = FALLBACK_GLYPH_SCALE as i32;
    let advance = 8 * scale + scale;
    let (w, h) = (img.width() as i32, img.height() as i32);

    for (i, ch) in text.chars().enumerate() {
        let origin_x = x + i as i32 * advance;
        for (row, bits) in fallback_glyph(ch).iter().enumerate() {
            for col in 0..8 {
                if (bits >> col) & 1 == 0 {
                    continue;
                }
                for dy in 0..scale {
                    for dx in 0..scale {
                        let px = origin_x + col * scale + dx;
                        let py = y + row as i32 * scale + dy;
                        if px >= 0 && py >= 0 && px < w && py < h {
                            img.put_pixel(px as u32, py as u32, color);
                        }
                    }
                }
            }
        }
    }
}

/// Draw the overlay fields onto a copy of `image`.
///
/// Layout, relative to width `w` and height `h`: every line starts at
/// `w / 20`; title at `h / 6`, subtitle at `h / 2.5`, tech items from
/// `h / 1.8` stepping `h / 20`, duration at `h - h / 6`.
pub fn draw_overlay_text(image: &DynamicImage, fields: &OverlayFields, font: &OverlayFont) -> DynamicImage {
    let mut canvas = image.to_rgba8();
    let (w, h) = (canvas.width() as f32, canvas.height() as f32);
    let x = (w / 20.0) as i32;

    debug!(
        width = canvas.width(),
        height = canvas.height(),
        fallback = font.is_fallback(),
        tech_items = fields.tech_stack.len(),
        "Drawing text overlay"
    );

    let title_step = font.line_height(FontTier::Large, canvas.height()) as i32;
    let mut y = (h / 6.0) as i32;
    for line in fields.title.lines() {
        font.draw(&mut canvas, x, y, FontTier::Large, line);
        y += title_step;
    }

    if !fields.subtitle.is_empty() {
        font.draw(&mut canvas, x, (h / 2.5) as i32, FontTier::Medium, &fields.subtitle);
    }

    let mut tech_y = h / 1.8;
    for tech in &fields.tech_stack {
        let line = format!("{BULLET} {tech}");
        font.draw(&mut canvas, x, tech_y as i32, FontTier::Small, &line);
        tech_y += h / 20.0;
    }

    if !fields.duration.is_empty() {
        font.draw(&mut canvas, x, (h - h / 6.0) as i32, FontTier::Small, &fields.duration);
    }

    DynamicImage::ImageRgba8(canvas)
}
