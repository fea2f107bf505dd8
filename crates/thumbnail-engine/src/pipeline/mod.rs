//! Pipeline driver: decode, resize, synthesize background, composite,
//! overlay, encode.
//!
//! Each run is synchronous and self-contained; intermediates are dropped
//! as soon as the next stage has consumed them.

mod style;


pub use style::{
    BackgroundPolicy, COMPACT_BLUR, FLAT_EDGE_MARGIN, FlatColorSource, Foreground,
    ParseStyleError, Preset, PresetTable, SQUARE_BLUR, StyleConfig, StyleVariant,
};

use chrono::NaiveDateTime;
use image::DynamicImage;
use tracing::{debug, info};

use crate::background::{
    SplitAxis, TEXT_CANVAS_BOTTOM, TEXT_CANVAS_TOP, blurred_background_with, flat_background,
    gradient_canvas, split_background,
};
use crate::codec::{Limits, decode, encode_png};
use crate::color::{Color, EdgeSide, sample_dominant_with, sample_edge};
use crate::compose::{center_offset, composite, overlay_gradient_style};
use crate::resize::{resize_cover, resize_fit};
use crate::text::{OverlayFont, draw_overlay_text};
use crate::{Offset, Result, Size, ThumbnailError};

/// Canvas color behind a fitted foreground when no background is synthesized.
const EMPTY_CANVAS: Color = Color::Rgb([0, 0, 0]);

/// A finished thumbnail and its suggested download name.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub image: DynamicImage,
    pub filename: String,
}

impl Thumbnail {
    pub fn encode(&self) -> Result<EncodedThumbnail> {
        Ok(EncodedThumbnail {
            bytes: encode_png(&self.image)?,
            filename: self.filename.clone(),
        })
    }
}

/// PNG bytes ready to hand to the caller.
#[derive(Debug, Clone)]
pub struct EncodedThumbnail {
    pub bytes: Vec<u8>,
    pub filename: String,
}

/// `thumbnail_{preset}_{YYYYMMDD_HHMMSS}.png`
pub fn thumbnail_filename(preset_name: &str, at: NaiveDateTime) -> String {
    format!("thumbnail_{preset_name}_{}.png", at.format("%Y%m%d_%H%M%S"))
}

/// Run the pipeline on an encoded upload (or none) and name the result
/// with the current local time.
pub fn generate(
    source: Option<&[u8]>,
    config: &StyleConfig,
    font: &OverlayFont,
    limits: &Limits,
) -> Result<Thumbnail> {
    generate_at(source, config, font, limits, chrono::Local::now().naive_local())
}

/// `generate` with an explicit timestamp for the filename.
pub fn generate_at(
    source: Option<&[u8]>,
    config: &StyleConfig,
    font: &OverlayFont,
    limits: &Limits,
    at: NaiveDateTime,
) -> Result<Thumbnail> {
    info!(
        preset = config.preset.name(),
        size = %config.size,
        foreground = ?config.foreground,
        background = ?config.background,
        gradient = config.add_gradient,
        has_source = source.is_some(),
        "Generating thumbnail"
    );

    let decoded = match source {
        Some(bytes) if config.requires_source() => Some(decode(bytes, limits)?),
        Some(_) => None,
        None if config.requires_source() => {
            return Err(ThumbnailError::MissingInput(
                "this style needs an uploaded image",
            ));
        }
        None => None,
    };

    let image = render(decoded.as_ref(), config, font)?;
    let filename = thumbnail_filename(config.preset.name(), at);
    info!(%filename, "Thumbnail generated");
    Ok(Thumbnail { image, filename })
}

/// Compose the final RGB bitmap from an already-decoded source.
pub fn render(
    source: Option<&DynamicImage>,
    config: &StyleConfig,
    font: &OverlayFont,
) -> Result<DynamicImage> {
    let size = config.size;
    if size.is_empty() {
        return Err(ThumbnailError::InvalidSize(size));
    }

    let mut canvas = match (config.foreground, source) {
        (Foreground::Omitted, _) => {
            gradient_canvas(size.width, size.height, TEXT_CANVAS_TOP, TEXT_CANVAS_BOTTOM)
        }
        (_, None) => {
            return Err(ThumbnailError::MissingInput(
                "this style needs an uploaded image",
            ));
        }
        (Foreground::FillCrop, Some(src)) => resize_cover(src, size.width, size.height)?,
        (Foreground::Fit, Some(src)) => fit_onto_background(src, config)?,
    };

    if config.add_gradient {
        canvas = overlay_gradient_style(&canvas, &config.gradient);
    }

    if let Some(fields) = config.text.as_ref().filter(|f| !f.is_empty()) {
        canvas = draw_overlay_text(&canvas, fields, font);
    }

    Ok(DynamicImage::ImageRgb8(flatten(canvas).into_rgb8()))
}

/// Composite any remaining transparency onto the empty canvas color.
fn flatten(canvas: DynamicImage) -> DynamicImage {
    if !canvas.color().has_alpha() {
        return canvas;
    }
    let base = flat_background(EMPTY_CANVAS, canvas.width(), canvas.height());
    composite(&base, &canvas, Offset::default())
}

fn fit_onto_background(src: &DynamicImage, config: &StyleConfig) -> Result<DynamicImage> {
    let size = config.size;
    let keep = 1.0 - config.margin.clamp(0.0, 0.99);
    let inner = Size::new(
        ((size.width as f32 * keep).round() as u32).max(1),
        ((size.height as f32 * keep).round() as u32).max(1),
    );

    let fg = resize_fit(src, inner.width, inner.height)?;
    let fg_size = Size::of(&fg);
    debug!(inner = %inner, fg = %fg_size, "Fitted foreground");

    let background = match config.background {
        BackgroundPolicy::FlatEdge => {
            let color = match config.flat_color {
                FlatColorSource::Edge(side) => sample_edge(src, side)?,
                FlatColorSource::Dominant(strategy) => sample_dominant_with(src, strategy)?,
            };
            flat_background(color, size.width, size.height)
        }
        BackgroundPolicy::SplitEdge => {
            // Bands go on the axis where the foreground leaves room.
            let (axis, first, second) = if fg_size.height < size.height {
                (SplitAxis::Horizontal, EdgeSide::Top, EdgeSide::Bottom)
            } else {
                (SplitAxis::Vertical, EdgeSide::Left, EdgeSide::Right)
            };
            split_background(
                sample_edge(src, first)?,
                sample_edge(src, second)?,
                size.width,
                size.height,
                axis,
            )
        }
        BackgroundPolicy::BlurredFullBleed => {
            blurred_background_with(src, size.width, size.height, config.blur)?
        }
        BackgroundPolicy::None => flat_background(EMPTY_CANVAS, size.width, size.height),
    };

    Ok(composite(&background, &fg, center_offset(size, fg_size)))
}
