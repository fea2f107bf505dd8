//! Thumbnail compositing pipeline.
//!
//! Provides edge/dominant color sampling, fit and fill resizing,
//! background synthesis (flat, split, blurred) and layered compositing
//! into fixed-size blog and social thumbnails.

pub mod background;
pub mod codec;
pub mod color;
pub mod compose;
pub mod pipeline;
pub mod resize;
pub mod text;

// Re-exports for convenience
pub use background::{
    BlurStyle, SplitAxis, blurred_background, flat_background, gradient_canvas, split_background,
};
pub use codec::{Limits, decode, encode_png};
pub use color::{Color, DominantStrategy, EdgeSide, sample_dominant, sample_edge};
pub use compose::{GradientDirection, GradientStyle, center_offset, composite, overlay_gradient};
pub use pipeline::{
    BackgroundPolicy, EncodedThumbnail, FlatColorSource, Foreground, Preset, PresetTable,
    StyleConfig, StyleVariant, Thumbnail, generate, generate_at, render, thumbnail_filename,
};
pub use resize::{Window, center_crop, cover_window, resize_cover, resize_fill, resize_fit};
pub use text::{
    OverlayFields, OverlayFont, draw_overlay_text, load_font, system_font_candidates,
};

/// Default ceiling on source pixel count (4096 x 4096).
pub const DEFAULT_MAX_PIXELS: u64 = 4096 * 4096;

/// Width/height pair. Both components are non-zero for any valid size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn of(img: &image::DynamicImage) -> Self {
        Self::new(img.width(), img.height())
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Top-left placement of a layer on a canvas. May be negative; pasting clips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Offset {
    pub x: i64,
    pub y: i64,
}

impl Offset {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// Errors that can occur while generating a thumbnail.
#[derive(Debug, thiserror::Error)]
pub enum ThumbnailError {
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Missing input: {0}")]
    MissingInput(&'static str),

    #[error("Image too large: {width}x{height} exceeds limit of {max_pixels} pixels")]
    ResourceExceeded {
        width: u32,
        height: u32,
        max_pixels: u64,
    },

    #[error("Invalid target size: {0}")]
    InvalidSize(Size),

    #[error("Encode error: {0}")]
    Encode(String),
}

/// Result type alias for thumbnail operations.
pub type Result<T> = std::result::Result<T, ThumbnailError>;

/// Reject zero-area bitmaps before any stage touches them.
pub(crate) fn ensure_non_empty(img: &image::DynamicImage) -> Result<()> {
    if Size::of(img).is_empty() {
        return Err(ThumbnailError::InvalidImage(format!(
            "zero-area image ({}x{})",
            img.width(),
            img.height()
        )));
    }
    Ok(())
}
