//! Platform presets and style policies.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Size;
use crate::background::BlurStyle;
use crate::color::{DominantStrategy, EdgeSide};
use crate::compose::{GRADIENT_MAX_ALPHA_SOFT, GRADIENT_MAX_ALPHA_STRONG, GradientStyle};
use crate::text::OverlayFields;

/// Blur used by the compact preset's full-bleed variant.
pub const COMPACT_BLUR: BlurStyle = BlurStyle {
    radius: 30.0,
    passes: 1,
    darken: 0.6,
};

/// Blur used by the square preset.
pub const SQUARE_BLUR: BlurStyle = BlurStyle {
    radius: 10.0,
    passes: 3,
    darken: 0.5,
};

/// Share of the canvas left empty around the foreground by the flat-edge variant.
pub const FLAT_EDGE_MARGIN: f32 = 0.1;

/// Output platform. Decides the canvas size and the filename prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Blog cover (tistory).
    Compact,
    /// Square social post (instagram).
    Square,
}

impl Preset {
    /// Name used in generated filenames.
    pub fn name(self) -> &'static str {
        match self {
            Self::Compact => "tistory",
            Self::Square => "instagram",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct ParseStyleError {
    kind: &'static str,
    value: String,
}

impl FromStr for Preset {
    type Err = ParseStyleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" | "tistory" => Ok(Self::Compact),
            "square" | "instagram" => Ok(Self::Square),
            other => Err(ParseStyleError {
                kind: "preset",
                value: other.to_string(),
            }),
        }
    }
}

/// Canvas size per preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetTable {
    pub compact: Size,
    pub square: Size,
}

impl Default for PresetTable {
    fn default() -> Self {
        Self {
            compact: Size::new(1200, 600),
            square: Size::new(1080, 1080),
        }
    }
}

impl PresetTable {
    pub fn size_for(&self, preset: Preset) -> Size {
        match preset {
            Preset::Compact => self.compact,
            Preset::Square => self.square,
        }
    }
}

/// What fills the canvas behind the foreground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundPolicy {
    /// One flat color sampled from the source.
    FlatEdge,
    /// Two flat bands, one per opposing edge of the source.
    SplitEdge,
    /// Blurred, darkened, enlarged copy of the source.
    BlurredFullBleed,
    /// No synthesized background.
    None,
}

/// How the source image is placed on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Foreground {
    /// Fit inside the canvas (minus the margin) and center.
    Fit,
    /// Cover the canvas and center-crop.
    FillCrop,
    /// No image at all; text over a gradient canvas.
    Omitted,
}

/// Where the flat background color comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlatColorSource {
    Edge(EdgeSide),
    Dominant(DominantStrategy),
}

impl Default for FlatColorSource {
    fn default() -> Self {
        Self::Edge(EdgeSide::All)
    }
}

/// The five compact-preset styles, oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleVariant {
    /// Text over a gradient canvas, no image.
    TextOnly,
    /// Fit with a margin over a flat edge color.
    FlatEdge,
    /// Fit over two flat bands.
    SplitEdge,
    /// Fill and center-crop.
    FillCrop,
    /// Fit over a blurred copy of the source.
    BlurredFullBleed,
}

impl StyleVariant {
    pub const ALL: [Self; 5] = [
        Self::TextOnly,
        Self::FlatEdge,
        Self::SplitEdge,
        Self::FillCrop,
        Self::BlurredFullBleed,
    ];
}

impl FromStr for StyleVariant {
    type Err = ParseStyleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "text_only" | "v1" => Ok(Self::TextOnly),
            "flat" | "flat_edge" | "v2" => Ok(Self::FlatEdge),
            "split" | "split_edge" | "v3" => Ok(Self::SplitEdge),
            "fill" | "fill_crop" | "v4" => Ok(Self::FillCrop),
            "blur" | "blurred" | "blurred_full_bleed" | "v5" => Ok(Self::BlurredFullBleed),
            other => Err(ParseStyleError {
                kind: "style",
                value: other.to_string(),
            }),
        }
    }
}

/// Everything one pipeline run needs to know. Built once per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleConfig {
    pub preset: Preset,
    pub size: Size,
    pub foreground: Foreground,
    pub background: BackgroundPolicy,
    /// Fraction of each canvas dimension kept free around a fitted foreground.
    pub margin: f32,
    pub flat_color: FlatColorSource,
    pub blur: BlurStyle,
    pub add_gradient: bool,
    pub gradient: GradientStyle,
    pub text: Option<OverlayFields>,
}

impl StyleConfig {
    /// Compact preset in one of its five styles.
    pub fn compact(variant: StyleVariant, size: Size) -> Self {
        let base = Self {
            preset: Preset::Compact,
            size,
            foreground: Foreground::Fit,
            background: BackgroundPolicy::None,
            margin: 0.0,
            flat_color: FlatColorSource::default(),
            blur: COMPACT_BLUR,
            add_gradient: false,
            gradient: GradientStyle::darken_downward(GRADIENT_MAX_ALPHA_SOFT),
            text: None,
        };
        match variant {
            StyleVariant::TextOnly => Self {
                foreground: Foreground::Omitted,
                ..base
            },
            StyleVariant::FlatEdge => Self {
                background: BackgroundPolicy::FlatEdge,
                margin: FLAT_EDGE_MARGIN,
                ..base
            },
            StyleVariant::SplitEdge => Self {
                background: BackgroundPolicy::SplitEdge,
                ..base
            },
            StyleVariant::FillCrop => Self {
                foreground: Foreground::FillCrop,
                ..base
            },
            StyleVariant::BlurredFullBleed => Self {
                background: BackgroundPolicy::BlurredFullBleed,
                ..base
            },
        }
    }

    /// Square preset: fit over a flat edge color or a blurred background.
    pub fn square(size: Size, blurred: bool) -> Self {
        Self {
            preset: Preset::Square,
            size,
            foreground: Foreground::Fit,
            background: if blurred {
                BackgroundPolicy::BlurredFullBleed
            } else {
                BackgroundPolicy::FlatEdge
            },
            margin: 0.0,
            flat_color: FlatColorSource::default(),
            blur: SQUARE_BLUR,
            add_gradient: false,
            gradient: GradientStyle::darken_downward(GRADIENT_MAX_ALPHA_STRONG),
            text: None,
        }
    }

    pub fn with_gradient(mut self, add_gradient: bool) -> Self {
        self.add_gradient = add_gradient;
        self
    }

    pub fn with_gradient_style(mut self, gradient: GradientStyle) -> Self {
        self.gradient = gradient;
        self
    }

    pub fn with_text(mut self, fields: OverlayFields) -> Self {
        self.text = Some(fields);
        self
    }

    pub fn with_flat_color(mut self, source: FlatColorSource) -> Self {
        self.flat_color = source;
        self
    }

    pub fn with_blur(mut self, blur: BlurStyle) -> Self {
        self.blur = blur;
        self
    }

    /// Builder: set the fit margin.
    ///
    /// # Panics
    /// Panics if value is not in 0.0..1.0 range.
    pub fn with_margin(mut self, margin: f32) -> Self {
        assert!(
            (0.0..1.0).contains(&margin),
            "Margin must be in 0.0..1.0, got {margin}"
        );
        self.margin = margin;
        self
    }

    /// Whether this style cannot run without an uploaded image.
    pub fn requires_source(&self) -> bool {
        self.foreground != Foreground::Omitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_names_match_filenames() {
        assert_eq!(Preset::Compact.name(), "tistory");
        assert_eq!(Preset::Square.name(), "instagram");
    }

    #[test]
    fn presets_parse_from_either_name() {
        assert_eq!("tistory".parse::<Preset>().unwrap(), Preset::Compact);
        assert_eq!(" Square ".parse::<Preset>().unwrap(), Preset::Square);
        assert!("facebook".parse::<Preset>().is_err());
    }

    #[test]
    fn variants_parse() {
        assert_eq!("v5".parse::<StyleVariant>().unwrap(), StyleVariant::BlurredFullBleed);
        assert_eq!("split".parse::<StyleVariant>().unwrap(), StyleVariant::SplitEdge);
        let err = "sepia".parse::<StyleVariant>().unwrap_err();
        assert_eq!(err.to_string(), "unknown style: \"sepia\"");
    }

    #[test]
    fn default_table_sizes() {
        let table = PresetTable::default();
        assert_eq!(table.size_for(Preset::Compact), Size::new(1200, 600));
        assert_eq!(table.size_for(Preset::Square), Size::new(1080, 1080));
    }

    #[test]
    fn compact_variants_map_to_policies() {
        let size = Size::new(230, 300);
        let policies: Vec<(Foreground, BackgroundPolicy)> = StyleVariant::ALL
            .iter()
            .map(|&v| {
                let c = StyleConfig::compact(v, size);
                (c.foreground, c.background)
            })
            .collect();
        assert_eq!(
            policies,
            vec![
                (Foreground::Omitted, BackgroundPolicy::None),
                (Foreground::Fit, BackgroundPolicy::FlatEdge),
                (Foreground::Fit, BackgroundPolicy::SplitEdge),
                (Foreground::FillCrop, BackgroundPolicy::None),
                (Foreground::Fit, BackgroundPolicy::BlurredFullBleed),
            ]
        );
    }

    #[test]
    fn only_text_only_runs_without_source() {
        for v in StyleVariant::ALL {
            let c = StyleConfig::compact(v, Size::new(10, 10));
            assert_eq!(c.requires_source(), v != StyleVariant::TextOnly);
        }
        assert!(StyleConfig::square(Size::new(10, 10), true).requires_source());
    }

    #[test]
    fn presets_carry_their_own_constants() {
        let compact = StyleConfig::compact(StyleVariant::BlurredFullBleed, Size::new(1, 1));
        let square = StyleConfig::square(Size::new(1, 1), true);
        assert_eq!(compact.gradient.end_alpha, 100);
        assert_eq!(square.gradient.end_alpha, 128);
        assert_eq!(compact.blur.darken, 0.6);
        assert_eq!(square.blur.darken, 0.5);
    }

    #[test]
    #[should_panic(expected = "Margin must be in 0.0..1.0")]
    fn margin_out_of_range_panics() {
        let _ = StyleConfig::square(Size::new(1, 1), false).with_margin(1.5);
    }
}
