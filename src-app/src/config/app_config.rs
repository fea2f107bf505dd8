use std::path::PathBuf;

use thumbnail_engine::{
    DEFAULT_MAX_PIXELS, Limits, OverlayFields, Preset, PresetTable, StyleConfig, StyleVariant,
};

use super::ConfigError;
use super::validation::{parse_size, validate_setting};

/// Runtime configuration for one generator run.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub source: Option<PathBuf>,
    pub preset: Preset,
    pub style: StyleVariant,
    pub square_blurred: bool,
    pub add_gradient: bool,
    pub presets: PresetTable,
    pub max_pixels: u64,

    // Text overlay
    pub title: String,
    pub subtitle: String,
    pub tech_stack: Vec<String>,
    pub duration: String,
    pub font_path: Option<PathBuf>,

    pub output_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source: None,
            preset: Preset::Compact,
            style: StyleVariant::BlurredFullBleed,
            square_blurred: false,
            add_gradient: false,
            presets: PresetTable::default(),
            max_pixels: DEFAULT_MAX_PIXELS,
            title: String::new(),
            subtitle: String::new(),
            tech_stack: Vec::new(),
            duration: String::new(),
            font_path: None,
            output_dir: PathBuf::from("output"),
        }
    }
}

impl AppConfig {
    /// Load from process environment variables.
    pub fn load(default_output_dir: PathBuf) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok(), default_output_dir)
    }

    /// Load from any key lookup. Unset and blank keys keep their defaults.
    pub fn from_lookup<F>(lookup: F, default_output_dir: PathBuf) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let g = |key: &str| -> Result<Option<String>, ConfigError> {
            let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) else {
                return Ok(None);
            };
            validate_setting(key, &value).map_err(|reason| ConfigError {
                key: key.to_string(),
                value: value.clone(),
                reason,
            })?;
            Ok(Some(value))
        };
        let text = |key: &str| lookup(key).map(|v| unescape_newlines(&v)).unwrap_or_default();

        let d = Self::default();
        let mut presets = d.presets;
        if let Some(v) = g("THUMBNAIL_COMPACT_SIZE")? {
            presets.compact = size_setting("THUMBNAIL_COMPACT_SIZE", &v)?;
        }
        if let Some(v) = g("THUMBNAIL_SQUARE_SIZE")? {
            presets.square = size_setting("THUMBNAIL_SQUARE_SIZE", &v)?;
        }

        Ok(Self {
            source: g("THUMBNAIL_SOURCE")?.map(PathBuf::from),
            preset: g("THUMBNAIL_PRESET")?
                .and_then(|v| v.parse().ok())
                .unwrap_or(d.preset),
            style: g("THUMBNAIL_STYLE")?
                .and_then(|v| v.parse().ok())
                .unwrap_or(d.style),
            square_blurred: g("THUMBNAIL_SQUARE_BACKGROUND")?
                .map(|v| v == "blur")
                .unwrap_or(d.square_blurred),
            add_gradient: g("THUMBNAIL_GRADIENT")?
                .map(|v| v == "true")
                .unwrap_or(d.add_gradient),
            presets,
            max_pixels: g("THUMBNAIL_MAX_PIXELS")?
                .and_then(|v| v.parse().ok())
                .unwrap_or(d.max_pixels),
            title: text("THUMBNAIL_TITLE"),
            subtitle: text("THUMBNAIL_SUBTITLE"),
            tech_stack: OverlayFields::parse_tech_list(&text("THUMBNAIL_TECH_STACK").replace('|', "\n")),
            duration: text("THUMBNAIL_DURATION"),
            font_path: g("THUMBNAIL_FONT")?.map(PathBuf::from),
            output_dir: g("THUMBNAIL_OUTPUT_DIR")?
                .map(PathBuf::from)
                .unwrap_or(default_output_dir),
        })
    }

    pub fn overlay_fields(&self) -> OverlayFields {
        OverlayFields {
            title: self.title.clone(),
            subtitle: self.subtitle.clone(),
            tech_stack: self.tech_stack.clone(),
            duration: self.duration.clone(),
        }
    }

    /// Pipeline settings for the selected preset and style.
    pub fn style_config(&self) -> StyleConfig {
        let size = self.presets.size_for(self.preset);
        let config = match self.preset {
            Preset::Compact => StyleConfig::compact(self.style, size),
            Preset::Square => StyleConfig::square(size, self.square_blurred),
        }
        .with_gradient(self.add_gradient);

        let fields = self.overlay_fields();
        if fields.is_empty() {
            config
        } else {
            config.with_text(fields)
        }
    }

    pub fn limits(&self) -> Limits {
        Limits::default().with_max_pixels(self.max_pixels)
    }
}

fn size_setting(key: &str, value: &str) -> Result<thumbnail_engine::Size, ConfigError> {
    parse_size(value).map_err(|reason| ConfigError {
        key: key.to_string(),
        value: value.to_string(),
        reason,
    })
}

/// `.env` values cannot hold raw newlines; accept a literal `\n` instead.
fn unescape_newlines(value: &str) -> String {
    value.replace("\\n", "\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use thumbnail_engine::{BackgroundPolicy, Size};

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| map.get(k).cloned(), PathBuf::from("/tmp/out"))
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.preset, Preset::Compact);
        assert_eq!(config.style, StyleVariant::BlurredFullBleed);
        assert_eq!(config.presets, PresetTable::default());
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert!(config.source.is_none());
        assert!(config.style_config().text.is_none());
    }

    #[test]
    fn values_are_parsed() {
        let config = load(&[
            ("THUMBNAIL_SOURCE", "in.png"),
            ("THUMBNAIL_PRESET", "instagram"),
            ("THUMBNAIL_SQUARE_BACKGROUND", "blur"),
            ("THUMBNAIL_GRADIENT", "true"),
            ("THUMBNAIL_SQUARE_SIZE", "500x500"),
            ("THUMBNAIL_MAX_PIXELS", "1000000"),
        ])
        .unwrap();

        assert_eq!(config.source, Some(PathBuf::from("in.png")));
        assert_eq!(config.preset, Preset::Square);
        assert_eq!(config.limits().max_pixels, 1_000_000);

        let style = config.style_config();
        assert_eq!(style.size, Size::new(500, 500));
        assert_eq!(style.background, BackgroundPolicy::BlurredFullBleed);
        assert!(style.add_gradient);
    }

    #[test]
    fn text_fields_accept_escaped_newlines_and_pipes() {
        let config = load(&[
            ("THUMBNAIL_STYLE", "text"),
            ("THUMBNAIL_TITLE", "Data\\nEngineering"),
            ("THUMBNAIL_TECH_STACK", "Rust| Tokio||Axum"),
        ])
        .unwrap();

        assert_eq!(config.title, "Data\nEngineering");
        assert_eq!(config.tech_stack, vec!["Rust", "Tokio", "Axum"]);
        assert!(!config.style_config().requires_source());
        assert!(config.style_config().text.is_some());
    }

    #[test]
    fn invalid_values_name_the_key() {
        let err = load(&[("THUMBNAIL_STYLE", "sepia")]).unwrap_err();
        assert_eq!(err.key, "THUMBNAIL_STYLE");

        let err = load(&[("THUMBNAIL_COMPACT_SIZE", "12x")]).unwrap_err();
        assert_eq!(err.key, "THUMBNAIL_COMPACT_SIZE");
    }

    #[test]
    fn blank_values_keep_defaults() {
        let config = load(&[("THUMBNAIL_PRESET", "  "), ("THUMBNAIL_OUTPUT_DIR", "")]).unwrap();
        assert_eq!(config.preset, Preset::Compact);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
    }
}
