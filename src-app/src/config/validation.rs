//! Setting value validation.

use regex::Regex;
use std::sync::LazyLock;

use thumbnail_engine::{Preset, Size, StyleVariant};

static RE_SIZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d{1,5})\s*[xX×]\s*(\d{1,5})\s*$").unwrap());

/// Largest accepted canvas edge.
const MAX_CANVAS_EDGE: u32 = 4096;

/// Validate a setting value. Returns `Ok(())` if valid, or an error message.
pub fn validate_setting(key: &str, value: &str) -> Result<(), String> {
    match key {
        "THUMBNAIL_PRESET" => {
            value.parse::<Preset>().map_err(|e| e.to_string())?;
        }
        "THUMBNAIL_STYLE" => {
            value.parse::<StyleVariant>().map_err(|e| e.to_string())?;
        }
        "THUMBNAIL_SQUARE_BACKGROUND" => {
            if value != "flat" && value != "blur" {
                return Err("must be 'flat' or 'blur'".into());
            }
        }
        "THUMBNAIL_GRADIENT" => {
            if value != "true" && value != "false" {
                return Err("must be 'true' or 'false'".into());
            }
        }
        "THUMBNAIL_COMPACT_SIZE" | "THUMBNAIL_SQUARE_SIZE" => {
            parse_size(value)?;
        }
        "THUMBNAIL_MAX_PIXELS" => {
            let v: u64 = value.parse().map_err(|_| "must be an integer")?;
            if v == 0 {
                return Err("must be greater than 0".into());
            }
        }
        _ => {}
    }
    Ok(())
}

/// Parse `WIDTHxHEIGHT` (e.g. `1200x600`).
pub fn parse_size(value: &str) -> Result<Size, String> {
    let caps = RE_SIZE
        .captures(value)
        .ok_or("expected WIDTHxHEIGHT, e.g. 1200x600")?;
    let width: u32 = caps[1].parse().map_err(|_| "invalid width")?;
    let height: u32 = caps[2].parse().map_err(|_| "invalid height")?;
    if !(1..=MAX_CANVAS_EDGE).contains(&width) || !(1..=MAX_CANVAS_EDGE).contains(&height) {
        return Err(format!("each side must be between 1 and {MAX_CANVAS_EDGE}"));
    }
    Ok(Size::new(width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_parses_common_forms() {
        assert_eq!(parse_size("1200x600").unwrap(), Size::new(1200, 600));
        assert_eq!(parse_size(" 230 X 300 ").unwrap(), Size::new(230, 300));
        assert_eq!(parse_size("1080×1080").unwrap(), Size::new(1080, 1080));
    }

    #[test]
    fn size_rejects_bad_values() {
        assert!(parse_size("1200").is_err());
        assert!(parse_size("0x600").is_err());
        assert!(parse_size("5000x600").is_err());
        assert!(parse_size("axb").is_err());
    }

    #[test]
    fn settings_are_checked_by_key() {
        assert!(validate_setting("THUMBNAIL_PRESET", "tistory").is_ok());
        assert!(validate_setting("THUMBNAIL_PRESET", "tiktok").is_err());
        assert!(validate_setting("THUMBNAIL_STYLE", "v3").is_ok());
        assert!(validate_setting("THUMBNAIL_GRADIENT", "yes").is_err());
        assert!(validate_setting("THUMBNAIL_MAX_PIXELS", "0").is_err());
        assert!(validate_setting("THUMBNAIL_TITLE", "anything").is_ok());
    }
}
