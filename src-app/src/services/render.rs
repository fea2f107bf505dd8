//! One generator run: read the upload, run the pipeline, write the PNG.

use std::path::PathBuf;

use anyhow::Context;
use thumbnail_engine::{OverlayFont, generate};

use crate::config::AppConfig;

/// Generate a thumbnail and write it into the configured output directory.
/// Returns the path of the written file.
pub fn render_to_dir(config: &AppConfig, font: &OverlayFont) -> anyhow::Result<PathBuf> {
    let style = config.style_config();

    let source = match &config.source {
        Some(path) if style.requires_source() => Some(
            std::fs::read(path)
                .with_context(|| format!("failed to read source image {}", path.display()))?,
        ),
        Some(path) => {
            tracing::debug!(path = %path.display(), "Style does not use an upload, ignoring source");
            None
        }
        None => None,
    };

    let thumbnail = generate(source.as_deref(), &style, font, &config.limits())?;
    let encoded = thumbnail.encode()?;

    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!("failed to create output dir {}", config.output_dir.display())
    })?;
    let path = config.output_dir.join(&encoded.filename);
    std::fs::write(&path, &encoded.bytes)
        .with_context(|| format!("failed to write {}", path.display()))?;

    tracing::info!(path = %path.display(), bytes = encoded.bytes.len(), "Thumbnail saved");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};
    use thumbnail_engine::{Preset, StyleVariant, ThumbnailError, encode_png};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("thumbnail-render-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn writes_png_named_after_preset() {
        let dir = scratch_dir("write");
        let src = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 48, Rgb([200, 40, 40])));
        let source = dir.join("in.png");
        std::fs::write(&source, encode_png(&src).unwrap()).unwrap();

        let mut config = AppConfig {
            source: Some(source),
            preset: Preset::Square,
            output_dir: dir.join("out"),
            ..AppConfig::default()
        };
        config.presets.square = thumbnail_engine::Size::new(120, 120);

        let path = render_to_dir(&config, &OverlayFont::Fallback).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("thumbnail_instagram_"), "{name}");
        assert!(name.ends_with(".png"));

        let written = image::open(&path).unwrap();
        assert_eq!((written.width(), written.height()), (120, 120));

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn missing_upload_surfaces_engine_error() {
        let dir = scratch_dir("missing");
        let config = AppConfig {
            style: StyleVariant::FillCrop,
            output_dir: dir.join("out"),
            ..AppConfig::default()
        };

        let err = render_to_dir(&config, &OverlayFont::Fallback).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ThumbnailError>(),
            Some(ThumbnailError::MissingInput(_))
        ));
        assert!(!dir.join("out").exists());

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn unreadable_source_is_an_io_error() {
        let config = AppConfig {
            source: Some(PathBuf::from("/nonexistent/thumbnail-source.png")),
            ..AppConfig::default()
        };
        let err = render_to_dir(&config, &OverlayFont::Fallback).unwrap_err();
        assert!(err.to_string().contains("failed to read source image"));
    }
}
