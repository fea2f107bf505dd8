pub mod config;
pub mod services;

use std::path::PathBuf;

use thumbnail_engine::ThumbnailError;

use config::AppConfig;
use services::font::FontService;
use services::render::render_to_dir;

/// Exit code for a run that could not start because an input was missing.
pub const EXIT_MISSING_INPUT: i32 = 2;

/// Determine the data directory for the application.
/// Priority: THUMBNAIL_GENERATOR_DATA_DIR env var > ~/.thumbnail-generator
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("THUMBNAIL_GENERATOR_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".thumbnail-generator")
}

/// Load .env from multiple candidate paths.
fn load_dotenv() {
    let candidates = [".env", "../.env"];
    for path in &candidates {
        if dotenvy::from_filename(path).is_ok() {
            tracing::info!("Loaded .env from: {path}");
            return;
        }
    }
    tracing::info!("No .env file found, using system environment variables");
}

/// Load .env and build the runtime config.
pub fn init_config() -> anyhow::Result<(AppConfig, PathBuf)> {
    load_dotenv();

    let dir = data_dir();
    let config = AppConfig::load(dir.join("output"))?;
    tracing::info!(
        preset = config.preset.name(),
        style = ?config.style,
        output = %config.output_dir.display(),
        "Config loaded"
    );
    Ok((config, dir))
}

/// Generate one thumbnail from the environment's settings.
pub fn run() -> anyhow::Result<PathBuf> {
    let (config, dir) = init_config()?;
    let font = FontService::new(dir).load(config.font_path.as_deref());
    render_to_dir(&config, &font)
}

/// Missing uploads are a user mistake, not a crash.
pub fn is_missing_input(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<ThumbnailError>(),
        Some(ThumbnailError::MissingInput(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_input_is_recognized_through_anyhow() {
        let err = anyhow::Error::from(ThumbnailError::MissingInput("no upload"));
        assert!(is_missing_input(&err));

        let err = anyhow::Error::from(ThumbnailError::InvalidImage("bad".into()));
        assert!(!is_missing_input(&err));
    }
}
