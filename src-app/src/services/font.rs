//! Overlay font lookup: configured path, then the data dir, then system fonts.

use std::path::{Path, PathBuf};

use thumbnail_engine::{OverlayFont, load_font, system_font_candidates};

const VALID_EXTENSIONS: &[&str] = &["ttf", "otf", "ttc"];

#[derive(Clone)]
pub struct FontService {
    data_dir: PathBuf,
}

impl FontService {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    fn fonts_dir(&self) -> PathBuf {
        self.data_dir.join("fonts")
    }

    /// First font file found in `<data dir>/fonts`, sorted by name.
    fn find_custom_font(&self) -> Option<PathBuf> {
        let entries = std::fs::read_dir(self.fonts_dir()).ok()?;
        let mut fonts: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_file() && has_font_extension(p))
            .collect();
        fonts.sort();
        fonts.into_iter().next()
    }

    /// Ordered lookup list for the overlay font.
    pub fn candidates(&self, configured: Option<&Path>) -> Vec<PathBuf> {
        configured
            .map(Path::to_path_buf)
            .into_iter()
            .chain(self.find_custom_font())
            .chain(system_font_candidates().iter().map(PathBuf::from))
            .collect()
    }

    /// Load the first usable font; the bitmap fallback if none parses.
    pub fn load(&self, configured: Option<&Path>) -> OverlayFont {
        load_font(&self.candidates(configured))
    }
}

fn has_font_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| VALID_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}
