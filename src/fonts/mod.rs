//! Font and logo asset loading.
//!
//! The report uses one regular and one bold TrueType file; the italic variants
//! reuse them.  Assets are resolved against the configured assets directory
//! and checked only when a document is rendered.

use std::io;
use std::path::{Path, PathBuf};

use genpdf::error::Error;
use genpdf::fonts::{FontData, FontFamily};
use log::warn;

use crate::config::ReportConfig;

/// Locations of the static assets the renderer needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetPaths {
    /// Regular font file.
    pub regular_font: PathBuf,
    /// Bold font file.
    pub bold_font: PathBuf,
    /// Header logo image.
    pub logo: PathBuf,
}

impl AssetPaths {
    /// Resolves the asset file names of `config` against its assets directory.
    pub fn from_config(config: &ReportConfig) -> Self {
        Self {
            regular_font: config.assets_dir.join(&config.regular_font),
            bold_font: config.assets_dir.join(&config.bold_font),
            logo: config.assets_dir.join(&config.logo),
        }
    }

    /// Returns the font files that do not exist on disk.
    pub fn missing_fonts(&self) -> Vec<&Path> {
        [self.regular_font.as_path(), self.bold_font.as_path()]
            .into_iter()
            .filter(|path| !path.is_file())
            .collect()
    }

    /// Indicates whether both font files are present.
    pub fn fonts_available(&self) -> bool {
        self.missing_fonts().is_empty()
    }
}

fn ensure_required_fonts_present(paths: &AssetPaths) -> Result<(), Error> {
    let missing = paths.missing_fonts();
    if missing.is_empty() {
        return Ok(());
    }

    let display_list = missing
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    warn!("Report fonts missing: {display_list}");

    Err(Error::new(
        format!(
            "Missing font files: {}. Set FCI_REPORT_ASSETS_DIR to the directory holding them.",
            display_list
        ),
        io::Error::new(io::ErrorKind::NotFound, "report fonts missing"),
    ))
}

fn load_font(path: &Path) -> Result<FontData, Error> {
    FontData::load(path, None).map_err(|err| {
        Error::new(
            format!("Failed to load font {}: {}", path.display(), err),
            io::Error::new(io::ErrorKind::InvalidData, err.to_string()),
        )
    })
}

/// Loads the report font family from the configured files.
pub fn load_font_family(paths: &AssetPaths) -> Result<FontFamily<FontData>, Error> {
    ensure_required_fonts_present(paths)?;
    let regular = load_font(&paths.regular_font)?;
    let bold = load_font(&paths.bold_font)?;

    Ok(FontFamily {
        italic: regular.clone(),
        bold_italic: bold.clone(),
        regular,
        bold,
    })
}
