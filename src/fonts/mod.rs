//! Font discovery for the vector print document.
//!
//! The raster path uses bundled bitmap glyphs and needs nothing from here.
//! Vector print documents embed a TrueType family looked up in order from
//! `SHIPPING_LABEL_FONTS_DIR`, `assets/fonts` next to the executable, the
//! crate's `assets/fonts`, and the usual system locations of Liberation Sans.

use std::env;
use std::io;
use std::path::{Path, PathBuf};

use genpdf::error::Error;
use genpdf::fonts::{self, FontData, FontFamily};
use log::{debug, warn};

/// Name of the font family, also the file name prefix of its faces.
pub const DEFAULT_FONT_FAMILY_NAME: &str = "LiberationSans";

/// Environment variable overriding the font directory.
pub const FONTS_DIR_ENV: &str = "SHIPPING_LABEL_FONTS_DIR";

const FONT_FILES: &[&str] = &[
    "LiberationSans-Regular.ttf",
    "LiberationSans-Bold.ttf",
    "LiberationSans-Italic.ttf",
    "LiberationSans-BoldItalic.ttf",
];

const SYSTEM_FONT_DIRECTORIES: &[&str] = &[
    "/usr/share/fonts/truetype/liberation",
    "/usr/share/fonts/truetype/liberation2",
    "/usr/share/fonts/liberation-sans",
    "/usr/share/fonts/liberation",
];

fn candidate_directories() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(dir) = env::var_os(FONTS_DIR_ENV) {
        candidates.push(PathBuf::from(dir));
    }
    let exe_dir = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    if let Some(exe_dir) = exe_dir {
        candidates.push(exe_dir.join("assets/fonts"));
    }
    candidates.push(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/fonts"));
    candidates.extend(SYSTEM_FONT_DIRECTORIES.iter().map(PathBuf::from));
    candidates
}

fn has_all_faces(directory: &Path) -> bool {
    FONT_FILES.iter().all(|name| directory.join(name).is_file())
}

/// Returns the first directory holding every face of the default family.
pub fn font_directory() -> Option<PathBuf> {
    let candidates = candidate_directories();
    let found = candidates.iter().find(|dir| has_all_faces(dir)).cloned();
    match &found {
        Some(dir) => debug!("Using label fonts from {}", dir.display()),
        None => warn!(
            "No {} font family found; set {} to a directory containing {}",
            DEFAULT_FONT_FAMILY_NAME,
            FONTS_DIR_ENV,
            FONT_FILES.join(", ")
        ),
    }
    found
}

/// Loads the default family as a `genpdf` font family definition.
pub fn default_font_family() -> Result<FontFamily<FontData>, Error> {
    let directory = font_directory().ok_or_else(|| {
        Error::new(
            format!(
                "Font family {} not found; set {} to a directory containing its faces",
                DEFAULT_FONT_FAMILY_NAME, FONTS_DIR_ENV
            ),
            io::Error::new(io::ErrorKind::NotFound, "label fonts missing"),
        )
    })?;

    fonts::from_files(&directory, DEFAULT_FONT_FAMILY_NAME, None).map_err(|err| {
        Error::new(
            format!(
                "Failed to load font family '{}' from {}: {}",
                DEFAULT_FONT_FAMILY_NAME,
                directory.display(),
                err
            ),
            io::Error::new(io::ErrorKind::Other, err.to_string()),
        )
    })
}

/// Indicates whether vector print documents can be rendered on this machine.
pub fn default_fonts_available() -> bool {
    candidate_directories().iter().any(|dir| has_all_faces(dir))
}
