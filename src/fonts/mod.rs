//! Locating and loading the Roboto faces used by both render backends.
//!
//! Fonts are looked up in, in order: an explicit directory (from configuration), the
//! `AURINE_FONTS_DIR` environment variable, `assets/fonts` next to the executable and the
//! crate's own `assets/fonts`.  The raw bytes are kept so the rasterizer can parse them with
//! `rusttype` while the flow backend turns them into a `genpdf` font family.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use genpdf::fonts::{FontData, FontFamily};
use log::debug;

use crate::error::{Error, Result};

/// Name of the bundled font family.
pub const DEFAULT_FONT_FAMILY_NAME: &str = "Roboto";

/// Environment variable pointing at a directory holding the Roboto files.
pub const FONTS_DIR_ENV: &str = "AURINE_FONTS_DIR";

const FONT_FILES: [&str; 4] = [
    "Roboto-Regular.ttf",
    "Roboto-Bold.ttf",
    "Roboto-Italic.ttf",
    "Roboto-BoldItalic.ttf",
];

/// Raw TrueType data of the four faces of one family.
#[derive(Clone)]
pub struct FontSet {
    /// Regular face.
    pub regular: Vec<u8>,
    /// Bold face.
    pub bold: Vec<u8>,
    /// Italic face.
    pub italic: Vec<u8>,
    /// Bold italic face.
    pub bold_italic: Vec<u8>,
}

impl std::fmt::Debug for FontSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontSet")
            .field("regular", &self.regular.len())
            .field("bold", &self.bold.len())
            .field("italic", &self.italic.len())
            .field("bold_italic", &self.bold_italic.len())
            .finish()
    }
}

impl FontSet {
    /// Reads the four Roboto files from `directory`.
    pub fn load_from(directory: &Path) -> Result<Self> {
        let read = |name: &str| {
            let path = directory.join(name);
            fs::read(&path)
                .map_err(|err| Error::Font(format!("cannot read {}: {}", path.display(), err)))
        };
        Ok(Self {
            regular: read(FONT_FILES[0])?,
            bold: read(FONT_FILES[1])?,
            italic: read(FONT_FILES[2])?,
            bold_italic: read(FONT_FILES[3])?,
        })
    }

    /// Locates the font directory and reads the family from it.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        let directory = resolve_font_directory(explicit)?;
        debug!("Loading fonts from {}", directory.display());
        Self::load_from(&directory)
    }

    /// Converts the faces into a `genpdf` font family.
    pub fn to_genpdf_family(&self) -> Result<FontFamily<FontData>> {
        let load = |bytes: &Vec<u8>, face: &str| {
            FontData::new(bytes.clone(), None).map_err(|err| {
                Error::Font(format!(
                    "failed to parse {} {} face: {}",
                    DEFAULT_FONT_FAMILY_NAME, face, err
                ))
            })
        };
        Ok(FontFamily {
            regular: load(&self.regular, "regular")?,
            bold: load(&self.bold, "bold")?,
            italic: load(&self.italic, "italic")?,
            bold_italic: load(&self.bold_italic, "bold italic")?,
        })
    }
}

fn font_directory_candidates(explicit: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    let mut push = |candidate: PathBuf| {
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    };

    if let Some(path) = explicit {
        push(path.to_path_buf());
    }

    if let Some(value) = env::var_os(FONTS_DIR_ENV) {
        if !value.is_empty() {
            push(PathBuf::from(value));
        }
    }

    if let Ok(current_exe) = env::current_exe() {
        if let Some(bin_dir) = current_exe.parent() {
            push(bin_dir.join("assets/fonts"));
        }
    }

    push(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/fonts"));
    candidates
}

fn missing_font_files(path: &Path) -> Vec<&'static str> {
    FONT_FILES
        .iter()
        .copied()
        .filter(|name| !path.join(name).is_file())
        .collect()
}

/// Returns the first candidate directory containing every required font file.
pub fn resolve_font_directory(explicit: Option<&Path>) -> Result<PathBuf> {
    let mut attempts = Vec::new();

    for candidate in font_directory_candidates(explicit) {
        if !candidate.is_dir() {
            attempts.push(format!("{} (directory missing)", candidate.display()));
            continue;
        }
        let missing = missing_font_files(&candidate);
        if missing.is_empty() {
            return Ok(candidate);
        }
        attempts.push(format!(
            "{} (missing files [{}])",
            candidate.display(),
            missing.join(", ")
        ));
    }

    Err(Error::Font(format!(
        "unable to locate the {} fonts. Checked: {}. See assets/fonts/README.md or set {}.",
        DEFAULT_FONT_FAMILY_NAME,
        attempts.join(", "),
        FONTS_DIR_ENV
    )))
}

/// Indicates whether the bundled fonts can be found without explicit configuration.
pub fn default_fonts_available() -> bool {
    resolve_font_directory(None).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_directory_is_checked_first() {
        let explicit = Path::new("/definitely/not/here");
        let candidates = font_directory_candidates(Some(explicit));
        assert_eq!(candidates[0], explicit);
        assert!(candidates
            .iter()
            .any(|candidate| candidate.ends_with("assets/fonts")));
    }

    #[test]
    fn missing_directory_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = missing_font_files(dir.path());
        assert_eq!(missing.len(), 4);
        let err = FontSet::load_from(dir.path()).unwrap_err();
        assert!(matches!(err, Error::Font(_)));
    }
}
