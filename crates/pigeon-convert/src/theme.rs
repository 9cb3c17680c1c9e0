//! Theme stylesheets.
//!
//! A theme is a `<name>.css` file in one of the configured theme directories.
//! Directories are searched in order, so user directories listed first
//! override bundled ones.

use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

/// Stylesheet used when no theme is selected or the selected one is unusable.
pub const DEFAULT_CSS: &str = include_str!("../assets/default.css");

/// Lookup of theme stylesheets across an ordered list of directories.
#[derive(Clone, Debug, Default)]
pub struct ThemeStore {
    dirs: Vec<PathBuf>,
}

impl ThemeStore {
    #[must_use]
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    /// CSS of theme `name`, or [`DEFAULT_CSS`].
    ///
    /// Unknown and unreadable themes are logged and fall back to the default
    /// stylesheet rather than failing the conversion.
    #[must_use]
    pub fn load(&self, name: Option<&str>) -> String {
        let Some(name) = name else {
            return DEFAULT_CSS.to_owned();
        };
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            tracing::warn!(theme = %name, "Invalid theme name, using default");
            return DEFAULT_CSS.to_owned();
        }

        let file_name = format!("{name}.css");
        for dir in &self.dirs {
            let path = dir.join(&file_name);
            if !path.is_file() {
                continue;
            }
            match fs::read_to_string(&path) {
                Ok(css) => {
                    tracing::debug!(theme = %name, path = %path.display(), "Loaded theme");
                    return css;
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to load theme");
                }
            }
        }

        tracing::warn!(theme = %name, "Theme not found, using default");
        DEFAULT_CSS.to_owned()
    }

    /// Names of all themes across every directory, sorted and deduplicated.
    #[must_use]
    pub fn available(&self) -> Vec<String> {
        let mut names = BTreeSet::new();
        for dir in &self.dirs {
            let Ok(entries) = fs::read_dir(dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "css")
                    && path.is_file()
                    && let Some(stem) = path.file_stem()
                {
                    names.insert(stem.to_string_lossy().into_owned());
                }
            }
        }
        names.into_iter().collect()
    }
}
