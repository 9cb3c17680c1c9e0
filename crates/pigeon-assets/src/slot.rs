//! Exclusive ownership of one document's output files.
//!
//! Every converted document writes `<name>.html` and `<assets_name>/` into its
//! output directory. Names are handed out by [`SlotReservations`] before any
//! document is processed, so two documents of one batch never share a folder
//! even when they run in parallel.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{self, Path, PathBuf};

/// Prefix of every asset folder name.
pub const ASSETS_PREFIX: &str = "assets_";

/// Prefix of files still being written into an asset folder.
///
/// A copy interrupted by cancellation or a crash can leave one behind; it is
/// never part of the folder's content.
pub const PARTIAL_PREFIX: &str = ".pigeon-partial-";

/// Output names owned by exactly one document.
///
/// Not `Clone`: holding the slot is what entitles a conversion to write its
/// HTML file and asset folder.
#[derive(Debug, PartialEq, Eq)]
pub struct OutputSlot {
    dir: PathBuf,
    name: String,
}

impl OutputSlot {
    /// Document name (`report` for `report.html`).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory holding the HTML file and the asset folder.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<name>.html`
    #[must_use]
    pub fn html_file_name(&self) -> String {
        format!("{}.html", self.name)
    }

    /// `assets_<name>`, the folder name as referenced from the HTML.
    #[must_use]
    pub fn assets_name(&self) -> String {
        format!("{ASSETS_PREFIX}{}", self.name)
    }

    #[must_use]
    pub fn html_path(&self) -> PathBuf {
        self.dir.join(self.html_file_name())
    }

    #[must_use]
    pub fn assets_dir(&self) -> PathBuf {
        self.dir.join(self.assets_name())
    }
}

/// Hands out unique [`OutputSlot`]s per output directory.
///
/// Names are compared case-insensitively. The first document named `img`
/// keeps `img`; later ones get `img_2`, `img_3`, ...
#[derive(Debug, Default)]
pub struct SlotReservations {
    taken: HashMap<PathBuf, HashSet<String>>,
}

impl SlotReservations {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the first free name derived from `stem` in `dir`.
    pub fn reserve(&mut self, dir: &Path, stem: &str) -> OutputSlot {
        let stem = if stem.is_empty() { "document" } else { stem };
        let taken = self.taken.entry(directory_key(dir)).or_default();

        let mut name = stem.to_owned();
        let mut counter = 2;
        while taken.contains(&name.to_lowercase()) {
            name = format!("{stem}_{counter}");
            counter += 1;
        }
        taken.insert(name.to_lowercase());

        OutputSlot {
            dir: dir.to_path_buf(),
            name,
        }
    }
}

/// One key per directory however it is spelled (`docs`, `./docs`, absolute).
fn directory_key(dir: &Path) -> PathBuf {
    fs::canonicalize(dir)
        .or_else(|_| path::absolute(dir))
        .unwrap_or_else(|_| dir.to_path_buf())
}

/// Files below an asset folder as (`/`-separated relative path, file), sorted
/// by relative path. Partially written files are skipped.
///
/// # Errors
///
/// Returns the first error reading a directory.
pub fn folder_files(folder: &Path) -> io::Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    walk(folder, folder, &mut files)?;
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

fn walk(base: &Path, current: &Path, files: &mut Vec<(String, PathBuf)>) -> io::Result<()> {
    for entry in fs::read_dir(current)? {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with(PARTIAL_PREFIX) {
            continue;
        }
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            walk(base, &path, files)?;
        } else if let Ok(relative) = path.strip_prefix(base) {
            files.push((relative.to_string_lossy().replace('\\', "/"), path));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_slot_paths() {
        let mut reservations = SlotReservations::new();
        let slot = reservations.reserve(Path::new("/out"), "report");
        assert_eq!(slot.name(), "report");
        assert_eq!(slot.html_path(), PathBuf::from("/out/report.html"));
        assert_eq!(slot.assets_dir(), PathBuf::from("/out/assets_report"));
        assert_eq!(slot.assets_name(), "assets_report");
    }

    #[test]
    fn test_duplicates_get_suffixes_in_order() {
        let mut reservations = SlotReservations::new();
        let dir = Path::new("/out");
        let names: Vec<_> = ["img", "IMG", "img", "other"]
            .iter()
            .map(|stem| reservations.reserve(dir, stem).name().to_owned())
            .collect();
        assert_eq!(names, vec!["img", "IMG_2", "img_3", "other"]);
    }

    #[test]
    fn test_suffix_skips_names_already_taken() {
        let mut reservations = SlotReservations::new();
        let dir = Path::new("/out");
        reservations.reserve(dir, "a_2");
        reservations.reserve(dir, "a");
        assert_eq!(reservations.reserve(dir, "a").name(), "a_3");
    }

    #[test]
    fn test_directories_are_independent() {
        let mut reservations = SlotReservations::new();
        let first = reservations.reserve(Path::new("/one"), "img");
        let second = reservations.reserve(Path::new("/two"), "img");
        assert_eq!(first.name(), "img");
        assert_eq!(second.name(), "img");
    }

    #[test]
    fn test_directory_spellings_share_names() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs");
        fs::create_dir_all(&docs).unwrap();
        let mut reservations = SlotReservations::new();

        let first = reservations.reserve(&docs, "img");
        let second = reservations.reserve(&docs.join("."), "img");
        let third = reservations.reserve(&dir.path().join("docs/../docs"), "IMG");

        assert_eq!(first.name(), "img");
        assert_eq!(second.name(), "img_2");
        assert_eq!(third.name(), "IMG_3");
        assert_eq!(second.dir(), docs.join(".").as_path());
    }

    #[test]
    fn test_folder_files_keeps_dot_names_and_skips_partials() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join(".logo.png"), b"l").unwrap();
        fs::write(dir.path().join("b.png"), b"b").unwrap();
        fs::write(dir.path().join("sub/c.png"), b"c").unwrap();
        fs::write(dir.path().join(format!("{PARTIAL_PREFIX}x1")), b"half").unwrap();

        let names: Vec<String> = folder_files(dir.path())
            .unwrap()
            .into_iter()
            .map(|(relative, _)| relative)
            .collect();

        assert_eq!(names, vec![".logo.png", "b.png", "sub/c.png"]);
    }
}
