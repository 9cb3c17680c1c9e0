//! Expansion of command-line inputs into Markdown source files.

use std::fs;
use std::path::{Path, PathBuf};

/// File extensions accepted as Markdown, compared case-insensitively.
pub const MARKDOWN_EXTENSIONS: [&str; 2] = ["md", "markdown"];

/// Whether `path` has a Markdown extension.
#[must_use]
pub fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            MARKDOWN_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Expand directories into their Markdown files.
///
/// Explicit file inputs are kept as given, even when missing or not Markdown,
/// so that validation can report them. Directory contents are sorted and
/// hidden entries are skipped; subdirectories are only visited when
/// `recursive` is set.
#[must_use]
pub fn collect_sources(inputs: &[PathBuf], recursive: bool) -> Vec<PathBuf> {
    let mut sources = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found = Vec::new();
            scan_dir(input, recursive, &mut found);
            found.sort();
            sources.extend(found);
        } else {
            sources.push(input.clone());
        }
    }
    sources
}

fn scan_dir(dir: &Path, recursive: bool, found: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(path = %dir.display(), error = %e, "Failed to read directory");
            return;
        }
    };

    for entry in entries.flatten() {
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        let path = entry.path();
        if path.is_dir() {
            if recursive {
                scan_dir(&path, recursive, found);
            }
        } else if is_markdown(&path) {
            found.push(path);
        }
    }
}
