//! Classification of image references as remote or local files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;
use pigeon_renderer::Document;

use crate::warning::Warning;

/// Where an asset lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetKind {
    /// Left untouched in the output (`http(s)://`, `//host`, `data:`).
    Remote,
    /// A file on disk, relative to the document or absolute.
    Local,
}

/// One distinct image reference of a document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetReference {
    /// Source exactly as written in the document.
    pub original: String,
    pub kind: AssetKind,
    /// Existing file for a local reference, `None` if missing or remote.
    pub resolved: Option<PathBuf>,
}

/// Resolve every image reference of `document` against `source_dir`.
///
/// Each distinct source is returned once, in order of first appearance.
/// Missing local files produce a `MissingAsset` warning. Never touches the
/// network.
pub fn resolve(document: &Document, source_dir: &Path) -> (Vec<AssetReference>, Vec<Warning>) {
    let mut seen = HashSet::new();
    let mut references = Vec::new();
    let mut warnings = Vec::new();

    for original in document.asset_references() {
        if original.is_empty() || !seen.insert(original) {
            continue;
        }

        if is_remote(original) {
            references.push(AssetReference {
                original: original.to_owned(),
                kind: AssetKind::Remote,
                resolved: None,
            });
            continue;
        }

        let candidate = local_path(original, source_dir);
        let resolved = if candidate.is_file() {
            Some(candidate)
        } else {
            tracing::debug!(path = %candidate.display(), "Image not found");
            warnings.push(Warning::missing_asset(original, &candidate));
            None
        };
        references.push(AssetReference {
            original: original.to_owned(),
            kind: AssetKind::Local,
            resolved,
        });
    }

    (references, warnings)
}

/// Whether a reference points outside the local filesystem.
#[must_use]
pub fn is_remote(reference: &str) -> bool {
    let lower = reference.get(..8).unwrap_or(reference).to_ascii_lowercase();
    lower.starts_with("http://")
        || lower.starts_with("https://")
        || lower.starts_with("data:")
        || reference.starts_with("//")
}

/// Filesystem path a local reference points to.
fn local_path(reference: &str, source_dir: &Path) -> PathBuf {
    let without_suffix = reference
        .split(['?', '#'])
        .next()
        .unwrap_or(reference);
    let without_scheme = strip_file_scheme(without_suffix);
    let decoded = percent_decode_str(without_scheme).decode_utf8_lossy();

    let path = Path::new(decoded.as_ref());
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        source_dir.join(path)
    }
}

fn strip_file_scheme(reference: &str) -> &str {
    match reference.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("file://") => &reference[7..],
        _ => reference,
    }
}
