//! Non-fatal conditions recorded while converting a document.

use std::fmt;
use std::path::{Path, PathBuf};

/// Category of a [`Warning`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WarningKind {
    /// A local image does not exist; the placeholder is used instead.
    MissingAsset,
    /// Two different files share a name; one was renamed with a digest suffix.
    NameCollisionResolved,
    /// Any other recoverable failure (unreadable asset, failed copy).
    Other,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MissingAsset => "missing asset",
            Self::NameCollisionResolved => "name collision",
            Self::Other => "warning",
        })
    }
}

/// A recoverable problem attached to one document's conversion.
///
/// Warnings never turn a successful conversion into a failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
    pub related_path: Option<PathBuf>,
}

impl Warning {
    pub(crate) fn missing_asset(original: &str, path: &Path) -> Self {
        Self {
            kind: WarningKind::MissingAsset,
            message: format!("image not found: {original}"),
            related_path: Some(path.to_path_buf()),
        }
    }

    pub(crate) fn name_collision(original: &str, renamed: &str, source: &Path) -> Self {
        Self {
            kind: WarningKind::NameCollisionResolved,
            message: format!("{original} renamed to {renamed} to avoid a name collision"),
            related_path: Some(source.to_path_buf()),
        }
    }

    /// A warning of kind [`WarningKind::Other`].
    pub fn other(message: impl Into<String>, related_path: Option<PathBuf>) -> Self {
        Self {
            kind: WarningKind::Other,
            message: message.into(),
            related_path,
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}
