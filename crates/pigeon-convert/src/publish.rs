//! Seam for publishing a converted document to a remote host.
//!
//! No network implementation ships with this crate. A [`Publisher`] receives a
//! fully materialized [`PublishBundle`] and owns any credentials it needs.

use std::fs;
use std::io;
use std::path::PathBuf;

use pigeon_assets::folder_files;

use crate::converter::ConversionResult;

/// Error returned by publishing.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Cannot publish failed conversion of {}", .0.display())]
    FailedConversion(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Publish rejected: {0}")]
    Rejected(String),
}

/// Everything needed to publish one document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishBundle {
    /// Document name (`report`).
    pub name: String,
    /// Rendered HTML page.
    pub html: String,
    /// Asset files as (`assets_<name>/<file>`, bytes), sorted by path.
    pub assets: Vec<(String, Vec<u8>)>,
    /// Target repository.
    pub repo_name: String,
}

impl PublishBundle {
    /// Read a successful conversion's HTML and asset files into memory.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::FailedConversion`] for failed results and
    /// [`PublishError::Io`] if any output file cannot be read.
    pub fn from_result(result: &ConversionResult, repo_name: &str) -> Result<Self, PublishError> {
        let html_path = match (&result.output_html, result.is_success()) {
            (Some(path), true) => path,
            _ => return Err(PublishError::FailedConversion(result.source.clone())),
        };
        let html = fs::read_to_string(html_path)?;

        let mut assets = Vec::new();
        if let Some(folder) = &result.asset_folder {
            let prefix = folder
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            for (relative, path) in folder_files(folder)? {
                assets.push((format!("{prefix}/{relative}"), fs::read(path)?));
            }
        }

        Ok(Self {
            name: result.name.clone(),
            html,
            assets,
            repo_name: repo_name.to_owned(),
        })
    }
}

/// A remote destination for converted documents.
pub trait Publisher {
    /// Publish the bundle and return its public URL.
    fn publish(&self, bundle: &PublishBundle) -> Result<String, PublishError>;
}
