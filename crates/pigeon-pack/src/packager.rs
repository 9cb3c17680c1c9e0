//! ZIP archives of converted documents.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use pigeon_assets::folder_files;
use rayon::prelude::*;
use tempfile::NamedTempFile;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// How converted documents are packaged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExportMode {
    /// HTML files and asset folders only, no archives.
    #[default]
    Default,
    /// One `name.zip` next to each `name.html`.
    IndividualZip,
    /// One archive for the whole batch, one top-level directory per document.
    BatchZip,
}

/// A successfully converted document to package.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackDocument {
    /// Document name (`report` for `report.html`).
    pub name: String,
    /// The rendered HTML file.
    pub html: PathBuf,
    /// The document's asset folder, if it has one.
    pub assets: Option<PathBuf>,
}

/// Packaging settings independent of the documents.
#[derive(Clone, Debug, Default)]
pub struct PackOptions {
    /// Directory receiving the batch archive.
    pub batch_dir: PathBuf,
    /// Identifier in the batch archive name (`Batch_Output_<id>.zip`).
    pub batch_id: String,
    /// Delete packed HTML files and asset folders once their archive exists.
    pub remove_sources: bool,
}

/// A written archive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Archive {
    pub path: PathBuf,
    /// Number of files stored.
    pub entries: usize,
}

/// Outcome of one archive. A failure affects only that archive.
pub type ArchiveOutcome = Result<Archive, PackError>;

/// Archives produced by [`pack`].
#[derive(Debug, Default)]
pub struct PackReport {
    pub archives: Vec<ArchiveOutcome>,
}

impl PackReport {
    /// Number of archives that could not be written.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.archives.iter().filter(|outcome| outcome.is_err()).count()
    }
}

/// Error writing one archive.
#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot write archive {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Package documents according to `mode`.
///
/// Every archive is written to a temporary file in its destination directory
/// and only moved into place once complete, so a failure never leaves a
/// truncated archive behind. Entries are stored in sorted path order.
#[must_use]
pub fn pack(documents: &[PackDocument], mode: ExportMode, options: &PackOptions) -> PackReport {
    let archives = match mode {
        ExportMode::Default => Vec::new(),
        ExportMode::IndividualZip => documents
            .par_iter()
            .map(|document| {
                let path = document.html.with_extension("zip");
                let outcome = write_archive(&path, std::slice::from_ref(document), false);
                finish(outcome, std::slice::from_ref(document), options)
            })
            .collect(),
        ExportMode::BatchZip if documents.is_empty() => Vec::new(),
        ExportMode::BatchZip => {
            let path = options
                .batch_dir
                .join(format!("Batch_Output_{}.zip", options.batch_id));
            let outcome = write_archive(&path, documents, true);
            vec![finish(outcome, documents, options)]
        }
    };
    PackReport { archives }
}

fn finish(outcome: ArchiveOutcome, documents: &[PackDocument], options: &PackOptions) -> ArchiveOutcome {
    match &outcome {
        Ok(archive) => {
            tracing::info!(
                path = %archive.path.display(),
                entries = archive.entries,
                "Archive written"
            );
            if options.remove_sources {
                for document in documents {
                    remove_document(document);
                }
            }
        }
        Err(e) => tracing::warn!(error = %e, "Failed to write archive"),
    }
    outcome
}

fn remove_document(document: &PackDocument) {
    if let Err(e) = fs::remove_file(&document.html) {
        tracing::warn!(path = %document.html.display(), error = %e, "Failed to remove HTML file");
    }
    if let Some(assets) = &document.assets
        && let Err(e) = fs::remove_dir_all(assets)
    {
        tracing::warn!(path = %assets.display(), error = %e, "Failed to remove asset folder");
    }
}

/// Archive path to file on disk.
type Entry = (String, PathBuf);

fn write_archive(path: &Path, documents: &[PackDocument], nested: bool) -> ArchiveOutcome {
    let entries = collect_entries(documents, nested)?;

    let write_error = |source| PackError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let temp = NamedTempFile::new_in(dir).map_err(write_error)?;

    let mut zip = ZipWriter::new(temp);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, source) in &entries {
        let mut file = File::open(source).map_err(|source_err| PackError::Read {
            path: source.clone(),
            source: source_err,
        })?;
        zip.start_file(name.as_str(), deflated)
            .map_err(|e| write_error(io::Error::other(e)))?;
        io::copy(&mut file, &mut zip).map_err(|source_err| PackError::Read {
            path: source.clone(),
            source: source_err,
        })?;
    }
    let temp = zip.finish().map_err(|e| write_error(io::Error::other(e)))?;
    temp.persist(path).map_err(|e| write_error(e.error))?;

    Ok(Archive {
        path: path.to_path_buf(),
        entries: entries.len(),
    })
}

/// Entries of all documents, sorted by archive path.
///
/// With `nested`, each document lives under its own top-level directory
/// (`name/name.html`). Directory names are made unique case-insensitively.
fn collect_entries(documents: &[PackDocument], nested: bool) -> Result<Vec<Entry>, PackError> {
    let mut entries = Vec::new();
    let mut prefixes = HashSet::new();

    for document in documents {
        let prefix = if nested {
            let mut prefix = document.name.clone();
            let mut counter = 2;
            while !prefixes.insert(prefix.to_lowercase()) {
                prefix = format!("{}_{counter}", document.name);
                counter += 1;
            }
            format!("{prefix}/")
        } else {
            String::new()
        };

        let html_name = document
            .html
            .file_name()
            .map_or_else(|| format!("{}.html", document.name), |name| name.to_string_lossy().into_owned());
        entries.push((format!("{prefix}{html_name}"), document.html.clone()));

        if let Some(assets) = &document.assets {
            let folder = assets
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let files = folder_files(assets).map_err(|source| PackError::Read {
                path: assets.clone(),
                source,
            })?;
            entries.extend(
                files
                    .into_iter()
                    .map(|(relative, path)| (format!("{prefix}{folder}/{relative}"), path)),
            );
        }
    }

    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}
