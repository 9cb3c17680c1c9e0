//! Copying local assets into a document's asset folder.
//!
//! Relocation runs in three phases:
//!
//! 1. Digests of every resolved file are computed in parallel.
//! 2. Destination names are planned sequentially in first-reference order, so
//!    the result never depends on thread scheduling. Identical content shares
//!    one destination; different content under an already used name gets a
//!    digest suffix.
//! 3. Planned copies run in parallel. Each targets a distinct file, is written
//!    to a temporary name first and renamed into place when complete.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use pigeon_renderer::AssetLookup;
use rayon::prelude::*;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

use crate::cancel::CancelToken;
use crate::digest::ContentDigest;
use crate::placeholder::{PLACEHOLDER_DIGEST, PLACEHOLDER_NAME, PLACEHOLDER_PNG};
use crate::resolver::{AssetKind, AssetReference};
use crate::slot::{OutputSlot, PARTIAL_PREFIX};
use crate::warning::Warning;

/// Bytes escaped in one path segment of an image `src`.
const SRC_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'\\');

/// A file inside an asset folder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetRecord {
    /// File the content was copied from (empty for the bundled placeholder).
    pub source: PathBuf,
    pub digest: ContentDigest,
    /// URL relative to the HTML file, e.g. `assets_report/chart.png`.
    /// Segments are percent-encoded; the file on disk keeps its plain name.
    pub destination: String,
}

/// Original reference string to the record it was relocated to.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssetMapping(BTreeMap<String, AssetRecord>);

impl AssetMapping {
    #[must_use]
    pub fn get(&self, original: &str) -> Option<&AssetRecord> {
        self.0.get(original)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AssetRecord)> {
        self.0.iter().map(|(original, record)| (original.as_str(), record))
    }
}

impl AssetLookup for AssetMapping {
    fn lookup(&self, original: &str) -> Option<&str> {
        self.0.get(original).map(|record| record.destination.as_str())
    }
}

/// Outcome of relocating one document's assets.
#[derive(Debug, Default)]
pub struct Relocation {
    pub mapping: AssetMapping,
    /// Distinct files in the asset folder, in planning order.
    pub records: Vec<AssetRecord>,
    pub warnings: Vec<Warning>,
}

/// Error that prevents relocation as a whole.
///
/// Individual asset failures are warnings, not errors.
#[derive(Debug, thiserror::Error)]
pub enum RelocateError {
    /// Cancellation was requested before all copies ran.
    #[error("relocation cancelled")]
    Cancelled,
    /// The asset folder could not be created.
    #[error("cannot create asset folder {}: {source}", path.display())]
    CreateFolder {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Relocate every local reference into the slot's asset folder.
///
/// Remote references get no mapping entry. Missing or unreadable files map to
/// the placeholder image. Running twice into the same folder leaves it
/// unchanged: existing files with the planned content are not rewritten.
///
/// # Errors
///
/// Returns [`RelocateError::Cancelled`] if `cancel` fires before all copies
/// ran, and [`RelocateError::CreateFolder`] if the asset folder cannot be
/// created. The folder is only created when there is at least one local
/// reference.
pub fn relocate(
    references: &[AssetReference],
    slot: &OutputSlot,
    cancel: &CancelToken,
) -> Result<Relocation, RelocateError> {
    let locals: Vec<&AssetReference> = references
        .iter()
        .filter(|reference| reference.kind == AssetKind::Local)
        .collect();
    if locals.is_empty() {
        return Ok(Relocation::default());
    }

    let assets_dir = slot.assets_dir();
    fs::create_dir_all(&assets_dir).map_err(|source| RelocateError::CreateFolder {
        path: assets_dir.clone(),
        source,
    })?;

    let digests: Vec<Option<io::Result<ContentDigest>>> = locals
        .par_iter()
        .map(|reference| reference.resolved.as_deref().map(ContentDigest::of_file))
        .collect();

    let mut planner = Planner::new(&assets_dir, slot.assets_name());
    let mut assignments: Vec<(&str, usize)> = Vec::with_capacity(locals.len());
    for (reference, digest) in locals.iter().zip(digests) {
        let record = match (reference.resolved.as_deref(), digest) {
            (Some(path), Some(Ok(digest))) => planner.plan_file(path, digest),
            (Some(path), Some(Err(e))) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read image");
                planner.warnings.push(Warning::other(
                    format!("cannot read {}: {e}", reference.original),
                    Some(path.to_path_buf()),
                ));
                planner.plan_placeholder()
            }
            _ => planner.plan_placeholder(),
        };
        assignments.push((reference.original.as_str(), record));
    }

    let planned = planner.jobs.len();
    let failed = run_copies(&mut planner, &mut assignments, &assets_dir, cancel)?;

    let used: HashSet<usize> = assignments.iter().map(|(_, record)| *record).collect();
    let mapping = AssetMapping(
        assignments
            .iter()
            .map(|(original, record)| ((*original).to_owned(), planner.records[*record].clone()))
            .collect(),
    );
    let records = planner
        .records
        .into_iter()
        .enumerate()
        .filter(|(index, _)| used.contains(index))
        .map(|(_, record)| record)
        .collect();

    tracing::debug!(
        folder = %assets_dir.display(),
        references = mapping.len(),
        copied = planned - failed,
        "Relocated assets"
    );

    Ok(Relocation {
        mapping,
        records,
        warnings: planner.warnings,
    })
}

/// Run every planned copy and point references whose copy failed at the
/// placeholder. Returns the number of failed copies.
fn run_copies(
    planner: &mut Planner<'_>,
    assignments: &mut [(&str, usize)],
    assets_dir: &Path,
    cancel: &CancelToken,
) -> Result<usize, RelocateError> {
    let planned = planner.jobs.len();
    let outcomes: Vec<Result<(), CopyFailure>> = planner
        .jobs
        .par_iter()
        .map(|job| {
            if cancel.is_cancelled() {
                return Err(CopyFailure::Cancelled);
            }
            job.run(assets_dir).map_err(CopyFailure::Io)
        })
        .collect();

    let mut failed = HashSet::new();
    for (job, outcome) in planner.jobs.iter().zip(outcomes) {
        match outcome {
            Ok(()) => {}
            Err(CopyFailure::Cancelled) => return Err(RelocateError::Cancelled),
            Err(CopyFailure::Io(e)) => {
                let record = &planner.records[job.record];
                tracing::warn!(
                    path = %record.source.display(),
                    destination = %record.destination,
                    error = %e,
                    "Failed to copy image"
                );
                planner.warnings.push(Warning::other(
                    format!("cannot copy to {}: {e}", record.destination),
                    Some(record.source.clone()),
                ));
                failed.insert(job.record);
            }
        }
    }
    if failed.is_empty() {
        return Ok(0);
    }

    let placeholder = planner.plan_placeholder();
    if failed.contains(&placeholder) {
        // The placeholder itself was not written; references keep its path.
        planner.warnings.push(Warning::other(
            format!("no fallback image available in {}", assets_dir.display()),
            Some(assets_dir.to_path_buf()),
        ));
    }
    // A placeholder planned only now has not been written yet.
    for job in planner.jobs.get(planned..).unwrap_or_default() {
        if let Err(e) = job.run(assets_dir) {
            tracing::warn!(error = %e, "Failed to write placeholder image");
            planner.warnings.push(Warning::other(
                format!("cannot write {PLACEHOLDER_NAME}: {e}"),
                Some(assets_dir.to_path_buf()),
            ));
        }
    }
    for (_, record) in assignments.iter_mut() {
        if failed.contains(&*record) {
            *record = placeholder;
        }
    }
    Ok(failed.len())
}

enum CopyFailure {
    Cancelled,
    Io(io::Error),
}

enum CopySource {
    File(PathBuf),
    Placeholder,
}

struct CopyJob {
    record: usize,
    source: CopySource,
    file_name: String,
}

impl CopyJob {
    /// Write the asset under a temporary name and rename it into place.
    fn run(&self, dir: &Path) -> io::Result<()> {
        let mut temp = tempfile::Builder::new()
            .prefix(PARTIAL_PREFIX)
            .tempfile_in(dir)?;
        match &self.source {
            CopySource::File(path) => {
                let mut source = File::open(path)?;
                io::copy(&mut source, temp.as_file_mut())?;
            }
            CopySource::Placeholder => temp.write_all(PLACEHOLDER_PNG)?,
        }
        temp.persist(dir.join(&self.file_name))
            .map_err(|e| e.error)?;
        Ok(())
    }
}

/// What currently occupies a planned destination on disk.
enum Occupant {
    Free,
    Same,
    Different,
}

/// Sequential name planning state for one asset folder.
struct Planner<'a> {
    dir: &'a Path,
    assets_name: String,
    by_digest: HashMap<ContentDigest, usize>,
    /// Lowercased file names already assigned.
    taken: HashSet<String>,
    records: Vec<AssetRecord>,
    jobs: Vec<CopyJob>,
    warnings: Vec<Warning>,
}

impl<'a> Planner<'a> {
    fn new(dir: &'a Path, assets_name: String) -> Self {
        Self {
            dir,
            assets_name,
            by_digest: HashMap::new(),
            taken: HashSet::new(),
            records: Vec::new(),
            jobs: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn plan_file(&mut self, path: &Path, digest: ContentDigest) -> usize {
        let file_name = path
            .file_name()
            .map_or_else(|| "asset".to_owned(), |name| name.to_string_lossy().into_owned());
        self.plan(&file_name, digest, CopySource::File(path.to_path_buf()))
    }

    fn plan_placeholder(&mut self) -> usize {
        self.plan(PLACEHOLDER_NAME, *PLACEHOLDER_DIGEST, CopySource::Placeholder)
    }

    /// Record index for `digest`, assigning a free name on first sight.
    fn plan(&mut self, file_name: &str, digest: ContentDigest, source: CopySource) -> usize {
        if let Some(&index) = self.by_digest.get(&digest) {
            return index;
        }

        let mut candidate = file_name.to_owned();
        let mut attempt = 0;
        let needs_copy = loop {
            if !self.taken.contains(&candidate.to_lowercase()) {
                match self.occupant(&candidate, digest) {
                    Occupant::Free => break true,
                    Occupant::Same => break false,
                    Occupant::Different => {}
                }
            }
            candidate = suffixed_name(file_name, digest, attempt);
            attempt += 1;
        };

        let source_path = match &source {
            CopySource::File(path) => path.clone(),
            CopySource::Placeholder => PathBuf::new(),
        };
        if attempt > 0 {
            tracing::debug!(from = %file_name, to = %candidate, "Renamed colliding image");
            let related = if source_path.as_os_str().is_empty() {
                self.dir
            } else {
                source_path.as_path()
            };
            self.warnings
                .push(Warning::name_collision(file_name, &candidate, related));
        }

        let index = self.records.len();
        self.records.push(AssetRecord {
            source: source_path,
            digest,
            destination: format!(
                "{}/{}",
                utf8_percent_encode(&self.assets_name, SRC_SEGMENT),
                utf8_percent_encode(&candidate, SRC_SEGMENT)
            ),
        });
        self.taken.insert(candidate.to_lowercase());
        self.by_digest.insert(digest, index);
        if needs_copy {
            self.jobs.push(CopyJob {
                record: index,
                source,
                file_name: candidate,
            });
        }
        index
    }

    fn occupant(&self, file_name: &str, digest: ContentDigest) -> Occupant {
        let path = self.dir.join(file_name);
        if !path.exists() {
            return Occupant::Free;
        }
        match ContentDigest::of_file(&path) {
            Ok(existing) if existing == digest => Occupant::Same,
            _ => Occupant::Different,
        }
    }
}

/// `chart.png` becomes `chart_<hex>.png`.
///
/// The suffix starts with 8 hex characters and widens by 4 per attempt. Past
/// the full digest a counter is appended.
fn suffixed_name(file_name: &str, digest: ContentDigest, attempt: usize) -> String {
    let path = Path::new(file_name);
    let stem = path
        .file_stem()
        .map_or_else(|| file_name.into(), |stem| stem.to_string_lossy());
    let width = 8 + 4 * attempt;
    let mut suffix = digest.short_hex(width.min(64));
    if width > 64 {
        suffix = format!("{suffix}_{attempt}");
    }
    match path.extension() {
        Some(ext) => format!("{stem}_{suffix}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{suffix}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::SlotReservations;
    use crate::warning::WarningKind;
    use pretty_assertions::assert_eq;

    fn local(original: &str, resolved: Option<PathBuf>) -> AssetReference {
        AssetReference {
            original: original.to_owned(),
            kind: AssetKind::Local,
            resolved,
        }
    }

    fn remote(original: &str) -> AssetReference {
        AssetReference {
            original: original.to_owned(),
            kind: AssetKind::Remote,
            resolved: None,
        }
    }

    fn folder_listing(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_suffixed_name() {
        let digest = ContentDigest::of_bytes(b"hello");
        assert_eq!(suffixed_name("a.png", digest, 0), "a_2cf24dba.png");
        assert_eq!(suffixed_name("a.png", digest, 1), "a_2cf24dba5fb0.png");
        assert_eq!(suffixed_name("Makefile", digest, 0), "Makefile_2cf24dba");
        assert!(suffixed_name("a.png", digest, 20).ends_with("_20.png"));
    }

    #[test]
    fn test_remote_only_produces_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let slot = SlotReservations::new().reserve(dir.path(), "doc");
        let relocation = relocate(
            &[remote("https://example.com/b.png")],
            &slot,
            &CancelToken::new(),
        )
        .unwrap();

        assert!(relocation.mapping.is_empty());
        assert!(relocation.records.is_empty());
        assert!(!slot.assets_dir().exists());
    }

    #[test]
    fn test_identical_content_shares_one_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.png"), b"same").unwrap();
        fs::write(dir.path().join("b.png"), b"same").unwrap();
        let slot = SlotReservations::new().reserve(dir.path(), "doc");

        let relocation = relocate(
            &[
                local("a.png", Some(dir.path().join("a.png"))),
                local("b.png", Some(dir.path().join("b.png"))),
            ],
            &slot,
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(relocation.records.len(), 1);
        assert_eq!(relocation.mapping.lookup("a.png"), Some("assets_doc/a.png"));
        assert_eq!(relocation.mapping.lookup("b.png"), Some("assets_doc/a.png"));
        assert_eq!(folder_listing(&slot.assets_dir()), vec!["a.png"]);
        assert!(relocation.warnings.is_empty());
    }

    #[test]
    fn test_same_name_different_content_gets_suffix() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("x")).unwrap();
        fs::create_dir_all(dir.path().join("y")).unwrap();
        fs::write(dir.path().join("x/chart.png"), b"first").unwrap();
        fs::write(dir.path().join("y/Chart.PNG"), b"second").unwrap();
        let slot = SlotReservations::new().reserve(dir.path(), "doc");

        let relocation = relocate(
            &[
                local("x/chart.png", Some(dir.path().join("x/chart.png"))),
                local("y/Chart.PNG", Some(dir.path().join("y/Chart.PNG"))),
            ],
            &slot,
            &CancelToken::new(),
        )
        .unwrap();

        let suffix = ContentDigest::of_bytes(b"second").short_hex(8);
        let renamed = format!("Chart_{suffix}.PNG");
        assert_eq!(relocation.mapping.lookup("x/chart.png"), Some("assets_doc/chart.png"));
        assert_eq!(
            relocation.mapping.lookup("y/Chart.PNG"),
            Some(format!("assets_doc/{renamed}").as_str())
        );
        assert_eq!(relocation.warnings.len(), 1);
        assert_eq!(relocation.warnings[0].kind, WarningKind::NameCollisionResolved);
        assert_eq!(fs::read(slot.assets_dir().join(renamed)).unwrap(), b"second");
    }

    #[test]
    fn test_missing_asset_uses_placeholder_once() {
        let dir = tempfile::tempdir().unwrap();
        let slot = SlotReservations::new().reserve(dir.path(), "doc");

        let relocation = relocate(
            &[local("gone.png", None), local("also-gone.png", None)],
            &slot,
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(
            relocation.mapping.lookup("gone.png"),
            Some("assets_doc/placeholder.png")
        );
        assert_eq!(
            relocation.mapping.lookup("also-gone.png"),
            Some("assets_doc/placeholder.png")
        );
        assert_eq!(folder_listing(&slot.assets_dir()), vec!["placeholder.png"]);
        assert_eq!(
            fs::read(slot.assets_dir().join("placeholder.png")).unwrap(),
            PLACEHOLDER_PNG
        );
    }

    #[test]
    fn test_relocation_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("x")).unwrap();
        fs::write(dir.path().join("a.png"), b"one").unwrap();
        fs::write(dir.path().join("x/a.png"), b"two").unwrap();
        let references = [
            local("a.png", Some(dir.path().join("a.png"))),
            local("x/a.png", Some(dir.path().join("x/a.png"))),
            local("missing.png", None),
        ];
        let slot = SlotReservations::new().reserve(dir.path(), "doc");

        let first = relocate(&references, &slot, &CancelToken::new()).unwrap();
        let listing = folder_listing(&slot.assets_dir());
        let second = relocate(&references, &slot, &CancelToken::new()).unwrap();

        assert_eq!(listing.len(), 3);
        assert_eq!(folder_listing(&slot.assets_dir()), listing);
        assert_eq!(first.mapping, second.mapping);
    }

    #[test]
    fn test_existing_foreign_file_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.png"), b"mine").unwrap();
        let slot = SlotReservations::new().reserve(dir.path(), "doc");
        fs::create_dir_all(slot.assets_dir()).unwrap();
        fs::write(slot.assets_dir().join("a.png"), b"stale").unwrap();

        let relocation = relocate(
            &[local("a.png", Some(dir.path().join("a.png")))],
            &slot,
            &CancelToken::new(),
        )
        .unwrap();

        let destination = relocation.mapping.lookup("a.png").unwrap();
        assert_ne!(destination, "assets_doc/a.png");
        assert_eq!(fs::read(slot.assets_dir().join("a.png")).unwrap(), b"stale");
        assert_eq!(fs::read(dir.path().join(destination)).unwrap(), b"mine");
    }

    #[test]
    fn test_unreadable_source_falls_back_to_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let slot = SlotReservations::new().reserve(dir.path(), "doc");
        let relocation = relocate(
            &[local("vanished.png", Some(dir.path().join("vanished.png")))],
            &slot,
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(
            relocation.mapping.lookup("vanished.png"),
            Some("assets_doc/placeholder.png")
        );
        assert_eq!(relocation.warnings.len(), 1);
        assert_eq!(relocation.warnings[0].kind, WarningKind::Other);
    }

    #[test]
    fn test_cancelled_before_copy_leaves_no_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.png"), b"a").unwrap();
        let slot = SlotReservations::new().reserve(dir.path(), "doc");
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = relocate(
            &[local("a.png", Some(dir.path().join("a.png")))],
            &slot,
            &cancel,
        );

        assert!(matches!(result, Err(RelocateError::Cancelled)));
        assert!(folder_listing(&slot.assets_dir()).is_empty());
    }

    #[test]
    fn test_destination_is_url_encoded() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("fig#1.png"), b"fig").unwrap();
        fs::write(dir.path().join("my chart.png"), b"chart").unwrap();
        let slot = SlotReservations::new().reserve(dir.path(), "doc");

        let relocation = relocate(
            &[
                local("fig%231.png", Some(dir.path().join("fig#1.png"))),
                local("my chart.png", Some(dir.path().join("my chart.png"))),
            ],
            &slot,
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(
            relocation.mapping.lookup("fig%231.png"),
            Some("assets_doc/fig%231.png")
        );
        assert_eq!(
            relocation.mapping.lookup("my chart.png"),
            Some("assets_doc/my%20chart.png")
        );
        assert_eq!(
            folder_listing(&slot.assets_dir()),
            vec!["fig#1.png", "my chart.png"]
        );
    }

    #[test]
    fn test_failed_copy_falls_back_to_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let assets = dir.path().join("assets_doc");
        fs::create_dir_all(&assets).unwrap();
        let mut planner = Planner::new(&assets, "assets_doc".to_owned());
        // Digested earlier, gone by the time it is copied.
        let record = planner.plan_file(&dir.path().join("chart.png"), ContentDigest::of_bytes(b"c"));
        let mut assignments = vec![("chart.png", record)];

        let failed = run_copies(&mut planner, &mut assignments, &assets, &CancelToken::new()).unwrap();

        assert_eq!(failed, 1);
        assert_eq!(
            planner.records[assignments[0].1].destination,
            "assets_doc/placeholder.png"
        );
        let kinds: Vec<_> = planner.warnings.iter().map(|warning| warning.kind).collect();
        assert_eq!(kinds, vec![WarningKind::Other]);
        assert_eq!(folder_listing(&assets), vec!["placeholder.png"]);
    }

    #[test]
    fn test_unwritable_folder_keeps_placeholder_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.png"), b"a").unwrap();
        let assets = dir.path().join("never-created");
        let mut planner = Planner::new(&assets, "assets_doc".to_owned());
        let missing = planner.plan_placeholder();
        let copied = planner.plan_file(&dir.path().join("a.png"), ContentDigest::of_bytes(b"a"));
        let mut assignments = vec![("gone.png", missing), ("a.png", copied)];

        let failed = run_copies(&mut planner, &mut assignments, &assets, &CancelToken::new()).unwrap();

        assert_eq!(failed, 2);
        assert!(assignments.iter().all(|(_, record)| *record == missing));
        assert_eq!(planner.records[missing].destination, "assets_doc/placeholder.png");
        assert_eq!(planner.warnings.len(), 3);
        assert!(planner.warnings.iter().all(|warning| warning.kind == WarningKind::Other));
        assert!(!assets.exists());
    }
}
