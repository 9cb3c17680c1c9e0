//! Conversion of Markdown documents into HTML plus isolated assets.
//!
//! Each document runs read → parse → resolve → relocate → render → write in
//! order. Independent documents run on a fixed-size rayon pool; results come
//! back in input order regardless of completion order.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use pigeon_assets::{CancelToken, OutputSlot, RelocateError, Warning, relocate, resolve};
use pigeon_renderer::{Document, RenderContext, render};
use rayon::prelude::*;
use tempfile::NamedTempFile;

use crate::error::ConvertError;
use crate::inputs::is_markdown;
use crate::reservation::reserve_slots;
use crate::theme::DEFAULT_CSS;

/// Callback invoked as each document finishes: `(completed, total, source)`.
pub type ProgressFn = dyn Fn(usize, usize, &Path) + Send + Sync;

/// Final state of one document.
#[derive(Debug)]
pub enum ConversionStatus {
    Success,
    Failed(ConvertError),
}

/// Outcome of converting one document.
#[derive(Debug)]
pub struct ConversionResult {
    pub source: PathBuf,
    /// Reserved document name (`report`, `img_2`).
    pub name: String,
    /// Written HTML file, `None` on failure.
    pub output_html: Option<PathBuf>,
    /// Asset folder, `None` when the document has no local images or failed.
    pub asset_folder: Option<PathBuf>,
    /// Resolver warnings first, then relocator warnings.
    pub warnings: Vec<Warning>,
    pub status: ConversionStatus,
}

impl ConversionResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.status, ConversionStatus::Success)
    }

    /// The failure, if any.
    #[must_use]
    pub fn error(&self) -> Option<&ConvertError> {
        match &self.status {
            ConversionStatus::Success => None,
            ConversionStatus::Failed(e) => Some(e),
        }
    }

    fn failed(source: &Path, slot: &OutputSlot, warnings: Vec<Warning>, error: ConvertError) -> Self {
        Self {
            source: source.to_path_buf(),
            name: slot.name().to_owned(),
            output_html: None,
            asset_folder: None,
            warnings,
            status: ConversionStatus::Failed(error),
        }
    }
}

/// Settings shared by every document of a batch.
#[derive(Clone, Debug)]
pub struct ConvertOptions {
    /// Directory for all outputs, `None` to write next to each source.
    pub output_dir: Option<PathBuf>,
    /// Pool size, `None` for available parallelism.
    pub workers: Option<usize>,
    /// `lang` attribute of generated pages.
    pub lang: String,
    /// Stylesheet embedded in every page.
    pub theme_css: String,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            output_dir: None,
            workers: None,
            lang: "en".to_owned(),
            theme_css: DEFAULT_CSS.to_owned(),
        }
    }
}

/// Batch converter.
pub struct Converter {
    options: ConvertOptions,
    cancel: CancelToken,
    progress: Option<Box<ProgressFn>>,
}

impl Converter {
    #[must_use]
    pub fn new(options: ConvertOptions) -> Self {
        Self {
            options,
            cancel: CancelToken::new(),
            progress: None,
        }
    }

    /// Use an externally owned cancellation token.
    #[must_use]
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Register a progress callback.
    #[must_use]
    pub fn on_progress<F>(mut self, progress: F) -> Self
    where
        F: Fn(usize, usize, &Path) + Send + Sync + 'static,
    {
        self.progress = Some(Box::new(progress));
        self
    }

    /// Token that cancels this converter's work.
    #[must_use]
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Convert a single document.
    pub fn convert_file(&self, source: &Path) -> ConversionResult {
        let mut results = self.convert_batch(&[source.to_path_buf()]);
        results.remove(0)
    }

    /// Convert every source, returning one result per source in input order.
    ///
    /// Failures are per document; the batch always runs to completion unless
    /// cancelled, in which case the remaining documents are `Failed(Cancelled)`.
    pub fn convert_batch(&self, sources: &[PathBuf]) -> Vec<ConversionResult> {
        let slots = reserve_slots(sources, self.options.output_dir.as_deref());
        let total = sources.len();
        let completed = AtomicUsize::new(0);

        let run = || -> Vec<ConversionResult> {
            sources
                .par_iter()
                .zip(slots.par_iter())
                .map(|(source, slot)| {
                    let result = self.convert_one(source, slot);
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    if let Some(progress) = &self.progress {
                        progress(done, total, source);
                    }
                    result
                })
                .collect()
        };

        let workers = self
            .options
            .workers
            .filter(|&n| n > 0)
            .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, usize::from));
        let results = match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
            Ok(pool) => pool.install(run),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to create thread pool, using global pool");
                run()
            }
        };

        let failed = results.iter().filter(|result| !result.is_success()).count();
        tracing::info!(total, failed, workers, "Batch converted");
        results
    }

    fn convert_one(&self, source: &Path, slot: &OutputSlot) -> ConversionResult {
        let mut warnings = Vec::new();
        match self.try_convert(source, slot, &mut warnings) {
            Ok(asset_folder) => {
                tracing::info!(
                    source = %source.display(),
                    output = %slot.html_path().display(),
                    warnings = warnings.len(),
                    "Converted"
                );
                ConversionResult {
                    source: source.to_path_buf(),
                    name: slot.name().to_owned(),
                    output_html: Some(slot.html_path()),
                    asset_folder,
                    warnings,
                    status: ConversionStatus::Success,
                }
            }
            Err(e) => {
                tracing::warn!(source = %source.display(), error = %e, "Conversion failed");
                ConversionResult::failed(source, slot, warnings, e)
            }
        }
    }

    /// Run the per-document pipeline, returning the asset folder if one was
    /// populated.
    fn try_convert(
        &self,
        source: &Path,
        slot: &OutputSlot,
        warnings: &mut Vec<Warning>,
    ) -> Result<Option<PathBuf>, ConvertError> {
        if self.cancel.is_cancelled() {
            return Err(ConvertError::Cancelled);
        }
        if !source.is_file() {
            return Err(ConvertError::SourceNotFound(source.to_path_buf()));
        }
        if !is_markdown(source) {
            return Err(ConvertError::NotMarkdown(source.to_path_buf()));
        }

        let markdown = fs::read_to_string(source).map_err(|e| ConvertError::UnreadableSource {
            path: source.to_path_buf(),
            source: e,
        })?;
        let document = Document::parse(&markdown);

        let source_dir = source.parent().unwrap_or(Path::new("."));
        let (references, resolve_warnings) = resolve(&document, source_dir);
        warnings.extend(resolve_warnings);

        let relocation = relocate(&references, slot, &self.cancel).map_err(|e| match e {
            RelocateError::Cancelled => ConvertError::Cancelled,
            RelocateError::CreateFolder { path, source } => ConvertError::WriteOutput { path, source },
        })?;
        warnings.extend(relocation.warnings);

        let mut context = RenderContext::new(&self.options.theme_css).with_lang(&self.options.lang);
        if document.title().is_none() {
            context = context.with_title(slot.name());
        }
        let html = render(&document, &relocation.mapping, &context);

        if self.cancel.is_cancelled() {
            return Err(ConvertError::Cancelled);
        }
        write_atomic(&slot.html_path(), html.as_bytes())?;

        Ok((!relocation.records.is_empty()).then(|| slot.assets_dir()))
    }
}

/// Write `data` to a temporary file next to `path` and rename it into place.
fn write_atomic(path: &Path, data: &[u8]) -> Result<(), ConvertError> {
    let write_error = |source| ConvertError::WriteOutput {
        path: path.to_path_buf(),
        source,
    };
    let dir = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(dir).map_err(write_error)?;
    let mut temp = NamedTempFile::new_in(dir).map_err(write_error)?;
    temp.write_all(data).map_err(write_error)?;
    temp.persist(path).map_err(|e| write_error(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use pigeon_assets::WarningKind;
    use pretty_assertions::assert_eq;

    fn converter(output_dir: &Path) -> Converter {
        Converter::new(ConvertOptions {
            output_dir: Some(output_dir.to_path_buf()),
            workers: Some(2),
            theme_css: "body {}".to_owned(),
            ..ConvertOptions::default()
        })
    }

    #[test]
    fn test_convert_with_local_and_remote_images() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("img")).unwrap();
        fs::write(src.join("img/a.png"), b"png-a").unwrap();
        fs::write(
            src.join("report.md"),
            "# Report\n\n![A](./img/a.png)\n\n![B](https://example.com/b.png)\n",
        )
        .unwrap();
        let out = dir.path().join("out");

        let result = converter(&out).convert_file(&src.join("report.md"));

        assert!(result.is_success());
        assert!(result.warnings.is_empty());
        assert_eq!(result.output_html, Some(out.join("report.html")));
        assert_eq!(result.asset_folder, Some(out.join("assets_report")));
        let html = fs::read_to_string(out.join("report.html")).unwrap();
        assert!(html.contains(r#"src="assets_report/a.png""#));
        assert!(html.contains(r#"src="https://example.com/b.png""#));
        assert!(html.contains("<title>Report</title>"));
        assert_eq!(fs::read(out.join("assets_report/a.png")).unwrap(), b"png-a");
    }

    #[test]
    fn test_missing_image_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("doc.md"), "![x](nope.png)").unwrap();

        let result = converter(dir.path()).convert_file(&dir.path().join("doc.md"));

        assert!(result.is_success());
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].kind, WarningKind::MissingAsset);
        let html = fs::read_to_string(dir.path().join("doc.html")).unwrap();
        assert!(html.contains(r#"src="assets_doc/placeholder.png""#));
        assert!(html.contains("<title>doc</title>"));
    }

    #[test]
    fn test_no_local_images_creates_no_folder() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("plain.md"), "Just text").unwrap();

        let result = converter(dir.path()).convert_file(&dir.path().join("plain.md"));

        assert!(result.is_success());
        assert_eq!(result.asset_folder, None);
        assert!(!dir.path().join("assets_plain").exists());
    }

    #[test]
    fn test_validation_failures() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "text").unwrap();
        fs::write(dir.path().join("binary.md"), [0xff, 0xfe, 0x00]).unwrap();
        let sources = vec![
            dir.path().join("missing.md"),
            dir.path().join("notes.txt"),
            dir.path().join("binary.md"),
        ];

        let results = converter(dir.path()).convert_batch(&sources);

        assert!(matches!(results[0].error(), Some(ConvertError::SourceNotFound(_))));
        assert!(matches!(results[1].error(), Some(ConvertError::NotMarkdown(_))));
        assert!(matches!(
            results[2].error(),
            Some(ConvertError::UnreadableSource { .. })
        ));
        assert!(!dir.path().join("binary.html").exists());
    }

    #[test]
    fn test_results_in_input_order_with_progress() {
        let dir = tempfile::tempdir().unwrap();
        let sources: Vec<PathBuf> = (0..8)
            .map(|i| {
                let path = dir.path().join(format!("doc{i}.md"));
                fs::write(&path, format!("# Doc {i}")).unwrap();
                path
            })
            .collect();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let results = converter(dir.path())
            .on_progress(move |done, total, _source| sink.lock().unwrap().push((done, total)))
            .convert_batch(&sources);

        let order: Vec<_> = results.iter().map(|result| result.source.clone()).collect();
        assert_eq!(order, sources);
        let mut progress = seen.lock().unwrap().clone();
        progress.sort_unstable();
        assert_eq!(progress, (1..=8).map(|done| (done, 8)).collect::<Vec<_>>());
    }

    #[test]
    fn test_cancelled_batch_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.md"), "# A").unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();

        let results = converter(dir.path())
            .with_cancel_token(cancel)
            .convert_batch(&[dir.path().join("a.md")]);

        assert!(matches!(results[0].error(), Some(ConvertError::Cancelled)));
        assert!(!dir.path().join("a.html").exists());
    }
}
