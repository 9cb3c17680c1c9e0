//! `pigeon convert` command implementation.

use std::path::PathBuf;

use clap::Args;
use pigeon_config::{CliSettings, Config, OutputMode};
use pigeon_convert::{
    ConvertOptions, Converter, ExportBundle, ExportMode, PackOptions, ThemeStore,
    collect_sources,
};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the convert command.
#[derive(Args)]
pub(crate) struct ConvertArgs {
    /// Markdown files or directories to convert.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory (overrides config, default: next to each source).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Theme name (overrides config).
    #[arg(short, long)]
    theme: Option<String>,

    /// Package each document into its own ZIP archive.
    #[arg(short, long, conflicts_with = "batch")]
    zip: bool,

    /// Package all documents into a single ZIP archive.
    #[arg(short, long)]
    batch: bool,

    /// Descend into subdirectories of directory inputs.
    #[arg(short, long)]
    recursive: bool,

    /// Number of parallel workers (overrides config).
    #[arg(short = 'j', long)]
    workers: Option<usize>,

    /// Delete HTML files and asset folders once they are archived.
    #[arg(long)]
    remove_sources: bool,

    /// Path to configuration file (default: auto-discover pigeon.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl ConvertArgs {
    /// Execute the convert command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, or if any document or archive
    /// failed.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            output_dir: self.output.clone(),
            mode: self.resolve_mode(),
            remove_sources: self.remove_sources.then_some(true),
            theme: self.theme.clone(),
            workers: self.workers,
            recursive: self.recursive.then_some(true),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        let sources = collect_sources(&self.inputs, config.convert.recursive);
        if sources.is_empty() {
            return Err(CliError::Validation(
                "no Markdown files found in the given inputs".to_owned(),
            ));
        }

        let themes = ThemeStore::new(config.theme_resolved.dirs.clone());
        let theme_css = themes.load(config.theme_resolved.name.as_deref());
        if let Some(name) = &config.theme_resolved.name {
            output.info(&format!("Theme: {name}"));
        }
        output.info(&format!("Converting {} file(s)...", sources.len()));

        let progress = Output::new();
        let converter = Converter::new(ConvertOptions {
            output_dir: config.output_resolved.dir.clone(),
            workers: config.convert.workers,
            lang: config.convert.lang.clone(),
            theme_css,
        })
        .on_progress(move |done, total, source| progress.progress(done, total, source));
        let results = converter.convert_batch(&sources);

        output.separator();
        for result in &results {
            output.result(result);
        }

        let bundle = ExportBundle::new(results, export_mode(config.output_resolved.mode));
        let options = PackOptions {
            batch_dir: config
                .output_resolved
                .dir
                .clone()
                .map_or_else(std::env::current_dir, Ok)?,
            batch_id: chrono::Local::now().format("%Y%m%d_%H%M%S").to_string(),
            remove_sources: config.output_resolved.remove_sources,
        };
        let report = bundle.pack(&options);
        for outcome in &report.archives {
            output.archive(outcome);
        }

        let total = bundle.results.len();
        let failed = bundle.failed();
        output.separator();
        output.highlight(&format!("{} converted, {failed} failed", total - failed));

        if failed > 0 {
            return Err(CliError::Failed {
                failed,
                total,
                what: "documents",
            });
        }
        let failed_archives = report.failed();
        if failed_archives > 0 {
            return Err(CliError::Failed {
                failed: failed_archives,
                total: report.archives.len(),
                what: "archives",
            });
        }
        Ok(())
    }

    /// Resolve packaging mode from --zip/--batch flags.
    fn resolve_mode(&self) -> Option<OutputMode> {
        if self.batch {
            Some(OutputMode::Batch)
        } else if self.zip {
            Some(OutputMode::Zip)
        } else {
            None
        }
    }
}

fn export_mode(mode: OutputMode) -> ExportMode {
    match mode {
        OutputMode::Default => ExportMode::Default,
        OutputMode::Zip => ExportMode::IndividualZip,
        OutputMode::Batch => ExportMode::BatchZip,
    }
}
