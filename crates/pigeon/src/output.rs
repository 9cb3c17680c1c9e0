//! Colored terminal output for conversion reports.

use std::path::Path;

use console::{Style, Term};
use pigeon_convert::{ArchiveOutcome, ConversionResult, Warning};

/// Terminal output formatter writing to stderr.
pub(crate) struct Output {
    term: Term,
    ok: Style,
    warn: Style,
    fail: Style,
    emphasis: Style,
    dim: Style,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            ok: Style::new().green(),
            warn: Style::new().yellow(),
            fail: Style::new().red(),
            emphasis: Style::new().cyan().bold(),
            dim: Style::new().dim(),
        }
    }

    fn line(&self, msg: &str) {
        let _ = self.term.write_line(msg);
    }

    /// Print a plain message.
    pub(crate) fn info(&self, msg: &str) {
        self.line(msg);
    }

    /// Print an error message (red).
    pub(crate) fn error(&self, msg: &str) {
        self.line(&self.fail.apply_to(msg).to_string());
    }

    /// Print a highlighted message (cyan bold).
    pub(crate) fn highlight(&self, msg: &str) {
        self.line(&self.emphasis.apply_to(msg).to_string());
    }

    /// `[done/total] source`, printed as each document finishes.
    pub(crate) fn progress(&self, done: usize, total: usize, source: &Path) {
        let counter = self.dim.apply_to(format!("[{done}/{total}]"));
        self.line(&format!("{counter} {}", source.display()));
    }

    /// Status line of one document followed by its warnings.
    pub(crate) fn result(&self, result: &ConversionResult) {
        let source = result.source.display();
        match (result.error(), &result.output_html) {
            (Some(err), _) => self.line(&self.fail.apply_to(format!("✗ {source}: {err}")).to_string()),
            (None, Some(html)) => self.line(
                &self
                    .ok
                    .apply_to(format!("✓ {source} -> {}", html.display()))
                    .to_string(),
            ),
            (None, None) => self.line(&self.ok.apply_to(format!("✓ {source}")).to_string()),
        }
        for warning in &result.warnings {
            self.warning(warning);
        }
    }

    fn warning(&self, warning: &Warning) {
        let text = match &warning.related_path {
            Some(path) => format!("  ! {warning} ({})", path.display()),
            None => format!("  ! {warning}"),
        };
        self.line(&self.warn.apply_to(text).to_string());
    }

    /// One line per written or failed archive.
    pub(crate) fn archive(&self, outcome: &ArchiveOutcome) {
        match outcome {
            Ok(archive) => self.line(
                &self
                    .ok
                    .apply_to(format!(
                        "Archived {} ({} entries)",
                        archive.path.display(),
                        archive.entries
                    ))
                    .to_string(),
            ),
            Err(err) => self.error(&format!("Archive failed: {err}")),
        }
    }

    /// Print a separator line.
    pub(crate) fn separator(&self) {
        self.line(&"-".repeat(60));
    }
}
