use std::io;
use std::path::PathBuf;

/// Error that fails the conversion of one document.
///
/// A failed document never stops the rest of its batch.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("Source file not found: {}", .0.display())]
    SourceNotFound(PathBuf),
    #[error("Not a Markdown file (expected .md or .markdown): {}", .0.display())]
    NotMarkdown(PathBuf),
    #[error("Cannot read {}: {source}", path.display())]
    UnreadableSource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Cannot write {}: {source}", path.display())]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Conversion cancelled")]
    Cancelled,
}
