//! ZIP packaging of converted documents.
//!
//! A converted document is an HTML file plus an optional `assets_<name>/`
//! folder. [`pack`] bundles them either one archive per document or one
//! archive for a whole batch.

mod packager;

pub use packager::{
    Archive, ArchiveOutcome, ExportMode, PackDocument, PackError, PackOptions, PackReport, pack,
};
