//! Markdown to portable HTML conversion for pigeon.
//!
//! A [`Converter`] turns each Markdown source into `<name>.html` with the theme
//! stylesheet embedded, plus an `assets_<name>/` folder holding copies of every
//! local image it references. Batches run in parallel, each document owning
//! its output names through a slot reserved up front. Results can then be
//! packaged into ZIP archives through an [`ExportBundle`].
//!
//! ```no_run
//! use std::path::PathBuf;
//! use pigeon_convert::{ConvertOptions, Converter, ExportBundle, ExportMode, PackOptions};
//!
//! let converter = Converter::new(ConvertOptions::default());
//! let results = converter.convert_batch(&[PathBuf::from("report.md")]);
//! let bundle = ExportBundle::new(results, ExportMode::IndividualZip);
//! let report = bundle.pack(&PackOptions::default());
//! assert_eq!(report.failed(), 0);
//! ```

mod bundle;
mod converter;
mod error;
mod inputs;
mod publish;
mod reservation;
mod theme;

pub use bundle::ExportBundle;
pub use converter::{ConversionResult, ConversionStatus, ConvertOptions, Converter, ProgressFn};
pub use error::ConvertError;
pub use inputs::{MARKDOWN_EXTENSIONS, collect_sources, is_markdown};
pub use pigeon_assets::{CancelToken, Warning, WarningKind};
pub use pigeon_pack::{Archive, ArchiveOutcome, ExportMode, PackError, PackOptions, PackReport};
pub use publish::{PublishBundle, PublishError, Publisher};
pub use reservation::reserve_slots;
pub use theme::{DEFAULT_CSS, ThemeStore};
