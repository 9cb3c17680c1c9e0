//! Markdown document tree and self-contained HTML rendering for pigeon.
//!
//! This crate turns Markdown text into a [`Document`]: a closed tree of
//! [`Node`] variants built from `pulldown-cmark` events. The tree exposes
//! every image source it references so that asset relocation can run before
//! rendering, and [`render`] serializes it into a complete HTML page with the
//! theme stylesheet embedded.
//!
//! Rendering is a pure transform. Image sources are rewritten through an
//! [`AssetLookup`]; anything the lookup does not know is emitted unchanged.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use pigeon_renderer::{Document, RenderContext, render};
//!
//! let document = Document::parse("# Report\n\n![chart](./img/chart.png)");
//! let mut assets = BTreeMap::new();
//! assets.insert("./img/chart.png".to_owned(), "assets_report/chart.png".to_owned());
//!
//! let html = render(&document, &assets, &RenderContext::new("body { margin: 0 }"));
//! assert!(html.contains(r#"src="assets_report/chart.png""#));
//! assert!(html.contains("<title>Report</title>"));
//! ```

mod document;
mod html;
mod renderer;
mod state;
mod template;

pub use document::{AlertKind, Align, AssetReferences, Document, Image, Node};
pub use html::{img_sources, rewrite_img_sources};
pub use renderer::{AssetLookup, RenderContext, render, render_body};
pub use state::{escape_html, slugify};
