//! HTML serialization of a [`Document`].

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;

use crate::document::{AlertKind, Align, Document, Image, Node};
use crate::html::rewrite_img_sources;
use crate::state::escape_html;
use crate::template;

/// Maps image sources as written in the document to their rewritten paths.
///
/// Implemented by the asset relocation mapping; plain string maps implement it
/// too so rendering can be exercised without touching the filesystem.
pub trait AssetLookup {
    /// Rewritten path for `original`, or `None` to keep it unchanged.
    fn lookup(&self, original: &str) -> Option<&str>;
}

impl AssetLookup for BTreeMap<String, String> {
    fn lookup(&self, original: &str) -> Option<&str> {
        self.get(original).map(String::as_str)
    }
}

impl<S: std::hash::BuildHasher> AssetLookup for HashMap<String, String, S> {
    fn lookup(&self, original: &str) -> Option<&str> {
        self.get(original).map(String::as_str)
    }
}

/// Page-level inputs to rendering.
#[derive(Clone, Copy, Debug)]
pub struct RenderContext<'a> {
    /// Stylesheet injected verbatim into `<head>`.
    pub theme_css: &'a str,
    /// Page title; falls back to the document's first H1.
    pub title: Option<&'a str>,
    /// Value of the `lang` attribute.
    pub lang: &'a str,
}

impl<'a> RenderContext<'a> {
    /// Context with the given stylesheet, no explicit title and `lang="en"`.
    #[must_use]
    pub fn new(theme_css: &'a str) -> Self {
        Self {
            theme_css,
            title: None,
            lang: "en",
        }
    }

    /// Set an explicit page title.
    #[must_use]
    pub fn with_title(mut self, title: &'a str) -> Self {
        self.title = Some(title);
        self
    }

    /// Set the `lang` attribute.
    #[must_use]
    pub fn with_lang(mut self, lang: &'a str) -> Self {
        self.lang = lang;
        self
    }
}

/// Render a complete, self-contained HTML page.
///
/// Pure and deterministic: the same document, mapping and context always
/// produce the same bytes.
pub fn render(document: &Document, assets: &impl AssetLookup, context: &RenderContext<'_>) -> String {
    let body = render_body(document, assets);
    let title = context
        .title
        .or_else(|| document.title())
        .unwrap_or("Document");
    template::page(title, context.lang, context.theme_css, &body)
}

/// Render only the document content (what goes inside `<article>`).
pub fn render_body(document: &Document, assets: &impl AssetLookup) -> String {
    let mut writer = HtmlWriter {
        out: String::with_capacity(4096),
        assets,
        alignments: Vec::new(),
        in_head: false,
        cell_index: 0,
    };
    writer.nodes(document.nodes());
    writer.out
}

struct HtmlWriter<'a, A: AssetLookup> {
    out: String,
    assets: &'a A,
    /// Column alignments of the table being written.
    alignments: Vec<Align>,
    in_head: bool,
    cell_index: usize,
}

impl<A: AssetLookup> HtmlWriter<'_, A> {
    fn nodes(&mut self, nodes: &[Node]) {
        for node in nodes {
            self.node(node);
        }
    }

    fn wrap(&mut self, tag: &str, children: &[Node]) {
        write!(self.out, "<{tag}>").unwrap();
        self.nodes(children);
        write!(self.out, "</{tag}>").unwrap();
    }

    fn node(&mut self, node: &Node) {
        match node {
            Node::Text(text) => self.out.push_str(&escape_html(text)),
            Node::Code(code) => {
                write!(self.out, "<code>{}</code>", escape_html(code)).unwrap();
            }
            Node::Html(html) => {
                let assets = self.assets;
                let html = rewrite_img_sources(html, |src| assets.lookup(src));
                self.out.push_str(&html);
            }
            Node::SoftBreak => self.out.push('\n'),
            Node::HardBreak => self.out.push_str("<br>"),
            Node::Rule => self.out.push_str("<hr>"),
            Node::TaskMarker(checked) => {
                if *checked {
                    self.out
                        .push_str(r#"<input type="checkbox" checked disabled> "#);
                } else {
                    self.out.push_str(r#"<input type="checkbox" disabled> "#);
                }
            }
            Node::Paragraph(children) => self.wrap("p", children),
            Node::Heading {
                level,
                id,
                children,
            } => {
                write!(self.out, r#"<h{level} id="{}">"#, escape_html(id)).unwrap();
                self.nodes(children);
                write!(self.out, "</h{level}>").unwrap();
            }
            Node::BlockQuote { alert, children } => match alert {
                Some(kind) => self.alert(*kind, children),
                None => self.wrap("blockquote", children),
            },
            Node::CodeBlock { language, code } => {
                if let Some(lang) = language {
                    write!(
                        self.out,
                        r#"<pre><code class="language-{}">{}</code></pre>"#,
                        escape_html(lang),
                        escape_html(code)
                    )
                    .unwrap();
                } else {
                    write!(self.out, "<pre><code>{}</code></pre>", escape_html(code)).unwrap();
                }
            }
            Node::List { start, items } => match start {
                Some(1) => self.wrap("ol", items),
                Some(n) => {
                    write!(self.out, r#"<ol start="{n}">"#).unwrap();
                    self.nodes(items);
                    self.out.push_str("</ol>");
                }
                None => self.wrap("ul", items),
            },
            Node::Item(children) => self.wrap("li", children),
            Node::Table {
                alignments,
                children,
            } => {
                let outer = std::mem::replace(&mut self.alignments, alignments.clone());
                self.out.push_str("<table>");
                let (head, body): (Vec<&Node>, Vec<&Node>) = children
                    .iter()
                    .partition(|child| matches!(child, Node::TableHead(_)));
                for child in head {
                    self.node(child);
                }
                if !body.is_empty() {
                    self.out.push_str("<tbody>");
                    for child in body {
                        self.node(child);
                    }
                    self.out.push_str("</tbody>");
                }
                self.out.push_str("</table>");
                self.alignments = outer;
            }
            Node::TableHead(cells) => {
                self.in_head = true;
                self.cell_index = 0;
                self.out.push_str("<thead><tr>");
                self.nodes(cells);
                self.out.push_str("</tr></thead>");
                self.in_head = false;
            }
            Node::TableRow(cells) => {
                self.cell_index = 0;
                self.wrap("tr", cells);
            }
            Node::TableCell(children) => {
                let tag = if self.in_head { "th" } else { "td" };
                let align = match self.alignments.get(self.cell_index) {
                    Some(Align::Left) => r#" style="text-align:left""#,
                    Some(Align::Center) => r#" style="text-align:center""#,
                    Some(Align::Right) => r#" style="text-align:right""#,
                    Some(Align::None) | None => "",
                };
                write!(self.out, "<{tag}{align}>").unwrap();
                self.nodes(children);
                write!(self.out, "</{tag}>").unwrap();
                self.cell_index += 1;
            }
            Node::Emphasis(children) => self.wrap("em", children),
            Node::Strong(children) => self.wrap("strong", children),
            Node::Strikethrough(children) => self.wrap("s", children),
            Node::Superscript(children) => self.wrap("sup", children),
            Node::Subscript(children) => self.wrap("sub", children),
            Node::Link {
                href,
                title,
                children,
            } => {
                write!(self.out, r#"<a href="{}""#, escape_html(href)).unwrap();
                if !title.is_empty() {
                    write!(self.out, r#" title="{}""#, escape_html(title)).unwrap();
                }
                self.out.push('>');
                self.nodes(children);
                self.out.push_str("</a>");
            }
            Node::Image(image) => self.image(image),
            Node::DefinitionList(children) => self.wrap("dl", children),
            Node::DefinitionTitle(children) => self.wrap("dt", children),
            Node::DefinitionDetails(children) => self.wrap("dd", children),
        }
    }

    fn image(&mut self, image: &Image) {
        let src = self.assets.lookup(&image.src).unwrap_or(&image.src);
        write!(self.out, r#"<img src="{}""#, escape_html(src)).unwrap();
        if !image.title.is_empty() {
            write!(self.out, r#" title="{}""#, escape_html(&image.title)).unwrap();
        }
        write!(self.out, r#" alt="{}">"#, escape_html(&image.alt)).unwrap();
    }

    fn alert(&mut self, kind: AlertKind, children: &[Node]) {
        let (class, title) = match kind {
            AlertKind::Note => ("note", "Note"),
            AlertKind::Tip => ("tip", "Tip"),
            AlertKind::Important => ("important", "Important"),
            AlertKind::Warning => ("warning", "Warning"),
            AlertKind::Caution => ("caution", "Caution"),
        };
        write!(
            self.out,
            r#"<div class="alert alert-{class}"><p class="alert-title">{title}</p>"#
        )
        .unwrap();
        self.nodes(children);
        self.out.push_str("</div>");
    }
}
