//! Document tree built from `pulldown-cmark` events.
//!
//! The parser emits a flat stream of start/end events. [`Document::parse`]
//! folds that stream into a closed set of [`Node`] variants so that every
//! consumer (asset resolution, HTML rendering) matches exhaustively on the
//! same shape instead of re-tracking parser state.

use pulldown_cmark::{
    BlockQuoteKind, CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd,
};

use crate::html::img_sources;
use crate::state::HeadingIds;

/// Column alignment of a table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Align {
    None,
    Left,
    Center,
    Right,
}

/// GitHub-style alert kind of a block quote (`> [!NOTE]`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertKind {
    Note,
    Tip,
    Important,
    Warning,
    Caution,
}

impl From<BlockQuoteKind> for AlertKind {
    fn from(kind: BlockQuoteKind) -> Self {
        match kind {
            BlockQuoteKind::Note => Self::Note,
            BlockQuoteKind::Tip => Self::Tip,
            BlockQuoteKind::Important => Self::Important,
            BlockQuoteKind::Warning => Self::Warning,
            BlockQuoteKind::Caution => Self::Caution,
        }
    }
}

/// An image reference as written in the Markdown source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    /// Source exactly as written (`./img/a.png`, `https://...`).
    pub src: String,
    /// Optional title attribute (empty when absent).
    pub title: String,
    /// Plain-text alt text.
    pub alt: String,
}

/// A node of the document tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Text(String),
    /// Inline code span.
    Code(String),
    /// Raw HTML, kept verbatim. `<img>` tags inside are asset references.
    Html(String),
    SoftBreak,
    HardBreak,
    Rule,
    TaskMarker(bool),
    Paragraph(Vec<Node>),
    Heading {
        level: u8,
        id: String,
        children: Vec<Node>,
    },
    BlockQuote {
        alert: Option<AlertKind>,
        children: Vec<Node>,
    },
    CodeBlock {
        language: Option<String>,
        code: String,
    },
    List {
        start: Option<u64>,
        items: Vec<Node>,
    },
    Item(Vec<Node>),
    Table {
        alignments: Vec<Align>,
        children: Vec<Node>,
    },
    TableHead(Vec<Node>),
    TableRow(Vec<Node>),
    TableCell(Vec<Node>),
    Emphasis(Vec<Node>),
    Strong(Vec<Node>),
    Strikethrough(Vec<Node>),
    Superscript(Vec<Node>),
    Subscript(Vec<Node>),
    Link {
        href: String,
        title: String,
        children: Vec<Node>,
    },
    Image(Image),
    DefinitionList(Vec<Node>),
    DefinitionTitle(Vec<Node>),
    DefinitionDetails(Vec<Node>),
}

impl Node {
    /// Child nodes of a container node, empty for leaves.
    #[must_use]
    pub fn children(&self) -> &[Node] {
        match self {
            Self::Paragraph(children)
            | Self::Heading { children, .. }
            | Self::BlockQuote { children, .. }
            | Self::Item(children)
            | Self::Table { children, .. }
            | Self::TableHead(children)
            | Self::TableRow(children)
            | Self::TableCell(children)
            | Self::Emphasis(children)
            | Self::Strong(children)
            | Self::Strikethrough(children)
            | Self::Superscript(children)
            | Self::Subscript(children)
            | Self::Link { children, .. }
            | Self::DefinitionList(children)
            | Self::DefinitionTitle(children)
            | Self::DefinitionDetails(children) => children,
            Self::List { items, .. } => items,
            Self::Text(_)
            | Self::Code(_)
            | Self::Html(_)
            | Self::SoftBreak
            | Self::HardBreak
            | Self::Rule
            | Self::TaskMarker(_)
            | Self::CodeBlock { .. }
            | Self::Image(_) => &[],
        }
    }
}

/// A parsed Markdown document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Document {
    nodes: Vec<Node>,
    title: Option<String>,
}

impl Document {
    /// Parse Markdown text with GitHub Flavored Markdown extensions enabled.
    ///
    /// Parsing never fails: malformed Markdown degrades to text, as in any
    /// CommonMark implementation.
    #[must_use]
    pub fn parse(markdown: &str) -> Self {
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_GFM;
        Self::from_events(Parser::new_ext(markdown, options))
    }

    /// Build a document from an arbitrary `pulldown-cmark` event stream.
    pub fn from_events<'a, I>(events: I) -> Self
    where
        I: Iterator<Item = Event<'a>>,
    {
        let mut builder = TreeBuilder::new();
        for event in events {
            builder.event(event);
        }
        builder.finish()
    }

    /// Top-level nodes.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Plain text of the first H1 heading, if any.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Iterate every image source in document order.
    ///
    /// Includes Markdown images and `<img src>` attributes found in raw HTML.
    /// Sources are yielded as written; repeated references are yielded each time.
    pub fn asset_references(&self) -> AssetReferences<'_> {
        AssetReferences {
            stack: vec![self.nodes.iter()],
            pending: Vec::new().into_iter(),
        }
    }
}

/// Lazy depth-first iterator over image sources of a [`Document`].
pub struct AssetReferences<'a> {
    stack: Vec<std::slice::Iter<'a, Node>>,
    pending: std::vec::IntoIter<&'a str>,
}

impl<'a> Iterator for AssetReferences<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        loop {
            if let Some(src) = self.pending.next() {
                return Some(src);
            }
            let level = self.stack.last_mut()?;
            match level.next() {
                None => {
                    self.stack.pop();
                }
                Some(Node::Image(image)) => return Some(&image.src),
                Some(Node::Html(html)) => {
                    self.pending = img_sources(html).collect::<Vec<_>>().into_iter();
                }
                Some(node) => {
                    let children = node.children();
                    if !children.is_empty() {
                        self.stack.push(children.iter());
                    }
                }
            }
        }
    }
}

/// Open container while folding events into nodes.
enum Frame {
    Root,
    Paragraph,
    Heading(u8),
    BlockQuote(Option<AlertKind>),
    CodeBlock(Option<String>),
    List(Option<u64>),
    Item,
    Table(Vec<Align>),
    TableHead,
    TableRow,
    TableCell,
    Emphasis,
    Strong,
    Strikethrough,
    Superscript,
    Subscript,
    Link { href: String, title: String },
    Image { src: String, title: String },
    DefinitionList,
    DefinitionTitle,
    DefinitionDetails,
    /// Raw HTML block: consecutive HTML lines are merged into one node.
    HtmlBlock,
    /// Footnote definitions and metadata blocks are dropped.
    Discard,
}

struct TreeBuilder {
    stack: Vec<(Frame, Vec<Node>)>,
    ids: HeadingIds,
    title: Option<String>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            stack: vec![(Frame::Root, Vec::new())],
            ids: HeadingIds::default(),
            title: None,
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.push(Node::Text(text.into_string())),
            Event::Code(code) => self.push(Node::Code(code.into_string())),
            Event::Html(html) | Event::InlineHtml(html) => self.push(Node::Html(html.into_string())),
            Event::SoftBreak => self.push(Node::SoftBreak),
            Event::HardBreak => self.push(Node::HardBreak),
            Event::Rule => self.push(Node::Rule),
            Event::TaskListMarker(checked) => self.push(Node::TaskMarker(checked)),
            Event::FootnoteReference(_) | Event::InlineMath(_) | Event::DisplayMath(_) => {
                // Not supported
            }
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        let frame = match tag {
            Tag::Paragraph => Frame::Paragraph,
            Tag::Heading { level, .. } => Frame::Heading(heading_level_to_num(level)),
            Tag::BlockQuote(kind) => Frame::BlockQuote(kind.map(AlertKind::from)),
            Tag::CodeBlock(kind) => Frame::CodeBlock(match kind {
                CodeBlockKind::Fenced(info) => info
                    .split_whitespace()
                    .next()
                    .filter(|lang| !lang.is_empty())
                    .map(str::to_owned),
                CodeBlockKind::Indented => None,
            }),
            Tag::List(start) => Frame::List(start),
            Tag::Item => Frame::Item,
            Tag::Table(alignments) => Frame::Table(alignments.iter().map(convert_align).collect()),
            Tag::TableHead => Frame::TableHead,
            Tag::TableRow => Frame::TableRow,
            Tag::TableCell => Frame::TableCell,
            Tag::Emphasis => Frame::Emphasis,
            Tag::Strong => Frame::Strong,
            Tag::Strikethrough => Frame::Strikethrough,
            Tag::Superscript => Frame::Superscript,
            Tag::Subscript => Frame::Subscript,
            Tag::Link {
                dest_url, title, ..
            } => Frame::Link {
                href: dest_url.into_string(),
                title: title.into_string(),
            },
            Tag::Image {
                dest_url, title, ..
            } => Frame::Image {
                src: dest_url.into_string(),
                title: title.into_string(),
            },
            Tag::DefinitionList => Frame::DefinitionList,
            Tag::DefinitionListTitle => Frame::DefinitionTitle,
            Tag::DefinitionListDefinition => Frame::DefinitionDetails,
            Tag::HtmlBlock => Frame::HtmlBlock,
            Tag::FootnoteDefinition(_) | Tag::MetadataBlock(_) => Frame::Discard,
        };
        self.stack.push((frame, Vec::new()));
    }

    fn end(&mut self, _tag: TagEnd) {
        // Events are balanced, so the matching frame is always on top.
        if self.stack.len() < 2 {
            return;
        }
        let Some((frame, children)) = self.stack.pop() else {
            return;
        };

        let node = match frame {
            Frame::Root | Frame::Discard => return,
            Frame::HtmlBlock => {
                let html: String = children
                    .iter()
                    .filter_map(|node| match node {
                        Node::Html(html) | Node::Text(html) => Some(html.as_str()),
                        _ => None,
                    })
                    .collect();
                Node::Html(html)
            }
            Frame::Paragraph => Node::Paragraph(children),
            Frame::Heading(level) => {
                let text = plain_text(&children);
                let id = self.ids.next(&text);
                if level == 1 && self.title.is_none() {
                    self.title = Some(text.trim().to_owned());
                }
                Node::Heading {
                    level,
                    id,
                    children,
                }
            }
            Frame::BlockQuote(alert) => Node::BlockQuote { alert, children },
            Frame::CodeBlock(language) => Node::CodeBlock {
                language,
                code: plain_text(&children),
            },
            Frame::List(start) => Node::List {
                start,
                items: children,
            },
            Frame::Item => Node::Item(children),
            Frame::Table(alignments) => Node::Table {
                alignments,
                children,
            },
            Frame::TableHead => Node::TableHead(children),
            Frame::TableRow => Node::TableRow(children),
            Frame::TableCell => Node::TableCell(children),
            Frame::Emphasis => Node::Emphasis(children),
            Frame::Strong => Node::Strong(children),
            Frame::Strikethrough => Node::Strikethrough(children),
            Frame::Superscript => Node::Superscript(children),
            Frame::Subscript => Node::Subscript(children),
            Frame::Link { href, title } => Node::Link {
                href,
                title,
                children,
            },
            Frame::Image { src, title } => Node::Image(Image {
                src,
                title,
                alt: plain_text(&children),
            }),
            Frame::DefinitionList => Node::DefinitionList(children),
            Frame::DefinitionTitle => Node::DefinitionTitle(children),
            Frame::DefinitionDetails => Node::DefinitionDetails(children),
        };
        self.push(node);
    }

    fn push(&mut self, node: Node) {
        if let Some((_, children)) = self.stack.last_mut() {
            children.push(node);
        }
    }

    fn finish(mut self) -> Document {
        // Fold anything left open (only possible with a truncated event stream).
        while self.stack.len() > 1 {
            self.end(TagEnd::Paragraph);
        }
        let nodes = self
            .stack
            .pop()
            .map(|(_, children)| children)
            .unwrap_or_default();
        Document {
            nodes,
            title: self.title,
        }
    }
}

/// Convert heading level enum to number (1-6).
fn heading_level_to_num(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn convert_align(align: &pulldown_cmark::Alignment) -> Align {
    match align {
        pulldown_cmark::Alignment::None => Align::None,
        pulldown_cmark::Alignment::Left => Align::Left,
        pulldown_cmark::Alignment::Center => Align::Center,
        pulldown_cmark::Alignment::Right => Align::Right,
    }
}

/// Flatten nodes into plain text (used for alt text, heading slugs, code).
fn plain_text(nodes: &[Node]) -> String {
    let mut out = String::new();
    collect_text(nodes, &mut out);
    out
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) | Node::Code(text) => out.push_str(text),
            Node::SoftBreak | Node::HardBreak => out.push(' '),
            Node::Image(image) => out.push_str(&image.alt),
            other => collect_text(other.children(), out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_paragraph() {
        let doc = Document::parse("Hello, *world*!");
        assert_eq!(
            doc.nodes(),
            &[Node::Paragraph(vec![
                Node::Text("Hello, ".to_owned()),
                Node::Emphasis(vec![Node::Text("world".to_owned())]),
                Node::Text("!".to_owned()),
            ])]
        );
    }

    #[test]
    fn test_parse_image_collects_alt_text() {
        let doc = Document::parse(r#"![A *bold* chart](img/chart.png "Sales")"#);
        assert_eq!(
            doc.nodes(),
            &[Node::Paragraph(vec![Node::Image(Image {
                src: "img/chart.png".to_owned(),
                title: "Sales".to_owned(),
                alt: "A bold chart".to_owned(),
            })])]
        );
    }

    #[test]
    fn test_title_from_first_h1() {
        let doc = Document::parse("## Intro\n\n# Quarterly Report\n\n# Second");
        assert_eq!(doc.title(), Some("Quarterly Report"));
    }

    #[test]
    fn test_no_title_without_h1() {
        let doc = Document::parse("## Only a section");
        assert_eq!(doc.title(), None);
    }

    #[test]
    fn test_heading_ids_are_unique() {
        let doc = Document::parse("## Notes\n\n## Notes");
        let ids: Vec<_> = doc
            .nodes()
            .iter()
            .filter_map(|node| match node {
                Node::Heading { id, .. } => Some(id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec!["notes", "notes-1"]);
    }

    #[test]
    fn test_fenced_code_block_language() {
        let doc = Document::parse("```rust ignore\nfn main() {}\n```");
        assert_eq!(
            doc.nodes(),
            &[Node::CodeBlock {
                language: Some("rust".to_owned()),
                code: "fn main() {}\n".to_owned(),
            }]
        );
    }

    #[test]
    fn test_asset_references_in_document_order() {
        let markdown = "\
![a](./img/a.png)

- item ![b](b.png)
- [![c](c.png)](https://example.com)

| col |
|-----|
| ![d](https://example.com/d.png) |
";
        let doc = Document::parse(markdown);
        let refs: Vec<_> = doc.asset_references().collect();
        assert_eq!(
            refs,
            vec!["./img/a.png", "b.png", "c.png", "https://example.com/d.png"]
        );
    }

    #[test]
    fn test_asset_references_include_raw_html_images() {
        let markdown = "<p align=\"center\">\n<img src=\"logo.png\" width=\"200\">\n</p>\n\nText <img src='inline.gif'> here.";
        let doc = Document::parse(markdown);
        let refs: Vec<_> = doc.asset_references().collect();
        assert_eq!(refs, vec!["logo.png", "inline.gif"]);
    }

    #[test]
    fn test_asset_references_repeat_duplicates() {
        let doc = Document::parse("![x](a.png) ![y](a.png)");
        assert_eq!(doc.asset_references().count(), 2);
    }

    #[test]
    fn test_footnote_definitions_dropped() {
        let doc = Document::from_events(
            Parser::new_ext("Text[^1]\n\n[^1]: Note ![n](n.png)", Options::ENABLE_FOOTNOTES),
        );
        assert_eq!(doc.asset_references().count(), 0);
    }

    #[test]
    fn test_alert_block_quote() {
        let doc = Document::parse("> [!WARNING]\n> Careful");
        assert!(matches!(
            doc.nodes(),
            [Node::BlockQuote {
                alert: Some(AlertKind::Warning),
                ..
            }]
        ));
    }
}
