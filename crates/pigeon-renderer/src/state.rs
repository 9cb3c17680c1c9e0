//! Text helpers shared by the tree builder and the HTML writer.

use std::collections::{HashMap, HashSet};

/// Generates unique heading anchor IDs within one document.
#[derive(Default)]
pub(crate) struct HeadingIds {
    /// Next suffix to try per slug.
    counts: HashMap<String, usize>,
    issued: HashSet<String>,
}

impl HeadingIds {
    /// Return a unique ID for a heading with the given plain text.
    ///
    /// The first occurrence gets the bare slug, later ones `-1`, `-2`, ...
    /// skipping any ID an earlier heading already took.
    pub(crate) fn next(&mut self, text: &str) -> String {
        let base_id = slugify(text);
        let count = self.counts.entry(base_id.clone()).or_default();
        let mut id = base_id.clone();
        if *count > 0 || self.issued.contains(&id) {
            *count = (*count).max(1);
            loop {
                id = format!("{base_id}-{count}");
                *count += 1;
                if !self.issued.contains(&id) {
                    break;
                }
            }
        } else {
            *count = 1;
        }
        self.issued.insert(id.clone());
        id
    }
}

/// Lowercase ASCII slug of `text` for use as an anchor.
///
/// Runs of whitespace, `-` and `_` collapse into one `-`; other punctuation
/// and non-ASCII characters are dropped.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || c == '-' || c == '_' {
            pending_dash = true;
        }
    }
    slug
}

/// Escape text for HTML element content and double- or single-quoted
/// attribute values.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        let entity = match c {
            '&' => "&amp;",
            '<' => "&lt;",
            '>' => "&gt;",
            '"' => "&quot;",
            '\'' => "&#x27;",
            _ => {
                escaped.push(c);
                continue;
            }
        };
        escaped.push_str(entity);
    }
    escaped
}
