//! Image references inside raw HTML fragments.
//!
//! Markdown allows inline HTML, and documents frequently use
//! `<img src="..." width="...">` to size images. Those sources are assets just
//! like Markdown images, so they are discovered and rewritten here.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::state::escape_html;

/// Matches the `src` attribute of an `<img>` tag.
///
/// Group 1 is everything up to the value, group 2 a double-quoted value,
/// group 3 a single-quoted value.
static IMG_SRC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(<img\b[^>]*?\ssrc\s*=\s*)(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

/// Iterate `<img src>` values in an HTML fragment, in order.
pub fn img_sources(html: &str) -> impl Iterator<Item = &str> {
    IMG_SRC_RE.captures_iter(html).filter_map(|caps| {
        caps.get(2)
            .or_else(|| caps.get(3))
            .map(|m| m.as_str())
            .filter(|src| !src.is_empty())
    })
}

/// Rewrite `<img src>` values through `lookup`.
///
/// Sources for which `lookup` returns `None` are left byte-for-byte unchanged.
/// Rewritten values are written double-quoted and HTML-escaped.
pub fn rewrite_img_sources<'a, 'b, F>(html: &'a str, mut lookup: F) -> Cow<'a, str>
where
    F: FnMut(&str) -> Option<&'b str>,
{
    IMG_SRC_RE.replace_all(html, |caps: &Captures<'_>| {
        let src = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map_or("", |m| m.as_str());
        match lookup(src) {
            Some(target) => format!(r#"{}"{}""#, &caps[1], escape_html(target)),
            None => caps[0].to_owned(),
        }
    })
}
