//! HTML page template.
//!
//! The page has no external dependencies: the theme stylesheet is embedded in
//! a `<style>` block and only relocated assets are referenced by path.

use std::fmt::Write;

use crate::state::escape_html;

/// Render a complete HTML page around already-rendered body content.
pub(crate) fn page(title: &str, lang: &str, css: &str, body: &str) -> String {
    let mut html = String::with_capacity(body.len() + css.len() + 512);

    let _ = writeln!(
        html,
        "<!DOCTYPE html>\n<html lang=\"{}\">",
        escape_html(lang)
    );
    html.push_str("<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    let _ = writeln!(html, "<title>{}</title>", escape_html(title));
    html.push_str("<style>\n");
    html.push_str(css);
    html.push_str("\n</style>\n");
    html.push_str("</head>\n<body>\n");
    html.push_str("<article class=\"markdown-body\">\n");
    html.push_str(body);
    html.push_str("\n</article>\n</body>\n</html>\n");
    html
}
