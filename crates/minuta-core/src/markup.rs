//! Small HTML helpers for imported text and clipboard output.

use std::sync::LazyLock;

use regex::Regex;

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));

static BLOCK_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(p|div|h[1-6]|li|tr)>").expect("block pattern is valid")
});

static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*(\n[ \t]*)+").expect("blank line pattern is valid"));

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Text content of an HTML fragment, with no line structure.
pub fn strip_tags(html: &str) -> String {
    decode_entities(&TAG.replace_all(html, ""))
}

/// True when a fragment has no visible text.
pub fn is_blank(html: &str) -> bool {
    strip_tags(html).trim().is_empty()
}

/// Wrap one line of plain text as a paragraph.
pub fn paragraph(text: &str) -> String {
    format!("<p>{}</p>", escape(text.trim()))
}

/// Split extracted document text into paragraph fragments, one per line.
pub fn paragraphs_from_text(text: &str) -> Vec<String> {
    text.lines().map(paragraph).collect()
}

/// Readable text for the clipboard: block ends become line breaks, runs of
/// blank lines collapse to one.
pub fn plain_text(html: &str) -> String {
    let with_breaks = BLOCK_END.replace_all(html, "\n");
    let text = strip_tags(&with_breaks);
    BLANK_LINES.replace_all(text.trim(), "\n\n").into_owned()
}
