//! `{{name}}` placeholder interpolation.
//!
//! Unfilled placeholders are replaced by a marker span that carries the name
//! but uses no braces, so rendering already-rendered output changes nothing.
//!
//! Nothing is escaped: clause bodies, qualification fragments and entity data
//! are authored inside the same system and inserted as raw HTML.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::format::format_long_date;

/// Signature date. Always rendered through [`format_long_date`].
pub const SIGNATURE_DATE: &str = "data_assinatura";

/// Document title shown in the default header.
pub const DOCUMENT_TITLE: &str = "titulo_contrato";

/// CSS class on the marker emitted for an unfilled placeholder.
pub const MISSING_CLASS: &str = "placeholder-missing";

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([^{}\s]+)\s*\}\}").expect("placeholder pattern is valid")
});

/// Marker for a placeholder with no value.
pub fn missing_marker(name: &str) -> String {
    format!(r#"<span class="{MISSING_CLASS}" data-placeholder="{name}">[{name}]</span>"#)
}

/// Replace every `{{name}}` in `html` with its value, or with [`missing_marker`]
/// when the value is absent or blank.
///
/// Substitution is a single pass: a value that itself contains `{{...}}` is
/// inserted literally, not expanded.
pub fn render(html: &str, values: &BTreeMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(html, |caps: &Captures<'_>| {
            let name = &caps[1];
            let value = values.get(name).map(String::as_str).unwrap_or_default();
            let value = if name == SIGNATURE_DATE {
                format_long_date(value)
            } else {
                value.to_string()
            };
            if value.trim().is_empty() {
                missing_marker(name)
            } else {
                value
            }
        })
        .into_owned()
}

/// Distinct placeholder names in `html`, in order of first appearance.
pub fn placeholders(html: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in PLACEHOLDER.captures_iter(html) {
        let name = &caps[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}
