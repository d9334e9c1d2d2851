//! Terminal rendering for drafts, history and reference data.

use chrono::TimeZone;
use minuta_core::format::format_timestamp;
use minuta_core::{Attachment, ContractType, Draft, HistoryEntry, Notice};
use std::fmt::Display;
use std::fmt::Write as _;

const LABEL_WIDTH: usize = 14;

// ── Public API ──

/// One line per contract type: id, name and declared roles.
pub fn contract_types(types: &[ContractType]) -> String {
    let mut out = String::new();
    for ct in types {
        let _ = writeln!(
            out,
            "{:>4}  {}  [{}]",
            ct.id,
            ct.name,
            ct.required_roles.join(", ")
        );
    }
    out
}

/// Header card for a draft: id, title, status, completeness and the lock banner.
pub fn draft_card(draft: &Draft) -> String {
    let payload = draft.payload();
    let state = draft.state();
    let mut out = String::new();

    let heading = match draft.id() {
        Some(id) => format!("=== Draft #{id} ==="),
        None => "=== Unsaved draft ===".to_string(),
    };
    let _ = writeln!(out, "{heading}");
    field(&mut out, "title", &payload.title);
    field(&mut out, "contract type", &state.contract_type.name);
    if let Some(status) = draft.status() {
        field(&mut out, "status", status);
    }
    for role in &state.contract_type.required_roles {
        let party = state
            .assignments
            .get(role)
            .and_then(|a| a.party.as_ref())
            .map_or("-", |p| p.name.as_str());
        field(&mut out, role, party);
    }
    field(&mut out, "clauses", state.clauses.len());
    field(&mut out, "complete", if draft.is_complete() { "yes" } else { "no" });
    if let Some(banner) = draft.lock_banner() {
        let _ = writeln!(out);
        let _ = writeln!(out, "! {banner}");
    }
    out
}

/// History, newest first, with timestamps shown in `tz`.
pub fn history<Tz>(entries: &[HistoryEntry], tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    if entries.is_empty() {
        return "No history recorded.\n".to_string();
    }
    let mut out = String::new();
    for entry in entries {
        let _ = writeln!(
            out,
            "{}  {:<12} {}",
            format_timestamp(&entry.timestamp.with_timezone(tz)),
            entry.actor,
            entry.event_description
        );
    }
    out
}

pub fn attachments(items: &[Attachment]) -> String {
    if items.is_empty() {
        return "No attachments.\n".to_string();
    }
    let mut out = String::new();
    for a in items {
        let _ = writeln!(out, "{:>4}  {:<28} {}", a.id, a.filename, a.url);
    }
    out
}

/// Write queued notices to stderr.
pub fn print_notices(notices: &[Notice]) {
    for notice in notices {
        eprintln!("{notice}");
    }
}

fn field(out: &mut String, label: &str, value: impl Display) {
    let _ = writeln!(out, "  {label:<LABEL_WIDTH$} {value}");
}
