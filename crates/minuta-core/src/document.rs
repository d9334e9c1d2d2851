//! Full document preview: header, qualification blocks, clauses, footer.

use std::collections::BTreeMap;

use crate::clauses::display_title;
use crate::draft::WorkingState;
use crate::model::VariableValues;
use crate::qualification;
use crate::template::{self, DOCUMENT_TITLE, SIGNATURE_DATE};

/// Party name on the n-th signature line (1-based, role order).
pub const PARTY_NAME_PREFIX: &str = "nome_parte_";
/// Role name on the n-th signature line (1-based, role order).
pub const ROLE_NAME_PREFIX: &str = "nome_papel_";

/// Header and footer wrapped around the body of every document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentLayout {
    pub header: String,
    pub footer: String,
}

impl DocumentLayout {
    /// Title header, signature date and one signature line per role.
    pub fn standard(signatures: usize) -> Self {
        let header = format!(r#"<h3 class="document-title">{{{{{DOCUMENT_TITLE}}}}}</h3>"#);
        let mut footer = format!(r#"<p class="signature-date">{{{{{SIGNATURE_DATE}}}}}</p>"#);
        footer.push_str(r#"<div class="signatures">"#);
        for n in 1..=signatures {
            footer.push_str(&format!(
                concat!(
                    r#"<div class="signature">"#,
                    r#"<p class="signature-line">{{{{{}{}}}}}</p>"#,
                    r#"<p class="signature-role">{{{{{}{}}}}}</p>"#,
                    "</div>"
                ),
                PARTY_NAME_PREFIX, n, ROLE_NAME_PREFIX, n
            ));
        }
        footer.push_str("</div>");
        Self { header, footer }
    }

    /// The standard layout sized to a draft's declared roles.
    pub fn for_state(state: &WorkingState) -> Self {
        Self::standard(state.contract_type.required_roles.len())
    }
}

impl Default for DocumentLayout {
    fn default() -> Self {
        Self::standard(2)
    }
}

/// Values derived from the draft itself: title and signature lines.
fn derived_values(state: &WorkingState) -> BTreeMap<String, String> {
    let mut values = BTreeMap::new();
    values.insert(DOCUMENT_TITLE.to_string(), state.contract_type.name.clone());
    for (i, role) in state.contract_type.required_roles.iter().enumerate() {
        let n = i + 1;
        values.insert(format!("{ROLE_NAME_PREFIX}{n}"), role.clone());
        if let Some(party) = state.assignments.get(role).and_then(|a| a.party.as_ref()) {
            values.insert(format!("{PARTY_NAME_PREFIX}{n}"), party.name.clone());
        }
    }
    values
}

/// Values for header, clauses and footer: derived values with the user's
/// non-blank variables on top.
pub fn document_values(state: &WorkingState) -> BTreeMap<String, String> {
    let mut values = derived_values(state);
    for (key, value) in &state.values {
        if !value.trim().is_empty() {
            values.insert(key.clone(), value.clone());
        }
    }
    values
}

/// Render one clause at its current position.
pub fn render_clause(
    title: &str,
    body: &str,
    index: usize,
    values: &BTreeMap<String, String>,
) -> String {
    format!(
        r#"<div class="clause"><h4>{}</h4><div class="clause-body">{}</div></div>"#,
        template::render(&display_title(title, index), values),
        template::render(body, values)
    )
}

pub fn render_document(state: &WorkingState, layout: &DocumentLayout) -> String {
    let values = document_values(state);
    let mut out = template::render(&layout.header, &values);

    let qualifications = qualification::render_qualifications(
        &state.contract_type.required_roles,
        &state.assignments,
        &state.values,
    );
    if !qualifications.is_empty() {
        out.push_str(r#"<div class="qualifications">"#);
        out.push_str(&qualifications);
        out.push_str("</div>");
    }

    out.push_str(r#"<div class="clauses">"#);
    for (index, clause) in state.clauses.iter().enumerate() {
        out.push_str(&render_clause(&clause.title, &clause.body, index, &values));
    }
    out.push_str("</div>");

    out.push_str(&template::render(&layout.footer, &values));
    out
}

fn push_unique(names: &mut Vec<String>, name: String) {
    if !names.contains(&name) {
        names.push(name);
    }
}

/// Names the variable form should offer, in first-appearance order.
///
/// The title and signature date have their own fixed inputs and are left out,
/// as are signature lines and anything an assigned entity already supplies.
pub fn variable_names(state: &WorkingState, layout: &DocumentLayout) -> Vec<String> {
    let roles = state.contract_type.required_roles.len();
    let is_signature_slot = |name: &str| {
        (1..=roles).any(|n| {
            name == format!("{PARTY_NAME_PREFIX}{n}") || name == format!("{ROLE_NAME_PREFIX}{n}")
        })
    };
    let is_free = |name: &str| {
        name != DOCUMENT_TITLE && name != SIGNATURE_DATE && !is_signature_slot(name)
    };
    let no_globals = VariableValues::new();
    let mut names = Vec::new();

    for name in template::placeholders(&layout.header) {
        if is_free(&name) {
            push_unique(&mut names, name);
        }
    }
    for role in &state.contract_type.required_roles {
        let Some(assignment) = state.assignments.get(role) else {
            continue;
        };
        if let (Some(entity), Some(qualification)) =
            (&assignment.party, &assignment.qualification)
        {
            for name in qualification::unresolved(entity, qualification, &no_globals) {
                if is_free(&name) {
                    push_unique(&mut names, name);
                }
            }
        }
    }
    for clause in state.clauses.iter() {
        let title = template::placeholders(&clause.title);
        for name in title.into_iter().chain(template::placeholders(&clause.body)) {
            if is_free(&name) {
                push_unique(&mut names, name);
            }
        }
    }
    for name in template::placeholders(&layout.footer) {
        if is_free(&name) {
            push_unique(&mut names, name);
        }
    }
    names
}

/// The subset of [`variable_names`] that still has no value.
pub fn pending_variables(state: &WorkingState, layout: &DocumentLayout) -> Vec<String> {
    variable_names(state, layout)
        .into_iter()
        .filter(|name| state.values.get(name).is_none_or(|v| v.trim().is_empty()))
        .collect()
}
