//! Party qualification blocks.
//!
//! Each block merges, in increasing precedence: the entity's structured
//! fields, its free-form attributes, then the document's own variables. A
//! document value therefore overrides what the registry holds for that party,
//! for this document only.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::model::{Entity, PartyAssignments, QualificationTemplate, VariableValues};
use crate::template;

pub const FIELD_PARTY_NAME: &str = "nome_parte";
pub const FIELD_NAME: &str = "nome";
pub const FIELD_CPF: &str = "cpf";
pub const FIELD_RG: &str = "rg";
pub const FIELD_CNPJ: &str = "cnpj";
pub const FIELD_ADDRESS: &str = "endereco";

/// Render a free-form attribute as text. `null` and nested objects yield nothing.
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Object(_) => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(value_text).collect();
            Some(parts.join(", "))
        }
    }
}

/// The placeholder values an entity supplies on its own.
pub fn entity_fields(entity: &Entity) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    fields.insert(FIELD_PARTY_NAME.to_string(), entity.name.clone());
    fields.insert(FIELD_NAME.to_string(), entity.name.clone());

    let structured = [
        (FIELD_CPF, &entity.cpf),
        (FIELD_RG, &entity.rg),
        (FIELD_CNPJ, &entity.cnpj),
        (FIELD_ADDRESS, &entity.address),
    ];
    for (key, value) in structured {
        if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            fields.insert(key.to_string(), v.to_string());
        }
    }

    for (key, value) in &entity.extra {
        if let Some(text) = value_text(value) {
            fields.insert(key.clone(), text);
        }
    }
    fields
}

/// Entity fields overlaid with the document's non-blank variables.
pub fn merged_fields(entity: &Entity, globals: &VariableValues) -> BTreeMap<String, String> {
    let mut fields = entity_fields(entity);
    for (key, value) in globals {
        if !value.trim().is_empty() {
            fields.insert(key.clone(), value.clone());
        }
    }
    fields
}

/// One qualification block. Unresolved placeholders stay visible as markers.
pub fn render_block(
    entity: &Entity,
    qualification: &QualificationTemplate,
    globals: &VariableValues,
) -> String {
    template::render(&qualification.html, &merged_fields(entity, globals))
}

/// Placeholder names a block needs that neither the entity nor the document supplies.
///
/// Covers both the template's declared list and what its fragment actually uses.
pub fn unresolved(
    entity: &Entity,
    qualification: &QualificationTemplate,
    globals: &VariableValues,
) -> Vec<String> {
    let fields = merged_fields(entity, globals);
    let mut names: Vec<String> = Vec::new();
    let declared = qualification.declared_placeholders().map(str::to_string);
    for name in declared.chain(template::placeholders(&qualification.html)) {
        let filled = fields.get(&name).is_some_and(|v| !v.trim().is_empty());
        if !filled && !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Concatenate one block per role, in `roles` order, skipping incomplete assignments.
pub fn render_qualifications(
    roles: &[String],
    assignments: &PartyAssignments,
    globals: &VariableValues,
) -> String {
    roles
        .iter()
        .filter_map(|role| {
            let assignment = assignments.get(role)?;
            let entity = assignment.party.as_ref()?;
            let qualification = assignment.qualification.as_ref()?;
            Some(render_block(entity, qualification, globals))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PartyAssignment;
    use crate::template::missing_marker;

    fn maria() -> Entity {
        let mut extra = BTreeMap::new();
        extra.insert("nacionalidade".to_string(), Value::String("brasileira".into()));
        extra.insert("dependentes".to_string(), serde_json::json!(2));
        extra.insert("observacao".to_string(), Value::Null);
        Entity {
            id: 1,
            name: "Maria Souza".into(),
            is_organization: false,
            cpf: Some("529.982.247-25".into()),
            rg: None,
            cnpj: None,
            address: Some("Rua A, 10".into()),
            extra,
        }
    }

    fn pf_template() -> QualificationTemplate {
        QualificationTemplate {
            id: 10,
            name: "Pessoa Física".into(),
            is_organization: false,
            html: concat!(
                "<p><b>{{nome_parte}}</b>, {{nacionalidade}}, ",
                "CPF {{cpf}}, residente em {{endereco}}.</p>"
            )
            .into(),
            required_variables: vec!["nome_parte".into(), "cpf".into(), "endereco".into()],
        }
    }

    fn acme() -> Entity {
        Entity {
            id: 2,
            name: "ACME Ltda".into(),
            is_organization: true,
            cpf: None,
            rg: None,
            cnpj: Some("11.222.333/0001-81".into()),
            address: Some("Av. B, 200".into()),
            extra: BTreeMap::new(),
        }
    }

    fn pj_template() -> QualificationTemplate {
        QualificationTemplate {
            id: 11,
            name: "Pessoa Jurídica".into(),
            is_organization: true,
            html: "<p><b>{{nome_parte}}</b>, CNPJ {{cnpj}}, sede em {{endereco}}.</p>".into(),
            required_variables: vec!["nome_parte".into(), "cnpj".into()],
        }
    }

    #[test]
    fn entity_fields_include_structured_and_extra() {
        let fields = entity_fields(&maria());
        assert_eq!(fields[FIELD_PARTY_NAME], "Maria Souza");
        assert_eq!(fields[FIELD_CPF], "529.982.247-25");
        assert_eq!(fields["nacionalidade"], "brasileira");
        assert_eq!(fields["dependentes"], "2");
        assert!(!fields.contains_key(FIELD_RG));
        assert!(!fields.contains_key("observacao"));
    }

    #[test]
    fn renders_block_from_entity() {
        let out = render_block(&maria(), &pf_template(), &VariableValues::new());
        assert_eq!(
            out,
            "<p><b>Maria Souza</b>, brasileira, CPF 529.982.247-25, residente em Rua A, 10.</p>"
        );
    }

    #[test]
    fn document_value_overrides_entity_address() {
        let mut globals = VariableValues::new();
        globals.insert(FIELD_ADDRESS.into(), "Rua Nova, 99".into());
        let out = render_block(&maria(), &pf_template(), &globals);
        assert!(out.contains("residente em Rua Nova, 99."));
        assert!(!out.contains("Rua A, 10"));
    }

    #[test]
    fn blank_document_value_does_not_override() {
        let mut globals = VariableValues::new();
        globals.insert(FIELD_ADDRESS.into(), "".into());
        let out = render_block(&maria(), &pf_template(), &globals);
        assert!(out.contains("Rua A, 10"));
    }

    #[test]
    fn partial_qualification_is_rendered_with_markers() {
        let mut entity = maria();
        entity.extra.clear();
        let out = render_block(&entity, &pf_template(), &VariableValues::new());
        assert!(out.contains(&missing_marker("nacionalidade")));
        assert_eq!(
            unresolved(&entity, &pf_template(), &VariableValues::new()),
            vec!["nacionalidade"]
        );
    }

    #[test]
    fn blocks_follow_role_order_and_skip_incomplete() {
        let roles = vec![
            "contratante".to_string(),
            "contratada".to_string(),
            "testemunha".to_string(),
        ];
        let mut assignments = PartyAssignments::new();
        assignments.insert(
            "contratada".into(),
            PartyAssignment {
                party: Some(acme()),
                qualification: Some(pj_template()),
            },
        );
        assignments.insert(
            "contratante".into(),
            PartyAssignment {
                party: Some(maria()),
                qualification: Some(pf_template()),
            },
        );
        assignments.insert(
            "testemunha".into(),
            PartyAssignment {
                party: Some(maria()),
                qualification: None,
            },
        );

        let out = render_qualifications(&roles, &assignments, &VariableValues::new());
        let blocks: Vec<&str> = out.split('\n').collect();
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].contains("Maria Souza"));
        assert!(blocks[1].contains("ACME Ltda"));
    }

    #[test]
    fn nothing_assigned_renders_nothing() {
        let roles = vec!["contratante".to_string()];
        let mut assignments = PartyAssignments::new();
        assignments.insert("contratante".into(), PartyAssignment::default());
        assert_eq!(
            render_qualifications(&roles, &assignments, &VariableValues::new()),
            ""
        );
    }
}
