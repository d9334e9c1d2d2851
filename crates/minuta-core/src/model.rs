//! Reference data and draft records exchanged with the draft store.
//!
//! Everything here is a plain serde value. Wire names are camelCase; the
//! draft status travels as `"DRAFT" | "REVIEW" | "FINAL"`.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type ContractTypeId = u64;
pub type EntityId = u64;
pub type TemplateId = u64;
pub type DraftId = u64;
pub type AttachmentId = u64;

/// Placeholder name → value, for document-level variables and any field a
/// clause or qualification template references that no entity supplies.
pub type VariableValues = BTreeMap<String, String>;

/// Role name → party/qualification pair.
///
/// Keys are exactly the roles declared by the selected [`ContractType`].
/// Rendering order comes from the contract type, never from this map.
pub type PartyAssignments = BTreeMap<String, PartyAssignment>;

/// A kind of contract: which roles must be filled and which clauses it starts with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractType {
    pub id: ContractTypeId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub required_roles: Vec<String>,
    #[serde(default)]
    pub default_clauses: Vec<Clause>,
}

/// A registered party, individual or organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub is_organization: bool,
    #[serde(default)]
    pub cpf: Option<String>,
    #[serde(default)]
    pub rg: Option<String>,
    #[serde(default)]
    pub cnpj: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    /// Open-ended attributes (nationality, profession, marital status...).
    #[serde(default)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// How a party is formally introduced in a contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualificationTemplate {
    pub id: TemplateId,
    pub name: String,
    #[serde(default)]
    pub is_organization: bool,
    pub html: String,
    /// Declared placeholder names. Stored either bare (`cpf`) or braced (`{{cpf}}`).
    #[serde(default)]
    pub required_variables: Vec<String>,
}

impl QualificationTemplate {
    /// Declared placeholder names with any surrounding braces removed.
    pub fn declared_placeholders(&self) -> impl Iterator<Item = &str> {
        self.required_variables.iter().filter_map(|raw| {
            let name = raw
                .trim()
                .trim_start_matches("{{")
                .trim_end_matches("}}")
                .trim();
            (!name.is_empty()).then_some(name)
        })
    }
}

/// Clause identity: numeric for library clauses, string-tagged for ad hoc ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClauseId {
    Library(u64),
    Custom(String),
}

impl ClauseId {
    /// A fresh id for a clause written in the editor rather than taken from the library.
    pub fn custom() -> Self {
        Self::Custom(format!("custom_{}", uuid::Uuid::new_v4().simple()))
    }
}

impl fmt::Display for ClauseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Library(id) => write!(f, "{id}"),
            Self::Custom(tag) => f.write_str(tag),
        }
    }
}

/// One numbered section of contract body text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clause {
    pub id: ClauseId,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub requires_attachment: bool,
    #[serde(default)]
    pub attachment_id: Option<AttachmentId>,
}

impl Clause {
    /// An ad hoc clause with a generated id.
    pub fn custom(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: ClauseId::custom(),
            title: title.into(),
            body: body.into(),
            requires_attachment: false,
            attachment_id: None,
        }
    }
}

/// The party and qualification template bound to one role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartyAssignment {
    pub party: Option<Entity>,
    pub qualification: Option<QualificationTemplate>,
}

impl PartyAssignment {
    pub fn is_complete(&self) -> bool {
        self.party.is_some() && self.qualification.is_some()
    }
}

/// Lifecycle status of a persisted draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DraftStatus {
    Draft,
    Review,
    Final,
}

impl DraftStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Review => "REVIEW",
            Self::Final => "FINAL",
        }
    }

    /// Whether `self -> next` is one of the four permitted transitions.
    pub fn can_transition_to(self, next: DraftStatus) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::Review)
                | (Self::Review, Self::Final)
                | (Self::Review, Self::Draft)
                | (Self::Final, Self::Draft)
        )
    }

    pub fn allows_editing(self) -> bool {
        self == Self::Draft
    }
}

impl fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DraftStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DRAFT" => Ok(Self::Draft),
            "REVIEW" => Ok(Self::Review),
            "FINAL" => Ok(Self::Final),
            other => Err(format!("unknown draft status: {other}")),
        }
    }
}

/// Body sent to create or update a draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftPayload {
    pub title: String,
    pub contract_type_id: ContractTypeId,
    pub party_assignments: PartyAssignments,
    pub variable_values: VariableValues,
    pub clauses: Vec<Clause>,
    pub status: DraftStatus,
}

/// A draft as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftRecord {
    pub id: DraftId,
    #[serde(default)]
    pub title: String,
    /// `None` when the contract type was deleted after the draft was saved.
    pub contract_type_id: Option<ContractTypeId>,
    #[serde(default)]
    pub party_assignments: PartyAssignments,
    #[serde(default)]
    pub variable_values: VariableValues,
    #[serde(default)]
    pub clauses: Vec<Clause>,
    pub status: DraftStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// One line of the append-only history the backend keeps per draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub event_description: String,
}

/// A file uploaded against a draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: AttachmentId,
    pub draft_id: DraftId,
    pub filename: String,
    /// Where the stored file can be fetched from.
    pub url: String,
}
