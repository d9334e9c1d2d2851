//! The draft being edited and its lifecycle.
//!
//! A draft is either [`Draft::Unsaved`] (no identity yet) or
//! [`Draft::Persisted`] with a store-assigned id and a status. Content edits
//! are allowed only while unsaved or in `DRAFT`; in `REVIEW` and `FINAL` every
//! content operation returns [`DraftError::EditingLocked`] before touching
//! anything.
//!
//! Status changes go through the store: [`Draft::check_transition`] validates
//! the request, and the draft only changes when the store's response is
//! handed back through [`Draft::apply_record`].

use tracing::{debug, warn};

use crate::clauses::{Appended, ClauseSequence};
use crate::document::{self, DocumentLayout};
use crate::error::DraftError;
use crate::format::mask_for_variable;
use crate::model::{
    Attachment, Clause, ContractType, DraftId, DraftPayload, DraftRecord, DraftStatus, Entity,
    PartyAssignment, PartyAssignments, QualificationTemplate, VariableValues,
};
use crate::template::DOCUMENT_TITLE;

/// Everything the user edits: the chosen contract type, parties, variables and clauses.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkingState {
    pub contract_type: ContractType,
    pub assignments: PartyAssignments,
    pub values: VariableValues,
    pub clauses: ClauseSequence,
}

impl WorkingState {
    /// One empty assignment per declared role, clauses copied from the type's defaults.
    pub fn new(contract_type: ContractType) -> Self {
        let assignments = contract_type
            .required_roles
            .iter()
            .map(|role| (role.clone(), PartyAssignment::default()))
            .collect();
        let clauses = ClauseSequence::from(contract_type.default_clauses.clone());
        Self {
            contract_type,
            assignments,
            values: VariableValues::new(),
            clauses,
        }
    }

    /// True when every declared role has both a party and a qualification.
    pub fn is_complete(&self) -> bool {
        self.contract_type
            .required_roles
            .iter()
            .all(|role| self.assignments.get(role).is_some_and(PartyAssignment::is_complete))
    }

    /// The document title variable, or the contract type name when it is blank.
    pub fn title(&self) -> String {
        self.values
            .get(DOCUMENT_TITLE)
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .unwrap_or(&self.contract_type.name)
            .to_string()
    }

    fn assignment_mut(&mut self, role: &str) -> Result<&mut PartyAssignment, DraftError> {
        self.assignments
            .get_mut(role)
            .ok_or_else(|| DraftError::UnknownRole(role.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Draft {
    Unsaved(WorkingState),
    Persisted {
        id: DraftId,
        status: DraftStatus,
        state: WorkingState,
    },
}

impl Draft {
    pub fn new(contract_type: ContractType) -> Self {
        Self::Unsaved(WorkingState::new(contract_type))
    }

    /// Rebuild a draft from a stored record.
    ///
    /// Fails without building anything when the record's contract type is gone.
    /// Assignments are realigned to the contract type's declared roles.
    pub fn restore(
        record: DraftRecord,
        contract_types: &[ContractType],
    ) -> Result<Self, DraftError> {
        let type_id = record
            .contract_type_id
            .ok_or(DraftError::MissingContractType(record.id))?;
        let contract_type = contract_types
            .iter()
            .find(|ct| ct.id == type_id)
            .cloned()
            .ok_or(DraftError::UnknownContractType(type_id))?;

        let state = state_from_record(
            contract_type,
            record.party_assignments,
            record.variable_values,
            record.clauses,
        );
        Ok(Self::Persisted {
            id: record.id,
            status: record.status,
            state,
        })
    }

    pub fn id(&self) -> Option<DraftId> {
        match self {
            Self::Unsaved(_) => None,
            Self::Persisted { id, .. } => Some(*id),
        }
    }

    /// `None` for a draft that was never saved.
    pub fn status(&self) -> Option<DraftStatus> {
        match self {
            Self::Unsaved(_) => None,
            Self::Persisted { status, .. } => Some(*status),
        }
    }

    pub fn state(&self) -> &WorkingState {
        match self {
            Self::Unsaved(state) | Self::Persisted { state, .. } => state,
        }
    }

    pub fn is_editable(&self) -> bool {
        self.status().is_none_or(DraftStatus::allows_editing)
    }

    /// Persistent explanation shown while content is locked.
    pub fn lock_banner(&self) -> Option<String> {
        match self.status() {
            Some(status) if !status.allows_editing() => Some(format!(
                "Editing is locked because the contract is in {status}. \
                 Revert it to DRAFT to make changes."
            )),
            _ => None,
        }
    }

    /// The working state, if editing is allowed.
    fn editable(&mut self) -> Result<&mut WorkingState, DraftError> {
        match self {
            Self::Unsaved(state) => Ok(state),
            Self::Persisted { status, state, .. } if status.allows_editing() => Ok(state),
            Self::Persisted { status, .. } => {
                warn!(status = %status, "edit rejected while locked");
                Err(DraftError::EditingLocked { status: *status })
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state().is_complete()
    }

    // ── Content operations (status-gated) ──

    /// Switch contract type, discarding parties and clauses. Variables are kept.
    pub fn select_contract_type(&mut self, contract_type: ContractType) -> Result<(), DraftError> {
        let state = self.editable()?;
        debug!(contract_type = contract_type.id, "contract type selected");
        let values = std::mem::take(&mut state.values);
        *state = WorkingState::new(contract_type);
        state.values = values;
        Ok(())
    }

    pub fn assign_party(&mut self, role: &str, entity: Entity) -> Result<(), DraftError> {
        let assignment = self.editable()?.assignment_mut(role)?;
        debug!(role, entity = entity.id, "party assigned");
        assignment.party = Some(entity);
        Ok(())
    }

    pub fn assign_qualification(
        &mut self,
        role: &str,
        qualification: QualificationTemplate,
    ) -> Result<(), DraftError> {
        let assignment = self.editable()?.assignment_mut(role)?;
        debug!(role, template = qualification.id, "qualification assigned");
        assignment.qualification = Some(qualification);
        Ok(())
    }

    /// Set a document variable. ID-like names are masked; returns the stored value.
    pub fn set_variable(&mut self, name: &str, value: &str) -> Result<String, DraftError> {
        let state = self.editable()?;
        let stored = match mask_for_variable(name) {
            Some(kind) => kind.format(value),
            None => value.to_string(),
        };
        state.values.insert(name.to_string(), stored.clone());
        Ok(stored)
    }

    pub fn add_clause(&mut self, clause: Clause) -> Result<Appended, DraftError> {
        Ok(self.editable()?.clauses.append(clause))
    }

    pub fn move_clause(&mut self, from: usize, to: usize) -> Result<bool, DraftError> {
        Ok(self.editable()?.clauses.move_clause(from, to))
    }

    pub fn edit_clause(
        &mut self,
        index: usize,
        title: String,
        body: String,
    ) -> Result<(), DraftError> {
        self.editable()?.clauses.edit(index, title, body)
    }

    pub fn remove_clause(&mut self, index: usize) -> Result<Clause, DraftError> {
        self.editable()?.clauses.remove(index)
    }

    pub fn link_attachment(
        &mut self,
        index: usize,
        attachment: &Attachment,
    ) -> Result<(), DraftError> {
        self.editable()?.clauses.attach_file(index, attachment)
    }

    /// Replace every clause with one per non-blank imported paragraph.
    ///
    /// Content with no non-blank paragraph leaves the clauses untouched.
    pub fn import_paragraphs<I, S>(&mut self, paragraphs: I) -> Result<usize, DraftError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let state = self.editable()?;
        let imported = ClauseSequence::from_paragraphs(paragraphs);
        if imported.is_empty() {
            return Err(DraftError::EmptyImport);
        }
        let count = imported.len();
        state.clauses.replace_all(imported);
        Ok(count)
    }

    // ── Persistence ──

    /// Body to create or update this draft with. Status is carried through unchanged.
    pub fn payload(&self) -> DraftPayload {
        let state = self.state();
        DraftPayload {
            title: state.title(),
            contract_type_id: state.contract_type.id,
            party_assignments: state.assignments.clone(),
            variable_values: state.values.clone(),
            clauses: state.clauses.to_vec(),
            status: self.status().unwrap_or(DraftStatus::Draft),
        }
    }

    /// Validate a requested status change; returns the id to send it for.
    pub fn check_transition(&self, next: DraftStatus) -> Result<DraftId, DraftError> {
        match self {
            Self::Unsaved(_) => Err(DraftError::NotPersisted),
            Self::Persisted { id, status, .. } if status.can_transition_to(next) => Ok(*id),
            Self::Persisted { status, .. } => Err(DraftError::InvalidTransition {
                from: *status,
                to: next,
            }),
        }
    }

    /// Adopt a record returned by the store. The latest completed response wins.
    ///
    /// An unsaved draft takes the record's id. A persisted draft ignores records
    /// for any other id and returns `false`.
    pub fn apply_record(&mut self, record: DraftRecord) -> bool {
        if let Some(current) = self.id()
            && current != record.id
        {
            warn!(current, received = record.id, "ignoring response for another draft");
            return false;
        }

        let contract_type = self.state().contract_type.clone();
        let state = if record.contract_type_id == Some(contract_type.id) {
            state_from_record(
                contract_type,
                record.party_assignments,
                record.variable_values,
                record.clauses,
            )
        } else {
            warn!(draft = record.id, "stored contract type differs; keeping local content");
            self.state().clone()
        };

        debug!(draft = record.id, status = %record.status, "draft record applied");
        *self = Self::Persisted {
            id: record.id,
            status: record.status,
            state,
        };
        true
    }

    /// Rendered HTML preview.
    pub fn render(&self, layout: &DocumentLayout) -> String {
        document::render_document(self.state(), layout)
    }
}

fn state_from_record(
    contract_type: ContractType,
    mut stored: PartyAssignments,
    values: VariableValues,
    clauses: Vec<Clause>,
) -> WorkingState {
    let assignments: PartyAssignments = contract_type
        .required_roles
        .iter()
        .map(|role| (role.clone(), stored.remove(role).unwrap_or_default()))
        .collect();
    for role in stored.keys() {
        warn!(role = %role, "dropping assignment for undeclared role");
    }
    WorkingState {
        contract_type,
        assignments,
        values,
        clauses: ClauseSequence::from(clauses),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ClauseId;

    fn service_contract() -> ContractType {
        ContractType {
            id: 7,
            name: "Prestação de Serviços".into(),
            description: None,
            required_roles: vec!["contratante".into(), "contratada".into()],
            default_clauses: vec![Clause {
                id: ClauseId::Library(1),
                title: "CLÁUSULA 1ª - DO OBJETO".into(),
                body: "<p>{{objeto}}</p>".into(),
                requires_attachment: false,
                attachment_id: None,
            }],
        }
    }

    fn entity(id: u64, name: &str) -> Entity {
        Entity {
            id,
            name: name.into(),
            is_organization: false,
            cpf: None,
            rg: None,
            cnpj: None,
            address: None,
            extra: Default::default(),
        }
    }

    fn template() -> QualificationTemplate {
        QualificationTemplate {
            id: 1,
            name: "PF".into(),
            is_organization: false,
            html: "<p>{{nome_parte}}</p>".into(),
            required_variables: vec!["nome_parte".into()],
        }
    }

    fn record(id: DraftId, status: DraftStatus, draft: &Draft) -> DraftRecord {
        let payload = draft.payload();
        DraftRecord {
            id,
            title: payload.title,
            contract_type_id: Some(payload.contract_type_id),
            party_assignments: payload.party_assignments,
            variable_values: payload.variable_values,
            clauses: payload.clauses,
            status,
            created_at: None,
            updated_at: None,
        }
    }

    fn persisted(status: DraftStatus) -> Draft {
        let mut draft = Draft::new(service_contract());
        let rec = record(1, status, &draft);
        assert!(draft.apply_record(rec));
        draft
    }

    /// Run every content operation; each must be rejected.
    fn try_every_edit(draft: &mut Draft) -> Vec<Result<(), DraftError>> {
        let attachment = Attachment {
            id: 9,
            draft_id: 1,
            filename: "a.pdf".into(),
            url: "/a.pdf".into(),
        };
        vec![
            draft.set_variable("objeto", "Consultoria").map(drop),
            draft.assign_party("contratante", entity(1, "Ana")),
            draft.assign_qualification("contratante", template()),
            draft.add_clause(Clause::custom("Extra", "<p>x</p>")).map(drop),
            draft.move_clause(0, 1).map(drop),
            draft.edit_clause(0, "T".into(), "B".into()),
            draft.remove_clause(0).map(drop),
            draft.link_attachment(0, &attachment),
            draft.import_paragraphs(vec!["<p>Novo</p>".to_string()]).map(drop),
            draft.select_contract_type(service_contract()),
        ]
    }

    #[test]
    fn new_draft_has_one_empty_assignment_per_role() {
        let draft = Draft::new(service_contract());
        let state = draft.state();
        let roles: Vec<&String> = state.assignments.keys().collect();
        assert_eq!(roles, vec!["contratada", "contratante"]);
        assert!(state.assignments.values().all(|a| *a == PartyAssignment::default()));
        assert_eq!(state.clauses.len(), 1);
        assert!(draft.is_editable());
        assert!(draft.lock_banner().is_none());
    }

    #[test]
    fn completeness_requires_both_fields_for_every_role() {
        let mut draft = Draft::new(service_contract());
        assert!(!draft.is_complete());

        draft.assign_party("contratante", entity(1, "Ana")).unwrap();
        draft.assign_qualification("contratante", template()).unwrap();
        assert!(!draft.is_complete());

        draft.assign_party("contratada", entity(2, "Beto")).unwrap();
        assert!(!draft.is_complete());
        draft.assign_qualification("contratada", template()).unwrap();
        assert!(draft.is_complete());
    }

    #[test]
    fn unknown_role_is_rejected() {
        let mut draft = Draft::new(service_contract());
        assert_eq!(
            draft.assign_party("fiador", entity(1, "Ana")),
            Err(DraftError::UnknownRole("fiador".into()))
        );
    }

    #[test]
    fn set_variable_masks_id_fields() {
        let mut draft = Draft::new(service_contract());
        assert_eq!(draft.set_variable("cpf_fiador", "52998224725").unwrap(), "529.982.247-25");
        assert_eq!(draft.set_variable("objeto", "Consultoria").unwrap(), "Consultoria");
        assert_eq!(draft.state().values["cpf_fiador"], "529.982.247-25");
    }

    #[test]
    fn transitions_follow_table() {
        let (draft, review, fin) = (DraftStatus::Draft, DraftStatus::Review, DraftStatus::Final);
        assert_eq!(persisted(draft).check_transition(review), Ok(1));
        assert_eq!(persisted(review).check_transition(fin), Ok(1));
        assert_eq!(persisted(review).check_transition(draft), Ok(1));
        assert_eq!(persisted(fin).check_transition(draft), Ok(1));
        assert_eq!(
            persisted(draft).check_transition(fin),
            Err(DraftError::InvalidTransition { from: draft, to: fin })
        );
        assert_eq!(
            persisted(fin).check_transition(review),
            Err(DraftError::InvalidTransition { from: fin, to: review })
        );
    }

    #[test]
    fn unsaved_draft_cannot_transition() {
        let draft = Draft::new(service_contract());
        assert_eq!(
            draft.check_transition(DraftStatus::Review),
            Err(DraftError::NotPersisted)
        );
    }

    #[test]
    fn locked_statuses_leave_content_identical() {
        for status in [DraftStatus::Review, DraftStatus::Final] {
            let mut draft = persisted(status);
            let before = draft.clone();
            for result in try_every_edit(&mut draft) {
                assert_eq!(result, Err(DraftError::EditingLocked { status }));
            }
            assert_eq!(draft, before);
            assert!(draft.lock_banner().unwrap().contains(status.as_str()));
        }
    }

    #[test]
    fn draft_status_allows_every_edit() {
        let mut draft = persisted(DraftStatus::Draft);
        draft.add_clause(Clause::custom("Extra", "<p>x</p>")).unwrap();
        for result in try_every_edit(&mut draft) {
            assert!(result.is_ok(), "{result:?}");
        }
    }

    #[test]
    fn edit_clause_rewrites_title_and_body() {
        let mut draft = Draft::new(service_contract());
        draft
            .edit_clause(0, "CLÁUSULA 1ª - DO PRAZO".into(), "<p>12 meses</p>".into())
            .unwrap();
        let clause = draft.state().clauses.get(0).unwrap();
        assert_eq!(clause.title, "CLÁUSULA 1ª - DO PRAZO");
        assert_eq!(clause.body, "<p>12 meses</p>");
        assert_eq!(clause.id, ClauseId::Library(1));
    }

    #[test]
    fn clause_index_out_of_range() {
        let mut draft = Draft::new(service_contract());
        let before = draft.clone();
        let out_of_range = Err(DraftError::ClauseOutOfRange { index: 3, len: 1 });
        assert_eq!(draft.edit_clause(3, "T".into(), "B".into()), out_of_range);
        assert_eq!(draft.remove_clause(3).map(drop), out_of_range);
        assert_eq!(draft, before);

        let removed = draft.remove_clause(0).unwrap();
        assert_eq!(removed.id, ClauseId::Library(1));
        assert!(draft.state().clauses.is_empty());
    }

    #[test]
    fn empty_import_leaves_clauses() {
        let mut draft = Draft::new(service_contract());
        let before = draft.state().clauses.clone();
        assert_eq!(
            draft.import_paragraphs(vec!["<p> </p>".to_string()]),
            Err(DraftError::EmptyImport)
        );
        assert_eq!(draft.state().clauses, before);
    }

    #[test]
    fn payload_title_falls_back_to_contract_type() {
        let mut draft = Draft::new(service_contract());
        assert_eq!(draft.payload().title, "Prestação de Serviços");
        assert_eq!(draft.payload().status, DraftStatus::Draft);
        draft.set_variable(DOCUMENT_TITLE, "Acordo X").unwrap();
        assert_eq!(draft.payload().title, "Acordo X");
    }

    #[test]
    fn apply_record_ignores_other_drafts() {
        let mut draft = persisted(DraftStatus::Draft);
        let mut other = record(2, DraftStatus::Final, &draft);
        other.variable_values.insert("objeto".into(), "x".into());
        assert!(!draft.apply_record(other));
        assert_eq!(draft.id(), Some(1));
        assert_eq!(draft.status(), Some(DraftStatus::Draft));
    }

    #[test]
    fn apply_record_takes_latest_status() {
        let mut draft = persisted(DraftStatus::Draft);
        let rec = record(1, DraftStatus::Review, &draft);
        assert!(draft.apply_record(rec));
        assert_eq!(draft.status(), Some(DraftStatus::Review));
        assert!(!draft.is_editable());
    }

    #[test]
    fn restore_requires_known_contract_type() {
        let draft = persisted(DraftStatus::Draft);
        let mut rec = record(1, DraftStatus::Review, &draft);

        rec.contract_type_id = Some(99);
        assert_eq!(
            Draft::restore(rec.clone(), &[service_contract()]),
            Err(DraftError::UnknownContractType(99))
        );

        rec.contract_type_id = None;
        assert_eq!(
            Draft::restore(rec, &[service_contract()]),
            Err(DraftError::MissingContractType(1))
        );
    }

    #[test]
    fn restore_realigns_roles() {
        let draft = persisted(DraftStatus::Draft);
        let mut rec = record(5, DraftStatus::Final, &draft);
        rec.party_assignments.remove("contratada");
        rec.party_assignments.insert("antigo".into(), PartyAssignment::default());

        let restored = Draft::restore(rec, &[service_contract()]).unwrap();
        assert_eq!(restored.id(), Some(5));
        assert_eq!(restored.status(), Some(DraftStatus::Final));
        let roles: Vec<&String> = restored.state().assignments.keys().collect();
        assert_eq!(roles, vec!["contratada", "contratante"]);
    }

    #[test]
    fn selecting_a_new_type_discards_parties_and_clauses() {
        let mut draft = Draft::new(service_contract());
        draft.assign_party("contratante", entity(1, "Ana")).unwrap();
        draft.set_variable("objeto", "Consultoria").unwrap();

        let lease = ContractType {
            id: 8,
            name: "Locação".into(),
            description: None,
            required_roles: vec!["locador".into()],
            default_clauses: vec![],
        };
        draft.select_contract_type(lease).unwrap();
        let state = draft.state();
        assert_eq!(state.contract_type.id, 8);
        assert_eq!(state.assignments.len(), 1);
        assert!(state.assignments["locador"].party.is_none());
        assert!(state.clauses.is_empty());
        assert_eq!(state.values["objeto"], "Consultoria");
    }
}
