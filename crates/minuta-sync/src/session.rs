//! One user's editing session against a [`DraftStore`].
//!
//! The session owns the open [`Draft`] and never changes it until the store
//! has answered successfully. Failures are queued as error [`Notice`]s and
//! returned; the session stays usable after any of them.

use std::collections::VecDeque;
use std::path::Path;

use minuta_core::document::{self, DocumentLayout};
use minuta_core::format::validate_entity;
use minuta_core::markup;
use minuta_core::model::{AttachmentId, ContractTypeId, EntityId, TemplateId};
use minuta_core::{
    Appended, Attachment, AttachmentRequested, Clause, ClauseId, ContractType, Draft, DraftError,
    DraftId, DraftStatus, Entity, HistoryEntry, Notice, QualificationTemplate,
};
use tracing::{error, info, warn};

use crate::{DraftStore, SyncError};

/// File types accepted by [`EditorSession::import_document`].
pub const IMPORT_EXTENSIONS: &[&str] = &["docx", "txt"];

/// Reference data every draft is built from.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub contract_types: Vec<ContractType>,
    pub qualification_templates: Vec<QualificationTemplate>,
    pub entities: Vec<Entity>,
    pub clause_library: Vec<Clause>,
}

impl Catalog {
    /// Fetch all four collections concurrently. Any failure fails the whole load.
    pub async fn load<S: DraftStore + ?Sized>(store: &S) -> Result<Self, SyncError> {
        let (contract_types, qualification_templates, entities, clause_library) =
            futures::try_join!(
                store.contract_types(),
                store.qualification_templates(),
                store.entities(),
                store.clause_library(),
            )?;
        info!(
            contract_types = contract_types.len(),
            templates = qualification_templates.len(),
            entities = entities.len(),
            clauses = clause_library.len(),
            "catalog loaded"
        );
        Ok(Self {
            contract_types,
            qualification_templates,
            entities,
            clause_library,
        })
    }

    pub fn contract_type(&self, id: ContractTypeId) -> Option<&ContractType> {
        self.contract_types.iter().find(|ct| ct.id == id)
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn qualification_template(&self, id: TemplateId) -> Option<&QualificationTemplate> {
        self.qualification_templates.iter().find(|t| t.id == id)
    }

    pub fn library_clause(&self, id: u64) -> Option<&Clause> {
        self.clause_library
            .iter()
            .find(|c| c.id == ClauseId::Library(id))
    }
}

fn is_importable(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMPORT_EXTENSIONS.iter().any(|ok| ext.eq_ignore_ascii_case(ok)))
}

pub struct EditorSession<S> {
    store: S,
    catalog: Catalog,
    draft: Option<Draft>,
    notices: VecDeque<Notice>,
    attachment_requests: VecDeque<AttachmentRequested>,
}

impl<S: DraftStore> EditorSession<S> {
    /// Load the catalog. Without it there is nothing to draft from, so a
    /// failure here creates no session.
    pub async fn open(store: S) -> Result<Self, SyncError> {
        let catalog = Catalog::load(&store).await.inspect_err(|e| {
            error!(error = %e, "reference data unavailable");
        })?;
        Ok(Self {
            store,
            catalog,
            draft: None,
            notices: VecDeque::new(),
            attachment_requests: VecDeque::new(),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn draft(&self) -> Option<&Draft> {
        self.draft.as_ref()
    }

    /// Persistent banner while the open draft is locked.
    pub fn lock_banner(&self) -> Option<String> {
        self.draft.as_ref().and_then(Draft::lock_banner)
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    pub fn drain_attachment_requests(&mut self) -> Vec<AttachmentRequested> {
        self.attachment_requests.drain(..).collect()
    }

    fn notify(&mut self, notice: Notice) {
        self.notices.push_back(notice);
    }

    /// Queue `err` as an error notice and hand it back.
    fn fail(&mut self, err: SyncError) -> SyncError {
        error!(error = %err, "operation failed");
        self.notify(Notice::error(err.to_string()));
        err
    }

    fn require_draft(&self) -> Result<&Draft, DraftError> {
        self.draft.as_ref().ok_or(DraftError::NoDraft)
    }

    fn require_draft_mut(&mut self) -> Result<&mut Draft, DraftError> {
        self.draft.as_mut().ok_or(DraftError::NoDraft)
    }

    fn require_id(&self) -> Result<DraftId, DraftError> {
        self.require_draft()?.id().ok_or(DraftError::NotPersisted)
    }

    // ── Lifecycle ──

    /// Begin a new unsaved draft of the given contract type.
    pub fn start(&mut self, contract_type_id: ContractTypeId) -> Result<&Draft, SyncError> {
        let Some(contract_type) = self.catalog.contract_type(contract_type_id).cloned() else {
            return Err(self.fail(DraftError::UnknownContractType(contract_type_id).into()));
        };
        info!(contract_type = contract_type_id, "new draft started");
        Ok(&*self.draft.insert(Draft::new(contract_type)))
    }

    /// Open a stored draft for editing. On failure the current draft is kept.
    pub async fn load_draft(&mut self, id: DraftId) -> Result<&Draft, SyncError> {
        let restored = match self.store.fetch_draft(id).await {
            Ok(record) => {
                Draft::restore(record, &self.catalog.contract_types).map_err(SyncError::from)
            }
            Err(e) => Err(e),
        };
        match restored {
            Ok(draft) => {
                info!(draft = id, status = ?draft.status(), "draft loaded");
                Ok(&*self.draft.insert(draft))
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Create or update the open draft, depending on whether it has an id yet.
    pub async fn save(&mut self) -> Result<DraftId, SyncError> {
        let draft = self.require_draft()?;
        let payload = draft.payload();
        let result = match draft.id() {
            None => self.store.create_draft(&payload).await,
            Some(id) => self.store.update_draft(id, &payload).await,
        };
        let record = result.map_err(|e| self.fail(e))?;
        let id = record.id;
        let draft = self.require_draft_mut()?;
        if !draft.apply_record(record) {
            return Err(self.fail(SyncError::NotFound { what: "draft", id }));
        }
        self.notify(Notice::info("Draft saved"));
        Ok(id)
    }

    /// Ask the store to move the open draft to `next`.
    pub async fn transition(&mut self, next: DraftStatus) -> Result<DraftStatus, SyncError> {
        let id = match self.require_draft().and_then(|d| d.check_transition(next)) {
            Ok(id) => id,
            Err(e) => return Err(self.fail(e.into())),
        };
        let record = self
            .store
            .update_status(id, next)
            .await
            .map_err(|e| self.fail(e))?;
        let status = record.status;
        let draft = self.require_draft_mut()?;
        if !draft.apply_record(record) {
            return Err(self.fail(SyncError::NotFound { what: "draft", id }));
        }
        info!(draft = id, status = %status, "status changed");
        self.notify(Notice::info(format!("Status changed to {status}")));
        Ok(status)
    }

    pub async fn submit_for_review(&mut self) -> Result<DraftStatus, SyncError> {
        self.transition(DraftStatus::Review).await
    }

    pub async fn approve(&mut self) -> Result<DraftStatus, SyncError> {
        self.transition(DraftStatus::Final).await
    }

    pub async fn revert_to_draft(&mut self) -> Result<DraftStatus, SyncError> {
        self.transition(DraftStatus::Draft).await
    }

    pub async fn history(&mut self) -> Result<Vec<HistoryEntry>, SyncError> {
        let id = self.require_id()?;
        self.store.history(id).await.map_err(|e| self.fail(e))
    }

    // ── Attachments ──

    pub async fn attachments(&mut self) -> Result<Vec<Attachment>, SyncError> {
        let id = self.require_id()?;
        self.store.attachments(id).await.map_err(|e| self.fail(e))
    }

    /// Upload a file against the saved draft. Allowed in every status.
    pub async fn upload_attachment(
        &mut self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<Attachment, SyncError> {
        let id = self.require_id()?;
        let attachment = self
            .store
            .upload_attachment(id, filename, bytes)
            .await
            .map_err(|e| self.fail(e))?;
        self.notify(Notice::info(format!("Uploaded {}", attachment.filename)));
        Ok(attachment)
    }

    /// Linking changes clause content, so it is refused on a locked draft
    /// or a missing clause before the store is asked for anything.
    fn check_linkable(&self, index: usize) -> Result<(), DraftError> {
        let draft = self.require_draft()?;
        if let Some(status) = draft.status().filter(|s| !s.allows_editing()) {
            warn!(status = %status, "attachment link rejected while locked");
            return Err(DraftError::EditingLocked { status });
        }
        let len = draft.state().clauses.len();
        if index >= len {
            return Err(DraftError::ClauseOutOfRange { index, len });
        }
        Ok(())
    }

    /// Upload a file and link it to the clause at `index`.
    pub async fn attach_to_clause(
        &mut self,
        index: usize,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<Attachment, SyncError> {
        self.check_linkable(index)?;
        let attachment = self.upload_attachment(filename, bytes).await?;
        self.require_draft_mut()?.link_attachment(index, &attachment)?;
        Ok(attachment)
    }

    /// Link a file already uploaded against this draft to the clause at `index`.
    pub async fn link_existing(
        &mut self,
        index: usize,
        attachment_id: AttachmentId,
    ) -> Result<Attachment, SyncError> {
        self.check_linkable(index)?;
        let id = self.require_id()?;
        let uploaded = self.store.attachments(id).await.map_err(|e| self.fail(e))?;
        let Some(attachment) = uploaded.into_iter().find(|a| a.id == attachment_id) else {
            let missing = SyncError::NotFound {
                what: "attachment",
                id: attachment_id,
            };
            return Err(self.fail(missing));
        };
        self.require_draft_mut()?.link_attachment(index, &attachment)?;
        info!(draft = id, attachment = attachment_id, index, "attachment linked");
        Ok(attachment)
    }

    // ── Output ──

    /// Rendered HTML of the open draft.
    pub fn preview(&self) -> Result<String, DraftError> {
        let draft = self.require_draft()?;
        Ok(draft.render(&DocumentLayout::for_state(draft.state())))
    }

    /// Variables the form still needs a value for.
    pub fn pending_variables(&self) -> Result<Vec<String>, DraftError> {
        let state = self.require_draft()?.state();
        Ok(document::pending_variables(state, &DocumentLayout::for_state(state)))
    }

    /// Readable text of the preview, for the clipboard.
    pub fn copy_text(&mut self) -> Result<String, DraftError> {
        let text = markup::plain_text(&self.preview()?);
        self.notify(Notice::info("Contract text copied"));
        Ok(text)
    }

    pub async fn export_docx(&mut self) -> Result<Vec<u8>, SyncError> {
        let html = self.preview()?;
        self.store.export_docx(&html).await.map_err(|e| self.fail(e))
    }

    /// Replace every clause with the paragraphs of a .docx or .txt document.
    ///
    /// Unsupported files, extraction failures and documents with no text
    /// leave the clauses untouched.
    pub async fn import_document(
        &mut self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<usize, SyncError> {
        let draft = self.require_draft()?;
        if let Some(status) = draft.status().filter(|s| !s.allows_editing()) {
            warn!(status = %status, "import rejected while locked");
            return Err(DraftError::EditingLocked { status }.into());
        }
        if !is_importable(filename) {
            return Err(self.fail(SyncError::UnsupportedImport(filename.to_string())));
        }
        let text = self
            .store
            .extract_text(filename, bytes)
            .await
            .map_err(|e| self.fail(e))?;
        let paragraphs = markup::paragraphs_from_text(&text);
        let imported = match self.require_draft_mut()?.import_paragraphs(paragraphs) {
            Ok(count) => count,
            Err(e) => return Err(self.fail(e.into())),
        };
        info!(filename, clauses = imported, "document imported");
        self.notify(Notice::info(format!("Imported {imported} clauses from {filename}")));
        Ok(imported)
    }

    // ── Edits ──

    pub fn select_contract_type(
        &mut self,
        contract_type_id: ContractTypeId,
    ) -> Result<(), DraftError> {
        let contract_type = self
            .catalog
            .contract_type(contract_type_id)
            .cloned()
            .ok_or(DraftError::UnknownContractType(contract_type_id))?;
        self.require_draft_mut()?.select_contract_type(contract_type)
    }

    /// Bind an entity to a role. Invalid stored IDs are reported, not refused.
    pub fn assign_party(&mut self, role: &str, entity: Entity) -> Result<(), DraftError> {
        let problems = validate_entity(&entity);
        let name = entity.name.clone();
        self.require_draft_mut()?.assign_party(role, entity)?;
        for problem in problems {
            warn!(entity = %name, problem = %problem, "entity has invalid identifiers");
            self.notify(Notice::info(format!("Warning: {name}: {problem}")));
        }
        Ok(())
    }

    pub fn assign_qualification(
        &mut self,
        role: &str,
        qualification: QualificationTemplate,
    ) -> Result<(), DraftError> {
        self.require_draft_mut()?.assign_qualification(role, qualification)
    }

    pub fn set_variable(&mut self, name: &str, value: &str) -> Result<String, DraftError> {
        self.require_draft_mut()?.set_variable(name, value)
    }

    /// Append a clause. Clauses that need a file queue an [`AttachmentRequested`].
    pub fn add_clause(&mut self, clause: Clause) -> Result<Appended, DraftError> {
        let appended = self.require_draft_mut()?.add_clause(clause)?;
        if appended.needs_attachment {
            self.attachment_requests.push_back(AttachmentRequested {
                index: appended.index,
            });
        }
        Ok(appended)
    }

    pub fn move_clause(&mut self, from: usize, to: usize) -> Result<bool, DraftError> {
        self.require_draft_mut()?.move_clause(from, to)
    }

    pub fn edit_clause(
        &mut self,
        index: usize,
        title: String,
        body: String,
    ) -> Result<(), DraftError> {
        self.require_draft_mut()?.edit_clause(index, title, body)
    }

    pub fn remove_clause(&mut self, index: usize) -> Result<Clause, DraftError> {
        self.require_draft_mut()?.remove_clause(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use minuta_core::NoticeLevel;

    fn service_contract() -> ContractType {
        ContractType {
            id: 1,
            name: "Prestação de Serviços".into(),
            description: None,
            required_roles: vec!["contratante".into(), "contratada".into()],
            default_clauses: vec![Clause {
                id: ClauseId::Library(10),
                title: "CLÁUSULA 1ª - DO OBJETO".into(),
                body: "<p>{{objeto}}</p>".into(),
                requires_attachment: false,
                attachment_id: None,
            }],
        }
    }

    fn person(id: u64, name: &str) -> Entity {
        Entity {
            id,
            name: name.into(),
            is_organization: false,
            cpf: Some("529.982.247-25".into()),
            rg: None,
            cnpj: None,
            address: Some("Rua A, 1".into()),
            extra: Default::default(),
        }
    }

    fn individual() -> QualificationTemplate {
        QualificationTemplate {
            id: 1,
            name: "Pessoa física".into(),
            is_organization: false,
            html: "<p>{{nome_parte}}, CPF {{cpf}}, residente em {{endereco}}</p>".into(),
            required_variables: vec!["nome_parte".into(), "cpf".into(), "endereco".into()],
        }
    }

    fn store() -> MemoryStore {
        let mut plan = Clause::custom("Da Planta", "<p>Conforme planta anexa.</p>");
        plan.requires_attachment = true;
        MemoryStore::new(vec![service_contract()])
            .with_templates(vec![individual()])
            .with_entities(vec![person(1, "Ana Lima"), person(2, "Beto Souza")])
            .with_clauses(vec![plan])
    }

    async fn session() -> EditorSession<MemoryStore> {
        EditorSession::open(store()).await.unwrap()
    }

    async fn saved_session() -> EditorSession<MemoryStore> {
        let mut session = session().await;
        session.start(1).unwrap();
        session.set_variable("titulo_contrato", "Acordo X").unwrap();
        session.save().await.unwrap();
        session
    }

    #[tokio::test]
    async fn open_fails_without_reference_data() {
        let store = store();
        store.set_offline(true);
        assert!(EditorSession::open(store).await.is_err());
    }

    #[tokio::test]
    async fn completeness_tracks_both_roles() {
        let mut session = session().await;
        session.start(1).unwrap();
        let ana = session.catalog().entity(1).cloned().unwrap();
        let beto = session.catalog().entity(2).cloned().unwrap();

        session.assign_party("contratante", ana).unwrap();
        session.assign_qualification("contratante", individual()).unwrap();
        assert!(!session.draft().unwrap().is_complete());

        session.assign_party("contratada", beto).unwrap();
        session.assign_qualification("contratada", individual()).unwrap();
        assert!(session.draft().unwrap().is_complete());
        assert!(session.drain_notices().is_empty());
    }

    #[tokio::test]
    async fn save_then_review_locks_content() {
        let mut session = saved_session().await;
        let draft = session.draft().unwrap();
        assert_eq!(draft.id(), Some(1));
        assert_eq!(draft.status(), Some(DraftStatus::Draft));
        assert_eq!(draft.payload().title, "Acordo X");

        assert_eq!(session.submit_for_review().await.unwrap(), DraftStatus::Review);
        let before = session.draft().cloned().unwrap();
        let err = session.add_clause(Clause::custom("Extra", "<p>x</p>")).unwrap_err();
        assert!(err.is_blocked_edit());
        assert_eq!(session.draft().unwrap(), &before);
        assert!(session.lock_banner().unwrap().contains("REVIEW"));
    }

    #[tokio::test]
    async fn transitions_are_recorded_in_history() {
        let mut session = saved_session().await;
        session.submit_for_review().await.unwrap();
        session.approve().await.unwrap();
        session.revert_to_draft().await.unwrap();

        let history = session.history().await.unwrap();
        let events: Vec<&str> = history.iter().map(|h| h.event_description.as_str()).collect();
        assert_eq!(
            events,
            vec![
                "Status changed from FINAL to DRAFT",
                "Status changed from REVIEW to FINAL",
                "Status changed from DRAFT to REVIEW",
                "Draft created",
            ]
        );
        assert!(session.lock_banner().is_none());
    }

    #[tokio::test]
    async fn invalid_transition_is_reported_without_calling_store() {
        let mut session = saved_session().await;
        session.drain_notices();
        let err = session.approve().await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Draft(DraftError::InvalidTransition { .. })
        ));
        let notices = session.drain_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert_eq!(session.history().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unsaved_draft_cannot_transition() {
        let mut session = session().await;
        session.start(1).unwrap();
        let err = session.submit_for_review().await.unwrap_err();
        assert!(matches!(err, SyncError::Draft(DraftError::NotPersisted)));
    }

    #[tokio::test]
    async fn failed_save_leaves_state_unchanged() {
        let mut session = saved_session().await;
        session.set_variable("objeto", "Consultoria").unwrap();
        let before = session.draft().cloned().unwrap();
        session.drain_notices();

        session.store().set_offline(true);
        assert!(session.save().await.is_err());
        assert!(session.submit_for_review().await.is_err());
        assert_eq!(session.draft().unwrap(), &before);
        let notices = session.drain_notices();
        assert!(notices.iter().all(Notice::is_error));
        assert_eq!(notices.len(), 2);

        session.store().set_offline(false);
        session.save().await.unwrap();
        let stored = session.store().fetch_draft(1).await.unwrap();
        assert_eq!(stored.variable_values["objeto"], "Consultoria");
    }

    #[tokio::test]
    async fn load_draft_restores_status_and_content() {
        let mut session = saved_session().await;
        session.set_variable("objeto", "Consultoria").unwrap();
        session.save().await.unwrap();
        session.submit_for_review().await.unwrap();

        let mut other = EditorSession::open(store()).await.unwrap();
        assert!(other.load_draft(1).await.unwrap_err().is_not_found());
        assert!(other.draft().is_none());

        session.load_draft(1).await.unwrap();
        let draft = session.draft().unwrap();
        assert_eq!(draft.status(), Some(DraftStatus::Review));
        assert_eq!(draft.state().values["objeto"], "Consultoria");
    }

    #[tokio::test]
    async fn load_with_missing_contract_type_keeps_current_draft() {
        let mut session = saved_session().await;
        session.catalog.contract_types.clear();
        let before = session.draft().cloned();
        let err = session.load_draft(1).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Draft(DraftError::UnknownContractType(1))
        ));
        assert_eq!(session.draft().cloned(), before);
    }

    #[tokio::test]
    async fn clause_needing_file_requests_attachment() {
        let mut session = saved_session().await;
        let plan = session.catalog().clause_library[0].clone();
        let appended = session.add_clause(plan).unwrap();
        assert_eq!(appended.index, 1);
        assert_eq!(
            session.drain_attachment_requests(),
            vec![AttachmentRequested { index: 1 }]
        );

        let attachment = session
            .attach_to_clause(1, "planta.pdf", b"%PDF".to_vec())
            .await
            .unwrap();
        let clause = session.draft().unwrap().state().clauses.get(1).cloned().unwrap();
        assert_eq!(clause.attachment_id, Some(attachment.id));
        assert!(clause.body.contains("planta.pdf"));
        assert_eq!(session.attachments().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn existing_attachment_links_without_new_upload() {
        let mut session = saved_session().await;
        let plan = session.catalog().clause_library[0].clone();
        session.add_clause(plan).unwrap();
        let uploaded = session
            .upload_attachment("planta.pdf", b"%PDF".to_vec())
            .await
            .unwrap();

        session.link_existing(0, uploaded.id).await.unwrap();
        session.link_existing(1, uploaded.id).await.unwrap();

        let clauses = &session.draft().unwrap().state().clauses;
        assert!(clauses.iter().all(|c| c.attachment_id == Some(uploaded.id)));
        assert_eq!(session.attachments().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_attachment_is_reported() {
        let mut session = saved_session().await;
        session.drain_notices();
        let before = session.draft().cloned();

        let err = session.link_existing(0, 42).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(session.draft().cloned(), before);
        let notices = session.drain_notices();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].is_error());
    }

    #[tokio::test]
    async fn upload_allowed_but_link_refused_when_locked() {
        let mut session = saved_session().await;
        session.submit_for_review().await.unwrap();
        session.upload_attachment("anexo.pdf", b"%PDF".to_vec()).await.unwrap();

        let err = session
            .attach_to_clause(0, "outro.pdf", b"%PDF".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SyncError::Draft(DraftError::EditingLocked { .. })
        ));
        assert_eq!(session.attachments().await.unwrap().len(), 1);

        let uploaded = session.attachments().await.unwrap().remove(0);
        let err = session.link_existing(0, uploaded.id).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Draft(DraftError::EditingLocked { .. })
        ));
    }

    #[tokio::test]
    async fn import_replaces_clauses_from_text() {
        let mut session = saved_session().await;
        let count = session
            .import_document("contrato.txt", b"Intro text.\n\nSecond clause text.".to_vec())
            .await
            .unwrap();
        assert_eq!(count, 2);

        let clauses = &session.draft().unwrap().state().clauses;
        let titles: Vec<&str> = clauses.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["CLÁUSULA 1ª", "CLÁUSULA 2ª"]);
        assert_eq!(clauses.get(0).unwrap().body, "<p>Intro text.</p>");
        assert_eq!(clauses.get(1).unwrap().body, "<p>Second clause text.</p>");
    }

    #[tokio::test]
    async fn rejected_imports_leave_clauses() {
        let mut session = saved_session().await;
        let before = session.draft().unwrap().state().clauses.clone();

        let err = session.import_document("contrato.pdf", vec![1, 2]).await.unwrap_err();
        assert!(matches!(err, SyncError::UnsupportedImport(_)));

        let err = session.import_document("vazio.txt", b"\n  \n".to_vec()).await.unwrap_err();
        assert!(matches!(err, SyncError::Draft(DraftError::EmptyImport)));

        let err = session.import_document("a.docx", vec![0x50, 0x4b]).await.unwrap_err();
        assert!(matches!(err, SyncError::Extraction(_)));

        assert_eq!(session.draft().unwrap().state().clauses, before);
        assert_eq!(session.drain_notices().iter().filter(|n| n.is_error()).count(), 3);
    }

    #[tokio::test]
    async fn preview_and_copy_text() {
        let mut session = saved_session().await;
        session.set_variable("objeto", "Consultoria").unwrap();
        let html = session.preview().unwrap();
        assert!(html.contains("Acordo X"));
        assert!(html.contains("<p>Consultoria</p>"));

        let text = session.copy_text().unwrap();
        assert!(text.starts_with("Acordo X"));
        assert!(!text.contains('<'));

        let exported = session.export_docx().await.unwrap();
        assert_eq!(exported, html.into_bytes());
    }

    #[tokio::test]
    async fn pending_variables_follow_entities() {
        let mut session = session().await;
        session.start(1).unwrap();
        assert_eq!(session.pending_variables().unwrap(), vec!["objeto"]);
    }

    #[tokio::test]
    async fn invalid_entity_ids_warn_but_assign() {
        let mut session = session().await;
        session.start(1).unwrap();
        let mut entity = person(3, "Caio");
        entity.cpf = Some("111.111.111-11".into());
        session.assign_party("contratante", entity).unwrap();

        let notices = session.drain_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Info);
        assert!(notices[0].message.starts_with("Warning: Caio"));
        let state = session.draft().unwrap().state();
        assert!(state.assignments["contratante"].party.is_some());
    }

    #[test]
    fn import_extensions_are_case_insensitive() {
        assert!(is_importable("a.DOCX"));
        assert!(is_importable("b.txt"));
        assert!(!is_importable("c.pdf"));
        assert!(!is_importable("docx"));
    }
}
