//! In-process draft store, seeded with reference data.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use minuta_core::model::AttachmentId;
use minuta_core::{
    Attachment, Clause, ContractType, DraftId, DraftPayload, DraftRecord, DraftStatus, Entity,
    HistoryEntry, QualificationTemplate,
};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{DraftStore, SyncError};

#[derive(Default)]
struct Inner {
    drafts: BTreeMap<DraftId, DraftRecord>,
    history: BTreeMap<DraftId, Vec<HistoryEntry>>,
    attachments: Vec<Attachment>,
    next_draft: DraftId,
    next_attachment: AttachmentId,
}

impl Inner {
    fn record_event(&mut self, id: DraftId, actor: &str, description: String) {
        let entry = HistoryEntry {
            timestamp: Utc::now(),
            actor: actor.to_string(),
            event_description: description,
        };
        self.history.entry(id).or_default().insert(0, entry);
    }

    fn draft(&self, id: DraftId) -> Result<&DraftRecord, SyncError> {
        self.drafts.get(&id).ok_or(SyncError::NotFound { what: "draft", id })
    }
}

pub struct MemoryStore {
    contract_types: Vec<ContractType>,
    templates: Vec<QualificationTemplate>,
    entities: Vec<Entity>,
    clauses: Vec<Clause>,
    actor: String,
    offline: AtomicBool,
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new(contract_types: Vec<ContractType>) -> Self {
        Self {
            contract_types,
            templates: Vec::new(),
            entities: Vec::new(),
            clauses: Vec::new(),
            actor: "minuta".to_string(),
            offline: AtomicBool::new(false),
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn with_templates(mut self, templates: Vec<QualificationTemplate>) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_entities(mut self, entities: Vec<Entity>) -> Self {
        self.entities = entities;
        self
    }

    pub fn with_clauses(mut self, clauses: Vec<Clause>) -> Self {
        self.clauses = clauses;
        self
    }

    /// Name recorded as the actor of history entries.
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    /// While offline every call fails with a 503.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), SyncError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(SyncError::Server {
                status: 503,
                body: "store offline".to_string(),
            });
        }
        Ok(())
    }
}

fn apply_payload(record: &mut DraftRecord, payload: &DraftPayload) {
    record.title = payload.title.clone();
    record.contract_type_id = Some(payload.contract_type_id);
    record.party_assignments = payload.party_assignments.clone();
    record.variable_values = payload.variable_values.clone();
    record.clauses = payload.clauses.clone();
    record.updated_at = Some(Utc::now());
}

#[async_trait]
impl DraftStore for MemoryStore {
    async fn contract_types(&self) -> Result<Vec<ContractType>, SyncError> {
        self.check_online()?;
        Ok(self.contract_types.clone())
    }

    async fn qualification_templates(&self) -> Result<Vec<QualificationTemplate>, SyncError> {
        self.check_online()?;
        Ok(self.templates.clone())
    }

    async fn entities(&self) -> Result<Vec<Entity>, SyncError> {
        self.check_online()?;
        Ok(self.entities.clone())
    }

    async fn clause_library(&self) -> Result<Vec<Clause>, SyncError> {
        self.check_online()?;
        Ok(self.clauses.clone())
    }

    async fn create_draft(&self, payload: &DraftPayload) -> Result<DraftRecord, SyncError> {
        self.check_online()?;
        let mut inner = self.inner.lock().await;
        inner.next_draft += 1;
        let id = inner.next_draft;
        let now = Utc::now();
        let mut record = DraftRecord {
            id,
            title: String::new(),
            contract_type_id: None,
            party_assignments: Default::default(),
            variable_values: Default::default(),
            clauses: Vec::new(),
            status: DraftStatus::Draft,
            created_at: Some(now),
            updated_at: None,
        };
        apply_payload(&mut record, payload);
        inner.drafts.insert(id, record.clone());
        inner.record_event(id, &self.actor, "Draft created".to_string());
        info!(draft = id, title = %record.title, "draft created");
        Ok(record)
    }

    async fn update_draft(
        &self,
        id: DraftId,
        payload: &DraftPayload,
    ) -> Result<DraftRecord, SyncError> {
        self.check_online()?;
        let mut inner = self.inner.lock().await;
        let record = inner
            .drafts
            .get_mut(&id)
            .ok_or(SyncError::NotFound { what: "draft", id })?;
        apply_payload(record, payload);
        debug!(draft = id, "draft updated");
        Ok(record.clone())
    }

    async fn fetch_draft(&self, id: DraftId) -> Result<DraftRecord, SyncError> {
        self.check_online()?;
        let inner = self.inner.lock().await;
        inner.draft(id).cloned()
    }

    async fn update_status(
        &self,
        id: DraftId,
        status: DraftStatus,
    ) -> Result<DraftRecord, SyncError> {
        self.check_online()?;
        let mut inner = self.inner.lock().await;
        let from = inner.draft(id)?.status;
        if !from.can_transition_to(status) {
            return Err(SyncError::Server {
                status: 409,
                body: format!("cannot change status from {from} to {status}"),
            });
        }
        let record = inner
            .drafts
            .get_mut(&id)
            .ok_or(SyncError::NotFound { what: "draft", id })?;
        record.status = status;
        record.updated_at = Some(Utc::now());
        let record = record.clone();
        inner.record_event(id, &self.actor, format!("Status changed from {from} to {status}"));
        info!(draft = id, from = %from, to = %status, "status changed");
        Ok(record)
    }

    async fn history(&self, id: DraftId) -> Result<Vec<HistoryEntry>, SyncError> {
        self.check_online()?;
        let inner = self.inner.lock().await;
        inner.draft(id)?;
        Ok(inner.history.get(&id).cloned().unwrap_or_default())
    }

    async fn attachments(&self, draft: DraftId) -> Result<Vec<Attachment>, SyncError> {
        self.check_online()?;
        let inner = self.inner.lock().await;
        Ok(inner
            .attachments
            .iter()
            .filter(|a| a.draft_id == draft)
            .cloned()
            .collect())
    }

    async fn upload_attachment(
        &self,
        draft: DraftId,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<Attachment, SyncError> {
        self.check_online()?;
        let mut inner = self.inner.lock().await;
        inner.draft(draft)?;
        inner.next_attachment += 1;
        let id = inner.next_attachment;
        let attachment = Attachment {
            id,
            draft_id: draft,
            filename: filename.to_string(),
            url: format!("/media/attachments/{draft}/{filename}"),
        };
        inner.attachments.push(attachment.clone());
        info!(draft, attachment = id, size = bytes.len(), "attachment stored");
        Ok(attachment)
    }

    async fn export_docx(&self, html: &str) -> Result<Vec<u8>, SyncError> {
        self.check_online()?;
        Ok(html.as_bytes().to_vec())
    }

    async fn extract_text(&self, filename: &str, bytes: Vec<u8>) -> Result<String, SyncError> {
        self.check_online()?;
        let is_text = Path::new(filename)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"));
        if !is_text {
            return Err(SyncError::Extraction(format!(
                "{filename}: only plain text can be converted offline"
            )));
        }
        String::from_utf8(bytes).map_err(|e| SyncError::Extraction(format!("{filename}: {e}")))
    }
}
