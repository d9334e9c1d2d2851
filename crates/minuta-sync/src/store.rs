use async_trait::async_trait;
use minuta_core::DraftId;
use minuta_core::{
    Attachment, Clause, ContractType, DraftPayload, DraftRecord, DraftStatus, Entity, HistoryEntry,
    QualificationTemplate,
};

use crate::SyncError;

/// The persistence backend a draft is edited against.
///
/// Every call either completes with the backend's view of the data or fails
/// with nothing changed on the caller's side.
#[async_trait]
pub trait DraftStore: Send + Sync {
    // ── Reference data ──

    async fn contract_types(&self) -> Result<Vec<ContractType>, SyncError>;
    async fn qualification_templates(&self) -> Result<Vec<QualificationTemplate>, SyncError>;
    async fn entities(&self) -> Result<Vec<Entity>, SyncError>;
    async fn clause_library(&self) -> Result<Vec<Clause>, SyncError>;

    // ── Drafts ──

    /// Create a draft. The returned record carries the assigned id.
    async fn create_draft(&self, payload: &DraftPayload) -> Result<DraftRecord, SyncError>;
    async fn update_draft(&self, id: DraftId, payload: &DraftPayload)
    -> Result<DraftRecord, SyncError>;
    async fn fetch_draft(&self, id: DraftId) -> Result<DraftRecord, SyncError>;
    /// Change only the status. The backend appends a history entry.
    async fn update_status(&self, id: DraftId, status: DraftStatus)
    -> Result<DraftRecord, SyncError>;
    /// Audit trail, newest first.
    async fn history(&self, id: DraftId) -> Result<Vec<HistoryEntry>, SyncError>;

    // ── Files ──

    async fn attachments(&self, draft: DraftId) -> Result<Vec<Attachment>, SyncError>;
    async fn upload_attachment(
        &self,
        draft: DraftId,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<Attachment, SyncError>;
    /// Convert rendered HTML into a .docx document.
    async fn export_docx(&self, html: &str) -> Result<Vec<u8>, SyncError>;
    /// Plain text of an uploaded document, one paragraph per line.
    async fn extract_text(&self, filename: &str, bytes: Vec<u8>) -> Result<String, SyncError>;
}
