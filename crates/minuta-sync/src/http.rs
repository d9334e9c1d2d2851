//! REST draft store for the Minuta backend.

use async_trait::async_trait;
use minuta_core::{
    Attachment, Clause, ContractType, DraftId, DraftPayload, DraftRecord, DraftStatus, Entity,
    HistoryEntry, QualificationTemplate,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{DraftStore, SyncError};

#[derive(Serialize)]
struct StatusBody {
    status: DraftStatus,
}

#[derive(Serialize)]
struct ExportBody<'a> {
    html: &'a str,
}

#[derive(Deserialize)]
struct ExtractedText {
    text: String,
}

/// HTTP client for the drafting backend's REST endpoints.
pub struct HttpDraftStore {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpDraftStore {
    /// `base_url` should be like `http://localhost:8000` (a trailing slash is dropped).
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.url(path);
        debug!(method = %method, url = %url, "request");
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, SyncError> {
        let resp = builder.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SyncError::Server {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, SyncError> {
        let resp = self.send(self.request(Method::GET, path)).await?;
        Ok(resp.json().await?)
    }

    async fn list<T: DeserializeOwned>(&self, path: &str, what: &str) -> Result<Vec<T>, SyncError> {
        let items: Vec<T> = self.get_json(path).await?;
        info!(count = items.len(), what, "fetched reference data");
        Ok(items)
    }
}

fn draft_path(id: DraftId) -> String {
    format!("/api/drafts/{id}/")
}

fn not_found_as(err: SyncError, what: &'static str, id: u64) -> SyncError {
    match err {
        SyncError::Server { status, .. } if status == StatusCode::NOT_FOUND.as_u16() => {
            SyncError::NotFound { what, id }
        }
        other => other,
    }
}

#[async_trait]
impl DraftStore for HttpDraftStore {
    async fn contract_types(&self) -> Result<Vec<ContractType>, SyncError> {
        self.list("/api/contract-types/", "contract types").await
    }

    async fn qualification_templates(&self) -> Result<Vec<QualificationTemplate>, SyncError> {
        self.list("/api/qualifications/", "qualification templates").await
    }

    async fn entities(&self) -> Result<Vec<Entity>, SyncError> {
        self.list("/api/entities/", "entities").await
    }

    async fn clause_library(&self) -> Result<Vec<Clause>, SyncError> {
        self.list("/api/clauses/", "clauses").await
    }

    async fn create_draft(&self, payload: &DraftPayload) -> Result<DraftRecord, SyncError> {
        let resp = self
            .send(self.request(Method::POST, "/api/drafts/").json(payload))
            .await?;
        let record: DraftRecord = resp.json().await?;
        info!(draft = record.id, title = %record.title, "draft created");
        Ok(record)
    }

    async fn update_draft(
        &self,
        id: DraftId,
        payload: &DraftPayload,
    ) -> Result<DraftRecord, SyncError> {
        let resp = self
            .send(self.request(Method::PUT, &draft_path(id)).json(payload))
            .await
            .map_err(|e| not_found_as(e, "draft", id))?;
        let record: DraftRecord = resp.json().await?;
        info!(draft = id, "draft saved");
        Ok(record)
    }

    async fn fetch_draft(&self, id: DraftId) -> Result<DraftRecord, SyncError> {
        self.get_json(&draft_path(id))
            .await
            .map_err(|e| not_found_as(e, "draft", id))
    }

    async fn update_status(
        &self,
        id: DraftId,
        status: DraftStatus,
    ) -> Result<DraftRecord, SyncError> {
        let path = format!("/api/drafts/{id}/status/");
        let resp = self
            .send(self.request(Method::PATCH, &path).json(&StatusBody { status }))
            .await
            .map_err(|e| not_found_as(e, "draft", id))?;
        let record: DraftRecord = resp.json().await?;
        info!(draft = id, status = %record.status, "status updated");
        Ok(record)
    }

    async fn history(&self, id: DraftId) -> Result<Vec<HistoryEntry>, SyncError> {
        self.get_json(&format!("/api/drafts/{id}/history/"))
            .await
            .map_err(|e| not_found_as(e, "draft", id))
    }

    async fn attachments(&self, draft: DraftId) -> Result<Vec<Attachment>, SyncError> {
        self.get_json(&format!("/api/attachments/?draft={draft}")).await
    }

    async fn upload_attachment(
        &self,
        draft: DraftId,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<Attachment, SyncError> {
        let size = bytes.len();
        let form = Form::new()
            .text("draft", draft.to_string())
            .part("file", Part::bytes(bytes).file_name(filename.to_string()));
        let resp = self
            .send(self.request(Method::POST, "/api/attachments/").multipart(form))
            .await?;
        let attachment: Attachment = resp.json().await?;
        info!(draft, attachment = attachment.id, size, "attachment uploaded");
        Ok(attachment)
    }

    async fn export_docx(&self, html: &str) -> Result<Vec<u8>, SyncError> {
        let resp = self
            .send(self.request(Method::POST, "/api/export/docx/").json(&ExportBody { html }))
            .await?;
        let bytes = resp.bytes().await?;
        info!(size = bytes.len(), "document exported");
        Ok(bytes.to_vec())
    }

    async fn extract_text(&self, filename: &str, bytes: Vec<u8>) -> Result<String, SyncError> {
        let form = Form::new().part("file", Part::bytes(bytes).file_name(filename.to_string()));
        let resp = self
            .send(self.request(Method::POST, "/api/import/text/").multipart(form))
            .await?;
        let extracted: ExtractedText = resp.json().await?;
        info!(filename, chars = extracted.text.len(), "text extracted");
        Ok(extracted.text)
    }
}
