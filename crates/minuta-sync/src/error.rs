use minuta_core::DraftError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{what} {id} not found")]
    NotFound { what: &'static str, id: u64 },

    #[error("unsupported file {0:?}: only .docx and .txt can be imported")]
    UnsupportedImport(String),

    #[error("could not extract text: {0}")]
    Extraction(String),

    #[error(transparent)]
    Draft(#[from] DraftError),
}

impl SyncError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
