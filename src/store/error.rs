use thiserror::Error;

/// Errors raised while talking to the content store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request to content store failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("content store answered {status} for {url}")]
    Status { status: u16, url: String },

    #[error("failed to decode content store response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("repository has no master ref")]
    NoMasterRef,

    #[error("invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("document not found: {0}")]
    NotFound(String),

    #[error("failed to read fixtures: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}
