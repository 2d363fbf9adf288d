use thiserror::Error;

/// エラー型
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Auth error: {0}")]
    AuthError(#[from] digitradex_auth::AuthError),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("OCR job failed: {0}")]
    JobFailed(String),

    #[error("OCR polling gave up after {0} attempts")]
    PollTimeout(u32),

    #[error("OCR polling was cancelled")]
    Cancelled,

    #[error("Extraction payload has no recognizable shape")]
    UnrecognizedShape,

    #[error("Invalid workflow transition: {from} -> {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
}
