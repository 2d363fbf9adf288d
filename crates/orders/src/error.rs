use thiserror::Error;

/// エラー型
#[derive(Error, Debug)]
pub enum OrdersError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Auth error: {0}")]
    AuthError(#[from] digitradex_auth::AuthError),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unknown PO id: {0}")]
    UnknownId(i64),
}
