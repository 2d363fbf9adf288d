//! Error handling for the DigiTradeX Rust client

use std::fmt;
use thiserror::Error;

/// Unified error type for the DigiTradeX Rust client
#[derive(Error, Debug)]
pub enum Error {
    /// Authentication and session errors
    #[error("Auth error: {0}")]
    Auth(#[from] digitradex_auth::AuthError),

    /// Upload, OCR, and registration errors
    #[error("Ingest error: {0}")]
    Ingest(#[from] digitradex_ingest::IngestError),

    /// Purchase order list errors
    #[error("Orders error: {0}")]
    Orders(#[from] digitradex_orders::OrdersError),

    /// Network or HTTP related errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// General errors
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Create a new general error
    pub fn general<T: fmt::Display>(msg: T) -> Self {
        Error::General(msg.to_string())
    }
}
