//! DigiTradeX document ingestion client for Rust
//!
//! This crate drives a purchase order document through the backend OCR
//! pipeline: upload, status polling, field normalization, user review,
//! and registration.

pub mod client;
pub mod draft;
pub mod error;
pub mod normalize;
pub mod workflow;

pub use client::{IngestClient, IngestOptions, JobStatus, PollHandle};
pub use draft::{ItemField, LineItem, PurchaseOrderDraft, MAX_LINE_ITEMS};
pub use error::IngestError;
pub use workflow::{IngestWorkflow, UploadedDocument, WorkflowState};
