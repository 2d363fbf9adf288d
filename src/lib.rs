//! DigiTradeX Rust Client Library
//!
//! A Rust client library for the DigiTradeX purchase order intake
//! backend, covering authentication, document upload with OCR polling,
//! draft review and registration, and the registered purchase order
//! list.

pub mod config;
pub mod error;

use reqwest::Client;

use crate::config::ClientOptions;
use digitradex_auth::{AuthClient, SessionStore};
use digitradex_ingest::{IngestClient, IngestWorkflow};
use digitradex_orders::{ListBrowser, OrdersClient};

pub use digitradex_auth as auth;
pub use digitradex_ingest as ingest;
pub use digitradex_orders as orders;

/// The main entry point for the DigiTradeX client
///
/// All sub-clients created from one instance share the same HTTP client
/// and session store, so signing in once authorizes every request.
pub struct DigiTradeX {
    /// The base URL of the DigiTradeX backend
    pub base_url: String,
    /// HTTP client used for requests
    pub http_client: Client,
    /// Shared session store
    pub session: SessionStore,
    /// Auth client for login and session verification
    pub auth: AuthClient,
    /// Client options
    pub options: ClientOptions,
}

impl DigiTradeX {
    /// Create a new DigiTradeX client
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of your DigiTradeX backend
    ///
    /// # Example
    ///
    /// ```
    /// use digitradex_rust::DigiTradeX;
    ///
    /// let client = DigiTradeX::new("https://api.example.com");
    /// ```
    pub fn new(base_url: &str) -> Self {
        Self::new_with_options(base_url, ClientOptions::default())
    }

    /// Create a new DigiTradeX client with custom options
    ///
    /// # Example
    ///
    /// ```
    /// use digitradex_rust::{DigiTradeX, config::ClientOptions};
    /// use std::time::Duration;
    ///
    /// let options = ClientOptions::default().with_poll_interval(Duration::from_secs(2));
    /// let client = DigiTradeX::new_with_options("https://api.example.com", options);
    /// ```
    pub fn new_with_options(base_url: &str, options: ClientOptions) -> Self {
        let http_client = Client::new();
        let session = SessionStore::new();

        let auth = AuthClient::new(base_url, http_client.clone(), session.clone());

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
            session,
            auth,
            options,
        }
    }

    /// Get a reference to the auth client for login and session management
    pub fn auth(&self) -> &AuthClient {
        &self.auth
    }

    /// Get a reference to the shared session store
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Create an ingestion client for document upload, OCR polling, and
    /// registration
    pub fn ingest(&self) -> IngestClient {
        IngestClient::new(
            &self.base_url,
            self.http_client.clone(),
            self.session.clone(),
            self.options.ingest_options(),
        )
    }

    /// Create an ingestion workflow that tracks the upload-to-register
    /// state machine
    pub fn workflow(&self) -> IngestWorkflow {
        IngestWorkflow::new(self.ingest())
    }

    /// Create a purchase order list client
    pub fn orders(&self) -> OrdersClient {
        OrdersClient::new(
            &self.base_url,
            self.http_client.clone(),
            self.session.clone(),
            self.options.orders_options(),
        )
    }

    /// Create a list browser that holds the filter, pagination, and
    /// selection state over the purchase order list
    pub fn browser(&self) -> ListBrowser {
        ListBrowser::new(self.orders())
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::config::ClientOptions;
    pub use crate::error::Error;
    pub use crate::DigiTradeX;
    pub use digitradex_auth::{Session, SessionStore, User};
    pub use digitradex_ingest::{IngestWorkflow, PurchaseOrderDraft, WorkflowState};
    pub use digitradex_orders::{FilterCriteria, ListBrowser, PurchaseOrder};
}
