//! Configuration options for the DigiTradeX client

use std::time::Duration;

use digitradex_ingest::IngestOptions;
use digitradex_orders::OrdersOptions;

/// Configuration options for the DigiTradeX client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// The request timeout for uploads and other long requests
    pub request_timeout: Option<Duration>,

    /// The currency assumed when OCR extraction does not yield one
    pub default_currency: String,

    /// Delay between OCR status polls
    pub poll_interval: Duration,

    /// Maximum number of OCR status polls before giving up
    pub poll_max_attempts: u32,

    /// Number of rows per page in the purchase order list
    pub page_size: usize,

    /// Maximum number of product detail requests in flight at once
    pub detail_concurrency: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Some(Duration::from_secs(30)),
            default_currency: "USD".to_string(),
            poll_interval: Duration::from_secs(1),
            poll_max_attempts: 120,
            page_size: 10,
            detail_concurrency: 4,
        }
    }
}

impl ClientOptions {
    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the default currency
    pub fn with_default_currency(mut self, value: &str) -> Self {
        self.default_currency = value.to_string();
        self
    }

    /// Set the delay between OCR status polls
    pub fn with_poll_interval(mut self, value: Duration) -> Self {
        self.poll_interval = value;
        self
    }

    /// Set the maximum number of OCR status polls
    pub fn with_poll_max_attempts(mut self, value: u32) -> Self {
        self.poll_max_attempts = value;
        self
    }

    /// Set the list page size
    pub fn with_page_size(mut self, value: usize) -> Self {
        self.page_size = value;
        self
    }

    /// Set the product detail fetch concurrency
    pub fn with_detail_concurrency(mut self, value: usize) -> Self {
        self.detail_concurrency = value;
        self
    }

    /// Derive the ingestion options from these client options
    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions::default()
            .with_default_currency(&self.default_currency)
            .with_poll_interval(self.poll_interval)
            .with_poll_max_attempts(self.poll_max_attempts)
            .with_upload_timeout(self.request_timeout)
    }

    /// Derive the list options from these client options
    pub fn orders_options(&self) -> OrdersOptions {
        OrdersOptions::default()
            .with_detail_concurrency(self.detail_concurrency)
            .with_page_size(self.page_size)
    }
}
