//! DigiTradeX purchase order list client for Rust
//!
//! This crate fetches registered purchase orders, expands them into one
//! display row per line item, and manages the client-side list state:
//! filtering, pagination, row expansion, selection, and the optimistic
//! status/memo edits with revert on failure.

pub mod client;
pub mod error;
pub mod model;
pub mod view;

pub use client::{LoadReport, OrdersClient, OrdersOptions};
pub use error::OrdersError;
pub use model::{expand_purchase_order, DisplayRow, Product, PurchaseOrder};
pub use view::{
    FilterCriteria, ListBrowser, ListView, RowTone, MAX_PAGE_BUTTONS, PAGE_SIZE, STATUS_CHOICES,
};
