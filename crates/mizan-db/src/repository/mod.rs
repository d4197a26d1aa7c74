//! # Repository Module
//!
//! Plain CRUD over the catalog, parties, invoices and settings.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Handler                                                                │
//! │     │  db.products().get_by_id(id)                                      │
//! │     ▼                                                                   │
//! │  ProductRepository ── SQL ──► SQLite                                    │
//! │                                                                         │
//! │  Repositories never touch stock quantities or party balances after      │
//! │  creation. Those columns belong to the ledgers (`crate::ledger`).       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - products and low-stock listing
//! - [`category::CategoryRepository`] - categories
//! - [`party::PartyRepository`] - customers and suppliers
//! - [`invoice::InvoiceRepository`] - invoice reads
//! - [`settings::SettingsRepository`] - the store settings row
//! - [`report::ReportRepository`] - snapshot for the report aggregator

pub mod category;
pub mod invoice;
pub mod party;
pub mod product;
pub mod report;
pub mod settings;

use uuid::Uuid;

/// Generates a new entity id (UUID v4 string).
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Trims an optional text field, mapping blank input to `None`.
pub(crate) fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
