//! # mizan-core: Pure Business Logic for Mizan
//!
//! Everything in this crate is a pure function over plain data. Nothing here
//! touches the database, the network or the clock; callers pass `now` in.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Mizan Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   mizan-api (HTTP, axum)                        │   │
//! │  │    POST /invoices ──► payments ──► reports ──► catalog CRUD     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  mizan-db (SQLite + ledgers)                    │   │
//! │  │    InvoiceProcessor ──► StockLedger / BalanceLedger             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ mizan-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  types  │ │  money  │ │ invoice │ │ report  │ │ access  │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Party, Invoice, StoreSettings, ...)
//! - [`money`] - Money type with integer arithmetic
//! - [`invoice`] - Invoice Builder: cart lines + header → priced invoice
//! - [`report`] - Report Aggregator: read-side statistics
//! - [`access`] - Role → resource policy
//! - [`validation`] - Field rules for catalog, party and cart input
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use mizan_core::invoice::{price_invoice, DraftLine, InvoiceDraft};
//! use mizan_core::{InvoiceStatus, InvoiceType, PaymentMethod, TaxRate};
//!
//! let draft = InvoiceDraft {
//!     invoice_type: InvoiceType::Sale,
//!     customer_id: None,
//!     supplier_id: None,
//!     payment_method: PaymentMethod::Cash,
//!     discount_cents: 0,
//!     amount_paid_cents: None,
//!     notes: None,
//!     items: vec![DraftLine::new("p-1", "Tea", 2, 100)],
//! };
//!
//! let priced = price_invoice(&draft, TaxRate::zero()).unwrap();
//! assert_eq!(priced.total.cents(), 200);
//! assert_eq!(priced.status, InvoiceStatus::Completed);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod access;
pub mod error;
pub mod invoice;
pub mod money;
pub mod report;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use access::{can_access, Resource, Role};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed on a single invoice.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity on a single invoice line.
///
/// Catches typing 1000 instead of 10 at the till.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Largest single amount accepted in minor units (prices, costs, payments).
///
/// `MAX_AMOUNT_CENTS × MAX_ITEM_QUANTITY × MAX_CART_ITEMS`, doubled by a
/// 100% tax, stays inside `i64`.
pub const MAX_AMOUNT_CENTS: i64 = 10_000_000_000_000;

/// Invoice number prefix used until the store configures its own.
pub const DEFAULT_INVOICE_PREFIX: &str = "INV";

/// Width of the zero-padded sequence part of an invoice number (`INV000001`).
pub const INVOICE_NUMBER_DIGITS: usize = 6;

/// Prefix of debt payment receipt numbers.
pub const RECEIPT_PREFIX: &str = "REC";
