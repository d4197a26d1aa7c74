//! # mizan-db: Persistence Layer for Mizan
//!
//! SQLite storage through sqlx, plus the write workflows that must be atomic.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  HTTP handler (mizan-api)                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                     mizan-db (THIS CRATE)                       │    │
//! │  │                                                                 │    │
//! │  │   ┌──────────────┐  ┌──────────────┐  ┌────────────────────┐    │    │
//! │  │   │  Database    │  │ Repositories │  │ InvoiceProcessor   │    │    │
//! │  │   │  (pool.rs)   │  │ products     │  │  one transaction:  │    │    │
//! │  │   │              │  │ categories   │  │  number, header,   │    │    │
//! │  │   │  SqlitePool  │◄─│ parties      │  │  items, stock,     │    │    │
//! │  │   │  migrations  │  │ invoices     │  │  balance           │    │    │
//! │  │   │              │  │ settings     │  └─────────┬──────────┘    │    │
//! │  │   └──────────────┘  └──────────────┘            │               │    │
//! │  │                                       ┌─────────▼──────────┐    │    │
//! │  │                                       │ Ledgers            │    │    │
//! │  │                                       │ StockLedger        │    │    │
//! │  │                                       │ BalanceLedger      │    │    │
//! │  │                                       └────────────────────┘    │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL, foreign keys on)                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mizan_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./mizan.db")).await?;
//!
//! let processed = db.processor().process(&draft, Some("user-1")).await?;
//! let receipt = db
//!     .balances()
//!     .apply_payment(PartyKind::Customer, &customer_id, Money::from_cents(500), None, None)
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod processor;
pub mod repository;

#[cfg(test)]
pub(crate) mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult, LedgerError, LedgerResult};
pub use pool::{Database, DbConfig};

pub use ledger::balance::{BalanceAudit, BalanceLedger};
pub use ledger::stock::StockLedger;
pub use processor::{InvoiceProcessor, ProcessedInvoice};
pub use repository::category::{CategoryRepository, NewCategory};
pub use repository::invoice::{InvoiceFilter, InvoiceReceipt, InvoiceRepository};
pub use repository::party::{NewParty, PartyRepository};
pub use repository::product::{NewProduct, ProductRepository, ProductUpdate};
pub use repository::report::{ReportRepository, ReportSnapshot};
pub use repository::settings::{SettingsRepository, SettingsUpdate};
