//! # Mizan API
//!
//! HTTP JSON API for invoices, stock, debts and reports.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Mizan API Server                               │
//! │                                                                         │
//! │  Till / back office ──► HTTP (8080) ──► Handlers ──► mizan-db ──► SQLite│
//! │                              │              │                           │
//! │                              ▼              ▼                           │
//! │                         TraceLayer     AuthUser + can_access            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Endpoints
//! ```text
//! ┌───────────────────────────────────┬──────────────┬─────────────────────┐
//! │ Route                             │ Resource     │ Purpose             │
//! ├───────────────────────────────────┼──────────────┼─────────────────────┤
//! │ GET  /health                      │ -            │ liveness + DB ping  │
//! │ POST /invoices                    │ sales/purch. │ process an invoice  │
//! │ GET  /invoices[/:id]              │ sales/purch. │ list / receipt      │
//! │ *    /products[/:id|/low-stock]   │ products     │ catalog             │
//! │ *    /categories                  │ categories   │ catalog             │
//! │ *    /customers, /suppliers       │ customers/.. │ parties             │
//! │ POST /{customers,suppliers}/:id/  │ debts        │ debt payment        │
//! │      payments                     │              │                     │
//! │ GET  /debts                       │ debts        │ debtors overview    │
//! │ GET  /reports?range=&top=         │ reports      │ aggregated report   │
//! │ *    /settings                    │ settings     │ store settings      │
//! └───────────────────────────────────┴──────────────┴─────────────────────┘
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod startup;
pub mod state;

// Re-exports
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use startup::build_router;
pub use state::AppState;
