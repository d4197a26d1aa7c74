//! # Ledgers
//!
//! The only writers of the two shared counters in the schema.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products.quantity        ◄── StockLedger    quantity = quantity + Δ    │
//! │  customers.balance_cents  ◄── BalanceLedger  balance  = balance  + Δ    │
//! │  suppliers.balance_cents  ◄── BalanceLedger  (compare-and-set on pay)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every write is a single relative `UPDATE`, never read-modify-write in
//! Rust, so concurrent requests cannot lose each other's changes. Each ledger
//! exposes pool-level methods and `*_in` variants that run on a caller's
//! open transaction.

pub mod balance;
pub mod stock;
