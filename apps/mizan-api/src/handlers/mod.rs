//! HTTP handlers, one module per area.
//!
//! Every handler except `health` takes an [`AuthUser`](crate::auth::AuthUser)
//! and checks its resource before touching the database.

pub mod category;
pub mod debts;
pub mod health;
pub mod invoice;
pub mod party;
pub mod product;
pub mod report;
pub mod settings;
