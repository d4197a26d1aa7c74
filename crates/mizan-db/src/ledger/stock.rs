//! # Stock Ledger
//!
//! Atomic on-hand quantity adjustments.
//!
//! ## Delta Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  ❌ read 10, write 10 − 3 = 7      (a concurrent −2 is lost)        │
//! │                                                                     │
//! │  ✅ UPDATE products SET quantity = quantity − 3 ... RETURNING       │
//! │     Request A: −3 ┐                                                 │
//! │     Request B: −2 ┴──► 10 − 3 − 2 = 5, in either order              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sales use a negative delta, purchases and returns a positive one
//! (see [`mizan_core::InvoiceType::stock_delta`]).

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use mizan_core::CoreError;

use crate::error::{DbError, LedgerResult};

#[derive(Debug, Clone)]
pub struct StockLedger {
    pool: SqlitePool,
}

impl StockLedger {
    pub fn new(pool: SqlitePool) -> Self {
        StockLedger { pool }
    }

    /// Adds `delta` to the product's quantity and returns the new quantity.
    /// The result may go negative.
    ///
    /// ## Returns
    /// * `Err(CoreError::NotFound)` - unknown product
    pub async fn adjust(&self, product_id: &str, delta: i64) -> LedgerResult<i64> {
        let mut conn = self.pool.acquire().await.map_err(DbError::from)?;
        adjust_in(&mut conn, product_id, delta).await
    }

    /// Like [`adjust`](Self::adjust), but refuses to go below zero.
    ///
    /// ## Returns
    /// * `Err(CoreError::InsufficientStock)` - quantity unchanged
    /// * `Err(CoreError::NotFound)` - unknown product
    pub async fn adjust_with_floor(&self, product_id: &str, delta: i64) -> LedgerResult<i64> {
        let mut conn = self.pool.acquire().await.map_err(DbError::from)?;
        adjust_with_floor_in(&mut conn, product_id, delta).await
    }
}

/// Unbounded adjustment on an existing connection or transaction.
pub(crate) async fn adjust_in(
    conn: &mut SqliteConnection,
    product_id: &str,
    delta: i64,
) -> LedgerResult<i64> {
    let quantity: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE products
        SET quantity = quantity + ?2,
            updated_at = ?3
        WHERE id = ?1
        RETURNING quantity
        "#,
    )
    .bind(product_id)
    .bind(delta)
    .bind(Utc::now())
    .fetch_optional(&mut *conn)
    .await?;

    let quantity = quantity.ok_or_else(|| CoreError::not_found("Product", product_id))?;

    debug!(product_id = %product_id, delta, quantity, "Stock adjusted");
    Ok(quantity)
}

/// Floored adjustment on an existing connection or transaction.
///
/// The floor is part of the `WHERE`, so the check and the write are one
/// statement.
pub(crate) async fn adjust_with_floor_in(
    conn: &mut SqliteConnection,
    product_id: &str,
    delta: i64,
) -> LedgerResult<i64> {
    let quantity: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE products
        SET quantity = quantity + ?2,
            updated_at = ?3
        WHERE id = ?1 AND quantity + ?2 >= 0
        RETURNING quantity
        "#,
    )
    .bind(product_id)
    .bind(delta)
    .bind(Utc::now())
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(quantity) = quantity {
        debug!(product_id = %product_id, delta, quantity, "Stock adjusted");
        return Ok(quantity);
    }

    // No row updated: either the product is missing or the floor held
    let current: Option<(String, i64)> =
        sqlx::query_as("SELECT name, quantity FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await?;

    match current {
        Some((name, available)) => {
            warn!(
                product_id = %product_id,
                available,
                requested = -delta,
                "Stock adjustment rejected"
            );
            Err(CoreError::InsufficientStock {
                product: name,
                available,
                requested: -delta,
            }
            .into())
        }
        None => Err(CoreError::not_found("Product", product_id).into()),
    }
}
