//! # Report Snapshot
//!
//! Loads the rows [`mizan_core::report::build_report`] aggregates. All four
//! reads run in one transaction so the report sees a single point in time.
//!
//! Invoices are bounded by [`mizan_core::report::window_start`]: completed
//! invoices older than the window cannot change any figure, pending ones are
//! counted at any age. Customers are limited to those who owe something.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use mizan_core::report::ReportInput;
use mizan_core::{Invoice, InvoiceItem, Party, Product};

use crate::error::DbResult;

/// Owned rows backing a [`ReportInput`].
#[derive(Debug, Clone, Default)]
pub struct ReportSnapshot {
    pub invoices: Vec<Invoice>,
    pub items: Vec<InvoiceItem>,
    pub products: Vec<Product>,
    pub customers: Vec<Party>,
}

impl ReportSnapshot {
    pub fn input(&self) -> ReportInput<'_> {
        ReportInput {
            invoices: &self.invoices,
            items: &self.items,
            products: &self.products,
            customers: &self.customers,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Rows for a report whose window opens at `since`.
    pub async fn snapshot(&self, since: DateTime<Utc>) -> DbResult<ReportSnapshot> {
        let mut tx = self.pool.begin().await?;

        let invoices = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT id, invoice_number, invoice_type, customer_id, supplier_id,
                   subtotal_cents, discount_cents, tax_cents, total_cents, paid_cents,
                   remaining_cents, status, payment_method, notes, created_by, created_at
            FROM invoices
            WHERE created_at >= ?1 OR status = 'pending'
            "#,
        )
        .bind(since)
        .fetch_all(&mut *tx)
        .await?;

        let items = sqlx::query_as::<_, InvoiceItem>(
            r#"
            SELECT id, invoice_id, product_id, product_name, quantity,
                   price_cents, discount_cents, total_cents, position
            FROM invoice_items
            WHERE invoice_id IN (SELECT id FROM invoices WHERE created_at >= ?1)
            "#,
        )
        .bind(since)
        .fetch_all(&mut *tx)
        .await?;

        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, description, sku, barcode, category_id, price_cents, cost_cents,
                   quantity, min_quantity, unit, is_active, created_at, updated_at
            FROM products
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        let customers = sqlx::query_as::<_, Party>(
            r#"
            SELECT id, name, phone, email, address, balance_cents,
                   total_purchases_cents, created_at, updated_at
            FROM customers
            WHERE balance_cents > 0
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(
            since = %since,
            invoices = invoices.len(),
            items = items.len(),
            products = products.len(),
            customers = customers.len(),
            "Loaded report snapshot"
        );

        Ok(ReportSnapshot {
            invoices,
            items,
            products,
            customers,
        })
    }
}
