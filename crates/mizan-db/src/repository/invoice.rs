//! # Invoice Repository
//!
//! Reads of persisted invoices, plus the insert statements the
//! [`crate::processor::InvoiceProcessor`] runs inside its transaction.
//! There is no public insert: invoices only come into existence through
//! the processor.
//!
//! ## Snapshot Pattern
//! Each item stores `product_name` and `price_cents` as they were at the
//! moment of sale, so receipts reprint identically after catalog edits.

use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use mizan_core::{Invoice, InvoiceItem, InvoiceStatus, InvoiceType, Party, PartyKind, StoreSettings};

use super::party::fetch_party;
use super::settings::fetch_settings;
use crate::error::{DbError, DbResult};

const INVOICE_COLUMNS: &str = "id, invoice_number, invoice_type, customer_id, supplier_id, \
     subtotal_cents, discount_cents, tax_cents, total_cents, paid_cents, remaining_cents, \
     status, payment_method, notes, created_by, created_at";

const ITEM_COLUMNS: &str = "id, invoice_id, product_id, product_name, quantity, \
     price_cents, discount_cents, total_cents, position";

/// Optional filters for [`InvoiceRepository::list`].
#[derive(Debug, Clone, Default)]
pub struct InvoiceFilter {
    pub invoice_type: Option<InvoiceType>,
    pub status: Option<InvoiceStatus>,
    pub customer_id: Option<String>,
    pub supplier_id: Option<String>,
    pub limit: Option<u32>,
}

/// Everything a printer needs to render an invoice.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceReceipt {
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
    pub customer: Option<Party>,
    pub supplier: Option<Party>,
    pub settings: StoreSettings,
}

#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Newest first.
    pub async fn list(&self, filter: &InvoiceFilter) -> DbResult<Vec<Invoice>> {
        let sql = format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices \
             WHERE (?1 IS NULL OR invoice_type = ?1) \
               AND (?2 IS NULL OR status = ?2) \
               AND (?3 IS NULL OR customer_id = ?3) \
               AND (?4 IS NULL OR supplier_id = ?4) \
             ORDER BY created_at DESC, invoice_number DESC \
             LIMIT ?5"
        );

        let limit = filter.limit.map(i64::from).unwrap_or(-1);

        let invoices = sqlx::query_as::<_, Invoice>(&sql)
            .bind(filter.invoice_type)
            .bind(filter.status)
            .bind(&filter.customer_id)
            .bind(&filter.supplier_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = invoices.len(), "Listed invoices");
        Ok(invoices)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Invoice>> {
        let mut conn = self.pool.acquire().await?;
        fetch_invoice(&mut conn, id).await
    }

    /// Items of one invoice in cart order.
    pub async fn items(&self, invoice_id: &str) -> DbResult<Vec<InvoiceItem>> {
        let mut conn = self.pool.acquire().await?;
        fetch_items(&mut conn, invoice_id).await
    }

    /// Invoice, items, party and store settings in one read.
    pub async fn receipt(&self, id: &str) -> DbResult<InvoiceReceipt> {
        let mut conn = self.pool.acquire().await?;

        let invoice = fetch_invoice(&mut conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", id))?;
        let items = fetch_items(&mut conn, id).await?;

        let customer = match &invoice.customer_id {
            Some(cid) => fetch_party(&mut conn, PartyKind::Customer, cid).await?,
            None => None,
        };
        let supplier = match &invoice.supplier_id {
            Some(sid) => fetch_party(&mut conn, PartyKind::Supplier, sid).await?,
            None => None,
        };
        let settings = fetch_settings(&mut conn).await?;

        Ok(InvoiceReceipt {
            invoice,
            items,
            customer,
            supplier,
            settings,
        })
    }

    /// Number of invoices still awaiting payment.
    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices WHERE status = ?1")
            .bind(InvoiceStatus::Pending)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Connection-level statements
// =============================================================================

pub(crate) async fn fetch_invoice(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<Invoice>> {
    let sql = format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ?1");

    let invoice = sqlx::query_as::<_, Invoice>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(invoice)
}

pub(crate) async fn fetch_items(
    conn: &mut SqliteConnection,
    invoice_id: &str,
) -> DbResult<Vec<InvoiceItem>> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM invoice_items WHERE invoice_id = ?1 ORDER BY position");

    let items = sqlx::query_as::<_, InvoiceItem>(&sql)
        .bind(invoice_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(items)
}

pub(crate) async fn insert_invoice(conn: &mut SqliteConnection, invoice: &Invoice) -> DbResult<()> {
    debug!(id = %invoice.id, number = %invoice.invoice_number, "Inserting invoice header");

    sqlx::query(
        r#"
        INSERT INTO invoices (
            id, invoice_number, invoice_type, customer_id, supplier_id,
            subtotal_cents, discount_cents, tax_cents, total_cents,
            paid_cents, remaining_cents, status, payment_method,
            notes, created_by, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
        "#,
    )
    .bind(&invoice.id)
    .bind(&invoice.invoice_number)
    .bind(invoice.invoice_type)
    .bind(&invoice.customer_id)
    .bind(&invoice.supplier_id)
    .bind(invoice.subtotal_cents)
    .bind(invoice.discount_cents)
    .bind(invoice.tax_cents)
    .bind(invoice.total_cents)
    .bind(invoice.paid_cents)
    .bind(invoice.remaining_cents)
    .bind(invoice.status)
    .bind(invoice.payment_method)
    .bind(&invoice.notes)
    .bind(&invoice.created_by)
    .bind(invoice.created_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::UniqueViolation { field, .. } => {
            DbError::duplicate(field, invoice.invoice_number.clone())
        }
        other => other,
    })?;

    Ok(())
}

pub(crate) async fn insert_item(conn: &mut SqliteConnection, item: &InvoiceItem) -> DbResult<()> {
    debug!(invoice_id = %item.invoice_id, product_id = %item.product_id, "Inserting invoice item");

    sqlx::query(
        r#"
        INSERT INTO invoice_items (
            id, invoice_id, product_id, product_name, quantity,
            price_cents, discount_cents, total_cents, position
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&item.id)
    .bind(&item.invoice_id)
    .bind(&item.product_id)
    .bind(&item.product_name)
    .bind(item.quantity)
    .bind(item.price_cents)
    .bind(item.discount_cents)
    .bind(item.total_cents)
    .bind(item.position)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
