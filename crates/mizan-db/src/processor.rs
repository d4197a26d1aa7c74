//! # Invoice Processor
//!
//! Turns a till draft into a persisted invoice and applies its side effects.
//!
//! ## One Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  check_parties(draft)                        pure, before any I/O       │
//! │  BEGIN                                                                  │
//! │  ├── invoice_sequence += 1  ──► INV000042    first write takes the lock │
//! │  ├── store_settings         ──► tax rate, prefix, stock policy          │
//! │  ├── parties exist?                                                     │
//! │  ├── price_invoice(draft, rate)                                         │
//! │  ├── INSERT invoices                                                    │
//! │  ├── per line: StockLedger Δ, INSERT invoice_items                      │
//! │  ├── credit remainder ──► BalanceLedger                                 │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any error drops the transaction: no header, no items, no stock or      │
//! │  balance movement, and the sequence value is handed out again.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use mizan_core::invoice::{check_parties, format_invoice_number, price_invoice, InvoiceDraft};
use mizan_core::{CoreError, Invoice, InvoiceItem, InvoiceType, PartyKind};

use crate::error::{DbError, LedgerResult};
use crate::ledger::balance::apply_credit_in;
use crate::ledger::stock::{adjust_in, adjust_with_floor_in};
use crate::repository::generate_id;
use crate::repository::invoice::{insert_invoice, insert_item};
use crate::repository::party::fetch_party;
use crate::repository::settings::fetch_settings;

/// A committed invoice as stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedInvoice {
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
}

#[derive(Debug, Clone)]
pub struct InvoiceProcessor {
    pool: SqlitePool,
}

impl InvoiceProcessor {
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceProcessor { pool }
    }

    /// Prices, numbers and persists `draft`, then moves stock and balances.
    ///
    /// ## Returns
    /// * `Err(LedgerError::Core(..))` - the draft was rejected
    ///   (`EmptyCart`, `MissingParty`, `NotFound`, `InsufficientStock`, ...)
    /// * `Err(LedgerError::Persistence(..))` - storage failed
    ///
    /// Either way nothing was written.
    pub async fn process(
        &self,
        draft: &InvoiceDraft,
        created_by: Option<&str>,
    ) -> LedgerResult<ProcessedInvoice> {
        check_parties(draft)?;

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let sequence = next_sequence(&mut tx).await?;
        let settings = fetch_settings(&mut tx).await?;

        if let Some(customer_id) = &draft.customer_id {
            ensure_party(&mut tx, PartyKind::Customer, customer_id).await?;
        }
        if let Some(supplier_id) = &draft.supplier_id {
            ensure_party(&mut tx, PartyKind::Supplier, supplier_id).await?;
        }

        let priced = price_invoice(draft, settings.tax_rate_for(draft.invoice_type))?;

        let invoice = Invoice {
            id: generate_id(),
            invoice_number: format_invoice_number(&settings.invoice_prefix, sequence),
            invoice_type: draft.invoice_type,
            customer_id: draft.customer_id.clone(),
            supplier_id: draft.supplier_id.clone(),
            subtotal_cents: priced.subtotal.cents(),
            discount_cents: priced.discount.cents(),
            tax_cents: priced.tax.cents(),
            total_cents: priced.total.cents(),
            paid_cents: priced.paid.cents(),
            remaining_cents: priced.remaining.cents(),
            status: priced.status,
            payment_method: draft.payment_method,
            notes: draft
                .notes
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
            created_by: created_by.map(str::to_string),
            created_at: Utc::now(),
        };

        insert_invoice(&mut tx, &invoice).await?;

        let mut items = Vec::with_capacity(priced.lines.len());
        for (position, line) in priced.lines.iter().enumerate() {
            let delta = draft.invoice_type.stock_delta(line.quantity);
            if delta < 0 && !settings.allow_negative_stock {
                adjust_with_floor_in(&mut tx, &line.product_id, delta).await?;
            } else {
                adjust_in(&mut tx, &line.product_id, delta).await?;
            }

            let item = InvoiceItem {
                id: generate_id(),
                invoice_id: invoice.id.clone(),
                product_id: line.product_id.clone(),
                product_name: line.product_name.clone(),
                quantity: line.quantity,
                price_cents: line.price_cents,
                discount_cents: line.discount_cents,
                total_cents: line.total.cents(),
                position: position as i64,
            };
            insert_item(&mut tx, &item).await?;
            items.push(item);
        }

        if priced.remaining.is_positive() {
            if let Some((kind, party_id)) = credited_party(&invoice) {
                apply_credit_in(&mut tx, kind, party_id, priced.remaining, priced.total).await?;
            }
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(
            number = %invoice.invoice_number,
            kind = %invoice.invoice_type,
            total = invoice.total_cents,
            remaining = invoice.remaining_cents,
            lines = items.len(),
            "Invoice processed"
        );

        Ok(ProcessedInvoice { invoice, items })
    }
}

/// Reserves the next invoice sequence value.
async fn next_sequence(conn: &mut SqliteConnection) -> LedgerResult<i64> {
    let value: i64 = sqlx::query_scalar(
        "UPDATE invoice_sequence SET last_value = last_value + 1 WHERE id = 1 RETURNING last_value",
    )
    .fetch_one(&mut *conn)
    .await?;

    debug!(sequence = value, "Reserved invoice sequence");
    Ok(value)
}

async fn ensure_party(conn: &mut SqliteConnection, kind: PartyKind, id: &str) -> LedgerResult<()> {
    fetch_party(conn, kind, id)
        .await?
        .map(|_| ())
        .ok_or_else(|| CoreError::not_found(kind.label(), id).into())
}

/// Party whose balance carries an unpaid remainder. Returns never do.
fn credited_party(invoice: &Invoice) -> Option<(PartyKind, &str)> {
    match invoice.invoice_type {
        InvoiceType::Sale => invoice
            .customer_id
            .as_deref()
            .map(|id| (PartyKind::Customer, id)),
        InvoiceType::Purchase => invoice
            .supplier_id
            .as_deref()
            .map(|id| (PartyKind::Supplier, id)),
        InvoiceType::Return => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::pool::{Database, DbConfig};
    use crate::repository::party::NewParty;
    use crate::repository::product::NewProduct;
    use crate::repository::settings::SettingsUpdate;
    use crate::testing::TempDb;
    use mizan_core::invoice::DraftLine;
    use mizan_core::{InvoiceStatus, PaymentMethod};

    struct Fixture {
        db: Database,
        a: String,
        b: String,
        customer: String,
        supplier: String,
    }

    async fn fixture() -> Fixture {
        fixture_on(Database::new(DbConfig::in_memory()).await.unwrap()).await
    }

    async fn fixture_on(db: Database) -> Fixture {

        let product = |sku: &str, price: i64| NewProduct {
            name: format!("Product {sku}"),
            description: None,
            sku: sku.into(),
            barcode: None,
            category_id: None,
            price_cents: price,
            cost_cents: price / 2,
            quantity: 10,
            min_quantity: 0,
            unit: None,
        };
        let party = |name: &str| NewParty {
            name: name.into(),
            phone: None,
            email: None,
            address: None,
        };

        let a = db.products().create(&product("A", 100)).await.unwrap().id;
        let b = db.products().create(&product("B", 50)).await.unwrap().id;
        let customer = db.customers().create(&party("Zara")).await.unwrap().id;
        let supplier = db.suppliers().create(&party("Metro")).await.unwrap().id;

        Fixture {
            db,
            a,
            b,
            customer,
            supplier,
        }
    }

    fn cart(f: &Fixture, invoice_type: InvoiceType, method: PaymentMethod) -> InvoiceDraft {
        InvoiceDraft {
            invoice_type,
            customer_id: None,
            supplier_id: None,
            payment_method: method,
            discount_cents: 0,
            amount_paid_cents: None,
            notes: None,
            items: vec![
                DraftLine::new(&f.a, "A", 2, 100),
                DraftLine::new(&f.b, "B", 1, 50),
            ],
        }
    }

    async fn quantity(db: &Database, id: &str) -> i64 {
        db.products().get_by_id(id).await.unwrap().unwrap().quantity
    }

    #[tokio::test]
    async fn cash_sale_completes_and_moves_stock() {
        let f = fixture().await;

        let done = f
            .db
            .processor()
            .process(&cart(&f, InvoiceType::Sale, PaymentMethod::Cash), Some("u-1"))
            .await
            .unwrap();

        let inv = &done.invoice;
        assert_eq!(inv.invoice_number, "INV000001");
        assert_eq!(inv.subtotal_cents, 250);
        assert_eq!(inv.total_cents, 250);
        assert_eq!(inv.paid_cents, 250);
        assert_eq!(inv.remaining_cents, 0);
        assert_eq!(inv.status, InvoiceStatus::Completed);
        assert_eq!(inv.created_by.as_deref(), Some("u-1"));
        assert_eq!(done.items.len(), 2);

        assert_eq!(quantity(&f.db, &f.a).await, 8);
        assert_eq!(quantity(&f.db, &f.b).await, 9);
    }

    #[tokio::test]
    async fn persisted_invoice_reads_back_identically() {
        let f = fixture().await;

        let done = f
            .db
            .processor()
            .process(&cart(&f, InvoiceType::Sale, PaymentMethod::Card), None)
            .await
            .unwrap();

        let stored = f.db.invoices().get_by_id(&done.invoice.id).await.unwrap().unwrap();
        let items = f.db.invoices().items(&done.invoice.id).await.unwrap();
        assert_eq!(stored.total_cents, done.invoice.total_cents);
        assert_eq!(stored.invoice_number, done.invoice.invoice_number);
        assert_eq!(items, done.items);
    }

    #[tokio::test]
    async fn credit_sale_leaves_remainder_on_customer() {
        let f = fixture().await;
        let mut draft = cart(&f, InvoiceType::Sale, PaymentMethod::Credit);
        draft.customer_id = Some(f.customer.clone());
        draft.amount_paid_cents = Some(100);

        let done = f.db.processor().process(&draft, None).await.unwrap();

        assert_eq!(done.invoice.remaining_cents, 150);
        assert_eq!(done.invoice.status, InvoiceStatus::Pending);

        let customer = f.db.customers().get_by_id(&f.customer).await.unwrap().unwrap();
        assert_eq!(customer.balance_cents, 150);
        assert_eq!(customer.total_purchases_cents, 250);

        let audit = f
            .db
            .balances()
            .audit(PartyKind::Customer, &f.customer)
            .await
            .unwrap();
        assert!(audit.is_consistent());
    }

    #[tokio::test]
    async fn credit_purchase_owes_supplier_and_restocks() {
        let f = fixture().await;
        let mut draft = cart(&f, InvoiceType::Purchase, PaymentMethod::Credit);
        draft.supplier_id = Some(f.supplier.clone());

        f.db.processor().process(&draft, None).await.unwrap();

        let supplier = f.db.suppliers().get_by_id(&f.supplier).await.unwrap().unwrap();
        assert_eq!(supplier.balance_cents, 250);
        assert_eq!(quantity(&f.db, &f.a).await, 12);
    }

    #[tokio::test]
    async fn purchases_are_not_taxed() {
        let f = fixture().await;
        f.db.settings()
            .update(&SettingsUpdate {
                tax_rate_bps: Some(1000),
                ..Default::default()
            })
            .await
            .unwrap();

        let sale = f
            .db
            .processor()
            .process(&cart(&f, InvoiceType::Sale, PaymentMethod::Cash), None)
            .await
            .unwrap();
        let purchase = f
            .db
            .processor()
            .process(&cart(&f, InvoiceType::Purchase, PaymentMethod::Cash), None)
            .await
            .unwrap();

        assert_eq!(sale.invoice.tax_cents, 25);
        assert_eq!(sale.invoice.total_cents, 275);
        assert_eq!(purchase.invoice.tax_cents, 0);
    }

    #[tokio::test]
    async fn credit_sale_without_customer_is_rejected() {
        let f = fixture().await;

        let err = f
            .db
            .processor()
            .process(&cart(&f, InvoiceType::Sale, PaymentMethod::Credit), None)
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::Core(CoreError::MissingParty { .. })));
    }

    #[tokio::test]
    async fn failure_midway_leaves_nothing_behind() {
        let f = fixture().await;
        let mut draft = cart(&f, InvoiceType::Sale, PaymentMethod::Credit);
        draft.customer_id = Some(f.customer.clone());
        // Second line points at a product that does not exist
        draft.items[1].product_id = "ghost".into();

        let err = f.db.processor().process(&draft, None).await.unwrap_err();
        assert!(matches!(err, LedgerError::Core(CoreError::NotFound { .. })));

        assert!(f.db.invoices().list(&Default::default()).await.unwrap().is_empty());
        assert_eq!(quantity(&f.db, &f.a).await, 10);
        let customer = f.db.customers().get_by_id(&f.customer).await.unwrap().unwrap();
        assert_eq!(customer.balance_cents, 0);

        // The rolled-back sequence value is reused
        let next = f
            .db
            .processor()
            .process(&cart(&f, InvoiceType::Sale, PaymentMethod::Cash), None)
            .await
            .unwrap();
        assert_eq!(next.invoice.invoice_number, "INV000001");
    }

    #[tokio::test]
    async fn oversell_rejected_when_negative_stock_is_off() {
        let f = fixture().await;
        f.db.settings()
            .update(&SettingsUpdate {
                allow_negative_stock: Some(false),
                ..Default::default()
            })
            .await
            .unwrap();

        let mut draft = cart(&f, InvoiceType::Sale, PaymentMethod::Cash);
        draft.items[0].quantity = 11;

        let err = f.db.processor().process(&draft, None).await.unwrap_err();

        assert!(matches!(
            err,
            LedgerError::Core(CoreError::InsufficientStock { available: 10, requested: 11, .. })
        ));
        assert_eq!(quantity(&f.db, &f.a).await, 10);
    }

    #[tokio::test]
    async fn oversell_allowed_by_default() {
        let f = fixture().await;
        let mut draft = cart(&f, InvoiceType::Sale, PaymentMethod::Cash);
        draft.items[0].quantity = 11;

        f.db.processor().process(&draft, None).await.unwrap();

        assert_eq!(quantity(&f.db, &f.a).await, -1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_invoices_get_distinct_numbers() {
        let temp = TempDb::new().await;
        let f = fixture_on(temp.db.clone()).await;

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let processor = f.db.processor();
                let draft = cart(&f, InvoiceType::Sale, PaymentMethod::Cash);
                tokio::spawn(async move { processor.process(&draft, None).await })
            })
            .collect();

        let mut numbers = Vec::new();
        for handle in handles {
            numbers.push(handle.await.unwrap().unwrap().invoice.invoice_number);
        }
        numbers.sort();
        numbers.dedup();

        assert_eq!(numbers.len(), 10);
        assert_eq!(numbers.first().map(String::as_str), Some("INV000001"));
        assert_eq!(numbers.last().map(String::as_str), Some("INV000010"));
        // Ten sales of two units each
        assert_eq!(quantity(&f.db, &f.a).await, 10 - 20);
    }

    #[tokio::test]
    async fn credit_return_is_rejected_before_anything_is_written() {
        let f = fixture().await;
        let mut draft = cart(&f, InvoiceType::Return, PaymentMethod::Credit);
        draft.customer_id = Some(f.customer.clone());

        let err = f.db.processor().process(&draft, None).await.unwrap_err();

        assert!(matches!(err, LedgerError::Core(CoreError::Validation(_))));
        assert!(f.db.invoices().list(&Default::default()).await.unwrap().is_empty());
        assert_eq!(quantity(&f.db, &f.a).await, 10);
        let audit = f
            .db
            .balances()
            .audit(PartyKind::Customer, &f.customer)
            .await
            .unwrap();
        assert!(audit.is_consistent());
    }

    #[tokio::test]
    async fn return_restocks_without_touching_balance() {
        let f = fixture().await;
        let mut draft = cart(&f, InvoiceType::Return, PaymentMethod::Cash);
        draft.customer_id = Some(f.customer.clone());

        f.db.processor().process(&draft, None).await.unwrap();

        assert_eq!(quantity(&f.db, &f.a).await, 12);
        let customer = f.db.customers().get_by_id(&f.customer).await.unwrap().unwrap();
        assert_eq!(customer.balance_cents, 0);
    }
}
