//! # Balance Ledger
//!
//! Outstanding debt per customer (they owe us) and per supplier (we owe them).
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  credit invoice, remaining R, total T                                   │
//! │      balance += R, total_purchases += T        (apply_credit_*)         │
//! │                                                                         │
//! │  debt payment P                                                         │
//! │      0 < P ≤ MAX_AMOUNT_CENTS ? ── no ──► InvalidPayment                 │
//! │            │ yes                                                        │
//! │            ▼                                                            │
//! │      UPDATE ... balance = balance − P WHERE balance ≥ P   (first write) │
//! │            │ no row ──► NotFound or InvalidPayment, rolled back         │
//! │            ▼                                                            │
//! │      INSERT party_payments (previous, amount, new, receipt)             │
//! │      ──► PaymentReceipt                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariant
//! `balance == Σ remaining of the party's credit invoices − Σ payments`.
//! [`BalanceLedger::audit`] recomputes the right-hand side and reports drift.

use chrono::Utc;
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use mizan_core::invoice::format_receipt_number;
use mizan_core::validation::validate_payment_amount;
use mizan_core::{CoreError, Money, PartyKind, PaymentMethod, PaymentReceipt};

use crate::error::{DbError, LedgerResult};
use crate::repository::generate_id;
use crate::repository::party::fetch_party;

/// Result of checking a stored balance against the invoice and payment history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceAudit {
    pub party_kind: PartyKind,
    pub party_id: String,
    pub stored_cents: i64,
    pub expected_cents: i64,
    /// `stored − expected`. Zero when consistent.
    pub drift_cents: i64,
}

impl BalanceAudit {
    pub fn is_consistent(&self) -> bool {
        self.drift_cents == 0
    }
}

/// Invoice column that references a party of `kind`.
const fn invoice_party_column(kind: PartyKind) -> &'static str {
    match kind {
        PartyKind::Customer => "customer_id",
        PartyKind::Supplier => "supplier_id",
    }
}

#[derive(Debug, Clone)]
pub struct BalanceLedger {
    pool: SqlitePool,
}

impl BalanceLedger {
    pub fn new(pool: SqlitePool) -> Self {
        BalanceLedger { pool }
    }

    /// Records a credit sale's unpaid remainder against the customer.
    pub async fn apply_credit_sale(
        &self,
        customer_id: &str,
        remaining: Money,
        invoice_total: Money,
    ) -> LedgerResult<()> {
        let mut conn = self.pool.acquire().await.map_err(DbError::from)?;
        apply_credit_in(&mut conn, PartyKind::Customer, customer_id, remaining, invoice_total).await
    }

    /// Records a credit purchase's unpaid remainder against the supplier.
    pub async fn apply_credit_purchase(
        &self,
        supplier_id: &str,
        remaining: Money,
        invoice_total: Money,
    ) -> LedgerResult<()> {
        let mut conn = self.pool.acquire().await.map_err(DbError::from)?;
        apply_credit_in(&mut conn, PartyKind::Supplier, supplier_id, remaining, invoice_total).await
    }

    /// Pays down a party's balance and returns the receipt.
    ///
    /// ## Returns
    /// * `Err(CoreError::InvalidPayment)` - amount ≤ 0 or above the balance;
    ///   the balance is unchanged
    /// * `Err(CoreError::NotFound)` - unknown party
    ///
    /// ## Example
    /// ```rust,ignore
    /// let receipt = db
    ///     .balances()
    ///     .apply_payment(PartyKind::Customer, &id, Money::from_cents(500), None, Some("u-1"))
    ///     .await?;
    /// assert_eq!(receipt.new_balance_cents, 0);
    /// ```
    pub async fn apply_payment(
        &self,
        kind: PartyKind,
        party_id: &str,
        amount: Money,
        notes: Option<String>,
        created_by: Option<String>,
    ) -> LedgerResult<PaymentReceipt> {
        if let Err(e) = validate_payment_amount(amount.cents()) {
            warn!(kind = %kind, party_id = %party_id, amount = amount.cents(), "Rejected payment amount");
            return Err(CoreError::invalid_payment(e.to_string()).into());
        }

        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let now = Utc::now();
        let sql = format!(
            "UPDATE {} SET balance_cents = balance_cents - ?2, updated_at = ?3 \
             WHERE id = ?1 AND balance_cents >= ?2 \
             RETURNING balance_cents, name",
            kind.table()
        );

        // Write first: the transaction holds the write lock from here on, and
        // a concurrent payment that got there first leaves no row
        let updated: Option<(i64, String)> = sqlx::query_as(&sql)
            .bind(party_id)
            .bind(amount.cents())
            .bind(now)
            .fetch_optional(&mut *tx)
            .await?;

        let Some((new_balance, party_name)) = updated else {
            let party = fetch_party(&mut tx, kind, party_id)
                .await?
                .ok_or_else(|| CoreError::not_found(kind.label(), party_id))?;

            warn!(
                kind = %kind,
                party_id = %party_id,
                amount = amount.cents(),
                balance = party.balance_cents,
                "Rejected payment above balance"
            );
            return Err(CoreError::invalid_payment(format!(
                "amount {} exceeds outstanding balance {}",
                amount,
                party.balance()
            ))
            .into());
        };
        let previous_balance = new_balance + amount.cents();

        let receipt_number = format_receipt_number(now.timestamp_millis());

        sqlx::query(
            r#"
            INSERT INTO party_payments (
                id, party_kind, party_id, amount_cents, previous_balance_cents,
                new_balance_cents, receipt_number, notes, created_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(generate_id())
        .bind(kind)
        .bind(party_id)
        .bind(amount.cents())
        .bind(previous_balance)
        .bind(new_balance)
        .bind(&receipt_number)
        .bind(&notes)
        .bind(&created_by)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            kind = %kind,
            party_id = %party_id,
            amount = amount.cents(),
            previous_balance,
            new_balance,
            receipt = %receipt_number,
            "Debt payment recorded"
        );

        Ok(PaymentReceipt {
            receipt_number,
            party_kind: kind,
            party_id: party_id.to_string(),
            party_name,
            previous_balance_cents: previous_balance,
            amount_cents: amount.cents(),
            new_balance_cents: new_balance,
            notes,
            timestamp: now,
        })
    }

    /// Compares the stored balance with credit invoices minus payments.
    ///
    /// Only sales and purchases carry debt; returns are always settled.
    pub async fn audit(&self, kind: PartyKind, party_id: &str) -> LedgerResult<BalanceAudit> {
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let party = fetch_party(&mut tx, kind, party_id)
            .await?
            .ok_or_else(|| CoreError::not_found(kind.label(), party_id))?;

        let sql = format!(
            "SELECT COALESCE(SUM(remaining_cents), 0) FROM invoices \
             WHERE {} = ?1 AND payment_method = ?2 \
               AND invoice_type IN ('sale', 'purchase')",
            invoice_party_column(kind)
        );
        let credited: i64 = sqlx::query_scalar(&sql)
            .bind(party_id)
            .bind(PaymentMethod::Credit)
            .fetch_one(&mut *tx)
            .await?;

        let paid: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount_cents), 0) FROM party_payments
            WHERE party_kind = ?1 AND party_id = ?2
            "#,
        )
        .bind(kind)
        .bind(party_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await.map_err(DbError::from)?;

        let expected = credited - paid;
        let audit = BalanceAudit {
            party_kind: kind,
            party_id: party.id,
            stored_cents: party.balance_cents,
            expected_cents: expected,
            drift_cents: party.balance_cents - expected,
        };

        if !audit.is_consistent() {
            warn!(
                kind = %kind,
                party_id = %party_id,
                stored = audit.stored_cents,
                expected = audit.expected_cents,
                "Balance drift detected"
            );
        }

        Ok(audit)
    }
}

/// Adds a credit invoice's remainder and total to a party, on an open
/// connection or transaction.
pub(crate) async fn apply_credit_in(
    conn: &mut SqliteConnection,
    kind: PartyKind,
    party_id: &str,
    remaining: Money,
    invoice_total: Money,
) -> LedgerResult<()> {
    let sql = format!(
        "UPDATE {} SET balance_cents = balance_cents + ?2, \
         total_purchases_cents = total_purchases_cents + ?3, updated_at = ?4 \
         WHERE id = ?1",
        kind.table()
    );

    let result = sqlx::query(&sql)
        .bind(party_id)
        .bind(remaining.cents())
        .bind(invoice_total.cents())
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::not_found(kind.label(), party_id).into());
    }

    debug!(
        kind = %kind,
        party_id = %party_id,
        remaining = remaining.cents(),
        total = invoice_total.cents(),
        "Credit applied to balance"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::pool::{Database, DbConfig};
    use crate::repository::invoice::insert_invoice;
    use crate::repository::party::NewParty;
    use crate::testing::TempDb;
    use mizan_core::{Invoice, InvoiceStatus, InvoiceType};

    async fn customer_owing(db: &Database, cents: i64) -> String {
        let customer = db
            .customers()
            .create(&NewParty {
                name: "Bilal".into(),
                phone: None,
                email: None,
                address: None,
            })
            .await
            .unwrap();
        if cents > 0 {
            db.balances()
                .apply_credit_sale(&customer.id, Money::from_cents(cents), Money::from_cents(cents))
                .await
                .unwrap();
        }
        customer.id
    }

    async fn balance_of(db: &Database, id: &str) -> i64 {
        db.customers().get_by_id(id).await.unwrap().unwrap().balance_cents
    }

    #[tokio::test]
    async fn credit_sale_raises_balance_and_lifetime_total() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let id = customer_owing(&db, 0).await;

        db.balances()
            .apply_credit_sale(&id, Money::from_cents(150), Money::from_cents(250))
            .await
            .unwrap();

        let customer = db.customers().get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(customer.balance_cents, 150);
        assert_eq!(customer.total_purchases_cents, 250);
    }

    #[tokio::test]
    async fn payment_of_full_balance_clears_it() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let id = customer_owing(&db, 500).await;

        let receipt = db
            .balances()
            .apply_payment(PartyKind::Customer, &id, Money::from_cents(500), Some("cash".into()), None)
            .await
            .unwrap();

        assert_eq!(receipt.previous_balance_cents, 500);
        assert_eq!(receipt.new_balance_cents, 0);
        assert_eq!(receipt.party_name, "Bilal");
        assert!(receipt.receipt_number.starts_with("REC"));
        assert_eq!(balance_of(&db, &id).await, 0);

        let history = db.customers().payments(&id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].amount_cents, 500);
    }

    #[tokio::test]
    async fn overpayment_is_rejected_and_balance_unchanged() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let id = customer_owing(&db, 500).await;

        let err = db
            .balances()
            .apply_payment(PartyKind::Customer, &id, Money::from_cents(600), None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::Core(CoreError::InvalidPayment { .. })));
        assert_eq!(balance_of(&db, &id).await, 500);
        assert!(db.customers().payments(&id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn zero_and_negative_payments_are_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let id = customer_owing(&db, 500).await;

        for cents in [0, -100] {
            let err = db
                .balances()
                .apply_payment(PartyKind::Customer, &id, Money::from_cents(cents), None, None)
                .await
                .unwrap_err();
            assert!(matches!(err, LedgerError::Core(CoreError::InvalidPayment { .. })));
        }
        assert_eq!(balance_of(&db, &id).await, 500);
    }

    #[tokio::test]
    async fn payment_to_unknown_party_is_not_found() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let err = db
            .balances()
            .apply_payment(PartyKind::Supplier, "missing", Money::from_cents(1), None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::Core(CoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn audit_flags_balance_without_invoices() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        // Credit applied directly, with no invoice behind it
        let id = customer_owing(&db, 300).await;

        let audit = db.balances().audit(PartyKind::Customer, &id).await.unwrap();

        assert_eq!(audit.stored_cents, 300);
        assert_eq!(audit.expected_cents, 0);
        assert_eq!(audit.drift_cents, 300);
        assert!(!audit.is_consistent());
    }

    #[tokio::test]
    async fn payment_above_max_amount_is_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let id = customer_owing(&db, 500).await;

        let err = db
            .balances()
            .apply_payment(PartyKind::Customer, &id, Money::from_cents(i64::MAX), None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, LedgerError::Core(CoreError::InvalidPayment { .. })));
        assert_eq!(balance_of(&db, &id).await, 500);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_payments_all_land() {
        let temp = TempDb::new().await;
        let db = &temp.db;
        let id = customer_owing(db, 1000).await;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = db.balances();
                let id = id.clone();
                tokio::spawn(async move {
                    ledger
                        .apply_payment(PartyKind::Customer, &id, Money::from_cents(100), None, None)
                        .await
                })
            })
            .collect();

        let mut receipts = Vec::new();
        for handle in handles {
            receipts.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(balance_of(db, &id).await, 200);
        assert_eq!(db.customers().payments(&id).await.unwrap().len(), 8);

        // Each receipt saw the balance left by the one before it
        let mut after: Vec<i64> = receipts.iter().map(|r| r.new_balance_cents).collect();
        after.sort_unstable();
        assert_eq!(after, vec![200, 300, 400, 500, 600, 700, 800, 900]);
        assert!(receipts
            .iter()
            .all(|r| r.previous_balance_cents == r.new_balance_cents + 100));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_overdraw_keeps_balance_at_zero() {
        let temp = TempDb::new().await;
        let db = &temp.db;
        let id = customer_owing(db, 300).await;

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let ledger = db.balances();
                let id = id.clone();
                tokio::spawn(async move {
                    ledger
                        .apply_payment(PartyKind::Customer, &id, Money::from_cents(100), None, None)
                        .await
                })
            })
            .collect();

        let mut accepted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(err) => {
                    assert!(matches!(err, LedgerError::Core(CoreError::InvalidPayment { .. })))
                }
            }
        }

        assert_eq!(accepted, 3);
        assert_eq!(balance_of(db, &id).await, 0);
    }

    #[tokio::test]
    async fn audit_ignores_returns() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let id = customer_owing(&db, 0).await;

        // A stored credit return left unpaid, as older data may hold
        let stale_return = Invoice {
            id: generate_id(),
            invoice_number: "INV000001".into(),
            invoice_type: InvoiceType::Return,
            customer_id: Some(id.clone()),
            supplier_id: None,
            subtotal_cents: 100,
            discount_cents: 0,
            tax_cents: 0,
            total_cents: 100,
            paid_cents: 0,
            remaining_cents: 100,
            status: InvoiceStatus::Pending,
            payment_method: PaymentMethod::Credit,
            notes: None,
            created_by: None,
            created_at: Utc::now(),
        };
        let mut conn = db.pool().acquire().await.unwrap();
        insert_invoice(&mut conn, &stale_return).await.unwrap();
        drop(conn);

        let audit = db.balances().audit(PartyKind::Customer, &id).await.unwrap();

        assert_eq!(audit.expected_cents, 0);
        assert!(audit.is_consistent());
    }
}
