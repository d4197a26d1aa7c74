//! # Party Repository
//!
//! Customers and suppliers share one shape and live in two tables. A single
//! repository serves both, keyed by [`PartyKind`].
//!
//! `balance_cents` and `total_purchases_cents` start at zero here and are
//! only moved by [`crate::ledger::balance::BalanceLedger`].

use chrono::Utc;
use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use mizan_core::validation::{validate_email, validate_name, ValidationResult};
use mizan_core::{Party, PartyKind, PartyPayment};

use super::{clean_optional, generate_id};
use crate::error::{DbError, DbResult};

const PARTY_COLUMNS: &str = "id, name, phone, email, address, balance_cents, \
     total_purchases_cents, created_at, updated_at";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewParty {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

impl NewParty {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name)?;
        if let Some(email) = self.email.as_deref().filter(|e| !e.trim().is_empty()) {
            validate_email(email)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PartyRepository {
    pool: SqlitePool,
    kind: PartyKind,
}

impl PartyRepository {
    pub fn new(pool: SqlitePool, kind: PartyKind) -> Self {
        PartyRepository { pool, kind }
    }

    pub fn kind(&self) -> PartyKind {
        self.kind
    }

    /// All parties of this kind, ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Party>> {
        let sql = format!("SELECT {PARTY_COLUMNS} FROM {} ORDER BY name", self.kind.table());

        let parties = sqlx::query_as::<_, Party>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(parties)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Party>> {
        let mut conn = self.pool.acquire().await?;
        fetch_party(&mut conn, self.kind, id).await
    }

    /// Parties that owe (customers) or are owed (suppliers), largest first.
    pub async fn debtors(&self) -> DbResult<Vec<Party>> {
        let sql = format!(
            "SELECT {PARTY_COLUMNS} FROM {} WHERE balance_cents > 0 \
             ORDER BY balance_cents DESC, name",
            self.kind.table()
        );

        let parties = sqlx::query_as::<_, Party>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(parties)
    }

    pub async fn create(&self, input: &NewParty) -> DbResult<Party> {
        let now = Utc::now();
        let party = Party {
            id: generate_id(),
            name: input.name.trim().to_string(),
            phone: clean_optional(input.phone.clone()),
            email: clean_optional(input.email.clone()),
            address: clean_optional(input.address.clone()),
            balance_cents: 0,
            total_purchases_cents: 0,
            created_at: now,
            updated_at: now,
        };

        debug!(kind = %self.kind, name = %party.name, "Inserting party");

        let sql = format!(
            "INSERT INTO {} (id, name, phone, email, address, balance_cents, \
             total_purchases_cents, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, 0, 0, ?6, ?7)",
            self.kind.table()
        );

        sqlx::query(&sql)
            .bind(&party.id)
            .bind(&party.name)
            .bind(&party.phone)
            .bind(&party.email)
            .bind(&party.address)
            .bind(party.created_at)
            .bind(party.updated_at)
            .execute(&self.pool)
            .await?;

        Ok(party)
    }

    /// Debt payment history, newest first.
    pub async fn payments(&self, id: &str) -> DbResult<Vec<PartyPayment>> {
        let payments = sqlx::query_as::<_, PartyPayment>(
            r#"
            SELECT id, party_kind, party_id, amount_cents, previous_balance_cents,
                   new_balance_cents, receipt_number, notes, created_by, created_at
            FROM party_payments
            WHERE party_kind = ?1 AND party_id = ?2
            ORDER BY created_at DESC
            "#,
        )
        .bind(self.kind)
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }
}

/// Reads one party on an existing connection (pool or open transaction).
pub(crate) async fn fetch_party(
    conn: &mut SqliteConnection,
    kind: PartyKind,
    id: &str,
) -> DbResult<Option<Party>> {
    let sql = format!("SELECT {PARTY_COLUMNS} FROM {} WHERE id = ?1", kind.table());

    sqlx::query_as::<_, Party>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(DbError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn new_party(name: &str) -> NewParty {
        NewParty {
            name: name.into(),
            phone: Some("0300-1234567".into()),
            email: None,
            address: None,
        }
    }

    #[tokio::test]
    async fn customers_and_suppliers_are_separate() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let customer = db.customers().create(&new_party("Ayesha")).await.unwrap();
        db.suppliers().create(&new_party("Wholesale Co")).await.unwrap();

        assert_eq!(db.customers().list().await.unwrap().len(), 1);
        assert!(db.suppliers().get_by_id(&customer.id).await.unwrap().is_none());
        assert_eq!(customer.balance_cents, 0);
    }

    #[tokio::test]
    async fn debtors_lists_only_positive_balances() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let owes = db.customers().create(&new_party("Owes")).await.unwrap();
        db.customers().create(&new_party("Clear")).await.unwrap();

        sqlx::query("UPDATE customers SET balance_cents = 500 WHERE id = ?1")
            .bind(&owes.id)
            .execute(db.pool())
            .await
            .unwrap();

        let debtors = db.customers().debtors().await.unwrap();
        assert_eq!(debtors.len(), 1);
        assert_eq!(debtors[0].id, owes.id);
    }

    #[test]
    fn blank_email_is_allowed_but_bad_email_is_not() {
        let mut input = new_party("Ayesha");
        input.email = Some(" ".into());
        assert!(input.validate().is_ok());
        input.email = Some("ayesha".into());
        assert!(input.validate().is_err());
    }
}
