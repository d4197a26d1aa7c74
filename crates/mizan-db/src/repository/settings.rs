//! # Store Settings Repository
//!
//! The single `store_settings` row (id = 1). The invoice processor reads it
//! inside its own transaction so a concurrent edit applies to whole invoices.

use chrono::Utc;
use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use mizan_core::validation::{
    validate_email, validate_invoice_prefix, validate_name, validate_tax_rate_bps, ValidationResult,
};
use mizan_core::{StoreSettings, ValidationError};

use super::clean_optional;
use crate::error::DbResult;

/// Partial update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub store_name: Option<String>,
    pub store_phone: Option<String>,
    pub store_email: Option<String>,
    pub store_address: Option<String>,
    pub currency: Option<String>,
    pub tax_rate_bps: Option<u32>,
    pub invoice_prefix: Option<String>,
    pub allow_negative_stock: Option<bool>,
}

impl SettingsUpdate {
    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(name) = &self.store_name {
            validate_name("store_name", name)?;
        }
        if let Some(email) = self.store_email.as_deref().filter(|e| !e.trim().is_empty()) {
            validate_email(email)?;
        }
        if let Some(currency) = &self.currency {
            if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(ValidationError::InvalidFormat {
                    field: "currency".to_string(),
                    reason: "must be a 3-letter code like USD".to_string(),
                });
            }
        }
        if let Some(bps) = self.tax_rate_bps {
            validate_tax_rate_bps(bps)?;
        }
        if let Some(prefix) = &self.invoice_prefix {
            validate_invoice_prefix(prefix)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    pub async fn get(&self) -> DbResult<StoreSettings> {
        let mut conn = self.pool.acquire().await?;
        fetch_settings(&mut conn).await
    }

    /// Applies a partial update and returns the stored settings.
    pub async fn update(&self, changes: &SettingsUpdate) -> DbResult<StoreSettings> {
        let mut settings = self.get().await?;

        if let Some(name) = &changes.store_name {
            settings.store_name = name.trim().to_string();
        }
        if changes.store_phone.is_some() {
            settings.store_phone = clean_optional(changes.store_phone.clone());
        }
        if changes.store_email.is_some() {
            settings.store_email = clean_optional(changes.store_email.clone());
        }
        if changes.store_address.is_some() {
            settings.store_address = clean_optional(changes.store_address.clone());
        }
        if let Some(currency) = &changes.currency {
            settings.currency = currency.to_uppercase();
        }
        if let Some(bps) = changes.tax_rate_bps {
            settings.tax_rate_bps = bps;
        }
        if let Some(prefix) = &changes.invoice_prefix {
            settings.invoice_prefix = prefix.clone();
        }
        if let Some(allow) = changes.allow_negative_stock {
            settings.allow_negative_stock = allow;
        }
        settings.updated_at = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO store_settings (
                id, store_name, store_phone, store_email, store_address,
                currency, tax_rate_bps, invoice_prefix, allow_negative_stock, updated_at
            ) VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(id) DO UPDATE SET
                store_name = excluded.store_name,
                store_phone = excluded.store_phone,
                store_email = excluded.store_email,
                store_address = excluded.store_address,
                currency = excluded.currency,
                tax_rate_bps = excluded.tax_rate_bps,
                invoice_prefix = excluded.invoice_prefix,
                allow_negative_stock = excluded.allow_negative_stock,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&settings.store_name)
        .bind(&settings.store_phone)
        .bind(&settings.store_email)
        .bind(&settings.store_address)
        .bind(&settings.currency)
        .bind(settings.tax_rate_bps)
        .bind(&settings.invoice_prefix)
        .bind(settings.allow_negative_stock)
        .bind(settings.updated_at)
        .execute(&self.pool)
        .await?;

        info!(
            tax_rate_bps = settings.tax_rate_bps,
            prefix = %settings.invoice_prefix,
            allow_negative_stock = settings.allow_negative_stock,
            "Store settings updated"
        );

        Ok(settings)
    }
}

/// Reads the settings row, falling back to defaults if it is missing.
pub(crate) async fn fetch_settings(conn: &mut SqliteConnection) -> DbResult<StoreSettings> {
    let settings = sqlx::query_as::<_, StoreSettings>(
        r#"
        SELECT store_name, store_phone, store_email, store_address, currency,
               tax_rate_bps, invoice_prefix, allow_negative_stock, updated_at
        FROM store_settings
        WHERE id = 1
        "#,
    )
    .fetch_optional(&mut *conn)
    .await?;

    Ok(settings.unwrap_or_default())
}
