//! # Product Repository
//!
//! Catalog CRUD. On-hand `quantity` is set once at creation; every later
//! change goes through [`crate::ledger::stock::StockLedger`].

use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::debug;

use mizan_core::validation::{validate_amount_cents, validate_name, validate_sku, ValidationResult};
use mizan_core::{Product, ValidationError};

use super::{clean_optional, generate_id};
use crate::error::{DbError, DbResult};

const PRODUCT_COLUMNS: &str = "id, name, description, sku, barcode, category_id, \
     price_cents, cost_cents, quantity, min_quantity, unit, is_active, created_at, updated_at";

// =============================================================================
// Inputs
// =============================================================================

/// Fields for a new product.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub sku: String,
    pub barcode: Option<String>,
    pub category_id: Option<String>,
    pub price_cents: i64,
    #[serde(default)]
    pub cost_cents: i64,
    /// Opening stock.
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub min_quantity: i64,
    pub unit: Option<String>,
}

impl NewProduct {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name)?;
        validate_sku(&self.sku)?;
        validate_amount_cents("price", self.price_cents)?;
        validate_amount_cents("cost", self.cost_cents)?;
        non_negative("quantity", self.quantity)?;
        non_negative("min_quantity", self.min_quantity)?;
        Ok(())
    }
}

/// Partial update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub category_id: Option<String>,
    pub price_cents: Option<i64>,
    pub cost_cents: Option<i64>,
    pub min_quantity: Option<i64>,
    pub unit: Option<String>,
    pub is_active: Option<bool>,
}

impl ProductUpdate {
    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(name) = &self.name {
            validate_name("name", name)?;
        }
        if let Some(sku) = &self.sku {
            validate_sku(sku)?;
        }
        if let Some(price) = self.price_cents {
            validate_amount_cents("price", price)?;
        }
        if let Some(cost) = self.cost_cents {
            validate_amount_cents("cost", cost)?;
        }
        if let Some(min) = self.min_quantity {
            non_negative("min_quantity", min)?;
        }
        Ok(())
    }
}

fn non_negative(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists products ordered by name. Inactive ones only when asked.
    pub async fn list(&self, include_inactive: bool) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE is_active = 1 OR ?1 \
             ORDER BY name"
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(include_inactive)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), include_inactive, "Listed products");
        Ok(products)
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Gets a product by its SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = ?1");

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(sku.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Inserts a product.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - SKU already exists
    /// * `Err(DbError::ForeignKeyViolation)` - unknown category
    pub async fn create(&self, input: &NewProduct) -> DbResult<Product> {
        let now = Utc::now();
        let product = Product {
            id: generate_id(),
            name: input.name.trim().to_string(),
            description: clean_optional(input.description.clone()),
            sku: input.sku.trim().to_string(),
            barcode: clean_optional(input.barcode.clone()),
            category_id: clean_optional(input.category_id.clone()),
            price_cents: input.price_cents,
            cost_cents: input.cost_cents,
            quantity: input.quantity,
            min_quantity: input.min_quantity,
            unit: clean_optional(input.unit.clone()),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, description, sku, barcode, category_id,
                price_cents, cost_cents, quantity, min_quantity, unit,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.sku)
        .bind(&product.barcode)
        .bind(&product.category_id)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.quantity)
        .bind(product.min_quantity)
        .bind(&product.unit)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &product.sku),
            other => other,
        })?;

        Ok(product)
    }

    /// Applies a partial update and returns the stored row.
    ///
    /// `quantity` is not updatable here.
    pub async fn update(&self, id: &str, changes: &ProductUpdate) -> DbResult<Product> {
        let mut product = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        if let Some(name) = &changes.name {
            product.name = name.trim().to_string();
        }
        if changes.description.is_some() {
            product.description = clean_optional(changes.description.clone());
        }
        if let Some(sku) = &changes.sku {
            product.sku = sku.trim().to_string();
        }
        if changes.barcode.is_some() {
            product.barcode = clean_optional(changes.barcode.clone());
        }
        if changes.category_id.is_some() {
            product.category_id = clean_optional(changes.category_id.clone());
        }
        if let Some(price) = changes.price_cents {
            product.price_cents = price;
        }
        if let Some(cost) = changes.cost_cents {
            product.cost_cents = cost;
        }
        if let Some(min) = changes.min_quantity {
            product.min_quantity = min;
        }
        if changes.unit.is_some() {
            product.unit = clean_optional(changes.unit.clone());
        }
        if let Some(active) = changes.is_active {
            product.is_active = active;
        }
        product.updated_at = Utc::now();

        debug!(id = %id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                description = ?3,
                sku = ?4,
                barcode = ?5,
                category_id = ?6,
                price_cents = ?7,
                cost_cents = ?8,
                min_quantity = ?9,
                unit = ?10,
                is_active = ?11,
                updated_at = ?12
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.sku)
        .bind(&product.barcode)
        .bind(&product.category_id)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.min_quantity)
        .bind(&product.unit)
        .bind(product.is_active)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        // Re-read so a concurrent stock movement is reflected
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Products at or below their reorder threshold, lowest first.
    /// Deactivated products are included while they still hold stock counts.
    pub async fn low_stock(&self) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE quantity <= min_quantity \
             ORDER BY quantity, name"
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Counts active products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
