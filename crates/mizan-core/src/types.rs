//! # Domain Types
//!
//! Core domain types used throughout Mizan.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────┐   ┌──────────────────┐   ┌──────────────────┐        │
//! │  │   Product    │   │     Invoice      │   │   Party          │        │
//! │  │ ──────────── │   │ ──────────────── │   │ ──────────────── │        │
//! │  │ sku          │◄──│ InvoiceItem[]    │──►│ Customer or      │        │
//! │  │ quantity     │   │ invoice_number   │   │ Supplier         │        │
//! │  │ min_quantity │   │ total/paid/rem.  │   │ balance_cents    │        │
//! │  └──────────────┘   └──────────────────┘   └──────────────────┘        │
//! │                                                                         │
//! │  ┌──────────────┐   ┌──────────────────┐   ┌──────────────────┐        │
//! │  │ InvoiceType  │   │  InvoiceStatus   │   │  PaymentMethod   │        │
//! │  │ sale         │   │  pending         │   │  cash / card     │        │
//! │  │ purchase     │   │  completed       │   │  credit          │        │
//! │  │ return       │   │  cancelled       │   │  transfer        │        │
//! │  └──────────────┘   └──────────────────┘   └──────────────────┘        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Invoice items snapshot `product_name` and `price_cents` so history does
//! not change when the catalog does.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::DEFAULT_INVOICE_PREFIX;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 1700 bps = 17%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Enums
// =============================================================================

/// What an invoice does to stock and balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceType {
    /// Goods leave the store.
    Sale,
    /// Goods arrive from a supplier.
    Purchase,
    /// A customer brings goods back.
    Return,
}

impl InvoiceType {
    /// Lowercase wire/storage name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            InvoiceType::Sale => "sale",
            InvoiceType::Purchase => "purchase",
            InvoiceType::Return => "return",
        }
    }

    /// Signed stock movement for `quantity` units on this invoice type.
    ///
    /// ```rust
    /// use mizan_core::InvoiceType;
    ///
    /// assert_eq!(InvoiceType::Sale.stock_delta(3), -3);
    /// assert_eq!(InvoiceType::Purchase.stock_delta(3), 3);
    /// assert_eq!(InvoiceType::Return.stock_delta(3), 3);
    /// ```
    pub const fn stock_delta(&self, quantity: i64) -> i64 {
        match self {
            InvoiceType::Sale => -quantity,
            InvoiceType::Purchase | InvoiceType::Return => quantity,
        }
    }
}

impl fmt::Display for InvoiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sale" => Ok(InvoiceType::Sale),
            "purchase" => Ok(InvoiceType::Purchase),
            "return" => Ok(InvoiceType::Return),
            _ => Err(ValidationError::NotAllowed {
                field: "type".to_string(),
                allowed: vec!["sale".into(), "purchase".into(), "return".into()],
            }),
        }
    }
}

/// Settlement state of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Part of the total is still owed.
    Pending,
    /// Fully paid.
    Completed,
    /// Voided. Never produced by the processor, kept for imported data.
    Cancelled,
}

impl InvoiceStatus {
    /// `Completed` when nothing remains, `Pending` otherwise.
    pub fn from_remaining(remaining: Money) -> Self {
        if remaining.is_positive() {
            InvoiceStatus::Pending
        } else {
            InvoiceStatus::Completed
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Completed => "completed",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for InvoiceStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(InvoiceStatus::Pending),
            "completed" => Ok(InvoiceStatus::Completed),
            "cancelled" => Ok(InvoiceStatus::Cancelled),
            _ => Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: vec!["pending".into(), "completed".into(), "cancelled".into()],
            }),
        }
    }
}

/// How an invoice is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    /// On account: the unpaid remainder becomes a party balance.
    Credit,
    Transfer,
}

impl PaymentMethod {
    #[inline]
    pub const fn is_credit(&self) -> bool {
        matches!(self, PaymentMethod::Credit)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Credit => "credit",
            PaymentMethod::Transfer => "transfer",
        }
    }
}

/// Which party table a balance lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PartyKind {
    Customer,
    Supplier,
}

impl PartyKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PartyKind::Customer => "customer",
            PartyKind::Supplier => "supplier",
        }
    }

    /// Storage table for this kind of party.
    pub const fn table(&self) -> &'static str {
        match self {
            PartyKind::Customer => "customers",
            PartyKind::Supplier => "suppliers",
        }
    }

    /// Display label used in error messages.
    pub const fn label(&self) -> &'static str {
        match self {
            PartyKind::Customer => "Customer",
            PartyKind::Supplier => "Supplier",
        }
    }
}

impl fmt::Display for PartyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown at the till and on invoices.
    pub name: String,

    pub description: Option<String>,

    /// Stock Keeping Unit - unique business identifier.
    pub sku: String,

    pub barcode: Option<String>,

    pub category_id: Option<String>,

    /// Selling price in minor units.
    pub price_cents: i64,

    /// Current unit cost in minor units (profit reports use this live value).
    pub cost_cents: i64,

    /// On-hand quantity. Only the stock ledger writes this.
    pub quantity: i64,

    /// Reorder threshold; `quantity <= min_quantity` is low stock.
    pub min_quantity: i64,

    /// Unit of measure label ("pcs", "kg", ...).
    pub unit: Option<String>,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn cost(&self) -> Money {
        Money::from_cents(self.cost_cents)
    }

    /// Inclusive threshold: a product sitting exactly at its minimum is low.
    ///
    /// ```rust
    /// # use mizan_core::Product;
    /// # use chrono::Utc;
    /// # let mut p = Product { id: "p".into(), name: "Tea".into(), description: None,
    /// #     sku: "TEA".into(), barcode: None, category_id: None, price_cents: 0,
    /// #     cost_cents: 0, quantity: 10, min_quantity: 10, unit: None, is_active: true,
    /// #     created_at: Utc::now(), updated_at: Utc::now() };
    /// assert!(p.is_low_stock());
    /// p.quantity = 11;
    /// assert!(!p.is_low_stock());
    /// ```
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.min_quantity
    }
}

/// A product category. `parent_id` allows nesting; depth is not enforced.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// `#rrggbb`
    pub color: String,
    pub parent_id: Option<String>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Parties
// =============================================================================

/// A customer or supplier. Both tables share this shape.
///
/// `balance_cents` is what the party owes the store (customers) or what the
/// store owes the party (suppliers).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Party {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub balance_cents: i64,
    /// Lifetime total of credit invoices raised against this party.
    pub total_purchases_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Party {
    #[inline]
    pub fn balance(&self) -> Money {
        Money::from_cents(self.balance_cents)
    }

    /// Debtors are parties with a positive balance.
    #[inline]
    pub fn has_debt(&self) -> bool {
        self.balance_cents > 0
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// A persisted invoice header. Written once by the processor, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Invoice {
    pub id: String,
    /// `prefix + 6-digit sequence`, unique.
    pub invoice_number: String,
    pub invoice_type: InvoiceType,
    pub customer_id: Option<String>,
    pub supplier_id: Option<String>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub paid_cents: i64,
    pub remaining_cents: i64,
    pub status: InvoiceStatus,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub created_by: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn remaining(&self) -> Money {
        Money::from_cents(self.remaining_cents)
    }

    /// Credit invoice with something still owed.
    #[inline]
    pub fn is_open_credit(&self) -> bool {
        self.payment_method.is_credit() && self.remaining_cents > 0
    }
}

/// A line on an invoice. Name and price are frozen at time of sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InvoiceItem {
    pub id: String,
    pub invoice_id: String,
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub price_cents: i64,
    pub discount_cents: i64,
    /// `quantity × price − discount`
    pub total_cents: i64,
    /// Line order as entered.
    pub position: i64,
}

// =============================================================================
// Store Settings
// =============================================================================

/// Store-wide settings (single row).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StoreSettings {
    pub store_name: String,
    pub store_phone: Option<String>,
    pub store_email: Option<String>,
    pub store_address: Option<String>,
    /// ISO 4217 code, display only.
    pub currency: String,
    /// Applied to sales and returns. Purchases are never taxed.
    pub tax_rate_bps: u32,
    pub invoice_prefix: String,
    /// When false, a sale may not drive a product below zero.
    pub allow_negative_stock: bool,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl StoreSettings {
    #[inline]
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }

    /// The rate an invoice of `invoice_type` is priced at.
    pub fn tax_rate_for(&self, invoice_type: InvoiceType) -> TaxRate {
        match invoice_type {
            InvoiceType::Purchase => TaxRate::zero(),
            InvoiceType::Sale | InvoiceType::Return => self.tax_rate(),
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            store_name: "Mizan Store".to_string(),
            store_phone: None,
            store_email: None,
            store_address: None,
            currency: "USD".to_string(),
            tax_rate_bps: 0,
            invoice_prefix: DEFAULT_INVOICE_PREFIX.to_string(),
            allow_negative_stock: true,
            updated_at: DateTime::<Utc>::default(),
        }
    }
}

// =============================================================================
// Debt Payments
// =============================================================================

/// A recorded debt payment (balance ledger history row).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PartyPayment {
    pub id: String,
    pub party_kind: PartyKind,
    pub party_id: String,
    pub amount_cents: i64,
    pub previous_balance_cents: i64,
    pub new_balance_cents: i64,
    pub receipt_number: String,
    pub notes: Option<String>,
    pub created_by: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Receipt data handed to a printer/renderer after a debt payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PaymentReceipt {
    pub receipt_number: String,
    pub party_kind: PartyKind,
    pub party_id: String,
    pub party_name: String,
    pub previous_balance_cents: i64,
    pub amount_cents: i64,
    pub new_balance_cents: i64,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub timestamp: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
