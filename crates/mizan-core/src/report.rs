//! # Report Aggregator
//!
//! Read-side statistics over a snapshot of invoices, items, products and
//! customers. Pure: `now` and the store's UTC offset are passed in.
//!
//! ## What Counts
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Sales/purchase totals  completed invoices, created_at ≥ range start   │
//! │  Profit                 Σ (item.price − product.cost_now) × qty        │
//! │  Today / month          completed sales since local midnight / 1st     │
//! │  Pending                status = pending (any date)                    │
//! │  Low stock              quantity ≤ min_quantity (active or not)        │
//! │  Debts                  Σ customer.balance where balance > 0           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Profit uses the product's *current* cost, so editing a cost rewrites
//! historical profit. Credit sales count towards revenue only once paid off.

use chrono::{DateTime, Datelike, Duration, FixedOffset, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{Invoice, InvoiceItem, InvoiceStatus, InvoiceType, Party, Product};

/// Default number of entries in the top-products table.
pub const DEFAULT_TOP_N: usize = 10;

// =============================================================================
// Inputs
// =============================================================================

/// Reporting window, measured back from local midnight today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReportRange {
    #[default]
    Today,
    Week,
    Month,
    Year,
}

impl ReportRange {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ReportRange::Today => "today",
            ReportRange::Week => "week",
            ReportRange::Month => "month",
            ReportRange::Year => "year",
        }
    }
}

impl fmt::Display for ReportRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportRange {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "today" => Ok(ReportRange::Today),
            "week" => Ok(ReportRange::Week),
            "month" => Ok(ReportRange::Month),
            "year" => Ok(ReportRange::Year),
            _ => Err(ValidationError::NotAllowed {
                field: "range".to_string(),
                allowed: vec!["today".into(), "week".into(), "month".into(), "year".into()],
            }),
        }
    }
}

/// Borrowed snapshot the aggregator reads.
#[derive(Debug, Clone, Copy)]
pub struct ReportInput<'a> {
    pub invoices: &'a [Invoice],
    pub items: &'a [InvoiceItem],
    pub products: &'a [Product],
    pub customers: &'a [Party],
}

/// Clock, calendar and shape of the report.
#[derive(Debug, Clone, Copy)]
pub struct ReportOptions {
    pub now: DateTime<Utc>,
    /// Offset of the store's local calendar.
    pub offset: FixedOffset,
    pub range: ReportRange,
    pub top_n: usize,
}

// =============================================================================
// Output
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Report {
    pub range: ReportRange,
    #[ts(as = "String")]
    pub range_start: DateTime<Utc>,

    pub total_sales_cents: i64,
    pub sales_count: usize,
    pub total_purchases_cents: i64,
    pub total_profit_cents: i64,
    pub total_discounts_cents: i64,
    pub total_tax_cents: i64,

    pub today_sales_cents: i64,
    pub month_sales_cents: i64,

    pub pending_invoices: usize,
    pub total_products: usize,
    pub low_stock_count: usize,
    pub low_stock: Vec<LowStockProduct>,

    pub top_products: Vec<TopProduct>,
    pub daily_sales: Vec<DailySales>,

    pub total_debts_cents: i64,
    pub debtor_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LowStockProduct {
    pub product_id: String,
    pub name: String,
    pub sku: String,
    pub quantity: i64,
    pub min_quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TopProduct {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    pub revenue_cents: i64,
    pub profit_cents: i64,
}

/// Completed sales for one local calendar day (`YYYY-MM-DD`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DailySales {
    pub date: String,
    pub total_cents: i64,
    pub invoice_count: usize,
}

// =============================================================================
// Calendar Helpers
// =============================================================================

/// Local midnight of `date`, as a UTC instant.
fn local_midnight(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let local = date.and_time(NaiveTime::default());
    let utc = local - Duration::seconds(offset.local_minus_utc() as i64);
    Utc.from_utc_datetime(&utc)
}

/// Local calendar date of an instant.
fn local_date(at: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    at.with_timezone(&offset).date_naive()
}

/// Start of the reporting window.
///
/// Today's local midnight, moved back 7 days (`week`), one calendar month
/// (`month`) or one calendar year (`year`).
pub fn range_start(now: DateTime<Utc>, offset: FixedOffset, range: ReportRange) -> DateTime<Utc> {
    let today = local_date(now, offset);
    let start = match range {
        ReportRange::Today => today,
        ReportRange::Week => today - Duration::days(7),
        ReportRange::Month => today.checked_sub_months(Months::new(1)).unwrap_or(NaiveDate::MIN),
        ReportRange::Year => today.checked_sub_months(Months::new(12)).unwrap_or(NaiveDate::MIN),
    };
    local_midnight(start, offset)
}

/// First instant of the current local month.
fn month_start(now: DateTime<Utc>, offset: FixedOffset) -> DateTime<Utc> {
    let today = local_date(now, offset);
    local_midnight(today.with_day(1).unwrap_or(today), offset)
}

/// Earliest `created_at` a completed invoice needs to reach this report.
///
/// The range start or the first of the local month, whichever comes first.
/// Snapshot loaders can skip older completed invoices; pending ones still
/// count at any age.
pub fn window_start(now: DateTime<Utc>, offset: FixedOffset, range: ReportRange) -> DateTime<Utc> {
    range_start(now, offset, range).min(month_start(now, offset))
}

// =============================================================================
// Aggregation
// =============================================================================

/// Builds the report. Never mutates its input.
///
/// ## Example
/// ```rust
/// use chrono::{FixedOffset, Utc};
/// use mizan_core::report::{build_report, ReportInput, ReportOptions, ReportRange};
///
/// let input = ReportInput { invoices: &[], items: &[], products: &[], customers: &[] };
/// let options = ReportOptions {
///     now: Utc::now(),
///     offset: FixedOffset::east_opt(0).unwrap(),
///     range: ReportRange::Week,
///     top_n: 10,
/// };
/// let report = build_report(&input, &options);
/// assert_eq!(report.total_sales_cents, 0);
/// assert!(report.daily_sales.is_empty());
/// ```
pub fn build_report(input: &ReportInput<'_>, options: &ReportOptions) -> Report {
    let start = range_start(options.now, options.offset, options.range);
    let today_start = range_start(options.now, options.offset, ReportRange::Today);
    let month_start = month_start(options.now, options.offset);

    let completed = |inv: &&Invoice| inv.status == InvoiceStatus::Completed;
    let is_sale = |inv: &&Invoice| inv.invoice_type == InvoiceType::Sale;

    // ---- sales & purchases in range --------------------------------------
    let sales_in_range: Vec<&Invoice> = input
        .invoices
        .iter()
        .filter(completed)
        .filter(is_sale)
        .filter(|inv| inv.created_at >= start)
        .collect();

    let total_sales: Money = sales_in_range.iter().map(|inv| inv.total()).sum();
    let total_discounts: Money = sales_in_range
        .iter()
        .map(|inv| Money::from_cents(inv.discount_cents))
        .sum();
    let total_tax: Money = sales_in_range
        .iter()
        .map(|inv| Money::from_cents(inv.tax_cents))
        .sum();

    let total_purchases: Money = input
        .invoices
        .iter()
        .filter(completed)
        .filter(|inv| inv.invoice_type == InvoiceType::Purchase)
        .filter(|inv| inv.created_at >= start)
        .map(|inv| inv.total())
        .sum();

    // ---- today / this month ----------------------------------------------
    let sales_since = |since: DateTime<Utc>| -> Money {
        input
            .invoices
            .iter()
            .filter(completed)
            .filter(is_sale)
            .filter(|inv| inv.created_at >= since)
            .map(|inv| inv.total())
            .sum()
    };

    // ---- profit & top products -------------------------------------------
    let sale_ids: HashSet<&str> = sales_in_range.iter().map(|inv| inv.id.as_str()).collect();
    let products: HashMap<&str, &Product> =
        input.products.iter().map(|p| (p.id.as_str(), p)).collect();

    let mut total_profit = Money::zero();
    let mut per_product: HashMap<&str, TopProduct> = HashMap::new();

    for item in input
        .items
        .iter()
        .filter(|item| sale_ids.contains(item.invoice_id.as_str()))
    {
        let product = products.get(item.product_id.as_str());
        let cost = product.map(|p| p.cost()).unwrap_or_default();
        let profit = (Money::from_cents(item.price_cents) - cost).multiply_quantity(item.quantity);
        total_profit += profit;

        let entry = per_product
            .entry(item.product_id.as_str())
            .or_insert_with(|| TopProduct {
                product_id: item.product_id.clone(),
                name: product
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|| item.product_name.clone()),
                quantity: 0,
                revenue_cents: 0,
                profit_cents: 0,
            });
        entry.quantity += item.quantity;
        entry.revenue_cents += item.total_cents;
        entry.profit_cents += profit.cents();
    }

    let mut top_products: Vec<TopProduct> = per_product.into_values().collect();
    top_products.sort_by(|a, b| {
        b.revenue_cents
            .cmp(&a.revenue_cents)
            .then_with(|| a.name.cmp(&b.name))
    });
    top_products.truncate(options.top_n);

    // ---- daily buckets ---------------------------------------------------
    let mut daily: BTreeMap<NaiveDate, DailySales> = BTreeMap::new();
    for inv in &sales_in_range {
        let day = local_date(inv.created_at, options.offset);
        let bucket = daily.entry(day).or_insert_with(|| DailySales {
            date: day.format("%Y-%m-%d").to_string(),
            total_cents: 0,
            invoice_count: 0,
        });
        bucket.total_cents += inv.total_cents;
        bucket.invoice_count += 1;
    }

    // ---- stock -----------------------------------------------------------
    let mut low_stock: Vec<LowStockProduct> = input
        .products
        .iter()
        .filter(|p| p.is_low_stock())
        .map(|p| LowStockProduct {
            product_id: p.id.clone(),
            name: p.name.clone(),
            sku: p.sku.clone(),
            quantity: p.quantity,
            min_quantity: p.min_quantity,
        })
        .collect();
    low_stock.sort_by(|a, b| a.quantity.cmp(&b.quantity).then_with(|| a.name.cmp(&b.name)));

    // ---- debts -----------------------------------------------------------
    let debtors: Vec<&Party> = input.customers.iter().filter(|c| c.has_debt()).collect();
    let total_debts: Money = debtors.iter().map(|c| c.balance()).sum();

    Report {
        range: options.range,
        range_start: start,
        total_sales_cents: total_sales.cents(),
        sales_count: sales_in_range.len(),
        total_purchases_cents: total_purchases.cents(),
        total_profit_cents: total_profit.cents(),
        total_discounts_cents: total_discounts.cents(),
        total_tax_cents: total_tax.cents(),
        today_sales_cents: sales_since(today_start).cents(),
        month_sales_cents: sales_since(month_start).cents(),
        pending_invoices: input
            .invoices
            .iter()
            .filter(|inv| inv.status == InvoiceStatus::Pending)
            .count(),
        total_products: input.products.iter().filter(|p| p.is_active).count(),
        low_stock_count: low_stock.len(),
        low_stock,
        top_products,
        daily_sales: daily.into_values().collect(),
        total_debts_cents: total_debts.cents(),
        debtor_count: debtors.len(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PaymentMethod;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn product(id: &str, cost: i64, qty: i64, min: i64) -> Product {
        Product {
            id: id.into(),
            name: format!("Product {id}"),
            description: None,
            sku: id.to_uppercase(),
            barcode: None,
            category_id: None,
            price_cents: 0,
            cost_cents: cost,
            quantity: qty,
            min_quantity: min,
            unit: None,
            is_active: true,
            created_at: at("2024-01-01T00:00:00Z"),
            updated_at: at("2024-01-01T00:00:00Z"),
        }
    }

    fn invoice(
        id: &str,
        kind: InvoiceType,
        status: InvoiceStatus,
        total: i64,
        created_at: &str,
    ) -> Invoice {
        Invoice {
            id: id.into(),
            invoice_number: format!("INV-{id}"),
            invoice_type: kind,
            customer_id: None,
            supplier_id: None,
            subtotal_cents: total,
            discount_cents: 0,
            tax_cents: 0,
            total_cents: total,
            paid_cents: total,
            remaining_cents: 0,
            status,
            payment_method: PaymentMethod::Cash,
            notes: None,
            created_by: None,
            created_at: at(created_at),
        }
    }

    fn item(invoice_id: &str, product_id: &str, qty: i64, price: i64) -> InvoiceItem {
        InvoiceItem {
            id: format!("{invoice_id}-{product_id}"),
            invoice_id: invoice_id.into(),
            product_id: product_id.into(),
            product_name: format!("Snapshot {product_id}"),
            quantity: qty,
            price_cents: price,
            discount_cents: 0,
            total_cents: qty * price,
            position: 0,
        }
    }

    fn customer(id: &str, balance: i64) -> Party {
        Party {
            id: id.into(),
            name: id.into(),
            phone: None,
            email: None,
            address: None,
            balance_cents: balance,
            total_purchases_cents: 0,
            created_at: at("2024-01-01T00:00:00Z"),
            updated_at: at("2024-01-01T00:00:00Z"),
        }
    }

    fn options(now: &str, range: ReportRange) -> ReportOptions {
        ReportOptions {
            now: at(now),
            offset: utc(),
            range,
            top_n: DEFAULT_TOP_N,
        }
    }

    #[test]
    fn range_starts_at_local_midnight() {
        let now = at("2024-03-15T10:30:00Z");
        assert_eq!(range_start(now, utc(), ReportRange::Today), at("2024-03-15T00:00:00Z"));
        assert_eq!(range_start(now, utc(), ReportRange::Week), at("2024-03-08T00:00:00Z"));
        assert_eq!(range_start(now, utc(), ReportRange::Month), at("2024-02-15T00:00:00Z"));
        assert_eq!(range_start(now, utc(), ReportRange::Year), at("2023-03-15T00:00:00Z"));
    }

    #[test]
    fn range_start_respects_store_offset() {
        // 02:00 UTC is already 07:00 on the 16th in UTC+5
        let now = at("2024-03-16T02:00:00Z");
        let pkt = FixedOffset::east_opt(5 * 3600).unwrap();
        assert_eq!(range_start(now, pkt, ReportRange::Today), at("2024-03-15T19:00:00Z"));
    }

    #[test]
    fn totals_count_completed_invoices_only() {
        let invoices = vec![
            invoice("s1", InvoiceType::Sale, InvoiceStatus::Completed, 1000, "2024-03-15T09:00:00Z"),
            invoice("s2", InvoiceType::Sale, InvoiceStatus::Pending, 500, "2024-03-15T09:30:00Z"),
            invoice("p1", InvoiceType::Purchase, InvoiceStatus::Completed, 700, "2024-03-15T08:00:00Z"),
            invoice("r1", InvoiceType::Return, InvoiceStatus::Completed, 100, "2024-03-15T08:30:00Z"),
            invoice("old", InvoiceType::Sale, InvoiceStatus::Completed, 9000, "2024-03-01T09:00:00Z"),
        ];
        let input = ReportInput { invoices: &invoices, items: &[], products: &[], customers: &[] };

        let report = build_report(&input, &options("2024-03-15T12:00:00Z", ReportRange::Today));

        assert_eq!(report.total_sales_cents, 1000);
        assert_eq!(report.sales_count, 1);
        assert_eq!(report.total_purchases_cents, 700);
        assert_eq!(report.today_sales_cents, 1000);
        assert_eq!(report.month_sales_cents, 10000);
        assert_eq!(report.pending_invoices, 1);
    }

    #[test]
    fn profit_uses_current_cost() {
        let invoices = vec![invoice(
            "s1",
            InvoiceType::Sale,
            InvoiceStatus::Completed,
            500,
            "2024-03-15T09:00:00Z",
        )];
        let items = vec![item("s1", "a", 2, 200), item("s1", "gone", 1, 100)];
        let products = vec![product("a", 150, 10, 0)];
        let input = ReportInput { invoices: &invoices, items: &items, products: &products, customers: &[] };

        let report = build_report(&input, &options("2024-03-15T12:00:00Z", ReportRange::Today));

        // (200 − 150) × 2 + (100 − 0) × 1
        assert_eq!(report.total_profit_cents, 200);
    }

    #[test]
    fn top_products_ranked_by_revenue() {
        let invoices = vec![
            invoice("s1", InvoiceType::Sale, InvoiceStatus::Completed, 0, "2024-03-15T09:00:00Z"),
            invoice("s2", InvoiceType::Sale, InvoiceStatus::Completed, 0, "2024-03-15T10:00:00Z"),
        ];
        let items = vec![
            item("s1", "a", 1, 100),
            item("s1", "b", 5, 100),
            item("s2", "a", 1, 100),
            item("s2", "c", 1, 50),
        ];
        let products = vec![product("a", 0, 5, 0), product("b", 0, 5, 0), product("c", 0, 5, 0)];
        let input = ReportInput { invoices: &invoices, items: &items, products: &products, customers: &[] };

        let mut opts = options("2024-03-15T12:00:00Z", ReportRange::Today);
        opts.top_n = 2;
        let report = build_report(&input, &opts);

        let ids: Vec<&str> = report.top_products.iter().map(|t| t.product_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(report.top_products[1].quantity, 2);
        assert_eq!(report.top_products[1].revenue_cents, 200);
    }

    #[test]
    fn low_stock_boundary_is_inclusive() {
        let products = vec![
            product("a", 0, 3, 10),
            product("b", 0, 10, 10),
            product("c", 0, 11, 10),
        ];
        let input = ReportInput { invoices: &[], items: &[], products: &products, customers: &[] };

        let report = build_report(&input, &options("2024-03-15T12:00:00Z", ReportRange::Today));

        assert_eq!(report.low_stock_count, 2);
        let ids: Vec<&str> = report.low_stock.iter().map(|p| p.product_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(report.total_products, 3);
    }

    #[test]
    fn inactive_products_still_report_low_stock() {
        let mut retired = product("a", 0, 0, 5);
        retired.is_active = false;
        let products = vec![retired, product("b", 0, 50, 5)];
        let input = ReportInput { invoices: &[], items: &[], products: &products, customers: &[] };

        let report = build_report(&input, &options("2024-03-15T12:00:00Z", ReportRange::Today));

        assert_eq!(report.low_stock_count, 1);
        assert_eq!(report.low_stock[0].product_id, "a");
        assert_eq!(report.total_products, 1);
    }

    #[test]
    fn window_covers_range_and_current_month() {
        let now = at("2024-03-15T12:00:00Z");

        assert_eq!(window_start(now, utc(), ReportRange::Today), at("2024-03-01T00:00:00Z"));
        assert_eq!(window_start(now, utc(), ReportRange::Week), at("2024-03-01T00:00:00Z"));
        assert_eq!(window_start(now, utc(), ReportRange::Month), at("2024-02-15T00:00:00Z"));
        assert_eq!(window_start(now, utc(), ReportRange::Year), at("2023-03-15T00:00:00Z"));

        // Early in the month the week reaches further back
        let early = at("2024-03-03T12:00:00Z");
        assert_eq!(window_start(early, utc(), ReportRange::Week), at("2024-02-25T00:00:00Z"));
    }

    #[test]
    fn daily_sales_bucket_by_local_date() {
        let invoices = vec![
            invoice("s1", InvoiceType::Sale, InvoiceStatus::Completed, 100, "2024-03-13T20:00:00Z"),
            invoice("s2", InvoiceType::Sale, InvoiceStatus::Completed, 200, "2024-03-14T10:00:00Z"),
            invoice("s3", InvoiceType::Sale, InvoiceStatus::Completed, 300, "2024-03-14T11:00:00Z"),
        ];
        let input = ReportInput { invoices: &invoices, items: &[], products: &[], customers: &[] };

        // UTC+5: s1 lands on the 14th locally
        let mut opts = options("2024-03-15T12:00:00Z", ReportRange::Week);
        opts.offset = FixedOffset::east_opt(5 * 3600).unwrap();
        let report = build_report(&input, &opts);

        assert_eq!(report.daily_sales.len(), 1);
        assert_eq!(report.daily_sales[0].date, "2024-03-14");
        assert_eq!(report.daily_sales[0].total_cents, 600);
        assert_eq!(report.daily_sales[0].invoice_count, 3);
    }

    #[test]
    fn debts_sum_positive_balances() {
        let customers = vec![customer("a", 500), customer("b", 0), customer("c", 250)];
        let input = ReportInput { invoices: &[], items: &[], products: &[], customers: &customers };

        let report = build_report(&input, &options("2024-03-15T12:00:00Z", ReportRange::Today));

        assert_eq!(report.total_debts_cents, 750);
        assert_eq!(report.debtor_count, 2);
    }

    #[test]
    fn range_parses_from_query_strings() {
        assert_eq!("Month".parse::<ReportRange>().unwrap(), ReportRange::Month);
        assert!("decade".parse::<ReportRange>().is_err());
    }
}
