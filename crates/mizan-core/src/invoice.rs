//! # Invoice Builder
//!
//! Turns a draft (header + cart lines) into a priced invoice. Pure: the
//! caller supplies the tax rate and, later, the sequence number.
//!
//! ## Pricing Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  lines ──► Σ qty × price ─────────────► subtotal                        │
//! │                                            │                            │
//! │                                            ▼                            │
//! │  header.discount (0 ≤ d ≤ subtotal) ──► taxable = subtotal − discount   │
//! │                                            │                            │
//! │  store tax rate ───────────────────────► tax = round(taxable × rate)    │
//! │                                            │                            │
//! │                                            ▼                            │
//! │                                  total = taxable + tax                  │
//! │                                            │                            │
//! │  cash/card/transfer: paid = total          │                            │
//! │  credit: paid = amount given (default 0) ──┤                            │
//! │                                            ▼                            │
//! │                       remaining = max(0, total − paid)                  │
//! │                       status = remaining > 0 ? pending : completed      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Line discounts only reduce the line total; the subtotal is computed from
//! `quantity × price` alone.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{InvoiceStatus, InvoiceType, PaymentMethod, TaxRate};
use crate::validation::{
    validate_amount_cents, validate_cart_size, validate_discount, validate_quantity,
};
use crate::{INVOICE_NUMBER_DIGITS, MAX_CART_ITEMS, RECEIPT_PREFIX};

// =============================================================================
// Draft
// =============================================================================

/// What the till submits. Totals are never accepted from the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InvoiceDraft {
    #[serde(rename = "type")]
    pub invoice_type: InvoiceType,
    pub customer_id: Option<String>,
    pub supplier_id: Option<String>,
    pub payment_method: PaymentMethod,
    /// Invoice-level discount in minor units.
    #[serde(default)]
    pub discount_cents: i64,
    /// Only read for credit invoices; other methods always settle in full.
    pub amount_paid_cents: Option<i64>,
    pub notes: Option<String>,
    pub items: Vec<DraftLine>,
}

/// One cart line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DraftLine {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub price_cents: i64,
    #[serde(default)]
    pub discount_cents: i64,
}

impl DraftLine {
    /// A line with no line discount.
    pub fn new(
        product_id: impl Into<String>,
        product_name: impl Into<String>,
        quantity: i64,
        price_cents: i64,
    ) -> Self {
        DraftLine {
            product_id: product_id.into(),
            product_name: product_name.into(),
            quantity,
            price_cents,
            discount_cents: 0,
        }
    }

    /// `quantity × price`, before the line discount.
    #[inline]
    pub fn gross(&self) -> Money {
        Money::from_cents(self.price_cents).multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Priced
// =============================================================================

/// Output of [`price_invoice`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedInvoice {
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub total: Money,
    pub paid: Money,
    pub remaining: Money,
    pub status: InvoiceStatus,
    pub lines: Vec<PricedLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedLine {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub price_cents: i64,
    pub discount_cents: i64,
    pub total: Money,
}

/// Prices a draft at `tax_rate`.
///
/// ## Errors
/// - [`CoreError::EmptyCart`] when there are no lines
/// - [`CoreError::CartTooLarge`] past [`MAX_CART_ITEMS`] lines
/// - [`CoreError::Validation`] for a bad quantity, negative price, a line
///   discount larger than its line, a discount outside `0..=subtotal`, or a
///   negative credit payment
///
/// ## Example
/// ```rust
/// use mizan_core::invoice::{price_invoice, DraftLine, InvoiceDraft};
/// use mizan_core::{InvoiceStatus, InvoiceType, PaymentMethod, TaxRate};
///
/// let draft = InvoiceDraft {
///     invoice_type: InvoiceType::Sale,
///     customer_id: Some("c-1".into()),
///     supplier_id: None,
///     payment_method: PaymentMethod::Credit,
///     discount_cents: 0,
///     amount_paid_cents: Some(100),
///     notes: None,
///     items: vec![DraftLine::new("a", "A", 2, 100), DraftLine::new("b", "B", 1, 50)],
/// };
///
/// let priced = price_invoice(&draft, TaxRate::zero()).unwrap();
/// assert_eq!(priced.total.cents(), 250);
/// assert_eq!(priced.remaining.cents(), 150);
/// assert_eq!(priced.status, InvoiceStatus::Pending);
/// ```
pub fn price_invoice(draft: &InvoiceDraft, tax_rate: TaxRate) -> CoreResult<PricedInvoice> {
    if draft.items.is_empty() {
        return Err(CoreError::EmptyCart);
    }

    if validate_cart_size(draft.items.len()).is_err() {
        return Err(CoreError::CartTooLarge {
            max: MAX_CART_ITEMS,
        });
    }

    let mut lines = Vec::with_capacity(draft.items.len());
    for line in &draft.items {
        validate_quantity(line.quantity)?;
        validate_amount_cents("price", line.price_cents)?;
        validate_discount(line.discount_cents, line.gross().cents())?;

        lines.push(PricedLine {
            product_id: line.product_id.clone(),
            product_name: line.product_name.clone(),
            quantity: line.quantity,
            price_cents: line.price_cents,
            discount_cents: line.discount_cents,
            total: line.gross() - Money::from_cents(line.discount_cents),
        });
    }

    let subtotal: Money = draft.items.iter().map(DraftLine::gross).sum();
    validate_discount(draft.discount_cents, subtotal.cents())?;
    let discount = Money::from_cents(draft.discount_cents);

    let taxable = subtotal - discount;
    let tax = taxable.calculate_tax(tax_rate);
    let total = taxable + tax;

    let paid = if draft.payment_method.is_credit() {
        let amount = draft.amount_paid_cents.unwrap_or(0);
        validate_amount_cents("amount_paid", amount)?;
        Money::from_cents(amount)
    } else {
        total
    };

    let remaining = (total - paid).non_negative();

    Ok(PricedInvoice {
        subtotal,
        discount,
        tax,
        total,
        paid,
        remaining,
        status: InvoiceStatus::from_remaining(remaining),
        lines,
    })
}

// =============================================================================
// Party Rules
// =============================================================================

/// Checks that the draft names the right kind of party.
///
/// ## Rules
/// ```text
/// sale           : never a supplier; credit needs a customer
/// return         : never a supplier; never on credit (refunded in full)
/// purchase       : never a customer; credit needs a supplier
/// ```
pub fn check_parties(draft: &InvoiceDraft) -> CoreResult<()> {
    let credit = draft.payment_method.is_credit();
    let kind = draft.invoice_type.as_str().to_string();

    match draft.invoice_type {
        InvoiceType::Return if credit => {
            return Err(ValidationError::NotAllowed {
                field: "paymentMethod".to_string(),
                allowed: vec!["cash".to_string(), "card".to_string(), "transfer".to_string()],
            }
            .into());
        }
        InvoiceType::Sale | InvoiceType::Return => {
            if draft.supplier_id.is_some() {
                return Err(CoreError::UnexpectedParty {
                    invoice_type: kind,
                    party: "supplier".to_string(),
                });
            }
            if credit && draft.customer_id.is_none() {
                return Err(CoreError::MissingParty {
                    invoice_type: kind,
                    party: "customer".to_string(),
                });
            }
        }
        InvoiceType::Purchase => {
            if draft.customer_id.is_some() {
                return Err(CoreError::UnexpectedParty {
                    invoice_type: kind,
                    party: "customer".to_string(),
                });
            }
            if credit && draft.supplier_id.is_none() {
                return Err(CoreError::MissingParty {
                    invoice_type: kind,
                    party: "supplier".to_string(),
                });
            }
        }
    }

    Ok(())
}

// =============================================================================
// Numbering
// =============================================================================

/// `prefix` followed by the sequence zero-padded to six digits.
///
/// ```rust
/// use mizan_core::invoice::format_invoice_number;
///
/// assert_eq!(format_invoice_number("INV", 1), "INV000001");
/// assert_eq!(format_invoice_number("PUR", 1234567), "PUR1234567");
/// ```
pub fn format_invoice_number(prefix: &str, sequence: i64) -> String {
    format!("{}{:0width$}", prefix, sequence, width = INVOICE_NUMBER_DIGITS)
}

/// `REC` followed by the last eight digits of a millisecond timestamp.
///
/// ```rust
/// use mizan_core::invoice::format_receipt_number;
///
/// assert_eq!(format_receipt_number(1_718_000_123_456), "REC00123456");
/// ```
pub fn format_receipt_number(timestamp_millis: i64) -> String {
    format!("{}{:08}", RECEIPT_PREFIX, timestamp_millis.rem_euclid(100_000_000))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    fn draft(method: PaymentMethod, items: Vec<DraftLine>) -> InvoiceDraft {
        InvoiceDraft {
            invoice_type: InvoiceType::Sale,
            customer_id: None,
            supplier_id: None,
            payment_method: method,
            discount_cents: 0,
            amount_paid_cents: None,
            notes: None,
            items,
        }
    }

    fn two_lines() -> Vec<DraftLine> {
        vec![DraftLine::new("a", "A", 2, 100), DraftLine::new("b", "B", 1, 50)]
    }

    #[test]
    fn cash_sale_settles_in_full() {
        let priced = price_invoice(&draft(PaymentMethod::Cash, two_lines()), TaxRate::zero()).unwrap();

        assert_eq!(priced.subtotal.cents(), 250);
        assert_eq!(priced.total.cents(), 250);
        assert_eq!(priced.paid.cents(), 250);
        assert!(priced.remaining.is_zero());
        assert_eq!(priced.status, InvoiceStatus::Completed);
        assert_eq!(priced.lines[0].total.cents(), 200);
        assert_eq!(priced.lines[1].total.cents(), 50);
    }

    #[test]
    fn non_credit_methods_ignore_amount_paid() {
        for method in [PaymentMethod::Cash, PaymentMethod::Card, PaymentMethod::Transfer] {
            let mut d = draft(method, two_lines());
            d.amount_paid_cents = Some(10);
            let priced = price_invoice(&d, TaxRate::from_bps(1000)).unwrap();
            assert_eq!(priced.paid, priced.total);
            assert!(priced.remaining.is_zero());
            assert_eq!(priced.status, InvoiceStatus::Completed);
        }
    }

    #[test]
    fn credit_sale_leaves_remainder() {
        let mut d = draft(PaymentMethod::Credit, two_lines());
        d.customer_id = Some("c-1".into());
        d.amount_paid_cents = Some(100);

        let priced = price_invoice(&d, TaxRate::zero()).unwrap();
        assert_eq!(priced.total.cents(), 250);
        assert_eq!(priced.paid.cents(), 100);
        assert_eq!(priced.remaining.cents(), 150);
        assert_eq!(priced.status, InvoiceStatus::Pending);
    }

    #[test]
    fn credit_without_amount_defaults_to_nothing_paid() {
        let priced =
            price_invoice(&draft(PaymentMethod::Credit, two_lines()), TaxRate::zero()).unwrap();
        assert!(priced.paid.is_zero());
        assert_eq!(priced.remaining.cents(), 250);
    }

    #[test]
    fn credit_overpayment_leaves_nothing_remaining() {
        let mut d = draft(PaymentMethod::Credit, two_lines());
        d.amount_paid_cents = Some(300);
        let priced = price_invoice(&d, TaxRate::zero()).unwrap();
        assert!(priced.remaining.is_zero());
        assert_eq!(priced.status, InvoiceStatus::Completed);
    }

    #[test]
    fn tax_applies_after_discount() {
        let mut d = draft(PaymentMethod::Cash, two_lines());
        d.discount_cents = 50;

        // (250 − 50) × 17% = 34
        let priced = price_invoice(&d, TaxRate::from_bps(1700)).unwrap();
        assert_eq!(priced.tax.cents(), 34);
        assert_eq!(priced.total.cents(), 234);
        assert_eq!(
            priced.total,
            priced.subtotal - priced.discount + priced.tax
        );
    }

    #[test]
    fn line_discount_reduces_line_total_but_not_subtotal() {
        let mut line = DraftLine::new("a", "A", 3, 100);
        line.discount_cents = 30;

        let priced = price_invoice(&draft(PaymentMethod::Cash, vec![line]), TaxRate::zero()).unwrap();
        assert_eq!(priced.subtotal.cents(), 300);
        assert_eq!(priced.lines[0].total.cents(), 270);
    }

    #[test]
    fn empty_cart_is_rejected() {
        let err = price_invoice(&draft(PaymentMethod::Cash, vec![]), TaxRate::zero()).unwrap_err();
        assert!(matches!(err, CoreError::EmptyCart));
    }

    #[test]
    fn oversized_cart_is_rejected() {
        let lines = (0..=MAX_CART_ITEMS)
            .map(|i| DraftLine::new(format!("p{i}"), "X", 1, 1))
            .collect();
        let err = price_invoice(&draft(PaymentMethod::Cash, lines), TaxRate::zero()).unwrap_err();
        assert!(matches!(err, CoreError::CartTooLarge { max: MAX_CART_ITEMS }));
    }

    #[test]
    fn bad_lines_are_rejected() {
        let zero_qty = vec![DraftLine::new("a", "A", 0, 100)];
        assert!(matches!(
            price_invoice(&draft(PaymentMethod::Cash, zero_qty), TaxRate::zero()),
            Err(CoreError::Validation(ValidationError::MustBePositive { .. }))
        ));

        let negative_price = vec![DraftLine::new("a", "A", 1, -1)];
        assert!(price_invoice(&draft(PaymentMethod::Cash, negative_price), TaxRate::zero()).is_err());

        let mut over_discounted = DraftLine::new("a", "A", 1, 100);
        over_discounted.discount_cents = 101;
        assert!(price_invoice(&draft(PaymentMethod::Cash, vec![over_discounted]), TaxRate::zero()).is_err());
    }

    #[test]
    fn discount_larger_than_subtotal_is_rejected() {
        let mut d = draft(PaymentMethod::Cash, two_lines());
        d.discount_cents = 251;
        assert!(price_invoice(&d, TaxRate::zero()).is_err());
    }

    #[test]
    fn negative_credit_payment_is_rejected() {
        let mut d = draft(PaymentMethod::Credit, two_lines());
        d.amount_paid_cents = Some(-5);
        assert!(price_invoice(&d, TaxRate::zero()).is_err());
    }

    #[test]
    fn credit_sale_requires_customer() {
        let d = draft(PaymentMethod::Credit, two_lines());
        let err = check_parties(&d).unwrap_err();
        assert!(matches!(err, CoreError::MissingParty { ref party, .. } if party == "customer"));

        let cash = draft(PaymentMethod::Cash, two_lines());
        assert!(check_parties(&cash).is_ok());
    }

    #[test]
    fn credit_purchase_requires_supplier() {
        let mut d = draft(PaymentMethod::Credit, two_lines());
        d.invoice_type = InvoiceType::Purchase;
        assert!(matches!(
            check_parties(&d),
            Err(CoreError::MissingParty { ref party, .. }) if party == "supplier"
        ));

        d.supplier_id = Some("s-1".into());
        assert!(check_parties(&d).is_ok());
    }

    #[test]
    fn wrong_party_kind_is_rejected() {
        let mut sale = draft(PaymentMethod::Cash, two_lines());
        sale.supplier_id = Some("s-1".into());
        assert!(matches!(check_parties(&sale), Err(CoreError::UnexpectedParty { .. })));

        let mut purchase = draft(PaymentMethod::Cash, two_lines());
        purchase.invoice_type = InvoiceType::Purchase;
        purchase.customer_id = Some("c-1".into());
        assert!(matches!(check_parties(&purchase), Err(CoreError::UnexpectedParty { .. })));
    }

    #[test]
    fn credit_return_is_rejected() {
        let mut d = draft(PaymentMethod::Credit, two_lines());
        d.invoice_type = InvoiceType::Return;
        d.customer_id = Some("c-1".into());
        assert!(matches!(
            check_parties(&d),
            Err(CoreError::Validation(ValidationError::NotAllowed { ref field, .. })) if field == "paymentMethod"
        ));

        d.payment_method = PaymentMethod::Cash;
        assert!(check_parties(&d).is_ok());
    }

    #[test]
    fn huge_price_is_rejected_before_totals() {
        let lines = vec![DraftLine::new("a", "A", 3, i64::MAX / 2)];
        assert!(matches!(
            price_invoice(&draft(PaymentMethod::Cash, lines), TaxRate::zero()),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
    }

    #[test]
    fn largest_cart_prices_without_overflow() {
        let lines = (0..MAX_CART_ITEMS)
            .map(|i| DraftLine::new(format!("p{i}"), "X", crate::MAX_ITEM_QUANTITY, crate::MAX_AMOUNT_CENTS))
            .collect();
        let priced = price_invoice(&draft(PaymentMethod::Cash, lines), TaxRate::from_bps(10_000)).unwrap();

        let subtotal = crate::MAX_AMOUNT_CENTS * crate::MAX_ITEM_QUANTITY * MAX_CART_ITEMS as i64;
        assert_eq!(priced.subtotal.cents(), subtotal);
        assert_eq!(priced.total.cents(), subtotal * 2);
    }

    #[test]
    fn invoice_numbers_are_zero_padded() {
        assert_eq!(format_invoice_number("INV", 1), "INV000001");
        assert_eq!(format_invoice_number("INV", 999_999), "INV999999");
        assert_eq!(format_invoice_number("S", 42), "S000042");
    }

    #[test]
    fn receipt_numbers_keep_last_eight_digits() {
        assert_eq!(format_receipt_number(1_718_000_123_456), "REC00123456");
        assert_eq!(format_receipt_number(42), "REC00000042");
    }

    #[test]
    fn draft_reads_till_json() {
        let body = r#"{
            "type": "sale",
            "customerId": null,
            "paymentMethod": "cash",
            "items": [{"productId": "a", "productName": "Tea", "quantity": 2, "priceCents": 100}]
        }"#;

        let draft: InvoiceDraft = serde_json::from_str(body).unwrap();

        assert_eq!(draft.invoice_type, InvoiceType::Sale);
        assert_eq!(draft.discount_cents, 0);
        assert_eq!(draft.items[0].discount_cents, 0);
        assert!(draft.supplier_id.is_none());
    }
}
