use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{CustomerId, DomainError, InvoiceId, Money, OrderId};
use storefront_orders::{Order, OrderStatus, PaymentStatus};

/// Itemized invoice line, mirrored from the order's captured prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub label: String,
    pub quantity: u32,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: Money,
    pub line_total: Money,
}

/// Billing record derived from exactly one Paid order.
///
/// Append-only: once written it is never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    /// Human-facing number, formatted from a store-issued sequence.
    pub number: String,
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub lines: Vec<InvoiceLine>,
    pub total_excl_tax: Money,
    pub total_incl_tax: Money,
    pub issued_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    /// Mirror of the order's payment status at issue time.
    pub payment_status: PaymentStatus,
}

/// Billing knobs, injected from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingPolicy {
    /// Tax rate in basis points (2000 = 20%), applied on top of the
    /// tax-exclusive order total.
    pub tax_rate_bps: u32,
    /// Payment terms: due date offset from issue date, in days.
    pub due_days: i64,
}

impl Default for BillingPolicy {
    fn default() -> Self {
        Self {
            tax_rate_bps: 2000,
            due_days: 30,
        }
    }
}

/// Format a store-issued sequence into the human-facing invoice number.
pub fn format_number(issued_at: DateTime<Utc>, sequence: u64) -> String {
    format!("INV-{}-{:06}", issued_at.format("%Y"), sequence)
}

/// Derive the invoice for a Paid order.
///
/// Pure function of the order, the issued sequence number and the billing
/// policy. Totals come from the order's captured line prices, never from the
/// current catalog. Rejects orders that are not Paid (or beyond).
pub fn derive_invoice(
    order: &Order,
    sequence: u64,
    policy: BillingPolicy,
    issued_at: DateTime<Utc>,
) -> Result<Invoice, DomainError> {
    match order.status {
        OrderStatus::Pending | OrderStatus::Cancelled => {
            return Err(DomainError::invariant(
                "cannot invoice an order that is not paid",
            ));
        }
        _ => {}
    }

    let mut lines = Vec::with_capacity(order.items.len());
    for item in &order.items {
        lines.push(InvoiceLine {
            label: item.label.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            line_total: item.line_total()?,
        });
    }

    let total_excl_tax = order.total_amount;
    let total_incl_tax = with_tax(total_excl_tax, policy.tax_rate_bps)?;

    Ok(Invoice {
        id: InvoiceId::new(),
        number: format_number(issued_at, sequence),
        order_id: order.id,
        customer_id: order.customer_id,
        lines,
        total_excl_tax,
        total_incl_tax,
        issued_at,
        due_at: issued_at + Duration::days(policy.due_days),
        payment_status: order.payment_status,
    })
}

/// Apply a basis-point tax rate, rounding half-up on the minor unit.
fn with_tax(amount: Money, rate_bps: u32) -> Result<Money, DomainError> {
    let cents = amount.cents();
    let taxed = cents
        .checked_mul(10_000 + i64::from(rate_bps))
        .ok_or_else(|| DomainError::invariant("money overflow"))?;
    Ok(Money::from_cents((taxed + 5_000) / 10_000))
}

impl Invoice {
    /// Plain-text rendering of the billing document.
    ///
    /// The HTML template layer is out of scope; this is the canonical
    /// human-readable fallback served by the invoice endpoint.
    pub fn render_text(&self) -> String {
        let mut doc = String::new();
        doc.push_str(&format!("INVOICE {}\n", self.number));
        doc.push_str(&format!("Order: {}\n", self.order_id));
        doc.push_str(&format!("Issued: {}\n", self.issued_at.format("%Y-%m-%d")));
        doc.push_str(&format!("Due: {}\n\n", self.due_at.format("%Y-%m-%d")));
        for line in &self.lines {
            doc.push_str(&format!(
                "{:<40} {:>3} x {:>10} = {:>12}\n",
                line.label,
                line.quantity,
                line.unit_price.display_decimal(),
                line.line_total.display_decimal(),
            ));
        }
        doc.push_str(&format!(
            "\nTotal (excl. tax): {}\n",
            self.total_excl_tax.display_decimal()
        ));
        doc.push_str(&format!(
            "Total (incl. tax): {}\n",
            self.total_incl_tax.display_decimal()
        ));
        doc.push_str(&format!("Payment: {}\n", self.payment_status.as_str()));
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use storefront_core::ProductId;
    use storefront_orders::{OrderItem, ShippingAddress};

    fn paid_order(items: Vec<OrderItem>) -> Order {
        Order::paid(
            CustomerId::new(),
            items,
            ShippingAddress {
                recipient: "J. Doe".to_string(),
                line1: "1 Main St".to_string(),
                line2: None,
                city: "Lyon".to_string(),
                postal_code: "69001".to_string(),
                country: "FR".to_string(),
            },
            "TX-1".to_string(),
            Utc::now(),
        )
        .unwrap()
    }

    fn item(cents: i64, qty: u32) -> OrderItem {
        OrderItem {
            product_id: ProductId::new(),
            label: "Widget".to_string(),
            quantity: qty,
            unit_price: Money::from_cents(cents),
        }
    }

    #[test]
    fn invoice_totals_match_order_items() {
        let order = paid_order(vec![item(1000, 2), item(500, 1)]);
        let invoice =
            derive_invoice(&order, 42, BillingPolicy::default(), Utc::now()).unwrap();

        assert_eq!(invoice.total_excl_tax, Money::from_cents(2500));
        assert_eq!(invoice.total_incl_tax, Money::from_cents(3000)); // 20% VAT
        assert_eq!(invoice.lines.len(), 2);
        assert_eq!(invoice.lines[0].line_total, Money::from_cents(2000));
        assert_eq!(invoice.order_id, order.id);
        assert_eq!(invoice.payment_status, PaymentStatus::Completed);
    }

    #[test]
    fn number_formats_from_sequence_and_year() {
        let issued = "2026-08-27T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(format_number(issued, 7), "INV-2026-000007");
    }

    #[test]
    fn pending_order_cannot_be_invoiced() {
        let mut order = paid_order(vec![item(100, 1)]);
        order.status = OrderStatus::Pending;
        let err = derive_invoice(&order, 1, BillingPolicy::default(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn due_date_follows_policy() {
        let issued = "2026-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let order = paid_order(vec![item(100, 1)]);
        let invoice = derive_invoice(
            &order,
            1,
            BillingPolicy {
                tax_rate_bps: 0,
                due_days: 15,
            },
            issued,
        )
        .unwrap();
        assert_eq!(invoice.due_at - issued, Duration::days(15));
        assert_eq!(invoice.total_incl_tax, invoice.total_excl_tax);
    }

    #[test]
    fn render_text_carries_totals_and_number() {
        let order = paid_order(vec![item(1000, 2)]);
        let invoice =
            derive_invoice(&order, 3, BillingPolicy::default(), Utc::now()).unwrap();
        let doc = invoice.render_text();
        assert!(doc.contains(&invoice.number));
        assert!(doc.contains("20.00"));
        assert!(doc.contains("24.00"));
    }

    proptest! {
        // Deriving twice for the same order yields the same totals: the
        // invoice is a pure function of the order (ids/sequence aside).
        #[test]
        fn derivation_is_deterministic_in_totals(
            lines in prop::collection::vec((1i64..10_000, 1u32..10), 1..6)
        ) {
            let order = paid_order(lines.iter().map(|(c, q)| item(*c, *q)).collect());
            let issued = Utc::now();
            let a = derive_invoice(&order, 1, BillingPolicy::default(), issued).unwrap();
            let b = derive_invoice(&order, 1, BillingPolicy::default(), issued).unwrap();
            prop_assert_eq!(a.total_excl_tax, b.total_excl_tax);
            prop_assert_eq!(a.total_incl_tax, b.total_incl_tax);
            prop_assert_eq!(a.total_excl_tax, order.total_amount);
        }
    }
}
