use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{CustomerId, DomainError, Money, OrderId, ProductId};

/// Order lifecycle status.
///
/// Transitions are monotonic along Pending → Paid → Processing → Shipped →
/// Delivered; Pending and Paid may additionally move to Cancelled. Nothing
/// ever moves backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Whether `self → next` is a legal forward transition.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Paid)
                | (Paid, Processing)
                | (Processing, Shipped)
                | (Shipped, Delivered)
                | (Pending, Cancelled)
                | (Paid, Cancelled)
        )
    }

    /// Terminal states accept no further transitions from the payment path.
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Delivered)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(DomainError::validation(format!(
                "unknown order status: {other}"
            ))),
        }
    }
}

/// Payment settlement status, mirrored from the reconciliation outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "completed" => Ok(PaymentStatus::Completed),
            "failed" => Ok(PaymentStatus::Failed),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(DomainError::validation(format!(
                "unknown payment status: {other}"
            ))),
        }
    }
}

/// Which provider integration produced/settles this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Hosted checkout session, settled by an out-of-band signed callback.
    HostedCard,
    /// Two-phase wallet flow: intent, external approval, explicit capture.
    Wallet,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::HostedCard => "hosted_card",
            PaymentMethod::Wallet => "wallet",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "hosted_card" => Ok(PaymentMethod::HostedCard),
            "wallet" => Ok(PaymentMethod::Wallet),
            other => Err(DomainError::validation(format!(
                "unknown payment method: {other}"
            ))),
        }
    }
}

/// Shipping address captured at checkout time (opaque structured blob to
/// the payment core; the address book is out of scope).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub recipient: String,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

impl ShippingAddress {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.recipient.trim().is_empty()
            || self.line1.trim().is_empty()
            || self.city.trim().is_empty()
            || self.postal_code.trim().is_empty()
            || self.country.trim().is_empty()
        {
            return Err(DomainError::validation("incomplete shipping address"));
        }
        Ok(())
    }
}

/// Order line with the unit price captured at order time.
///
/// The captured price is final: it is never recomputed from current catalog
/// prices after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub label: String,
    pub quantity: u32,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: Money,
}

impl OrderItem {
    pub fn line_total(&self) -> Result<Money, DomainError> {
        self.unit_price.times(self.quantity)
    }
}

/// One checkout attempt's commercial record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub items: Vec<OrderItem>,
    /// Sum of line totals at creation time; never recomputed.
    pub total_amount: Money,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    /// External provider's transaction reference; the idempotency key that
    /// correlates provider events to exactly one order.
    #[serde(default)]
    pub provider_tx_id: Option<String>,
    /// Hosted-checkout session handle, kept for expiry correlation.
    #[serde(default)]
    pub checkout_session_ref: Option<String>,
    pub shipping_address: ShippingAddress,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Sum line totals, checked.
    pub fn total_from_items(items: &[OrderItem]) -> Result<Money, DomainError> {
        let mut total = Money::ZERO;
        for item in items {
            total = total.add(item.line_total()?)?;
        }
        Ok(total)
    }

    /// Construct a provisional (Pending) order from already-priced items.
    pub fn pending(
        customer_id: CustomerId,
        items: Vec<OrderItem>,
        shipping_address: ShippingAddress,
        payment_method: PaymentMethod,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if items.is_empty() {
            return Err(DomainError::validation("order has no items"));
        }
        shipping_address.validate()?;
        let total_amount = Self::total_from_items(&items)?;

        Ok(Self {
            id: OrderId::new(),
            customer_id,
            items,
            total_amount,
            status: OrderStatus::Pending,
            payment_method,
            payment_status: PaymentStatus::Pending,
            provider_tx_id: None,
            checkout_session_ref: None,
            shipping_address,
            created_at: now,
            updated_at: now,
        })
    }

    /// Construct an order born Paid: the two-phase wallet capture path, where
    /// no Pending row pre-exists the provider approval.
    pub fn paid(
        customer_id: CustomerId,
        items: Vec<OrderItem>,
        shipping_address: ShippingAddress,
        provider_tx_id: String,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let mut order = Self::pending(
            customer_id,
            items,
            shipping_address,
            PaymentMethod::Wallet,
            now,
        )?;
        order.status = OrderStatus::Paid;
        order.payment_status = PaymentStatus::Completed;
        order.provider_tx_id = Some(provider_tx_id);
        Ok(order)
    }

    pub fn is_owned_by(&self, customer: CustomerId) -> bool {
        self.customer_id == customer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> ShippingAddress {
        ShippingAddress {
            recipient: "J. Doe".to_string(),
            line1: "1 Main St".to_string(),
            line2: None,
            city: "Lyon".to_string(),
            postal_code: "69001".to_string(),
            country: "FR".to_string(),
        }
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
    fn forward_transitions_only() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Paid));
        assert!(Paid.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Delivered));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Paid.can_transition_to(Cancelled));

        assert!(!Paid.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Paid));
        assert!(!Delivered.can_transition_to(Shipped));
        assert!(!Pending.can_transition_to(Processing));
    }

    #[test]
    fn pending_order_totals_from_items() {
        let order = Order::pending(
            CustomerId::new(),
            vec![item(1000, 2), item(250, 1)],
            address(),
            PaymentMethod::HostedCard,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(order.total_amount, Money::from_cents(2250));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert!(order.provider_tx_id.is_none());
    }

    #[test]
    fn empty_cart_is_rejected() {
        let err = Order::pending(
            CustomerId::new(),
            vec![],
            address(),
            PaymentMethod::HostedCard,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn incomplete_address_is_rejected() {
        let mut addr = address();
        addr.city = "  ".to_string();
        let err = Order::pending(
            CustomerId::new(),
            vec![item(100, 1)],
            addr,
            PaymentMethod::HostedCard,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn paid_order_carries_provider_tx() {
        let order = Order::paid(
            CustomerId::new(),
            vec![item(500, 3)],
            address(),
            "TX-123".to_string(),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.payment_status, PaymentStatus::Completed);
        assert_eq!(order.payment_method, PaymentMethod::Wallet);
        assert_eq!(order.provider_tx_id.as_deref(), Some("TX-123"));
        assert_eq!(order.total_amount, Money::from_cents(1500));
    }

    #[test]
    fn status_round_trips_through_strings() {
        for s in [
            OrderStatus::Pending,
            OrderStatus::Paid,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::parse(s.as_str()).unwrap(), s);
        }
        assert!(OrderStatus::parse("unknown").is_err());
    }
}
