use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{CustomerId, DomainError, NotificationId, OrderId};
use storefront_orders::Order;

/// Notification type tag, used by the UI layer for grouping/icons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    OrderConfirmed,
    StaffOrderAlert,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::OrderConfirmed => "order_confirmed",
            NotificationKind::StaffOrderAlert => "staff_order_alert",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "order_confirmed" => Ok(NotificationKind::OrderConfirmed),
            "staff_order_alert" => Ok(NotificationKind::StaffOrderAlert),
            other => Err(DomainError::validation(format!(
                "unknown notification kind: {other}"
            ))),
        }
    }
}

/// Ephemeral user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub customer_id: CustomerId,
    pub title: String,
    pub body: String,
    pub kind: NotificationKind,
    pub read: bool,
    #[serde(default)]
    pub order_id: Option<OrderId>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Buyer-facing payment confirmation.
    pub fn order_confirmation(order: &Order, now: DateTime<Utc>) -> Self {
        Self {
            id: NotificationId::new(),
            customer_id: order.customer_id,
            title: "Your order is confirmed".to_string(),
            body: format!(
                "Payment of {} received. Order {} is being prepared.",
                order.total_amount.display_decimal(),
                order.id
            ),
            kind: NotificationKind::OrderConfirmed,
            read: false,
            order_id: Some(order.id),
            created_at: now,
        }
    }

    /// Staff-facing alert about a newly paid order.
    pub fn staff_alert(recipient: CustomerId, order: &Order, now: DateTime<Utc>) -> Self {
        Self {
            id: NotificationId::new(),
            customer_id: recipient,
            title: "New paid order".to_string(),
            body: format!(
                "Order {} ({}) is paid and awaiting processing.",
                order.id,
                order.total_amount.display_decimal()
            ),
            kind: NotificationKind::StaffOrderAlert,
            read: false,
            order_id: Some(order.id),
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::{Money, ProductId};
    use storefront_orders::{OrderItem, ShippingAddress};

    fn order() -> Order {
        Order::paid(
            CustomerId::new(),
            vec![OrderItem {
                product_id: ProductId::new(),
                label: "Widget".to_string(),
                quantity: 2,
                unit_price: Money::from_cents(1000),
            }],
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

    #[test]
    fn confirmation_targets_the_buyer() {
        let order = order();
        let n = Notification::order_confirmation(&order, Utc::now());
        assert_eq!(n.customer_id, order.customer_id);
        assert_eq!(n.order_id, Some(order.id));
        assert!(!n.read);
        assert!(n.body.contains("20.00"));
    }

    #[test]
    fn staff_alert_targets_the_recipient() {
        let order = order();
        let staff = CustomerId::new();
        let n = Notification::staff_alert(staff, &order, Utc::now());
        assert_eq!(n.customer_id, staff);
        assert_eq!(n.kind, NotificationKind::StaffOrderAlert);
    }
}
