//! In-memory ledger stores.
//!
//! Intended for tests/dev. Not optimized for performance. Locks are only
//! held for the duration of a synchronous map operation, never across an
//! await point.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use storefront_core::{CustomerId, InvoiceId, NotificationId, OrderId};
use storefront_invoicing::Invoice;
use storefront_legal::LegalAcceptance;
use storefront_notify::Notification;
use storefront_orders::{Order, OrderStatus, PaymentStatus};
use storefront_reconcile::{
    CancelOutcome, InsertInvoice, InsertPaid, InvoiceStore, LegalStore,
    NotificationStore, OrderStore, PaidTransition, StoreError,
};

fn poisoned() -> StoreError {
    StoreError::unavailable("lock poisoned")
}

/// In-memory order store with the same conditional-write semantics as the
/// Postgres implementation.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<OrderId, Order>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert_pending(&self, order: &Order) -> Result<(), StoreError> {
        let mut orders = self.orders.write().map_err(|_| poisoned())?;
        if orders.contains_key(&order.id) {
            return Err(StoreError::Conflict(format!(
                "order {} already exists",
                order.id
            )));
        }
        orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn insert_paid(&self, order: &Order) -> Result<InsertPaid, StoreError> {
        let mut orders = self.orders.write().map_err(|_| poisoned())?;
        if let Some(tx) = order.provider_tx_id.as_deref() {
            if let Some(existing) = orders
                .values()
                .find(|o| o.provider_tx_id.as_deref() == Some(tx))
            {
                return Ok(InsertPaid::DuplicateTx {
                    existing: existing.id,
                });
            }
        }
        orders.insert(order.id, order.clone());
        Ok(InsertPaid::Created)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let orders = self.orders.read().map_err(|_| poisoned())?;
        Ok(orders.get(&id).cloned())
    }

    async fn find_by_provider_tx(
        &self,
        provider_tx_id: &str,
    ) -> Result<Option<Order>, StoreError> {
        let orders = self.orders.read().map_err(|_| poisoned())?;
        Ok(orders
            .values()
            .find(|o| o.provider_tx_id.as_deref() == Some(provider_tx_id))
            .cloned())
    }

    async fn attach_checkout_session(
        &self,
        id: OrderId,
        session_ref: &str,
    ) -> Result<(), StoreError> {
        let mut orders = self.orders.write().map_err(|_| poisoned())?;
        let order = orders
            .get_mut(&id)
            .ok_or_else(|| StoreError::Conflict(format!("order {id} not found")))?;
        order.checkout_session_ref = Some(session_ref.to_string());
        Ok(())
    }

    async fn mark_paid(
        &self,
        id: OrderId,
        provider_tx_id: &str,
        paid_at: DateTime<Utc>,
    ) -> Result<PaidTransition, StoreError> {
        let mut orders = self.orders.write().map_err(|_| poisoned())?;
        let Some(order) = orders.get_mut(&id) else {
            return Ok(PaidTransition::NotFound);
        };
        match order.status {
            OrderStatus::Pending => {
                order.status = OrderStatus::Paid;
                order.payment_status = PaymentStatus::Completed;
                order.provider_tx_id = Some(provider_tx_id.to_string());
                order.updated_at = paid_at;
                Ok(PaidTransition::Applied)
            }
            OrderStatus::Paid
            | OrderStatus::Processing
            | OrderStatus::Shipped
            | OrderStatus::Delivered => Ok(PaidTransition::AlreadyPaid {
                provider_tx_id: order.provider_tx_id.clone(),
            }),
            OrderStatus::Cancelled => Ok(PaidTransition::NotPending {
                status: order.status,
            }),
        }
    }

    async fn cancel_if_pending(
        &self,
        id: OrderId,
        now: DateTime<Utc>,
    ) -> Result<CancelOutcome, StoreError> {
        let mut orders = self.orders.write().map_err(|_| poisoned())?;
        let Some(order) = orders.get_mut(&id) else {
            return Ok(CancelOutcome::NotFound);
        };
        if order.status != OrderStatus::Pending {
            return Ok(CancelOutcome::NotPending);
        }
        order.status = OrderStatus::Cancelled;
        order.payment_status = PaymentStatus::Failed;
        order.updated_at = now;
        Ok(CancelOutcome::Cancelled)
    }

    async fn cancel_stale_pending(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrderId>, StoreError> {
        let mut orders = self.orders.write().map_err(|_| poisoned())?;
        let mut swept = Vec::new();
        for order in orders.values_mut() {
            if order.status == OrderStatus::Pending && order.created_at < cutoff {
                order.status = OrderStatus::Cancelled;
                order.payment_status = PaymentStatus::Failed;
                order.updated_at = now;
                swept.push(order.id);
            }
        }
        Ok(swept)
    }

    async fn advance_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut orders = self.orders.write().map_err(|_| poisoned())?;
        let Some(order) = orders.get_mut(&id) else {
            return Ok(false);
        };
        if order.status != from || !from.can_transition_to(to) {
            return Ok(false);
        }
        order.status = to;
        order.updated_at = now;
        Ok(true)
    }

    async fn list_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Order>, StoreError> {
        let orders = self.orders.read().map_err(|_| poisoned())?;
        let mut result: Vec<Order> = orders
            .values()
            .filter(|o| o.customer_id == customer_id)
            .cloned()
            .collect();
        result.sort_by_key(|o| o.created_at);
        Ok(result)
    }
}

/// In-memory invoice store; unique per order, monotonic sequence.
#[derive(Debug, Default)]
pub struct InMemoryInvoiceStore {
    invoices: RwLock<HashMap<OrderId, Invoice>>,
    sequence: AtomicU64,
}

impl InMemoryInvoiceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InvoiceStore for InMemoryInvoiceStore {
    async fn next_sequence(&self) -> Result<u64, StoreError> {
        Ok(self.sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn insert(&self, invoice: &Invoice) -> Result<InsertInvoice, StoreError> {
        let mut invoices = self.invoices.write().map_err(|_| poisoned())?;
        if let Some(existing) = invoices.get(&invoice.order_id) {
            return Ok(InsertInvoice::AlreadyExists(existing.clone()));
        }
        invoices.insert(invoice.order_id, invoice.clone());
        Ok(InsertInvoice::Created)
    }

    async fn find_by_order(&self, order_id: OrderId) -> Result<Option<Invoice>, StoreError> {
        let invoices = self.invoices.read().map_err(|_| poisoned())?;
        Ok(invoices.get(&order_id).cloned())
    }

    async fn get(&self, id: InvoiceId) -> Result<Option<Invoice>, StoreError> {
        let invoices = self.invoices.read().map_err(|_| poisoned())?;
        Ok(invoices.values().find(|i| i.id == id).cloned())
    }
}

/// In-memory legal store; unique per (order, document, version).
#[derive(Debug, Default)]
pub struct InMemoryLegalStore {
    acceptances: RwLock<Vec<LegalAcceptance>>,
}

impl InMemoryLegalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LegalStore for InMemoryLegalStore {
    async fn record(&self, acceptance: &LegalAcceptance) -> Result<bool, StoreError> {
        let mut acceptances = self.acceptances.write().map_err(|_| poisoned())?;
        let duplicate = acceptance.order_id.is_some()
            && acceptances.iter().any(|a| {
                a.order_id == acceptance.order_id
                    && a.document == acceptance.document
                    && a.version == acceptance.version
            });
        if duplicate {
            return Ok(false);
        }
        acceptances.push(acceptance.clone());
        Ok(true)
    }

    async fn list_for_order(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<LegalAcceptance>, StoreError> {
        let acceptances = self.acceptances.read().map_err(|_| poisoned())?;
        Ok(acceptances
            .iter()
            .filter(|a| a.order_id == Some(order_id))
            .cloned()
            .collect())
    }

    async fn list_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<LegalAcceptance>, StoreError> {
        let acceptances = self.acceptances.read().map_err(|_| poisoned())?;
        Ok(acceptances
            .iter()
            .filter(|a| a.customer_id == customer_id)
            .cloned()
            .collect())
    }
}

/// In-memory notification store.
#[derive(Debug, Default)]
pub struct InMemoryNotificationStore {
    notifications: RwLock<Vec<Notification>>,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn push(&self, notification: &Notification) -> Result<(), StoreError> {
        let mut notifications = self.notifications.write().map_err(|_| poisoned())?;
        notifications.push(notification.clone());
        Ok(())
    }

    async fn list_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Notification>, StoreError> {
        let notifications = self.notifications.read().map_err(|_| poisoned())?;
        Ok(notifications
            .iter()
            .filter(|n| n.customer_id == customer_id)
            .cloned()
            .collect())
    }

    async fn mark_read(
        &self,
        id: NotificationId,
        customer_id: CustomerId,
    ) -> Result<bool, StoreError> {
        let mut notifications = self.notifications.write().map_err(|_| poisoned())?;
        for n in notifications.iter_mut() {
            if n.id == id && n.customer_id == customer_id {
                n.read = true;
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::{Money, ProductId};
    use storefront_orders::{OrderItem, PaymentMethod, ShippingAddress};

    fn pending_order() -> Order {
        Order::pending(
            CustomerId::new(),
            vec![OrderItem {
                product_id: ProductId::new(),
                label: "Widget".to_string(),
                quantity: 1,
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
            PaymentMethod::HostedCard,
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn mark_paid_is_conditional_on_pending() {
        let store = InMemoryOrderStore::new();
        let order = pending_order();
        store.insert_pending(&order).await.unwrap();

        let first = store.mark_paid(order.id, "tx_1", Utc::now()).await.unwrap();
        assert_eq!(first, PaidTransition::Applied);

        let second = store.mark_paid(order.id, "tx_1", Utc::now()).await.unwrap();
        assert_eq!(
            second,
            PaidTransition::AlreadyPaid {
                provider_tx_id: Some("tx_1".to_string())
            }
        );
    }

    #[tokio::test]
    async fn cancelled_order_rejects_payment() {
        let store = InMemoryOrderStore::new();
        let order = pending_order();
        store.insert_pending(&order).await.unwrap();
        assert_eq!(
            store.cancel_if_pending(order.id, Utc::now()).await.unwrap(),
            CancelOutcome::Cancelled
        );

        let transition = store.mark_paid(order.id, "tx_1", Utc::now()).await.unwrap();
        assert_eq!(
            transition,
            PaidTransition::NotPending {
                status: OrderStatus::Cancelled
            }
        );
    }

    #[tokio::test]
    async fn insert_paid_detects_duplicate_tx() {
        let store = InMemoryOrderStore::new();
        let mut order = pending_order();
        order.status = OrderStatus::Paid;
        order.provider_tx_id = Some("tx_dup".to_string());
        assert_eq!(
            store.insert_paid(&order).await.unwrap(),
            InsertPaid::Created
        );

        let mut copy = pending_order();
        copy.status = OrderStatus::Paid;
        copy.provider_tx_id = Some("tx_dup".to_string());
        assert_eq!(
            store.insert_paid(&copy).await.unwrap(),
            InsertPaid::DuplicateTx { existing: order.id }
        );
    }

    #[tokio::test]
    async fn stale_sweep_only_cancels_old_pending() {
        let store = InMemoryOrderStore::new();
        let mut old = pending_order();
        old.created_at = Utc::now() - chrono::Duration::hours(2);
        let fresh = pending_order();
        store.insert_pending(&old).await.unwrap();
        store.insert_pending(&fresh).await.unwrap();

        let cutoff = Utc::now() - chrono::Duration::hours(1);
        let swept = store.cancel_stale_pending(cutoff, Utc::now()).await.unwrap();
        assert_eq!(swept, vec![old.id]);
        assert_eq!(
            store.get(fresh.id).await.unwrap().unwrap().status,
            OrderStatus::Pending
        );
    }

    #[tokio::test]
    async fn legal_record_is_unique_per_order_document_version() {
        let store = InMemoryLegalStore::new();
        let order_id = OrderId::new();
        let acceptance = LegalAcceptance::for_order(
            CustomerId::new(),
            order_id,
            storefront_legal::LegalDocument::TermsOfSale,
            "203.0.113.9".to_string(),
            "agent".to_string(),
            Utc::now(),
        );
        assert!(store.record(&acceptance).await.unwrap());
        assert!(!store.record(&acceptance).await.unwrap());
        assert_eq!(store.list_for_order(order_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invoice_insert_is_unique_per_order() {
        let store = InMemoryInvoiceStore::new();
        let mut order = pending_order();
        order.status = OrderStatus::Paid;
        let seq = store.next_sequence().await.unwrap();
        let invoice = storefront_invoicing::derive_invoice(
            &order,
            seq,
            storefront_invoicing::BillingPolicy::default(),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(store.insert(&invoice).await.unwrap(), InsertInvoice::Created);
        match store.insert(&invoice).await.unwrap() {
            InsertInvoice::AlreadyExists(existing) => assert_eq!(existing.id, invoice.id),
            other => panic!("expected AlreadyExists, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn mark_read_requires_ownership() {
        let store = InMemoryNotificationStore::new();
        let customer = CustomerId::new();
        let mut order = pending_order();
        order.customer_id = customer;
        order.status = OrderStatus::Paid;
        let n = Notification::order_confirmation(&order, Utc::now());
        store.push(&n).await.unwrap();

        assert!(!store.mark_read(n.id, CustomerId::new()).await.unwrap());
        assert!(store.mark_read(n.id, customer).await.unwrap());
        let listed = store.list_for_customer(customer).await.unwrap();
        assert!(listed[0].read);
    }
}
