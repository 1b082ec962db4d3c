//! Ledger store contract.
//!
//! The datastore is the single source of truth and the only shared mutable
//! resource. Same-order idempotency is enforced by conditional
//! check-and-write primitives here (compare-and-swap on order status,
//! uniqueness on the provider transaction id), not by in-process locks: the
//! two adapters run in physically separate request contexts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use storefront_core::{CustomerId, InvoiceId, NotificationId, OrderId};
use storefront_invoicing::Invoice;
use storefront_legal::LegalAcceptance;
use storefront_notify::Notification;
use storefront_orders::{Order, OrderStatus};

/// Datastore failure, surfaced as retryable to callers.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store conflict: {0}")]
    Conflict(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }
}

/// Outcome of the conditional Pending→Paid write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaidTransition {
    /// The order moved Pending→Paid in this call.
    Applied,
    /// The order was already Paid (or further along); carries the stored
    /// provider transaction id for duplicate-delivery diagnostics.
    AlreadyPaid { provider_tx_id: Option<String> },
    /// The order is in a terminal non-payable state (e.g. Cancelled).
    NotPending { status: OrderStatus },
    /// No such order.
    NotFound,
}

/// Outcome of the conditional Pending→Cancelled write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled,
    NotPending,
    NotFound,
}

/// Outcome of inserting an order born Paid (wallet capture path).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertPaid {
    Created,
    /// Another order already owns this provider transaction id.
    DuplicateTx { existing: OrderId },
}

/// Outcome of inserting an invoice (unique per order).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertInvoice {
    Created,
    /// An invoice for the order already exists; the stored one is returned.
    AlreadyExists(Invoice),
}

/// Durable order records, keyed by order id and provider transaction id.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist a provisional order (the builder's single durable write).
    async fn insert_pending(&self, order: &Order) -> Result<(), StoreError>;

    /// Atomically persist an order born Paid, enforcing provider-tx
    /// uniqueness in the same operation.
    async fn insert_paid(&self, order: &Order) -> Result<InsertPaid, StoreError>;

    async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    async fn find_by_provider_tx(
        &self,
        provider_tx_id: &str,
    ) -> Result<Option<Order>, StoreError>;

    /// Record the hosted-checkout session handle for expiry correlation.
    async fn attach_checkout_session(
        &self,
        id: OrderId,
        session_ref: &str,
    ) -> Result<(), StoreError>;

    /// Conditional Pending→Paid transition (compare-and-swap on status).
    async fn mark_paid(
        &self,
        id: OrderId,
        provider_tx_id: &str,
        paid_at: DateTime<Utc>,
    ) -> Result<PaidTransition, StoreError>;

    /// Conditional Pending→Cancelled transition.
    async fn cancel_if_pending(
        &self,
        id: OrderId,
        now: DateTime<Utc>,
    ) -> Result<CancelOutcome, StoreError>;

    /// Cancel every Pending order created before `cutoff`; returns the ids
    /// swept.
    async fn cancel_stale_pending(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrderId>, StoreError>;

    /// Staff-driven monotonic status advance; `false` when the precondition
    /// no longer holds.
    async fn advance_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    async fn list_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Order>, StoreError>;
}

/// Append-only invoice records, at most one per order.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Allocate the next human-facing sequence number.
    async fn next_sequence(&self) -> Result<u64, StoreError>;

    /// Insert unless an invoice for the order already exists.
    async fn insert(&self, invoice: &Invoice) -> Result<InsertInvoice, StoreError>;

    async fn find_by_order(&self, order_id: OrderId) -> Result<Option<Invoice>, StoreError>;

    async fn get(&self, id: InvoiceId) -> Result<Option<Invoice>, StoreError>;
}

/// Append-only consent records, unique per (order, document, version).
#[async_trait]
pub trait LegalStore: Send + Sync {
    /// Insert an acceptance; returns `false` when an identical proof already
    /// exists (duplicate fan-out runs insert nothing new).
    async fn record(&self, acceptance: &LegalAcceptance) -> Result<bool, StoreError>;

    async fn list_for_order(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<LegalAcceptance>, StoreError>;

    async fn list_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<LegalAcceptance>, StoreError>;
}

/// Advisory notification rows.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn push(&self, notification: &Notification) -> Result<(), StoreError>;

    async fn list_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Notification>, StoreError>;

    /// Mark one of the customer's notifications read; `false` if not theirs.
    async fn mark_read(
        &self,
        id: NotificationId,
        customer_id: CustomerId,
    ) -> Result<bool, StoreError>;
}
