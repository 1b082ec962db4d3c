//! The reconciliation engine: single writer of order payment state.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use storefront_core::{CustomerId, DomainError, OrderId};
use storefront_gateways::{CallbackEvent, CaptureResult, CheckoutContext};
use storefront_invoicing::{derive_invoice, BillingPolicy};
use storefront_legal::{missing_required, LegalAcceptance};
use storefront_notify::Notification;
use storefront_orders::{Order, OrderItem};

use crate::error::ReconcileError;
use crate::stores::{
    CancelOutcome, InsertInvoice, InsertPaid, InvoiceStore, LegalStore,
    NotificationStore, OrderStore, PaidTransition, StoreError,
};

/// Finalization knobs, injected from configuration.
#[derive(Debug, Clone)]
pub struct FinalizePolicy {
    pub billing: BillingPolicy,
    /// Staff accounts alerted about every newly paid order.
    pub staff_recipients: Vec<CustomerId>,
}

/// Per-effect outcome of the post-Paid fan-out.
///
/// A `false` means the effect failed and was logged for operational
/// follow-up; the Paid transition stands regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanoutReport {
    pub invoice_issued: bool,
    pub legal_recorded: bool,
    pub buyer_notified: bool,
    pub staff_notified: bool,
}

impl FanoutReport {
    pub fn all_ok(&self) -> bool {
        self.invoice_issued && self.legal_recorded && self.buyer_notified && self.staff_notified
    }
}

/// How a verified callback was reconciled. Every variant except a transport
/// error is acknowledged to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackDisposition {
    /// Pending→Paid applied and side effects fanned out.
    Finalized {
        order_id: OrderId,
        fanout: FanoutReport,
    },
    /// Same completion delivered again; no-op.
    DuplicateDelivery { order_id: OrderId },
    /// Session expiry cancelled the pending order.
    Expired { order_id: OrderId },
    /// Expiry for an order that was no longer pending; no-op.
    ExpiryIgnored { order_id: OrderId },
    /// The order is already terminal (e.g. swept to Cancelled); a late
    /// completion is not allowed to reopen it.
    Stale { order_id: OrderId },
    /// Not an order of ours; acknowledged so the provider stops retrying.
    UnknownOrder { order_id: OrderId },
    /// An event type this system does not act on.
    Ignored { event_type: String },
}

/// Outcome of a wallet capture finalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureDisposition {
    /// A new Paid order was created.
    Finalized { order: Order, fanout: FanoutReport },
    /// This provider transaction already finalized an order (duplicate
    /// capture call, e.g. a client retry after a timed-out first attempt
    /// that actually succeeded upstream).
    AlreadyFinalized { order: Order },
}

/// Consumes adapter events and maps each to exactly one ledger transition.
pub struct ReconciliationEngine {
    orders: Arc<dyn OrderStore>,
    invoices: Arc<dyn InvoiceStore>,
    legal: Arc<dyn LegalStore>,
    notifications: Arc<dyn NotificationStore>,
    policy: FinalizePolicy,
}

impl ReconciliationEngine {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        invoices: Arc<dyn InvoiceStore>,
        legal: Arc<dyn LegalStore>,
        notifications: Arc<dyn NotificationStore>,
        policy: FinalizePolicy,
    ) -> Self {
        Self {
            orders,
            invoices,
            legal,
            notifications,
            policy,
        }
    }

    /// Reconcile one verified hosted-provider callback.
    ///
    /// Errors are transient store failures only; every business outcome is a
    /// disposition the caller acknowledges to the provider.
    pub async fn handle_callback_event(
        &self,
        event: CallbackEvent,
        now: DateTime<Utc>,
    ) -> Result<CallbackDisposition, ReconcileError> {
        match event {
            CallbackEvent::SessionCompleted {
                order_id,
                provider_tx_id,
                context,
            } => {
                self.complete_session(order_id, &provider_tx_id, &context, now)
                    .await
            }
            CallbackEvent::SessionExpired { order_id } => {
                match self.orders.cancel_if_pending(order_id, now).await? {
                    CancelOutcome::Cancelled => {
                        tracing::info!(%order_id, "pending order cancelled on session expiry");
                        Ok(CallbackDisposition::Expired { order_id })
                    }
                    CancelOutcome::NotPending => {
                        Ok(CallbackDisposition::ExpiryIgnored { order_id })
                    }
                    CancelOutcome::NotFound => {
                        tracing::warn!(%order_id, "expiry callback for unknown order");
                        Ok(CallbackDisposition::UnknownOrder { order_id })
                    }
                }
            }
            CallbackEvent::Ignored { event_type } => {
                tracing::debug!(%event_type, "callback event type not handled");
                Ok(CallbackDisposition::Ignored { event_type })
            }
        }
    }

    async fn complete_session(
        &self,
        order_id: OrderId,
        provider_tx_id: &str,
        context: &CheckoutContext,
        now: DateTime<Utc>,
    ) -> Result<CallbackDisposition, ReconcileError> {
        match self.orders.mark_paid(order_id, provider_tx_id, now).await? {
            PaidTransition::Applied => {
                let order = self
                    .orders
                    .get(order_id)
                    .await?
                    .ok_or_else(|| StoreError::corrupt("paid order vanished"))?;
                let fanout = self.fan_out(&order, context, now).await;
                Ok(CallbackDisposition::Finalized { order_id, fanout })
            }
            PaidTransition::AlreadyPaid {
                provider_tx_id: stored,
            } => {
                if stored.as_deref() != Some(provider_tx_id) {
                    tracing::warn!(
                        %order_id,
                        incoming_tx = provider_tx_id,
                        stored_tx = stored.as_deref().unwrap_or("<none>"),
                        "completion callback for already-paid order with different transaction"
                    );
                }
                Ok(CallbackDisposition::DuplicateDelivery { order_id })
            }
            PaidTransition::NotPending { status } => {
                tracing::warn!(
                    %order_id,
                    status = status.as_str(),
                    "completion callback for terminal order; not reopened"
                );
                Ok(CallbackDisposition::Stale { order_id })
            }
            PaidTransition::NotFound => {
                tracing::warn!(%order_id, "completion callback for unknown order");
                Ok(CallbackDisposition::UnknownOrder { order_id })
            }
        }
    }

    /// Finalize a successful wallet capture.
    ///
    /// This is the one path that creates an order directly in Paid status;
    /// it is gated by the provider-transaction existence check so duplicate
    /// capture calls resolve to the already-finalized order.
    pub async fn finalize_capture(
        &self,
        customer_id: CustomerId,
        capture: CaptureResult,
        context: &CheckoutContext,
        now: DateTime<Utc>,
    ) -> Result<CaptureDisposition, ReconcileError> {
        if let Some(existing) = self
            .orders
            .find_by_provider_tx(&capture.provider_tx_id)
            .await?
        {
            tracing::info!(
                order_id = %existing.id,
                provider_tx_id = capture.provider_tx_id,
                "duplicate capture absorbed by existing order"
            );
            return Ok(CaptureDisposition::AlreadyFinalized { order: existing });
        }

        let shipping = capture
            .shipping_address
            .ok_or_else(|| DomainError::validation("capture without shipping address"))?;
        check_amount(&capture.items, capture.amount)?;

        let order = Order::paid(
            customer_id,
            capture.items,
            shipping,
            capture.provider_tx_id.clone(),
            now,
        )?;

        match self.orders.insert_paid(&order).await? {
            InsertPaid::Created => {
                let fanout = self.fan_out(&order, context, now).await;
                Ok(CaptureDisposition::Finalized { order, fanout })
            }
            InsertPaid::DuplicateTx { existing } => {
                // Lost the race against a concurrent duplicate capture.
                let order = self
                    .orders
                    .get(existing)
                    .await?
                    .ok_or_else(|| StoreError::corrupt("duplicate-tx order vanished"))?;
                Ok(CaptureDisposition::AlreadyFinalized { order })
            }
        }
    }

    /// Administrative sweep: cancel Pending orders older than `window`.
    pub async fn sweep_stale_pending(
        &self,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrderId>, ReconcileError> {
        let swept = self.orders.cancel_stale_pending(now - window, now).await?;
        if !swept.is_empty() {
            tracing::info!(count = swept.len(), "stale pending orders cancelled");
        }
        Ok(swept)
    }

    /// Re-entrant invoice generation for a paid order (defensive entry point
    /// used by the retrieval path when fan-out previously failed).
    pub async fn ensure_invoice(
        &self,
        order: &Order,
        now: DateTime<Utc>,
    ) -> Result<storefront_invoicing::Invoice, ReconcileError> {
        if let Some(existing) = self.invoices.find_by_order(order.id).await? {
            return Ok(existing);
        }

        let sequence = self.invoices.next_sequence().await?;
        let invoice = derive_invoice(order, sequence, self.policy.billing, now)?;
        match self.invoices.insert(&invoice).await? {
            InsertInvoice::Created => Ok(invoice),
            InsertInvoice::AlreadyExists(existing) => Ok(existing),
        }
    }

    /// Post-Paid side effects: invoice, legal proof, notifications.
    ///
    /// Each effect is wrapped independently; a failure is logged and recorded
    /// in the report but neither blocks the others nor reaches the caller.
    /// The payment is settled and must not appear to fail.
    async fn fan_out(
        &self,
        order: &Order,
        context: &CheckoutContext,
        now: DateTime<Utc>,
    ) -> FanoutReport {
        let invoice_issued = match self.ensure_invoice(order, now).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(order_id = %order.id, error = %e, "invoice generation failed");
                false
            }
        };

        let legal_recorded = match self.record_legal_proof(order, context, now).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(order_id = %order.id, error = %e, "legal proof recording failed");
                false
            }
        };

        let (buyer_notified, staff_notified) = self.notify(order, now).await;

        FanoutReport {
            invoice_issued,
            legal_recorded,
            buyer_notified,
            staff_notified,
        }
    }

    async fn record_legal_proof(
        &self,
        order: &Order,
        context: &CheckoutContext,
        now: DateTime<Utc>,
    ) -> Result<(), ReconcileError> {
        let existing = self.legal.list_for_order(order.id).await?;
        for document in missing_required(order.id, &existing) {
            let acceptance = LegalAcceptance::for_order(
                order.customer_id,
                order.id,
                document,
                context.client_ip.clone(),
                context.user_agent.clone(),
                now,
            );
            self.legal.record(&acceptance).await?;
        }
        Ok(())
    }

    /// Best-effort notifications; per-recipient failures are isolated.
    async fn notify(&self, order: &Order, now: DateTime<Utc>) -> (bool, bool) {
        let buyer = Notification::order_confirmation(order, now);
        let buyer_ok = match self.notifications.push(&buyer).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(order_id = %order.id, error = %e, "buyer notification failed");
                false
            }
        };

        let mut staff_ok = true;
        for recipient in &self.policy.staff_recipients {
            let alert = Notification::staff_alert(*recipient, order, now);
            if let Err(e) = self.notifications.push(&alert).await {
                tracing::error!(
                    order_id = %order.id,
                    recipient = %recipient,
                    error = %e,
                    "staff notification failed"
                );
                staff_ok = false;
            }
        }

        (buyer_ok, staff_ok)
    }
}

/// The captured amount must equal the sum of the echoed line items.
fn check_amount(items: &[OrderItem], amount: storefront_core::Money) -> Result<(), DomainError> {
    let total = Order::total_from_items(items)?;
    if total != amount {
        return Err(DomainError::validation(format!(
            "capture amount mismatch: items total {total}, captured {amount}"
        )));
    }
    Ok(())
}
