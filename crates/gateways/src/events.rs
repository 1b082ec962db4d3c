//! Tagged events handed from the adapters to the reconciliation engine.

use storefront_core::OrderId;

/// Caller context captured at checkout time.
///
/// The hosted provider's callback arrives without a client IP of its own, so
/// the original client IP/user-agent are captured server-side at session
/// creation and round-tripped through the provider's metadata blob.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CheckoutContext {
    pub client_ip: String,
    pub user_agent: String,
}

/// Decoded, authenticated provider callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackEvent {
    /// The hosted session was paid; `provider_tx_id` is the idempotency key.
    SessionCompleted {
        order_id: OrderId,
        provider_tx_id: String,
        context: CheckoutContext,
    },
    /// The hosted session lapsed without payment.
    SessionExpired { order_id: OrderId },
    /// An event type this system does not act on; acknowledged, never retried.
    Ignored { event_type: String },
}
