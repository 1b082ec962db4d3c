//! Checkout entry points: one per provider protocol.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use chrono::Utc;

use storefront_orders::{
    build_pending_order, builder::price_cart, CheckoutRequest, Order, PaymentMethod,
};

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::context::CustomerContext;

pub fn router() -> Router {
    Router::new()
        .route("/checkout/session", post(create_session))
        .route("/checkout/intent", post(create_intent))
        .route("/checkout/capture", post(capture))
}

/// Hosted-card checkout: persist a Pending order, then register a provider
/// session carrying the correlation metadata.
pub async fn create_session(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(customer): Extension<CustomerContext>,
    headers: HeaderMap,
    Json(request): Json<CheckoutRequest>,
) -> axum::response::Response {
    let now = Utc::now();
    let context = dto::checkout_context(&headers);

    let order = match build_pending_order(
        services.catalog.as_ref(),
        customer.customer_id(),
        request,
        PaymentMethod::HostedCard,
        services.pricing,
        now,
    )
    .await
    {
        Ok(order) => order,
        Err(e) => return errors::domain_error_to_response(e),
    };

    if let Err(e) = services.orders.insert_pending(&order).await {
        return errors::store_error_to_response(e);
    }

    let session = match services
        .hosted
        .create_session(
            &order,
            &context,
            &services.checkout_success_url,
            &services.checkout_cancel_url,
        )
        .await
    {
        Ok(session) => session,
        Err(e) => {
            // The Pending order stays; the expiry sweep reclaims it if the
            // customer never retries.
            tracing::warn!(order_id = %order.id, error = %e, "hosted session creation failed");
            return errors::gateway_error_to_response(e);
        }
    };

    if let Err(e) = services
        .orders
        .attach_checkout_session(order.id, &session.session_id)
        .await
    {
        tracing::warn!(order_id = %order.id, error = %e, "failed to attach session ref");
    }

    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "order_id": order.id.to_string(),
            "session_id": session.session_id,
            "redirect_url": session.redirect_url,
            "total": order.total_amount.cents(),
        })),
    )
        .into_response()
}

/// Wallet phase one: price the cart and create a provider intent. No order
/// exists until capture succeeds.
pub async fn create_intent(
    Extension(services): Extension<Arc<AppServices>>,
    Json(request): Json<CheckoutRequest>,
) -> axum::response::Response {
    let items = match price_cart(services.catalog.as_ref(), &request.items).await {
        Ok(items) => items,
        Err(e) => return errors::domain_error_to_response(e),
    };
    if let Err(e) = request.shipping_address.validate() {
        return errors::domain_error_to_response(e);
    }
    let total = match Order::total_from_items(&items) {
        Ok(total) => total,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let intent = match services
        .wallet
        .create_intent(&items, &request.shipping_address, total)
        .await
    {
        Ok(intent) => intent,
        Err(e) => return errors::gateway_error_to_response(e),
    };

    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "intent_id": intent.intent_id,
            "approval_url": intent.approval_url,
            "total": total.cents(),
        })),
    )
        .into_response()
}

/// Wallet phase two: capture the approved intent and finalize the order.
pub async fn capture(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(customer): Extension<CustomerContext>,
    headers: HeaderMap,
    Json(request): Json<dto::CaptureRequest>,
) -> axum::response::Response {
    let now = Utc::now();
    let context = dto::checkout_context(&headers);

    let capture = match services.wallet.capture(&request.intent_id).await {
        Ok(capture) => capture,
        Err(e) => return errors::gateway_error_to_response(e),
    };

    let disposition = match services
        .engine
        .finalize_capture(customer.customer_id(), capture, &context, now)
        .await
    {
        Ok(d) => d,
        Err(e) => return errors::reconcile_error_to_response(e),
    };

    let order = match disposition {
        storefront_reconcile::CaptureDisposition::Finalized { order, .. } => order,
        storefront_reconcile::CaptureDisposition::AlreadyFinalized { order } => order,
    };

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "success": true,
            "order_id": order.id.to_string(),
            "provider_tx_id": order.provider_tx_id,
            "status": order.status.as_str(),
            "total": order.total_amount.cents(),
        })),
    )
        .into_response()
}
