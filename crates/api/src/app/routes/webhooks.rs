//! Provider callback endpoint.
//!
//! Authenticity comes from the signed payload, not from identity headers;
//! this route is mounted outside the identity layer. Every verified event
//! maps to a disposition that is acknowledged with 200 so the provider stops
//! redelivering; only transient store failures return 503 to invite a retry.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;

use storefront_reconcile::CallbackDisposition;

use crate::app::errors;
use crate::app::services::AppServices;

pub async fn hosted_callback(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    body: Bytes,
) -> axum::response::Response {
    let now = Utc::now();

    let Some(signature) = headers
        .get("x-provider-signature")
        .and_then(|v| v.to_str().ok())
    else {
        tracing::warn!("callback without signature header");
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_signature",
            "missing signature header",
        );
    };

    let event = match services.hosted.handle_callback(&body, signature, now) {
        Ok(event) => event,
        Err(e) => return errors::gateway_error_to_response(e),
    };

    let disposition = match services.engine.handle_callback_event(event, now).await {
        Ok(d) => d,
        Err(e) => return errors::reconcile_error_to_webhook_response(e),
    };

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "received": true,
            "disposition": disposition_label(&disposition),
        })),
    )
        .into_response()
}

fn disposition_label(disposition: &CallbackDisposition) -> &'static str {
    match disposition {
        CallbackDisposition::Finalized { .. } => "finalized",
        CallbackDisposition::DuplicateDelivery { .. } => "duplicate",
        CallbackDisposition::Expired { .. } => "expired",
        CallbackDisposition::ExpiryIgnored { .. } => "expiry_ignored",
        CallbackDisposition::Stale { .. } => "stale",
        CallbackDisposition::UnknownOrder { .. } => "unknown_order",
        CallbackDisposition::Ignored { .. } => "ignored",
    }
}
