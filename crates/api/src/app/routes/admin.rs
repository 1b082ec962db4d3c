//! Staff-only administration: fulfilment advances and the stale-pending sweep.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use chrono::Utc;

use storefront_core::OrderId;
use storefront_orders::OrderStatus;

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::context::CustomerContext;

pub fn router() -> Router {
    Router::new()
        .route("/admin/orders/sweep", post(sweep_stale))
        .route("/admin/orders/:id/status", post(advance_status))
}

fn require_staff(customer: &CustomerContext) -> Result<(), axum::response::Response> {
    if customer.is_staff() {
        Ok(())
    } else {
        Err(errors::json_error(
            StatusCode::FORBIDDEN,
            "forbidden",
            "staff access required",
        ))
    }
}

pub async fn sweep_stale(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(customer): Extension<CustomerContext>,
) -> axum::response::Response {
    if let Err(response) = require_staff(&customer) {
        return response;
    }

    match services
        .engine
        .sweep_stale_pending(services.checkout_expiry, Utc::now())
        .await
    {
        Ok(swept) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "cancelled": swept.iter().map(|id| id.to_string()).collect::<Vec<_>>(),
            })),
        )
            .into_response(),
        Err(e) => errors::reconcile_error_to_response(e),
    }
}

/// Monotonic status advance; the store re-checks the current status so a
/// concurrent change turns this into a 409.
pub async fn advance_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(customer): Extension<CustomerContext>,
    Path(id): Path<String>,
    Json(request): Json<dto::AdvanceStatusRequest>,
) -> axum::response::Response {
    if let Err(response) = require_staff(&customer) {
        return response;
    }

    let order_id: OrderId = match id.parse() {
        Ok(id) => id,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid order id"),
    };
    let to = match OrderStatus::parse(&request.status) {
        Ok(status) => status,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let order = match services.orders.get(order_id).await {
        Ok(Some(order)) => order,
        Ok(None) => return errors::json_error(StatusCode::NOT_FOUND, "not_found", "order not found"),
        Err(e) => return errors::store_error_to_response(e),
    };

    if !order.status.can_transition_to(to) {
        return errors::json_error(
            StatusCode::CONFLICT,
            "illegal_transition",
            format!("cannot move {} to {}", order.status.as_str(), to.as_str()),
        );
    }

    match services
        .orders
        .advance_status(order_id, order.status, to, Utc::now())
        .await
    {
        Ok(true) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "id": order_id.to_string(),
                "status": to.as_str(),
            })),
        )
            .into_response(),
        Ok(false) => errors::json_error(
            StatusCode::CONFLICT,
            "conflict",
            "order status changed concurrently",
        ),
        Err(e) => errors::store_error_to_response(e),
    }
}
