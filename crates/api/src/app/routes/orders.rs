//! Order retrieval: owner or staff only.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;

use storefront_core::OrderId;
use storefront_legal::all_required_accepted;
use storefront_orders::Order;

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::context::CustomerContext;

pub fn router() -> Router {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/invoice", get(get_invoice))
        .route("/orders/:id/legal", get(get_legal))
}

/// Load an order the caller is allowed to see, or produce the error response.
async fn load_accessible_order(
    services: &AppServices,
    customer: &CustomerContext,
    id: &str,
) -> Result<Order, axum::response::Response> {
    let order_id: OrderId = id
        .parse()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid order id"))?;

    let order = services
        .orders
        .get(order_id)
        .await
        .map_err(errors::store_error_to_response)?
        .ok_or_else(|| errors::json_error(StatusCode::NOT_FOUND, "not_found", "order not found"))?;

    if !customer.can_access(order.customer_id) {
        // Hide existence from non-owners.
        return Err(errors::json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            "order not found",
        ));
    }
    Ok(order)
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(customer): Extension<CustomerContext>,
) -> axum::response::Response {
    let orders = match services.orders.list_for_customer(customer.customer_id()).await {
        Ok(orders) => orders,
        Err(e) => return errors::store_error_to_response(e),
    };
    let items = orders.iter().map(dto::order_to_json).collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(customer): Extension<CustomerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    match load_accessible_order(&services, &customer, &id).await {
        Ok(order) => (StatusCode::OK, Json(dto::order_to_json(&order))).into_response(),
        Err(response) => response,
    }
}

/// Invoice retrieval is re-entrant: if fan-out previously failed, the invoice
/// is generated here, guarded by the per-order uniqueness.
pub async fn get_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(customer): Extension<CustomerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order = match load_accessible_order(&services, &customer, &id).await {
        Ok(order) => order,
        Err(response) => return response,
    };

    match services.engine.ensure_invoice(&order, Utc::now()).await {
        Ok(invoice) => (StatusCode::OK, Json(dto::invoice_to_json(&invoice))).into_response(),
        Err(e) => errors::reconcile_error_to_response(e),
    }
}

pub async fn get_legal(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(customer): Extension<CustomerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order = match load_accessible_order(&services, &customer, &id).await {
        Ok(order) => order,
        Err(response) => return response,
    };

    let acceptances = match services.legal.list_for_order(order.id).await {
        Ok(list) => list,
        Err(e) => return errors::store_error_to_response(e),
    };

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "items": acceptances.iter().map(dto::acceptance_to_json).collect::<Vec<_>>(),
            "all_required_accepted": all_required_accepted(order.id, &acceptances),
        })),
    )
        .into_response()
}
