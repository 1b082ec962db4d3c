use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use storefront_core::NotificationId;

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::context::CustomerContext;

pub fn router() -> Router {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/:id/read", post(mark_read))
}

pub async fn list_notifications(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(customer): Extension<CustomerContext>,
) -> axum::response::Response {
    let notifications = match services
        .notifications
        .list_for_customer(customer.customer_id())
        .await
    {
        Ok(list) => list,
        Err(e) => return errors::store_error_to_response(e),
    };
    let items = notifications
        .iter()
        .map(dto::notification_to_json)
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}

pub async fn mark_read(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(customer): Extension<CustomerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: NotificationId = match id.parse() {
        Ok(id) => id,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid notification id")
        }
    };

    match services.notifications.mark_read(id, customer.customer_id()).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => {
            errors::json_error(StatusCode::NOT_FOUND, "not_found", "notification not found")
        }
        Err(e) => errors::store_error_to_response(e),
    }
}
