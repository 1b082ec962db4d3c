use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use storefront_core::DomainError;
use storefront_gateways::GatewayError;
use storefront_reconcile::{ReconcileError, StoreError};

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DomainError::Unauthorized => {
            json_error(StatusCode::FORBIDDEN, "forbidden", "unauthorized")
        }
        DomainError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
    }
}

/// Store failures are retry-safe for the caller thanks to the conditional
/// write guards, so unavailability maps to 503.
pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::Unavailable(msg) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable", msg)
        }
        StoreError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        StoreError::Corrupt(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "corrupt_record", msg)
        }
    }
}

pub fn reconcile_error_to_response(err: ReconcileError) -> axum::response::Response {
    match err {
        ReconcileError::Store(e) => store_error_to_response(e),
        ReconcileError::Domain(e) => domain_error_to_response(e),
    }
}

/// Webhook variant: a store conflict here means a write race with another
/// delivery of the same event, which the idempotency guards resolve on the
/// next attempt. Answer 503 so the provider redelivers instead of dropping
/// the completion.
pub fn reconcile_error_to_webhook_response(err: ReconcileError) -> axum::response::Response {
    match err {
        ReconcileError::Store(StoreError::Corrupt(msg)) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "corrupt_record", msg)
        }
        ReconcileError::Store(e) => json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "store_unavailable",
            e.to_string(),
        ),
        ReconcileError::Domain(e) => domain_error_to_response(e),
    }
}

pub fn gateway_error_to_response(err: GatewayError) -> axum::response::Response {
    match err {
        GatewayError::Signature(msg) => {
            tracing::warn!(reason = %msg, "callback signature rejected");
            json_error(StatusCode::BAD_REQUEST, "invalid_signature", msg)
        }
        GatewayError::Decode(msg) => json_error(StatusCode::BAD_REQUEST, "undecodable_payload", msg),
        GatewayError::Capture { status } => json_error(
            StatusCode::PAYMENT_REQUIRED,
            "capture_declined",
            format!("provider declined the capture: {status}"),
        ),
        GatewayError::Provider { status, body } => json_error(
            StatusCode::BAD_GATEWAY,
            "provider_error",
            format!("provider returned {status}: {body}"),
        ),
        GatewayError::Transport(e) => {
            json_error(StatusCode::BAD_GATEWAY, "provider_unreachable", e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_conflict_is_409_for_clients_but_503_on_the_webhook() {
        let client = store_error_to_response(StoreError::Conflict("race".to_string()));
        assert_eq!(client.status(), StatusCode::CONFLICT);

        let webhook = reconcile_error_to_webhook_response(ReconcileError::Store(
            StoreError::Conflict("race".to_string()),
        ));
        assert_eq!(webhook.status(), StatusCode::SERVICE_UNAVAILABLE);

        let corrupt = reconcile_error_to_webhook_response(ReconcileError::Store(
            StoreError::Corrupt("bad row".to_string()),
        ));
        assert_eq!(corrupt.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
