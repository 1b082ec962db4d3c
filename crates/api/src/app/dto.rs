//! Request DTOs and JSON response mapping.

use axum::http::HeaderMap;
use serde::Deserialize;
use serde_json::json;

use storefront_gateways::CheckoutContext;
use storefront_invoicing::Invoice;
use storefront_legal::LegalAcceptance;
use storefront_notify::Notification;
use storefront_orders::Order;

/// Wallet capture trigger from the client.
#[derive(Debug, Deserialize)]
pub struct CaptureRequest {
    pub intent_id: String,
}

/// Staff request to advance an order's fulfilment status.
#[derive(Debug, Deserialize)]
pub struct AdvanceStatusRequest {
    pub status: String,
}

/// Capture the caller's IP and user agent for the legal proof trail.
///
/// `x-forwarded-for` is set by the site gateway; the first entry is the
/// client.
pub fn checkout_context(headers: &HeaderMap) -> CheckoutContext {
    let client_ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .unwrap_or_default()
        .trim()
        .to_string();
    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    CheckoutContext {
        client_ip,
        user_agent,
    }
}

pub fn order_to_json(order: &Order) -> serde_json::Value {
    json!({
        "id": order.id.to_string(),
        "customer_id": order.customer_id.to_string(),
        "items": order.items.iter().map(|item| json!({
            "product_id": item.product_id.to_string(),
            "label": item.label,
            "quantity": item.quantity,
            "unit_price": item.unit_price.cents(),
        })).collect::<Vec<_>>(),
        "total_amount": order.total_amount.cents(),
        "status": order.status.as_str(),
        "payment_method": order.payment_method.as_str(),
        "payment_status": order.payment_status.as_str(),
        "provider_tx_id": order.provider_tx_id,
        "shipping_address": order.shipping_address,
        "created_at": order.created_at,
        "updated_at": order.updated_at,
    })
}

pub fn invoice_to_json(invoice: &Invoice) -> serde_json::Value {
    json!({
        "id": invoice.id.to_string(),
        "number": invoice.number,
        "order_id": invoice.order_id.to_string(),
        "lines": invoice.lines.iter().map(|line| json!({
            "label": line.label,
            "quantity": line.quantity,
            "unit_price": line.unit_price.cents(),
            "line_total": line.line_total.cents(),
        })).collect::<Vec<_>>(),
        "total_excl_tax": invoice.total_excl_tax.cents(),
        "total_incl_tax": invoice.total_incl_tax.cents(),
        "issued_at": invoice.issued_at,
        "due_at": invoice.due_at,
        "payment_status": invoice.payment_status.as_str(),
        "document": invoice.render_text(),
    })
}

pub fn acceptance_to_json(acceptance: &LegalAcceptance) -> serde_json::Value {
    json!({
        "document": acceptance.document.as_str(),
        "version": acceptance.version,
        "ip_address": acceptance.ip_address,
        "user_agent": acceptance.user_agent,
        "order_id": acceptance.order_id.map(|id| id.to_string()),
        "accepted_at": acceptance.accepted_at,
    })
}

pub fn notification_to_json(notification: &Notification) -> serde_json::Value {
    json!({
        "id": notification.id.to_string(),
        "title": notification.title,
        "body": notification.body,
        "kind": notification.kind.as_str(),
        "read": notification.read,
        "order_id": notification.order_id.map(|id| id.to_string()),
        "created_at": notification.created_at,
    })
}
