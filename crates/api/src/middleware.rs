use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use storefront_core::CustomerId;

use crate::context::CustomerContext;

/// Establish the request's customer context from gateway-injected headers.
///
/// `x-customer-id` carries the authenticated customer; `x-staff: true` marks
/// staff accounts. The webhook and health routes are mounted outside this
/// layer since providers carry no customer identity.
pub async fn identity_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let context = extract_identity(req.headers())?;
    req.extensions_mut().insert(context);
    Ok(next.run(req).await)
}

fn extract_identity(headers: &HeaderMap) -> Result<CustomerContext, StatusCode> {
    let raw = headers
        .get("x-customer-id")
        .ok_or(StatusCode::UNAUTHORIZED)?
        .to_str()
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let customer_id: CustomerId = raw.trim().parse().map_err(|_| StatusCode::UNAUTHORIZED)?;

    let staff = headers
        .get("x-staff")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("true"));

    Ok(CustomerContext::new(customer_id, staff))
}
