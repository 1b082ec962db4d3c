use axum::Router;

pub mod admin;
pub mod checkout;
pub mod notifications;
pub mod orders;
pub mod system;
pub mod webhooks;

/// Routes behind the customer identity layer.
pub fn router() -> Router {
    Router::new()
        .merge(checkout::router())
        .merge(orders::router())
        .merge(notifications::router())
        .merge(admin::router())
}
