//! HTTP application wiring (Axum router + service wiring).
//!
//! Layout:
//! - `services.rs`: store/gateway/engine wiring (in-memory or Postgres)
//! - `routes/`: HTTP routes + handlers (one file per surface area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::{build_services, AppServices};

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// The webhook and health routes are public: providers authenticate with the
/// callback signature, not with customer identity headers.
pub fn build_app(services: Arc<AppServices>) -> Router {
    let public = Router::new()
        .route("/health", get(routes::system::health))
        .route("/webhooks/hosted", post(routes::webhooks::hosted_callback));

    let protected = routes::router().layer(axum::middleware::from_fn(
        middleware::identity_middleware,
    ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(Extension(services))
}
