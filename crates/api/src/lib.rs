//! HTTP surface of the storefront payment core.

pub mod app;
pub mod config;
pub mod context;
pub mod middleware;
