//! Orders domain module.
//!
//! This crate contains the business rules for orders: the order record, its
//! lifecycle state machine, and the provisional order builder that turns a
//! cart into a Pending order priced from the authoritative catalog. It is
//! pure domain logic (no IO, no HTTP, no storage).

pub mod builder;
pub mod order;

pub use builder::{build_pending_order, CartLine, CheckoutRequest, PricingPolicy};
pub use order::{
    Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus, ShippingAddress,
};
