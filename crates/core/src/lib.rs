//! Domain foundation building blocks shared by every crate in the workspace.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod money;

pub use error::{DomainError, DomainResult};
pub use id::{CustomerId, InvoiceId, NotificationId, OrderId, ProductId};
pub use money::Money;
