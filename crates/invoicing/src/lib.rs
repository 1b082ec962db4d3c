//! Invoicing domain module.
//!
//! Derivation of a billing record from a finalized (Paid) order, plus a
//! plain-text rendering of it. Pure domain logic; idempotency (at most one
//! invoice per order) is enforced by the ledger store's uniqueness contract
//! and the reconciliation engine's existence check.

pub mod invoice;

pub use invoice::{derive_invoice, BillingPolicy, Invoice, InvoiceLine};
