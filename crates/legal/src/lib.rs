//! Legal-consent domain module.
//!
//! Immutable acceptance records tied to a checkout attempt, kept as an
//! independent evidentiary trail per transaction: prior acceptances are never
//! reused across orders.

pub mod acceptance;

pub use acceptance::{
    all_required_accepted, missing_required, LegalAcceptance, LegalDocument,
    REQUIRED_AT_CHECKOUT,
};
