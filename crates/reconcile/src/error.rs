use thiserror::Error;

use storefront_core::DomainError;

use crate::stores::StoreError;

/// Reconciliation failure.
///
/// `Store` failures are transient and safe to retry from the beginning: the
/// conditional writes absorb a duplicate retry. Fan-out failures are *not*
/// represented here; they are logged and reported in the
/// [`crate::engine::FanoutReport`], never propagated to the payment path.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}
