//! Payment reconciliation and order-lifecycle finalization.
//!
//! The reconciliation engine is the single writer of order payment state. It
//! consumes the adapters' events/results, maps each to exactly one ledger
//! transition guarded by conditional writes, and fans out the secondary
//! effects (invoice, legal proof, notifications) with independent failure
//! isolation: once an order is Paid, nothing downstream can unsettle it.

pub mod engine;
pub mod error;
pub mod stores;

pub use engine::{
    CallbackDisposition, CaptureDisposition, FanoutReport, FinalizePolicy,
    ReconciliationEngine,
};
pub use error::ReconcileError;
pub use stores::{
    CancelOutcome, InsertInvoice, InsertPaid, InvoiceStore, LegalStore,
    NotificationStore, OrderStore, PaidTransition, StoreError,
};
