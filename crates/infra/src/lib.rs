//! Infrastructure layer: ledger store implementations.
//!
//! Two implementations of the `storefront-reconcile` store contract: an
//! in-memory one for dev/test wiring and a Postgres one (sqlx) for
//! production, plus the Postgres-backed catalog read model.

pub mod stores;


pub use stores::in_memory::{
    InMemoryInvoiceStore, InMemoryLegalStore, InMemoryNotificationStore,
    InMemoryOrderStore,
};
pub use stores::postgres::{
    PostgresCatalog, PostgresInvoiceStore, PostgresLegalStore,
    PostgresNotificationStore, PostgresOrderStore,
};
