//! Infrastructure wiring: stores, gateways and the reconciliation engine.

use std::sync::Arc;

use chrono::Duration;

use storefront_catalog::{Catalog, InMemoryCatalog};
use storefront_gateways::{HostedGateway, WalletGateway};
use storefront_infra::{
    InMemoryInvoiceStore, InMemoryLegalStore, InMemoryNotificationStore,
    InMemoryOrderStore, PostgresCatalog, PostgresInvoiceStore, PostgresLegalStore,
    PostgresNotificationStore, PostgresOrderStore,
};
use storefront_orders::PricingPolicy;
use storefront_reconcile::{
    FinalizePolicy, InvoiceStore, LegalStore, NotificationStore, OrderStore,
    ReconciliationEngine,
};

use crate::config::AppConfig;

/// Shared per-process services, injected into handlers as an extension.
pub struct AppServices {
    pub catalog: Arc<dyn Catalog>,
    pub orders: Arc<dyn OrderStore>,
    pub invoices: Arc<dyn InvoiceStore>,
    pub legal: Arc<dyn LegalStore>,
    pub notifications: Arc<dyn NotificationStore>,
    pub engine: ReconciliationEngine,
    pub hosted: HostedGateway,
    pub wallet: WalletGateway,
    pub pricing: PricingPolicy,
    pub checkout_expiry: Duration,
    pub checkout_success_url: String,
    pub checkout_cancel_url: String,
}

/// Wire the services per configuration: Postgres stores when
/// `USE_PERSISTENT_STORES` is set, in-memory otherwise.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let (catalog, orders, invoices, legal, notifications) = if config.use_persistent_stores
    {
        let url = config
            .database_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL required for persistent stores"))?;
        let pool = sqlx::PgPool::connect(url).await?;
        tracing::info!("using postgres-backed stores");
        (
            Arc::new(PostgresCatalog::new(pool.clone())) as Arc<dyn Catalog>,
            Arc::new(PostgresOrderStore::new(pool.clone())) as Arc<dyn OrderStore>,
            Arc::new(PostgresInvoiceStore::new(pool.clone())) as Arc<dyn InvoiceStore>,
            Arc::new(PostgresLegalStore::new(pool.clone())) as Arc<dyn LegalStore>,
            Arc::new(PostgresNotificationStore::new(pool)) as Arc<dyn NotificationStore>,
        )
    } else {
        tracing::info!("using in-memory stores");
        (
            Arc::new(InMemoryCatalog::new()) as Arc<dyn Catalog>,
            Arc::new(InMemoryOrderStore::new()) as Arc<dyn OrderStore>,
            Arc::new(InMemoryInvoiceStore::new()) as Arc<dyn InvoiceStore>,
            Arc::new(InMemoryLegalStore::new()) as Arc<dyn LegalStore>,
            Arc::new(InMemoryNotificationStore::new()) as Arc<dyn NotificationStore>,
        )
    };

    let engine = ReconciliationEngine::new(
        orders.clone(),
        invoices.clone(),
        legal.clone(),
        notifications.clone(),
        FinalizePolicy {
            billing: config.billing,
            staff_recipients: config.staff_recipients.clone(),
        },
    );

    Ok(AppServices {
        catalog,
        orders,
        invoices,
        legal,
        notifications,
        engine,
        hosted: HostedGateway::new(config.hosted.clone()),
        wallet: WalletGateway::new(config.wallet.clone()),
        pricing: config.pricing,
        checkout_expiry: config.checkout_expiry,
        checkout_success_url: config.checkout_success_url.clone(),
        checkout_cancel_url: config.checkout_cancel_url.clone(),
    })
}
