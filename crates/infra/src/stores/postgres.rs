//! Postgres-backed ledger stores.
//!
//! Idempotency lives in the schema, not in application locks:
//!
//! - `orders.status` transitions are conditional UPDATEs whose WHERE clause
//!   re-checks the precondition, so a lost race affects zero rows.
//! - `orders.provider_tx_id` carries a partial unique index so at most one
//!   order can ever own a provider transaction.
//! - `invoices.order_id` is unique, `nextval('invoice_sequence')` feeds the
//!   human-facing number.
//! - `legal_acceptances` is unique per (order_id, document, version).
//!
//! Expected schema:
//!
//! ```sql
//! CREATE TABLE orders (
//!     id                   UUID PRIMARY KEY,
//!     customer_id          UUID NOT NULL,
//!     items                JSONB NOT NULL,
//!     total_amount_cents   BIGINT NOT NULL,
//!     status               TEXT NOT NULL,
//!     payment_method       TEXT NOT NULL,
//!     payment_status       TEXT NOT NULL,
//!     provider_tx_id       TEXT,
//!     checkout_session_ref TEXT,
//!     shipping_address     JSONB NOT NULL,
//!     created_at           TIMESTAMPTZ NOT NULL,
//!     updated_at           TIMESTAMPTZ NOT NULL
//! );
//! CREATE UNIQUE INDEX orders_provider_tx_id_key
//!     ON orders (provider_tx_id) WHERE provider_tx_id IS NOT NULL;
//! CREATE INDEX orders_customer_id_idx ON orders (customer_id);
//!
//! CREATE SEQUENCE invoice_sequence;
//! CREATE TABLE invoices (
//!     id                   UUID PRIMARY KEY,
//!     number               TEXT NOT NULL,
//!     order_id             UUID NOT NULL UNIQUE,
//!     customer_id          UUID NOT NULL,
//!     lines                JSONB NOT NULL,
//!     total_excl_tax_cents BIGINT NOT NULL,
//!     total_incl_tax_cents BIGINT NOT NULL,
//!     issued_at            TIMESTAMPTZ NOT NULL,
//!     due_at               TIMESTAMPTZ NOT NULL,
//!     payment_status       TEXT NOT NULL
//! );
//!
//! CREATE TABLE legal_acceptances (
//!     customer_id UUID NOT NULL,
//!     document    TEXT NOT NULL,
//!     version     TEXT NOT NULL,
//!     ip_address  TEXT NOT NULL,
//!     user_agent  TEXT NOT NULL,
//!     order_id    UUID,
//!     accepted_at TIMESTAMPTZ NOT NULL
//! );
//! CREATE UNIQUE INDEX legal_acceptances_order_doc_key
//!     ON legal_acceptances (order_id, document, version)
//!     WHERE order_id IS NOT NULL;
//!
//! CREATE TABLE notifications (
//!     id          UUID PRIMARY KEY,
//!     customer_id UUID NOT NULL,
//!     title       TEXT NOT NULL,
//!     body        TEXT NOT NULL,
//!     kind        TEXT NOT NULL,
//!     read        BOOLEAN NOT NULL,
//!     order_id    UUID,
//!     created_at  TIMESTAMPTZ NOT NULL
//! );
//!
//! CREATE TABLE products (
//!     id               UUID PRIMARY KEY,
//!     sku              TEXT NOT NULL UNIQUE,
//!     name             TEXT NOT NULL,
//!     unit_price_cents BIGINT NOT NULL,
//!     active           BOOLEAN NOT NULL
//! );
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use storefront_catalog::{Catalog, CatalogError, Product};
use storefront_core::{CustomerId, InvoiceId, Money, NotificationId, OrderId};
use storefront_invoicing::{Invoice, InvoiceLine};
use storefront_legal::{LegalAcceptance, LegalDocument};
use storefront_notify::{Notification, NotificationKind};
use storefront_orders::{
    Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus, ShippingAddress,
};
use storefront_reconcile::{
    CancelOutcome, InsertInvoice, InsertPaid, InvoiceStore, LegalStore,
    NotificationStore, OrderStore, PaidTransition, StoreError,
};

/// Map sqlx failures to the store contract. Unique violations (23505) are
/// conflicts; everything else is surfaced as a retryable unavailability.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            if db_err.code().as_deref() == Some("23505") {
                tracing::warn!(operation, error = %db_err, "unique violation mapped to conflict");
                StoreError::Conflict(msg)
            } else {
                tracing::warn!(operation, error = %db_err, "database error");
                StoreError::Unavailable(msg)
            }
        }
        other => StoreError::Unavailable(format!("sqlx error in {operation}: {other}")),
    }
}

fn decode_json<T: serde::de::DeserializeOwned>(
    field: &str,
    value: serde_json::Value,
) -> Result<T, StoreError> {
    serde_json::from_value(value)
        .map_err(|e| StoreError::Corrupt(format!("bad {field} payload: {e}")))
}

/// Postgres order ledger.
#[derive(Debug, Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const ORDER_COLUMNS: &str = "id, customer_id, items, total_amount_cents, status, \
     payment_method, payment_status, provider_tx_id, checkout_session_ref, \
     shipping_address, created_at, updated_at";

fn order_from_row(row: &sqlx::postgres::PgRow) -> Result<Order, StoreError> {
    let id: Uuid = row.try_get("id").map_err(row_err)?;
    let customer_id: Uuid = row.try_get("customer_id").map_err(row_err)?;
    let items: serde_json::Value = row.try_get("items").map_err(row_err)?;
    let total_cents: i64 = row.try_get("total_amount_cents").map_err(row_err)?;
    let status: String = row.try_get("status").map_err(row_err)?;
    let payment_method: String = row.try_get("payment_method").map_err(row_err)?;
    let payment_status: String = row.try_get("payment_status").map_err(row_err)?;
    let provider_tx_id: Option<String> = row.try_get("provider_tx_id").map_err(row_err)?;
    let checkout_session_ref: Option<String> =
        row.try_get("checkout_session_ref").map_err(row_err)?;
    let shipping: serde_json::Value = row.try_get("shipping_address").map_err(row_err)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(row_err)?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(row_err)?;

    let items: Vec<OrderItem> = decode_json("items", items)?;
    let shipping_address: ShippingAddress = decode_json("shipping_address", shipping)?;

    Ok(Order {
        id: OrderId::from_uuid(id),
        customer_id: CustomerId::from_uuid(customer_id),
        items,
        total_amount: Money::from_cents(total_cents),
        status: OrderStatus::parse(&status).map_err(corrupt)?,
        payment_method: PaymentMethod::parse(&payment_method).map_err(corrupt)?,
        payment_status: PaymentStatus::parse(&payment_status).map_err(corrupt)?,
        provider_tx_id,
        checkout_session_ref,
        shipping_address,
        created_at,
        updated_at,
    })
}

fn row_err(e: sqlx::Error) -> StoreError {
    StoreError::Corrupt(format!("row decode failed: {e}"))
}

fn corrupt(e: storefront_core::DomainError) -> StoreError {
    StoreError::Corrupt(e.to_string())
}

fn items_json(items: &[OrderItem]) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(items)
        .map_err(|e| StoreError::Corrupt(format!("items serialization failed: {e}")))
}

fn shipping_json(address: &ShippingAddress) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(address)
        .map_err(|e| StoreError::Corrupt(format!("address serialization failed: {e}")))
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn insert_pending(&self, order: &Order) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, customer_id, items, total_amount_cents, status,
                payment_method, payment_status, provider_tx_id,
                checkout_session_ref, shipping_address, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.customer_id.as_uuid())
        .bind(items_json(&order.items)?)
        .bind(order.total_amount.cents())
        .bind(order.status.as_str())
        .bind(order.payment_method.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.provider_tx_id.as_deref())
        .bind(order.checkout_session_ref.as_deref())
        .bind(shipping_json(&order.shipping_address)?)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_pending", e))?;
        Ok(())
    }

    async fn insert_paid(&self, order: &Order) -> Result<InsertPaid, StoreError> {
        // The partial unique index on provider_tx_id makes this insert the
        // atomic claim on the provider transaction.
        let result = sqlx::query(
            r#"
            INSERT INTO orders (
                id, customer_id, items, total_amount_cents, status,
                payment_method, payment_status, provider_tx_id,
                checkout_session_ref, shipping_address, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (provider_tx_id) WHERE provider_tx_id IS NOT NULL
            DO NOTHING
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.customer_id.as_uuid())
        .bind(items_json(&order.items)?)
        .bind(order.total_amount.cents())
        .bind(order.status.as_str())
        .bind(order.payment_method.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.provider_tx_id.as_deref())
        .bind(order.checkout_session_ref.as_deref())
        .bind(shipping_json(&order.shipping_address)?)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_paid", e))?;

        if result.rows_affected() == 1 {
            return Ok(InsertPaid::Created);
        }

        let tx = order
            .provider_tx_id
            .as_deref()
            .ok_or_else(|| StoreError::corrupt("paid order without provider tx"))?;
        let existing = self
            .find_by_provider_tx(tx)
            .await?
            .ok_or_else(|| StoreError::corrupt("conflicting order vanished"))?;
        Ok(InsertPaid::DuplicateTx {
            existing: existing.id,
        })
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_order", e))?;
        row.map(|r| order_from_row(&r)).transpose()
    }

    async fn find_by_provider_tx(
        &self,
        provider_tx_id: &str,
    ) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE provider_tx_id = $1"
        ))
        .bind(provider_tx_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_by_provider_tx", e))?;
        row.map(|r| order_from_row(&r)).transpose()
    }

    async fn attach_checkout_session(
        &self,
        id: OrderId,
        session_ref: &str,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE orders SET checkout_session_ref = $2 WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(session_ref)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("attach_checkout_session", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!("order {id} not found")));
        }
        Ok(())
    }

    async fn mark_paid(
        &self,
        id: OrderId,
        provider_tx_id: &str,
        paid_at: DateTime<Utc>,
    ) -> Result<PaidTransition, StoreError> {
        // Conditional write first; only on a miss do we read back to classify
        // why. The WHERE clause is the compare-and-swap.
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = 'paid',
                payment_status = 'completed',
                provider_tx_id = $2,
                updated_at = $3
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id.as_uuid())
        .bind(provider_tx_id)
        .bind(paid_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("mark_paid", e))?;

        if result.rows_affected() == 1 {
            return Ok(PaidTransition::Applied);
        }

        let Some(order) = self.get(id).await? else {
            return Ok(PaidTransition::NotFound);
        };
        match order.status {
            OrderStatus::Cancelled => Ok(PaidTransition::NotPending {
                status: order.status,
            }),
            OrderStatus::Pending => {
                // Raced with a concurrent cancel/pay between UPDATE and SELECT.
                Err(StoreError::Conflict(format!(
                    "order {id} state changed during mark_paid"
                )))
            }
            _ => Ok(PaidTransition::AlreadyPaid {
                provider_tx_id: order.provider_tx_id,
            }),
        }
    }

    async fn cancel_if_pending(
        &self,
        id: OrderId,
        now: DateTime<Utc>,
    ) -> Result<CancelOutcome, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = 'cancelled', payment_status = 'failed', updated_at = $2
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id.as_uuid())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("cancel_if_pending", e))?;

        if result.rows_affected() == 1 {
            return Ok(CancelOutcome::Cancelled);
        }
        match self.get(id).await? {
            Some(_) => Ok(CancelOutcome::NotPending),
            None => Ok(CancelOutcome::NotFound),
        }
    }

    async fn cancel_stale_pending(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrderId>, StoreError> {
        let rows = sqlx::query(
            r#"
            UPDATE orders
            SET status = 'cancelled', payment_status = 'failed', updated_at = $2
            WHERE status = 'pending' AND created_at < $1
            RETURNING id
            "#,
        )
        .bind(cutoff)
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("cancel_stale_pending", e))?;

        let mut swept = Vec::with_capacity(rows.len());
        for row in rows {
            let id: Uuid = row.try_get("id").map_err(row_err)?;
            swept.push(OrderId::from_uuid(id));
        }
        Ok(swept)
    }

    async fn advance_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        if !from.can_transition_to(to) {
            return Ok(false);
        }
        let result = sqlx::query(
            "UPDATE orders SET status = $3, updated_at = $4 WHERE id = $1 AND status = $2",
        )
        .bind(id.as_uuid())
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("advance_status", e))?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE customer_id = $1 ORDER BY created_at ASC"
        ))
        .bind(customer_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_for_customer", e))?;

        rows.iter().map(order_from_row).collect()
    }
}

/// Postgres invoice store.
#[derive(Debug, Clone)]
pub struct PostgresInvoiceStore {
    pool: PgPool,
}

impl PostgresInvoiceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const INVOICE_COLUMNS: &str = "id, number, order_id, customer_id, lines, \
     total_excl_tax_cents, total_incl_tax_cents, issued_at, due_at, payment_status";

fn invoice_from_row(row: &sqlx::postgres::PgRow) -> Result<Invoice, StoreError> {
    let id: Uuid = row.try_get("id").map_err(row_err)?;
    let number: String = row.try_get("number").map_err(row_err)?;
    let order_id: Uuid = row.try_get("order_id").map_err(row_err)?;
    let customer_id: Uuid = row.try_get("customer_id").map_err(row_err)?;
    let lines: serde_json::Value = row.try_get("lines").map_err(row_err)?;
    let total_excl: i64 = row.try_get("total_excl_tax_cents").map_err(row_err)?;
    let total_incl: i64 = row.try_get("total_incl_tax_cents").map_err(row_err)?;
    let issued_at: DateTime<Utc> = row.try_get("issued_at").map_err(row_err)?;
    let due_at: DateTime<Utc> = row.try_get("due_at").map_err(row_err)?;
    let payment_status: String = row.try_get("payment_status").map_err(row_err)?;

    let lines: Vec<InvoiceLine> = decode_json("lines", lines)?;

    Ok(Invoice {
        id: InvoiceId::from_uuid(id),
        number,
        order_id: OrderId::from_uuid(order_id),
        customer_id: CustomerId::from_uuid(customer_id),
        lines,
        total_excl_tax: Money::from_cents(total_excl),
        total_incl_tax: Money::from_cents(total_incl),
        issued_at,
        due_at,
        payment_status: PaymentStatus::parse(&payment_status).map_err(corrupt)?,
    })
}

#[async_trait]
impl InvoiceStore for PostgresInvoiceStore {
    async fn next_sequence(&self) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT nextval('invoice_sequence') AS seq")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("next_sequence", e))?;
        let seq: i64 = row.try_get("seq").map_err(row_err)?;
        Ok(seq as u64)
    }

    async fn insert(&self, invoice: &Invoice) -> Result<InsertInvoice, StoreError> {
        let lines = serde_json::to_value(&invoice.lines)
            .map_err(|e| StoreError::Corrupt(format!("lines serialization failed: {e}")))?;
        let result = sqlx::query(
            r#"
            INSERT INTO invoices (
                id, number, order_id, customer_id, lines,
                total_excl_tax_cents, total_incl_tax_cents,
                issued_at, due_at, payment_status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (order_id) DO NOTHING
            "#,
        )
        .bind(invoice.id.as_uuid())
        .bind(&invoice.number)
        .bind(invoice.order_id.as_uuid())
        .bind(invoice.customer_id.as_uuid())
        .bind(lines)
        .bind(invoice.total_excl_tax.cents())
        .bind(invoice.total_incl_tax.cents())
        .bind(invoice.issued_at)
        .bind(invoice.due_at)
        .bind(invoice.payment_status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_invoice", e))?;

        if result.rows_affected() == 1 {
            return Ok(InsertInvoice::Created);
        }
        let existing = self
            .find_by_order(invoice.order_id)
            .await?
            .ok_or_else(|| StoreError::corrupt("conflicting invoice vanished"))?;
        Ok(InsertInvoice::AlreadyExists(existing))
    }

    async fn find_by_order(&self, order_id: OrderId) -> Result<Option<Invoice>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE order_id = $1"
        ))
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_invoice_by_order", e))?;
        row.map(|r| invoice_from_row(&r)).transpose()
    }

    async fn get(&self, id: InvoiceId) -> Result<Option<Invoice>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_invoice", e))?;
        row.map(|r| invoice_from_row(&r)).transpose()
    }
}

/// Postgres legal proof store.
#[derive(Debug, Clone)]
pub struct PostgresLegalStore {
    pool: PgPool,
}

impl PostgresLegalStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn acceptance_from_row(row: &sqlx::postgres::PgRow) -> Result<LegalAcceptance, StoreError> {
    let customer_id: Uuid = row.try_get("customer_id").map_err(row_err)?;
    let document: String = row.try_get("document").map_err(row_err)?;
    let version: String = row.try_get("version").map_err(row_err)?;
    let ip_address: String = row.try_get("ip_address").map_err(row_err)?;
    let user_agent: String = row.try_get("user_agent").map_err(row_err)?;
    let order_id: Option<Uuid> = row.try_get("order_id").map_err(row_err)?;
    let accepted_at: DateTime<Utc> = row.try_get("accepted_at").map_err(row_err)?;

    Ok(LegalAcceptance {
        customer_id: CustomerId::from_uuid(customer_id),
        document: LegalDocument::parse(&document).map_err(corrupt)?,
        version,
        ip_address,
        user_agent,
        order_id: order_id.map(OrderId::from_uuid),
        accepted_at,
    })
}

#[async_trait]
impl LegalStore for PostgresLegalStore {
    async fn record(&self, acceptance: &LegalAcceptance) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO legal_acceptances (
                customer_id, document, version, ip_address,
                user_agent, order_id, accepted_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (order_id, document, version) WHERE order_id IS NOT NULL
            DO NOTHING
            "#,
        )
        .bind(acceptance.customer_id.as_uuid())
        .bind(acceptance.document.as_str())
        .bind(&acceptance.version)
        .bind(&acceptance.ip_address)
        .bind(&acceptance.user_agent)
        .bind(acceptance.order_id.map(|id| *id.as_uuid()))
        .bind(acceptance.accepted_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("record_acceptance", e))?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_for_order(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<LegalAcceptance>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT customer_id, document, version, ip_address,
                   user_agent, order_id, accepted_at
            FROM legal_acceptances
            WHERE order_id = $1
            ORDER BY accepted_at ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_acceptances_for_order", e))?;
        rows.iter().map(acceptance_from_row).collect()
    }

    async fn list_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<LegalAcceptance>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT customer_id, document, version, ip_address,
                   user_agent, order_id, accepted_at
            FROM legal_acceptances
            WHERE customer_id = $1
            ORDER BY accepted_at ASC
            "#,
        )
        .bind(customer_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_acceptances_for_customer", e))?;
        rows.iter().map(acceptance_from_row).collect()
    }
}

/// Postgres notification store.
#[derive(Debug, Clone)]
pub struct PostgresNotificationStore {
    pool: PgPool,
}

impl PostgresNotificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn notification_from_row(row: &sqlx::postgres::PgRow) -> Result<Notification, StoreError> {
    let id: Uuid = row.try_get("id").map_err(row_err)?;
    let customer_id: Uuid = row.try_get("customer_id").map_err(row_err)?;
    let title: String = row.try_get("title").map_err(row_err)?;
    let body: String = row.try_get("body").map_err(row_err)?;
    let kind: String = row.try_get("kind").map_err(row_err)?;
    let read: bool = row.try_get("read").map_err(row_err)?;
    let order_id: Option<Uuid> = row.try_get("order_id").map_err(row_err)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(row_err)?;

    Ok(Notification {
        id: NotificationId::from_uuid(id),
        customer_id: CustomerId::from_uuid(customer_id),
        title,
        body,
        kind: NotificationKind::parse(&kind).map_err(corrupt)?,
        read,
        order_id: order_id.map(OrderId::from_uuid),
        created_at,
    })
}

#[async_trait]
impl NotificationStore for PostgresNotificationStore {
    async fn push(&self, notification: &Notification) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO notifications (
                id, customer_id, title, body, kind, read, order_id, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(notification.id.as_uuid())
        .bind(notification.customer_id.as_uuid())
        .bind(&notification.title)
        .bind(&notification.body)
        .bind(notification.kind.as_str())
        .bind(notification.read)
        .bind(notification.order_id.map(|id| *id.as_uuid()))
        .bind(notification.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("push_notification", e))?;
        Ok(())
    }

    async fn list_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Notification>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, customer_id, title, body, kind, read, order_id, created_at
            FROM notifications
            WHERE customer_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(customer_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_notifications", e))?;
        rows.iter().map(notification_from_row).collect()
    }

    async fn mark_read(
        &self,
        id: NotificationId,
        customer_id: CustomerId,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE notifications SET read = TRUE WHERE id = $1 AND customer_id = $2",
        )
        .bind(id.as_uuid())
        .bind(customer_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("mark_notification_read", e))?;
        Ok(result.rows_affected() == 1)
    }
}

/// Postgres-backed read-only catalog.
#[derive(Debug, Clone)]
pub struct PostgresCatalog {
    pool: PgPool,
}

impl PostgresCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Catalog for PostgresCatalog {
    async fn product(&self, id: storefront_core::ProductId) -> Result<Option<Product>, CatalogError> {
        let row = sqlx::query(
            "SELECT id, sku, name, unit_price_cents, active FROM products WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CatalogError::Unavailable(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let product_id: Uuid = row
            .try_get("id")
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?;
        let sku: String = row
            .try_get("sku")
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?;
        let name: String = row
            .try_get("name")
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?;
        let unit_price_cents: i64 = row
            .try_get("unit_price_cents")
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?;
        let active: bool = row
            .try_get("active")
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?;

        Ok(Some(Product {
            id: storefront_core::ProductId::from_uuid(product_id),
            sku,
            name,
            unit_price: Money::from_cents(unit_price_cents),
            active,
        }))
    }
}
