//! Provisional order builder.
//!
//! Turns a client cart into a Pending order, re-pricing every line against
//! the authoritative catalog. Client-submitted prices are only ever used for
//! a sanity cross-check of the displayed total against the server total; the
//! stored order carries catalog prices exclusively.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_catalog::{Catalog, CatalogError};
use storefront_core::{CustomerId, DomainError, Money};
use storefront_core::ProductId;

use crate::order::{Order, OrderItem, PaymentMethod, ShippingAddress};

/// One cart line as submitted by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Checkout submission: cart, destination, and the client's displayed total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<CartLine>,
    pub shipping_address: ShippingAddress,
    /// Total the client displayed to the customer, in minor units. Used only
    /// to detect client/catalog price drift mid-checkout.
    #[serde(default)]
    pub client_total: Option<Money>,
}

/// Pricing policy knobs, injected from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingPolicy {
    /// Allowed absolute drift between the client total and the server total,
    /// in minor units.
    pub epsilon: Money,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            epsilon: Money::from_cents(1),
        }
    }
}

/// Re-price the cart against the catalog and build a Pending order.
///
/// Fails with a validation error on unknown or inactive products,
/// non-positive quantities, or a client total outside the epsilon tolerance.
/// No persistence happens here; the caller owns the single durable write.
pub async fn build_pending_order(
    catalog: &dyn Catalog,
    customer_id: CustomerId,
    request: CheckoutRequest,
    payment_method: PaymentMethod,
    policy: PricingPolicy,
    now: DateTime<Utc>,
) -> Result<Order, DomainError> {
    let items = price_cart(catalog, &request.items).await?;
    let server_total = Order::total_from_items(&items)?;

    if let Some(client_total) = request.client_total {
        if client_total.abs_diff(server_total) > policy.epsilon.cents().unsigned_abs() {
            return Err(DomainError::validation(format!(
                "cart total mismatch: client {client_total}, server {server_total}"
            )));
        }
    }

    Order::pending(
        customer_id,
        items,
        request.shipping_address,
        payment_method,
        now,
    )
}

/// Price cart lines from the catalog.
pub async fn price_cart(
    catalog: &dyn Catalog,
    lines: &[CartLine],
) -> Result<Vec<OrderItem>, DomainError> {
    if lines.is_empty() {
        return Err(DomainError::validation("cart is empty"));
    }

    let mut items = Vec::with_capacity(lines.len());
    for line in lines {
        if line.quantity == 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }

        let product = catalog
            .product(line.product_id)
            .await
            .map_err(|e: CatalogError| DomainError::validation(e.to_string()))?
            .ok_or_else(|| {
                DomainError::validation(format!("unknown product {}", line.product_id))
            })?;

        if !product.active {
            return Err(DomainError::validation(format!(
                "product {} is not available",
                product.sku
            )));
        }

        items.push(OrderItem {
            product_id: product.id,
            label: product.name,
            quantity: line.quantity,
            unit_price: product.unit_price,
        });
    }
    Ok(items)
}
