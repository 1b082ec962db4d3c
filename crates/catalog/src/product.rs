use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use storefront_core::{Money, ProductId};

/// A sellable catalog product, as seen by the checkout path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: Money,
    pub active: bool,
}

/// Catalog lookup failure (the catalog itself lives elsewhere).
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

/// Read-only price source used to re-price carts server-side.
///
/// Client-submitted prices are never authoritative; every checkout line is
/// priced through this trait.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn product(&self, id: ProductId) -> Result<Option<Product>, CatalogError>;
}

/// In-memory catalog for tests and dev wiring.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: RwLock<HashMap<ProductId, Product>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, product: Product) {
        self.products
            .write()
            .expect("catalog lock poisoned")
            .insert(product.id, product);
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn product(&self, id: ProductId) -> Result<Option<Product>, CatalogError> {
        let products = self
            .products
            .read()
            .map_err(|_| CatalogError::Unavailable("lock poisoned".to_string()))?;
        Ok(products.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lookup_returns_inserted_product() {
        let catalog = InMemoryCatalog::new();
        let id = ProductId::new();
        catalog.insert(Product {
            id,
            sku: "P1".to_string(),
            name: "Widget".to_string(),
            unit_price: Money::from_cents(1000),
            active: true,
        });

        let found = catalog.product(id).await.unwrap().unwrap();
        assert_eq!(found.unit_price, Money::from_cents(1000));
        assert!(catalog.product(ProductId::new()).await.unwrap().is_none());
    }
}
