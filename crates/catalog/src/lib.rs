//! Catalog seam: the authoritative source of products and prices.
//!
//! Product/category CRUD itself is out of scope; this crate only defines the
//! read contract the checkout path depends on, plus an in-memory
//! implementation for dev/test wiring.

pub mod product;

pub use product::{Catalog, CatalogError, InMemoryCatalog, Product};
