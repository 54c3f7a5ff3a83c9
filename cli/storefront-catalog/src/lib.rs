//! HTTP client infrastructure for the upstream product catalog API.
//!
//! This crate provides:
//! - [`CatalogClient`], a `reqwest` based client for the listing, search,
//!   category, detail and category-list endpoints
//! - [`MockClient`], a client replaying canned responses for tests and offline use
//! - the canonical [`Product`] record and category normalization
//! - [`CatalogClientError`] and its [`ErrorKind`] classification
//!
//! ## Usage
//!
//! ```ignore
//! use storefront_catalog::{CatalogClient, CatalogClientConfig, ClientTrait, ProductQuery};
//!
//! let client = CatalogClient::new(CatalogClientConfig::new("https://dummyjson.com"))?;
//! let everything = client
//!     .fetch_all_matching(&ProductQuery::Search("phone".into()))
//!     .await?;
//! ```

mod client;
mod config;
mod error;
mod mock;
mod types;

pub use client::{CatalogClient, Client, ClientTrait};
pub use config::{CatalogClientConfig, DEFAULT_CATALOG_URL};
pub use error::{CatalogClientError, ErrorKind, MockDataError};
pub use mock::{GenericResponse, MockClient, Response, STOREFRONT_CATALOG_MOCK_DATA_VAR};
pub use types::{CategoryEntry, Product, ProductId, ProductPage, ProductQuery, normalize_categories};

#[cfg(any(test, feature = "tests"))]
pub mod test_helpers {
    use super::{Product, ProductId};

    /// A product in the shape the upstream listing returns it.
    pub fn product(id: u64, title: &str, price: f64, category: &str) -> Product {
        Product {
            id: ProductId::new(id),
            title: title.to_string(),
            description: "An apple mobile which is nothing like apple".to_string(),
            price,
            discount_percentage: 12.96,
            rating: 4.69,
            stock: 94,
            brand: "Apple".to_string(),
            category: category.to_string(),
            thumbnail: format!("https://cdn.dummyjson.com/products/{id}/thumbnail.jpg"),
            images: vec![format!("https://cdn.dummyjson.com/products/{id}/1.jpg")],
        }
    }

    /// `n` smartphones titled "iPhone 1" to "iPhone n", all at the same price.
    pub fn iphones(n: u64, price: f64) -> Vec<Product> {
        (1..=n)
            .map(|id| product(id, &format!("iPhone {id}"), price, "smartphones"))
            .collect()
    }
}
