//! Query state for the storefront product listing.
//!
//! The listing is driven by the URL: [url_state] decodes query parameters
//! into a [filter::FilterState], [query] turns that state into catalog
//! requests and a page of products, [controller] keeps only the newest
//! result, and [session] ties these together with the category directory
//! into the surface a view renders from.

pub mod categories;
pub mod controller;
pub mod filter;
pub mod query;
pub mod session;
pub mod url_state;

pub use storefront_catalog as catalog;
