//! Resolution of a [FilterState] into one page of products.
//!
//! The catalog can search or scope by category, but not both,
//! and it can't filter by price at all.
//! Resolution therefore picks the single most specific [FetchStrategy],
//! fetches every record the catalog matches for it,
//! and applies the price range and pagination locally.

use std::fmt::Display;
use std::num::{NonZeroU32, NonZeroUsize};

use serde::Serialize;
use storefront_catalog::{CatalogClientError, ClientTrait, ErrorKind, Product, ProductQuery};
use thiserror::Error;
use tracing::instrument;

use crate::filter::{FilterState, PriceRange};

pub const DEFAULT_PAGE_SIZE: NonZeroUsize = NonZeroUsize::new(12).unwrap();

/// The message shown to users when a listing can't be resolved.
pub const FETCH_ERROR_MESSAGE: &str = "Failed to load products. Please try again.";

/// The upstream query issued for a [FilterState].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStrategy {
    All,
    Category(String),
    Search(String),
}

impl FetchStrategy {
    /// Search wins over category, category wins over the full listing.
    pub fn select(filter: &FilterState) -> Self {
        if !filter.search_query.is_empty() {
            FetchStrategy::Search(filter.search_query.clone())
        } else if !filter.category.is_empty() {
            FetchStrategy::Category(filter.category.clone())
        } else {
            FetchStrategy::All
        }
    }

    pub fn query(&self) -> ProductQuery {
        match self {
            FetchStrategy::All => ProductQuery::All,
            FetchStrategy::Category(slug) => ProductQuery::Category(slug.clone()),
            FetchStrategy::Search(term) => ProductQuery::Search(term.clone()),
        }
    }
}

impl Display for FetchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.query().fmt(f)
    }
}

/// One page of a resolved listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolvedPage {
    pub page_items: Vec<Product>,
    /// Number of products matching all facets, across all pages.
    pub total_matching: usize,
}

/// Resolving a listing failed in either catalog request.
#[derive(Debug, Error)]
#[error("failed to fetch {strategy}")]
pub struct FetchError {
    pub strategy: FetchStrategy,
    #[source]
    pub source: CatalogClientError,
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }

    pub fn user_message(&self) -> &'static str {
        FETCH_ERROR_MESSAGE
    }
}

pub fn filter_by_price(products: Vec<Product>, range: PriceRange) -> Vec<Product> {
    products
        .into_iter()
        .filter(|product| range.contains(product.price))
        .collect()
}

/// The items of 1-indexed `page`. Pages past the end are empty.
pub fn paginate<T>(items: Vec<T>, page: NonZeroU32, page_size: NonZeroUsize) -> Vec<T> {
    let start = (page.get() as usize - 1).saturating_mul(page_size.get());
    items
        .into_iter()
        .skip(start)
        .take(page_size.get())
        .collect()
}

/// Fetch, filter and paginate the listing `filter` describes.
///
/// Either catalog request failing fails the whole resolution.
#[instrument(skip(client), fields(strategy = tracing::field::Empty))]
pub async fn resolve(
    client: &impl ClientTrait,
    filter: &FilterState,
    page_size: NonZeroUsize,
) -> Result<ResolvedPage, FetchError> {
    let strategy = FetchStrategy::select(filter);
    tracing::Span::current().record("strategy", tracing::field::display(&strategy));

    let candidates = client
        .fetch_all_matching(&strategy.query())
        .await
        .map_err(|source| FetchError {
            strategy: strategy.clone(),
            source,
        })?;

    let fetched = candidates.products.len();
    let matching = filter_by_price(candidates.products, filter.price_range());
    let total_matching = matching.len();
    tracing::debug!(fetched, total_matching, "applied price range");

    Ok(ResolvedPage {
        page_items: paginate(matching, filter.page, page_size),
        total_matching,
    })
}
