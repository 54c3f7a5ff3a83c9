use std::num::NonZeroU32;

use serde::Serialize;

pub const DEFAULT_MIN_PRICE: f64 = 0.0;
pub const DEFAULT_MAX_PRICE: f64 = 2000.0;
pub const FIRST_PAGE: NonZeroU32 = NonZeroU32::MIN;

/// The full set of facets a listing is resolved from.
///
/// Two states are the same query exactly when they compare equal,
/// which is what the query controller uses to detect facet changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterState {
    /// Category slug, empty for all categories.
    pub category: String,
    pub min_price: f64,
    pub max_price: f64,
    /// Free-text search, empty for no search.
    pub search_query: String,
    pub page: NonZeroU32,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            category: String::new(),
            min_price: DEFAULT_MIN_PRICE,
            max_price: DEFAULT_MAX_PRICE,
            search_query: String::new(),
            page: FIRST_PAGE,
        }
    }
}

impl FilterState {
    pub fn price_range(&self) -> PriceRange {
        PriceRange {
            min: self.min_price,
            max: self.max_price,
        }
    }

    /// Whether the price range narrows the listing at all.
    pub fn has_price_filter(&self) -> bool {
        self.min_price != DEFAULT_MIN_PRICE || self.max_price != DEFAULT_MAX_PRICE
    }
}

/// An inclusive price interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    pub fn contains(&self, price: f64) -> bool {
        self.min <= price && price <= self.max
    }
}
