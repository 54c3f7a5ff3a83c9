//! The URL as the listing's shared state.
//!
//! Every consumer reads the current [FilterState] through [decode]
//! and changes it by writing a [FilterPatch] through [encode].
//! Parameters that carry their field's default are never written,
//! so a shareable link only mentions the facets that are actually set.

use std::fmt::Display;
use std::num::NonZeroU32;

use url::form_urlencoded;

use crate::filter::{DEFAULT_MAX_PRICE, DEFAULT_MIN_PRICE, FIRST_PAGE, FilterState};

pub const PAGE_PARAM: &str = "page";
pub const CATEGORY_PARAM: &str = "category";
pub const MIN_PRICE_PARAM: &str = "minPrice";
pub const MAX_PRICE_PARAM: &str = "maxPrice";
pub const SEARCH_PARAM: &str = "q";

/// URL query parameters in the order they appear.
///
/// Parameters that don't belong to the listing are carried along untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    /// Parse an `application/x-www-form-urlencoded` query, with or without a leading `?`.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self(
            form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
        )
    }

    /// The first value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// Set `key` to `value`, keeping its position if already present.
    pub fn set(&mut self, key: &str, value: String) {
        let mut value = Some(value);
        self.0.retain_mut(|(name, existing)| {
            if name != key {
                return true;
            }
            match value.take() {
                Some(value) => {
                    *existing = value;
                    true
                },
                // drop repeated occurrences
                None => false,
            }
        });
        if let Some(value) = value {
            self.0.push((key.to_string(), value));
        }
    }

    pub fn remove(&mut self, key: &str) {
        self.0.retain(|(name, _)| name != key);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

impl Display for QueryParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish();
        f.write_str(&encoded)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}

/// A partial [FilterState]. Fields left as `None` are not touched on write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterPatch {
    pub page: Option<NonZeroU32>,
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub search_query: Option<String>,
}

impl From<&FilterState> for FilterPatch {
    fn from(state: &FilterState) -> Self {
        Self {
            page: Some(state.page),
            category: Some(state.category.clone()),
            min_price: Some(state.min_price),
            max_price: Some(state.max_price),
            search_query: Some(state.search_query.clone()),
        }
    }
}

fn parse_price(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|raw| raw.trim().parse::<f64>().ok())
        .filter(|price| price.is_finite())
}

/// Read the listing facets from URL parameters.
///
/// Missing or unparsable values fall back to their defaults.
/// The page is at least 1, prices are clamped so that `0 <= min <= max`.
pub fn decode(params: &QueryParams) -> FilterState {
    let page = params
        .get(PAGE_PARAM)
        .and_then(|raw| raw.trim().parse::<u32>().ok())
        .and_then(NonZeroU32::new)
        .unwrap_or(FIRST_PAGE);

    let min_price = parse_price(params.get(MIN_PRICE_PARAM))
        .unwrap_or(DEFAULT_MIN_PRICE)
        .max(0.0);
    let max_price = parse_price(params.get(MAX_PRICE_PARAM))
        .unwrap_or(DEFAULT_MAX_PRICE)
        .max(min_price);

    FilterState {
        category: params.get(CATEGORY_PARAM).unwrap_or_default().to_string(),
        min_price,
        max_price,
        search_query: params.get(SEARCH_PARAM).unwrap_or_default().to_string(),
        page,
    }
}

/// Merge `patch` into `current`.
///
/// A field equal to its default removes the parameter instead of writing it.
pub fn encode(patch: &FilterPatch, current: &QueryParams) -> QueryParams {
    fn write<T: PartialEq>(
        params: &mut QueryParams,
        key: &str,
        value: Option<&T>,
        default: &T,
        to_param: impl FnOnce(&T) -> String,
    ) {
        match value {
            None => {},
            Some(value) if value == default => params.remove(key),
            Some(value) => params.set(key, to_param(value)),
        }
    }

    let mut params = current.clone();
    write(
        &mut params,
        PAGE_PARAM,
        patch.page.as_ref(),
        &FIRST_PAGE,
        NonZeroU32::to_string,
    );
    write(
        &mut params,
        CATEGORY_PARAM,
        patch.category.as_ref(),
        &String::new(),
        String::clone,
    );
    write(
        &mut params,
        MIN_PRICE_PARAM,
        patch.min_price.as_ref(),
        &DEFAULT_MIN_PRICE,
        f64::to_string,
    );
    write(
        &mut params,
        MAX_PRICE_PARAM,
        patch.max_price.as_ref(),
        &DEFAULT_MAX_PRICE,
        f64::to_string,
    );
    write(
        &mut params,
        SEARCH_PARAM,
        patch.search_query.as_ref(),
        &String::new(),
        String::clone,
    );
    params
}

/// The URL of the listing view.
///
/// Writes replace the current location rather than pushing a new one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlState {
    params: QueryParams,
}

impl UrlState {
    pub fn new(params: QueryParams) -> Self {
        Self { params }
    }

    pub fn from_query(query: &str) -> Self {
        Self::new(QueryParams::parse(query))
    }

    pub fn read(&self) -> FilterState {
        decode(&self.params)
    }

    /// Apply `patch` and return the state the new location decodes to.
    pub fn write(&mut self, patch: &FilterPatch) -> FilterState {
        self.params = encode(patch, &self.params);
        tracing::debug!(query = %self.params, "replaced listing location");
        self.read()
    }

    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    /// The query string to share this listing, without a leading `?`.
    pub fn query_string(&self) -> String {
        self.params.to_string()
    }
}

#[cfg(any(test, feature = "tests"))]
pub mod test_helpers {
    use proptest::prelude::*;

    use super::*;

    /// Valid filter states, most of them with non-default facets.
    pub fn filter_state() -> impl Strategy<Value = FilterState> {
        (
            prop_oneof![Just(String::new()), "[a-z][a-z-]{0,15}"],
            (0_u32..300_000, 0_u32..300_000),
            prop_oneof![Just(String::new()), "\\PC{1,20}"],
            1_u32..500,
        )
            .prop_map(|(category, (a, b), search_query, page)| {
                let (min, max) = if a <= b { (a, b) } else { (b, a) };
                FilterState {
                    category,
                    min_price: f64::from(min) / 100.0,
                    max_price: f64::from(max) / 100.0,
                    search_query,
                    page: NonZeroU32::new(page).unwrap_or(FIRST_PAGE),
                }
            })
    }
}
