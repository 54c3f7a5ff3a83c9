//! Catalog interaction types.
//!
//! These are the canonical records the rest of the storefront works with,
//! independent of the shape variations the upstream API produces.

use std::fmt::Display;

use derive_more::{Display, From, FromStr};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    From,
    FromStr,
)]
#[serde(transparent)]
pub struct ProductId(u64);

impl ProductId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// A product as received from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub discount_percentage: f64,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub stock: u32,
    // Not every catalog entry carries a brand (e.g. groceries).
    #[serde(default)]
    pub brand: String,
    pub category: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub images: Vec<String>,
}

impl Product {
    pub fn has_discount(&self) -> bool {
        self.discount_percentage > 0.0
    }

    /// The price after applying `discount_percentage`.
    pub fn discounted_price(&self) -> f64 {
        if self.has_discount() {
            self.price * (1.0 - self.discount_percentage / 100.0)
        } else {
            self.price
        }
    }

    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// One response of a listing endpoint.
///
/// `total` counts every record matching the query upstream,
/// regardless of `skip` and `limit`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total: u64,
    #[serde(default)]
    pub skip: u64,
    #[serde(default)]
    pub limit: u64,
}

/// The listing endpoints the catalog offers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProductQuery {
    All,
    Category(String),
    Search(String),
}

impl Display for ProductQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductQuery::All => write!(f, "all products"),
            ProductQuery::Category(slug) => write!(f, "category '{slug}'"),
            ProductQuery::Search(term) => write!(f, "search '{term}'"),
        }
    }
}

/// A category as listed by the upstream.
///
/// Depending on the API version this is either a bare slug
/// or a record with `slug`, `name` and `url` fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoryEntry {
    Slug(String),
    Record {
        #[serde(default)]
        slug: Option<String>,
        #[serde(default)]
        name: Option<String>,
    },
    Other(serde_json::Value),
}

impl CategoryEntry {
    /// The canonical slug of this entry, preferring `slug` over `name`.
    pub fn into_slug(self) -> Option<String> {
        let slug = match self {
            CategoryEntry::Slug(slug) => Some(slug),
            CategoryEntry::Record { slug, name } => slug
                .filter(|slug| !slug.is_empty())
                .or(name),
            CategoryEntry::Other(serde_json::Value::Number(n)) => Some(n.to_string()),
            CategoryEntry::Other(serde_json::Value::Bool(b)) => Some(b.to_string()),
            CategoryEntry::Other(_) => None,
        };
        slug.filter(|slug| !slug.is_empty())
    }
}

/// Collapse heterogeneous category entries into distinct slugs,
/// keeping the upstream order.
///
/// Entries without a usable slug or name are dropped.
pub fn normalize_categories(entries: impl IntoIterator<Item = CategoryEntry>) -> Vec<String> {
    entries
        .into_iter()
        .filter_map(|entry| {
            let slug = entry.clone().into_slug();
            if slug.is_none() {
                tracing::debug!(?entry, "dropping category entry without slug or name");
            }
            slug
        })
        .unique()
        .collect()
}
