//! Catalog client for the upstream product API.

use std::fmt::Debug;
use std::str::FromStr;

use enum_dispatch::enum_dispatch;
use reqwest::header::{self, HeaderMap};
use reqwest::{Response as HttpResponse, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use crate::config::CatalogClientConfig;
use crate::error::CatalogClientError;
use crate::mock::MockClient;
use crate::types::{CategoryEntry, Product, ProductId, ProductPage, ProductQuery, normalize_categories};

const USER_AGENT: &str = concat!("storefront/", env!("CARGO_PKG_VERSION"));

/// Either a client for the actual catalog service,
/// or a mock client for testing.
#[derive(Debug, Clone)]
#[enum_dispatch(ClientTrait)]
pub enum Client {
    Catalog(CatalogClient),
    Mock(MockClient),
}

/// A client for the catalog service.
///
/// Clones share the underlying connection pool.
#[derive(Clone)]
pub struct CatalogClient {
    client: reqwest::Client,
    base_url: Url,
    config: CatalogClientConfig,
}

impl Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("catalog_url", &self.config.catalog_url)
            .finish_non_exhaustive()
    }
}

impl CatalogClient {
    /// Create a new catalog client from configuration.
    pub fn new(config: CatalogClientConfig) -> Result<Self, CatalogClientError> {
        let base_url = Url::parse(&config.catalog_url).map_err(|e| {
            CatalogClientError::Other(format!(
                "invalid catalog url '{}': {e}",
                config.catalog_url
            ))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(CatalogClientError::Other(format!(
                "catalog url '{}' cannot be used as a base url",
                config.catalog_url
            )));
        }

        let client = build_http_client(&config)?;

        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    /// Get the configured catalog URL.
    pub fn catalog_url(&self) -> &str {
        &self.config.catalog_url
    }

    /// Update the client configuration and recreate the client.
    pub fn update_config(
        &mut self,
        update: impl FnOnce(&mut CatalogClientConfig),
    ) -> Result<(), CatalogClientError> {
        let mut modified_config = self.config.clone();
        update(&mut modified_config);
        *self = Self::new(modified_config)?;
        Ok(())
    }

    /// Join `segments` onto the base url, percent-encoding each of them.
    fn endpoint(&self, segments: &[&str], query: &[(&str, String)]) -> Url {
        let mut url = self.base_url.clone();
        // checked in `new`
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (k, v.as_str())));
        }
        url
    }

    async fn send(&self, url: &Url) -> Result<HttpResponse, CatalogClientError> {
        debug!(%url, "sending catalog request");
        self.client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| CatalogClientError::Transport {
                url: url.to_string(),
                source,
            })
    }

    async fn listing(&self, segments: &[&str], query: &[(&str, String)]) -> Result<ProductPage, CatalogClientError> {
        let url = self.endpoint(segments, query);
        let response = self.send(&url).await?;
        decode_body(&url, response).await
    }
}

fn paging(skip: u64, limit: u64) -> [(&'static str, String); 2] {
    [("limit", limit.to_string()), ("skip", skip.to_string())]
}

/// Read the body of a successful response and parse it as JSON.
async fn decode_body<T: DeserializeOwned>(
    url: &Url,
    response: HttpResponse,
) -> Result<T, CatalogClientError> {
    let status = response.status();
    if !status.is_success() {
        return Err(CatalogClientError::UnexpectedStatus {
            url: url.to_string(),
            status,
        });
    }

    let body = response
        .bytes()
        .await
        .map_err(|source| CatalogClientError::Transport {
            url: url.to_string(),
            source,
        })?;

    serde_json::from_slice(&body).map_err(|source| CatalogClientError::Parse {
        url: url.to_string(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Catalog trait
// ---------------------------------------------------------------------------

/// The complete catalog API interface.
///
/// Listing operations take an offset (`skip`) and a `limit`
/// and report the upstream `total` alongside the returned records.
#[enum_dispatch]
#[allow(async_fn_in_trait)]
pub trait ClientTrait {
    /// Unfiltered listing.
    async fn fetch_all(&self, skip: u64, limit: u64) -> Result<ProductPage, CatalogClientError>;

    /// Listing scoped to a single category slug.
    ///
    /// Fails with [CatalogClientError::UnknownCategory] if the catalog doesn't know `slug`.
    async fn fetch_by_category(
        &self,
        slug: &str,
        skip: u64,
        limit: u64,
    ) -> Result<ProductPage, CatalogClientError>;

    /// Free-text search. `term` must not be empty.
    async fn fetch_by_search(
        &self,
        term: &str,
        skip: u64,
        limit: u64,
    ) -> Result<ProductPage, CatalogClientError>;

    /// Look up a single product.
    async fn fetch_by_id(&self, id: ProductId) -> Result<Product, CatalogClientError>;

    /// The distinct category slugs, in upstream order.
    async fn fetch_categories(&self) -> Result<Vec<String>, CatalogClientError>;

    /// Dispatch a listing request to the endpoint serving `query`.
    async fn fetch_page(
        &self,
        query: &ProductQuery,
        skip: u64,
        limit: u64,
    ) -> Result<ProductPage, CatalogClientError> {
        match query {
            ProductQuery::All => self.fetch_all(skip, limit).await,
            ProductQuery::Category(slug) => self.fetch_by_category(slug, skip, limit).await,
            ProductQuery::Search(term) => self.fetch_by_search(term, skip, limit).await,
        }
    }

    /// Retrieve every record matching `query`.
    ///
    /// The catalog can't filter by price, so callers need the whole candidate set.
    /// A zero-limit probe discovers the upstream total,
    /// then a single request fetches that many records.
    async fn fetch_all_matching(
        &self,
        query: &ProductQuery,
    ) -> Result<ProductPage, CatalogClientError> {
        let probe = self.fetch_page(query, 0, 0).await?;
        let total = probe.total;
        tracing::debug!(%query, total, "probed catalog total");

        if total == 0 {
            return Ok(ProductPage {
                products: Vec::new(),
                total: 0,
                skip: 0,
                limit: 0,
            });
        }

        let page = self.fetch_page(query, 0, total).await?;
        if page.products.len() as u64 != total {
            tracing::debug!(
                %query,
                expected = total,
                received = page.products.len(),
                "catalog returned a different number of records than probed"
            );
        }
        Ok(page)
    }
}

// ---------------------------------------------------------------------------
// ClientTrait implementation for CatalogClient
// ---------------------------------------------------------------------------

impl ClientTrait for CatalogClient {
    #[instrument(skip(self))]
    async fn fetch_all(&self, skip: u64, limit: u64) -> Result<ProductPage, CatalogClientError> {
        self.listing(&["products"], &paging(skip, limit)).await
    }

    #[instrument(skip(self))]
    async fn fetch_by_category(
        &self,
        slug: &str,
        skip: u64,
        limit: u64,
    ) -> Result<ProductPage, CatalogClientError> {
        let url = self.endpoint(&["products", "category", slug], &paging(skip, limit));
        let response = self.send(&url).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(CatalogClientError::UnknownCategory(slug.to_string()));
        }
        decode_body(&url, response).await.map_err(|e| match e {
            // an empty body is how some deployments answer for unknown slugs
            CatalogClientError::Parse { ref source, .. } if source.is_eof() => {
                CatalogClientError::UnknownCategory(slug.to_string())
            },
            other => other,
        })
    }

    #[instrument(skip(self))]
    async fn fetch_by_search(
        &self,
        term: &str,
        skip: u64,
        limit: u64,
    ) -> Result<ProductPage, CatalogClientError> {
        if term.is_empty() {
            return Err(CatalogClientError::InvalidRequest(
                "search term must not be empty".to_string(),
            ));
        }
        let [limit, skip] = paging(skip, limit);
        self.listing(&["products", "search"], &[("q", term.to_string()), limit, skip])
            .await
    }

    #[instrument(skip(self))]
    async fn fetch_by_id(&self, id: ProductId) -> Result<Product, CatalogClientError> {
        let url = self.endpoint(&["products", &id.to_string()], &[]);
        let response = self.send(&url).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(CatalogClientError::NotFound(id));
        }
        decode_body(&url, response).await
    }

    #[instrument(skip(self))]
    async fn fetch_categories(&self) -> Result<Vec<String>, CatalogClientError> {
        let url = self.endpoint(&["products", "categories"], &[]);
        let response = self.send(&url).await?;
        let body: serde_json::Value = decode_body(&url, response).await?;

        let serde_json::Value::Array(items) = body else {
            tracing::warn!(%url, "category listing is not an array, treating it as empty");
            return Ok(Vec::new());
        };

        let entries = items
            .into_iter()
            .map(serde_json::from_value::<CategoryEntry>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| CatalogClientError::Parse {
                url: url.to_string(),
                source,
            })?;

        let categories = normalize_categories(entries);
        debug!(n_categories = categories.len(), "received categories");
        Ok(categories)
    }
}

// ---------------------------------------------------------------------------
// HTTP client builder
// ---------------------------------------------------------------------------

fn build_http_client(config: &CatalogClientConfig) -> Result<reqwest::Client, CatalogClientError> {
    let mut headers = HeaderMap::new();

    // Pass in a bool if we are running in CI, so requests can reflect this in the headers
    if std::env::var("CI").is_ok() {
        headers.insert(
            header::HeaderName::from_static("storefront-ci"),
            header::HeaderValue::from_static("true"),
        );
    }

    for (key, value) in &config.extra_headers {
        headers.insert(
            header::HeaderName::from_str(key).map_err(
                |e: reqwest::header::InvalidHeaderName| CatalogClientError::Other(e.to_string()),
            )?,
            header::HeaderValue::from_str(value).map_err(
                |e: reqwest::header::InvalidHeaderValue| CatalogClientError::Other(e.to_string()),
            )?,
        );
    }

    debug!(
        catalog_url = %config.catalog_url,
        extra_headers = config.extra_headers.len(),
        "building catalog HTTP client"
    );

    reqwest::Client::builder()
        .default_headers(headers)
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .user_agent(config.user_agent.as_deref().unwrap_or(USER_AGENT))
        .build()
        .map_err(|e| CatalogClientError::Other(e.to_string()))
}
