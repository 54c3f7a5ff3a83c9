//! A catalog client that replays canned responses.
//!
//! Responses are consumed in order, one per catalog request,
//! so a full listing resolution consumes two: the probe and the full fetch.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::client::ClientTrait;
use crate::error::{CatalogClientError, MockDataError};
use crate::types::{CategoryEntry, Product, ProductId, ProductPage, normalize_categories};

/// Points the CLI at a JSON file of mock responses instead of the catalog.
pub const STOREFRONT_CATALOG_MOCK_DATA_VAR: &str = "_STOREFRONT_USE_CATALOG_MOCK";

const MOCK_URL: &str = "mock://catalog";

// Arc allows you to push things into the client from outside the client if necessary
// Mutex allows you to share across threads (necessary because of tokio)
type MockField<T> = Arc<Mutex<T>>;

/// A generic error response carrying only a status code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericResponse {
    pub status: u16,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Error(GenericResponse),
    Page(ProductPage),
    Product(Product),
    Categories(Vec<CategoryEntry>),
}

/// Reads a list of mock responses from disk.
fn read_mock_responses(path: impl AsRef<Path>) -> Result<VecDeque<Response>, MockDataError> {
    let contents = std::fs::read_to_string(path).map_err(MockDataError::ReadMockFile)?;
    let deserialized: Vec<Response> =
        serde_json::from_str(&contents).map_err(MockDataError::ParseJson)?;
    Ok(deserialized.into())
}

/// A catalog client that can be seeded with mock responses
#[derive(Debug, Default, Clone)]
pub struct MockClient {
    pub mock_responses: MockField<VecDeque<Response>>,
}

impl MockClient {
    /// Create a new mock client, potentially reading mock responses from disk
    pub fn new(mock_data_path: Option<impl AsRef<Path>>) -> Result<Self, MockDataError> {
        let mock_responses = match mock_data_path {
            Some(path) => read_mock_responses(path)?,
            None => VecDeque::new(),
        };
        Ok(Self {
            mock_responses: Arc::new(Mutex::new(mock_responses)),
        })
    }

    fn push(&self, response: Response) {
        self.mock_responses
            .lock()
            .expect("couldn't acquire mock lock")
            .push_back(response);
    }

    fn pop(&self) -> Option<Response> {
        self.mock_responses
            .lock()
            .expect("couldn't acquire mock lock")
            .pop_front()
    }

    /// Number of responses not consumed yet
    pub fn remaining(&self) -> usize {
        self.mock_responses
            .lock()
            .expect("couldn't acquire mock lock")
            .len()
    }

    /// Push a new response into the list of mock responses
    pub fn push_page_response(&mut self, page: ProductPage) {
        self.push(Response::Page(page));
    }

    /// Push the probe and full-fetch responses a listing resolution
    /// for `products` consumes.
    pub fn push_listing(&mut self, products: Vec<Product>) {
        let total = products.len() as u64;
        self.push(Response::Page(ProductPage {
            products: Vec::new(),
            total,
            skip: 0,
            limit: 0,
        }));
        if total > 0 {
            self.push(Response::Page(ProductPage {
                products,
                total,
                skip: 0,
                limit: total,
            }));
        }
    }

    pub fn push_product_response(&mut self, product: Product) {
        self.push(Response::Product(product));
    }

    pub fn push_categories_response(&mut self, categories: Vec<CategoryEntry>) {
        self.push(Response::Categories(categories));
    }

    /// Push an error response with the given HTTP status
    pub fn push_error_response(&mut self, status: u16) {
        self.push(Response::Error(GenericResponse {
            status,
            message: None,
        }));
    }

    /// Pop the next response expecting a listing page.
    ///
    /// `on_not_found` produces the error a 404 maps to for the calling endpoint.
    fn next_page(
        &self,
        on_not_found: impl FnOnce() -> CatalogClientError,
    ) -> Result<ProductPage, CatalogClientError> {
        match self.pop() {
            Some(Response::Page(page)) => Ok(page),
            Some(Response::Error(err)) => Err(error_from_status(err.status, on_not_found)),
            other => Err(unexpected_mock("page", other)),
        }
    }
}

fn error_from_status(
    status: u16,
    on_not_found: impl FnOnce() -> CatalogClientError,
) -> CatalogClientError {
    match StatusCode::from_u16(status) {
        Ok(StatusCode::NOT_FOUND) => on_not_found(),
        Ok(status) => CatalogClientError::UnexpectedStatus {
            url: MOCK_URL.to_string(),
            status,
        },
        Err(_) => CatalogClientError::Other(format!("invalid mock status code {status}")),
    }
}

fn unexpected_mock(expected: &str, found: Option<Response>) -> CatalogClientError {
    match found {
        None => CatalogClientError::Other(format!(
            "no mock responses left, expected {expected} response"
        )),
        Some(found) => CatalogClientError::Other(format!(
            "expected {expected} response, found {found:?}"
        )),
    }
}

impl ClientTrait for MockClient {
    async fn fetch_all(&self, _skip: u64, _limit: u64) -> Result<ProductPage, CatalogClientError> {
        self.next_page(plain_not_found)
    }

    async fn fetch_by_category(
        &self,
        slug: &str,
        _skip: u64,
        _limit: u64,
    ) -> Result<ProductPage, CatalogClientError> {
        self.next_page(|| CatalogClientError::UnknownCategory(slug.to_string()))
    }

    async fn fetch_by_search(
        &self,
        term: &str,
        _skip: u64,
        _limit: u64,
    ) -> Result<ProductPage, CatalogClientError> {
        if term.is_empty() {
            return Err(CatalogClientError::InvalidRequest(
                "search term must not be empty".to_string(),
            ));
        }
        self.next_page(plain_not_found)
    }

    async fn fetch_by_id(&self, id: ProductId) -> Result<Product, CatalogClientError> {
        match self.pop() {
            Some(Response::Product(product)) => Ok(product),
            Some(Response::Error(err)) => {
                Err(error_from_status(err.status, || CatalogClientError::NotFound(id)))
            },
            other => Err(unexpected_mock("product", other)),
        }
    }

    async fn fetch_categories(&self) -> Result<Vec<String>, CatalogClientError> {
        match self.pop() {
            Some(Response::Categories(entries)) => Ok(normalize_categories(entries)),
            Some(Response::Error(err)) => Err(CatalogClientError::UnexpectedStatus {
                url: MOCK_URL.to_string(),
                status: StatusCode::from_u16(err.status)
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            }),
            other => Err(unexpected_mock("categories", other)),
        }
    }
}

/// Listing endpoints without a dedicated not-found meaning report a plain 404.
fn plain_not_found() -> CatalogClientError {
    CatalogClientError::UnexpectedStatus {
        url: MOCK_URL.to_string(),
        status: StatusCode::NOT_FOUND,
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::PathBuf;

    use pollster::FutureExt;
    use pretty_assertions::assert_eq;
    use tempfile::NamedTempFile;

    use super::*;
    use crate::ProductQuery;
    use crate::error::ErrorKind;
    use crate::test_helpers::iphones;

    fn empty_client() -> MockClient {
        let path: Option<&PathBuf> = None;
        MockClient::new(path).unwrap()
    }

    #[test]
    fn mock_client_uses_seeded_responses() {
        let mut client = empty_client();
        client.push_listing(iphones(3, 549.0));

        let page = client.fetch_all_matching(&ProductQuery::All).block_on().unwrap();

        assert_eq!(page.products.len(), 3);
        assert_eq!(client.remaining(), 0);
    }

    #[test]
    fn can_push_responses_outside_of_client() {
        let client = empty_client();
        {
            // Need to drop the mutex guard otherwise `fetch_categories` will block trying to read
            // the queue of mock responses
            let resp_handle = client.mock_responses.clone();
            let mut responses = resp_handle.lock().unwrap();
            responses.push_back(Response::Categories(vec![CategoryEntry::Slug(
                "laptops".to_string(),
            )]));
        }
        let categories = client.fetch_categories().block_on().unwrap();
        assert_eq!(categories, vec!["laptops"]);
    }

    #[test]
    fn not_found_maps_per_endpoint() {
        let mut client = empty_client();
        client.push_error_response(404);
        client.push_error_response(404);

        let by_id = client.fetch_by_id(ProductId::new(3)).block_on().unwrap_err();
        assert_eq!(by_id.kind(), ErrorKind::NotFound);

        let by_category = client
            .fetch_by_category("toasters", 0, 0)
            .block_on()
            .unwrap_err();
        assert!(matches!(by_category, CatalogClientError::UnknownCategory(_)));
    }

    #[test]
    fn exhausted_queue_is_an_error() {
        let client = empty_client();
        let err = client.fetch_all(0, 0).block_on().unwrap_err();
        assert!(matches!(err, CatalogClientError::Other(_)));
    }

    #[test]
    fn error_when_invalid_json() {
        let tmp = NamedTempFile::new().unwrap();
        // There's nothing in the mock data file yet, so it can't be parsed as JSON.
        let res = MockClient::new(Some(&tmp));
        assert!(matches!(res, Err(MockDataError::ParseJson(_))));
    }

    #[test]
    fn parses_responses_from_file() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(
            br#"[
                { "products": [], "total": 0, "skip": 0, "limit": 0 },
                { "status": 500 },
                ["beauty", { "slug": "laptops", "name": "Laptops" }]
            ]"#,
        )
        .unwrap();
        let client = MockClient::new(Some(&tmp)).unwrap();

        let page = client.fetch_all(0, 0).block_on().unwrap();
        assert_eq!(page.total, 0);

        let err = client.fetch_all(0, 0).block_on().unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));

        let categories = client.fetch_categories().block_on().unwrap();
        assert_eq!(categories, vec!["beauty", "laptops"]);
    }
}
