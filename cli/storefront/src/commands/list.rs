use std::num::NonZeroU32;

use anyhow::{Result, anyhow};
use bpaf::Bpaf;
use serde::Serialize;
use storefront_catalog::Client;
use storefront_sdk::session::{CatalogSession, CatalogView};
use storefront_sdk::url_state::FilterPatch;
use tracing::instrument;

use super::initial_url;
use crate::config::Config;
use crate::utils::errors::display_chain;
use crate::utils::message;
use crate::utils::render::{DisplayListing, stdout_is_pretty};

const RETRY_HINT: &str = "Run the same command again to retry.";

// List one page of products
#[derive(Debug, Bpaf, Clone)]
pub struct List {
    /// Print the listing as JSON
    #[bpaf(long)]
    pub json: bool,

    /// Start from a shared listing query, e.g. 'category=laptops&page=2'
    #[bpaf(long, argument("QUERY"))]
    pub query: Option<String>,

    /// Only list products matching a search term
    #[bpaf(long, short, argument("TERM"))]
    pub search: Option<String>,

    /// Only list products of a category, by slug
    #[bpaf(long, argument("SLUG"))]
    pub category: Option<String>,

    /// Lowest price to list
    #[bpaf(long("min-price"), argument("PRICE"))]
    pub min_price: Option<f64>,

    /// Highest price to list
    #[bpaf(long("max-price"), argument("PRICE"))]
    pub max_price: Option<f64>,

    /// Page to show, starting at 1
    #[bpaf(long, short, argument("PAGE"))]
    pub page: Option<NonZeroU32>,
}

/// A listing page as printed by `--json`.
#[derive(Debug, Serialize)]
struct ListingJson<'a> {
    #[serde(flatten)]
    view: CatalogView<'a>,
    page: NonZeroU32,
    total_pages: usize,
    query: String,
}

impl List {
    #[instrument(name = "list", skip_all)]
    pub async fn handle(self, config: Config, client: Client) -> Result<()> {
        let json = self.json;
        let mut url = initial_url(self.query.as_deref());
        url.write(&self.patch());

        let mut session = CatalogSession::new(client, url, config.page_size);
        session.activate().await;

        if let Some(error) = session.view().categories_error {
            message::warning(error);
        }

        let rendered = render_listing(&session, json, stdout_is_pretty())?;
        if let Some(err) = listing_failure(&session) {
            message::plain(rendered);
            return Err(err);
        }
        println!("{rendered}");
        Ok(())
    }

    /// The facets given as flags, on top of `--query`.
    fn patch(&self) -> FilterPatch {
        FilterPatch {
            page: self.page,
            category: self.category.clone(),
            min_price: self.min_price,
            max_price: self.max_price,
            search_query: self.search.as_ref().map(|term| term.trim().to_string()),
        }
    }
}

/// The error behind a failed listing, if the listing failed.
fn listing_failure(session: &CatalogSession<Client>) -> Option<anyhow::Error> {
    let message = session.view().error?;
    Some(match session.controller().last_error() {
        Some(cause) => anyhow!("{}", display_chain(cause)),
        None => anyhow!("{message}"),
    })
}

/// Render the settled listing.
///
/// A failed listing always renders as text, with the error in place of the products.
fn render_listing(session: &CatalogSession<Client>, json: bool, pretty: bool) -> Result<String> {
    let view = session.view();
    let summary = session.summary();
    let share_query = session.share_query();

    if json && view.error.is_none() {
        let listing = ListingJson {
            view,
            page: summary.filter.page,
            total_pages: summary.total_pages(),
            query: share_query,
        };
        return Ok(serde_json::to_string_pretty(&listing)?);
    }

    Ok(DisplayListing {
        view: &view,
        summary: &summary,
        share_query: &share_query,
        retry_hint: RETRY_HINT,
        pretty,
    }
    .to_string())
}

#[cfg(test)]
mod tests {
    use bpaf::Parser;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use storefront_catalog::MockClient;
    use storefront_catalog::test_helpers::{iphones, product};
    use storefront_sdk::query::DEFAULT_PAGE_SIZE;
    use storefront_sdk::url_state::UrlState;

    use super::*;

    fn parse_list(args: &[&str]) -> List {
        list().to_options().run_inner(args).unwrap()
    }

    async fn settled_session(args: &List, client: MockClient) -> CatalogSession<Client> {
        let mut url = initial_url(args.query.as_deref());
        url.write(&args.patch());
        let mut session = CatalogSession::new(client.into(), url, DEFAULT_PAGE_SIZE);
        session.activate().await;
        session
    }

    #[test]
    fn flags_override_the_shared_query() {
        let args = parse_list(&[
            "--query",
            "category=laptops&page=3&q=mac",
            "--search",
            " lamp ",
            "--page",
            "1",
        ]);
        let mut url = initial_url(args.query.as_deref());
        let filter = url.write(&args.patch());

        assert_eq!(filter.category, "laptops");
        assert_eq!(filter.search_query, "lamp");
        assert_eq!(filter.page.get(), 1);
        assert_eq!(url, UrlState::from_query("category=laptops&q=lamp"));
    }

    #[tokio::test]
    async fn renders_a_filtered_listing() {
        let mut client = MockClient::default();
        client.push_categories_response(vec![]);
        client.push_listing(vec![
            product(1, "iPhone 9", 549.0, "smartphones"),
            product(2, "iPhone X", 899.0, "smartphones"),
        ]);

        let args = parse_list(&["--category", "smartphones", "--max-price", "600"]);
        let session = settled_session(&args, client).await;

        assert_eq!(render_listing(&session, false, false).unwrap(), indoc! {r#"
            Showing 1-1 of 1 products in "smartphones"
            Price range: $0 - $600

            1  iPhone 9    $549.00  ★ 4.7  smartphones
            Share: ?category=smartphones&maxPrice=600"#
        });
    }

    #[tokio::test]
    async fn renders_json() {
        let mut client = MockClient::default();
        client.push_categories_response(vec![]);
        client.push_listing(iphones(13, 10.0));

        let args = parse_list(&["--page", "2"]);
        let session = settled_session(&args, client).await;

        let json: serde_json::Value =
            serde_json::from_str(&render_listing(&session, true, false).unwrap()).unwrap();
        assert_eq!(json["page"], 2);
        assert_eq!(json["total_pages"], 2);
        assert_eq!(json["total_products"], 13);
        assert_eq!(json["query"], "page=2");
        assert_eq!(json["products"].as_array().unwrap().len(), 1);
        assert_eq!(json["products"][0]["title"], "iPhone 13");
        assert_eq!(json["error"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn failed_listing_renders_the_error_view() {
        let mut client = MockClient::default();
        client.push_categories_response(vec![]);
        client.push_error_response(500);

        let args = parse_list(&["--search", "lamp"]);
        let session = settled_session(&args, client).await;

        let expected = indoc! {"
            Something went wrong
            Failed to load products. Please try again.
            Run the same command again to retry."
        };
        assert_eq!(render_listing(&session, false, false).unwrap(), expected);
        assert_eq!(render_listing(&session, true, false).unwrap(), expected);

        let err = listing_failure(&session).unwrap();
        assert!(
            err.to_string().starts_with("failed to fetch search 'lamp': "),
            "{err}"
        );
    }

    #[tokio::test]
    async fn settled_listing_has_no_failure() {
        let mut client = MockClient::default();
        client.push_categories_response(vec![]);
        client.push_listing(iphones(3, 10.0));

        let session = settled_session(&parse_list(&[]), client).await;

        assert!(listing_failure(&session).is_none());
    }
}
