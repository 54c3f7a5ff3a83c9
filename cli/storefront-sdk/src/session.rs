//! The listing view's state, wired together.
//!
//! A [CatalogSession] owns the URL, the query controller and the category
//! directory. Views feed it [FacetChange]s and render the [CatalogView] it
//! exposes; nothing else about the listing is observable from outside.

use std::num::{NonZeroU32, NonZeroUsize};

use serde::Serialize;
use storefront_catalog::{ClientTrait, Product};

use crate::categories::CategoryDirectory;
use crate::controller::{Cycle, CycleOutcome, QueryController, QueryStatus};
use crate::filter::{FIRST_PAGE, FilterState};
use crate::url_state::{FilterPatch, UrlState};

/// The events a listing view may emit.
#[derive(Debug, Clone, PartialEq)]
pub enum FacetChange {
    /// Category and price range changed. Returns to the first page.
    Filter {
        category: String,
        min_price: f64,
        max_price: f64,
    },
    /// The search term changed. Returns to the first page.
    Search(String),
    Page(NonZeroU32),
}

impl FacetChange {
    pub fn into_patch(self) -> FilterPatch {
        match self {
            FacetChange::Filter {
                category,
                min_price,
                max_price,
            } => FilterPatch {
                category: Some(category),
                min_price: Some(min_price),
                max_price: Some(max_price),
                page: Some(FIRST_PAGE),
                ..Default::default()
            },
            FacetChange::Search(term) => FilterPatch {
                search_query: Some(term.trim().to_string()),
                page: Some(FIRST_PAGE),
                ..Default::default()
            },
            FacetChange::Page(page) => FilterPatch {
                page: Some(page),
                ..Default::default()
            },
        }
    }
}

/// Everything a listing view renders from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogView<'a> {
    pub products: &'a [Product],
    pub categories: &'a [String],
    pub total_products: usize,
    pub loading: bool,
    /// Set when the latest product query failed.
    pub error: Option<&'a str>,
    /// Set when the category list failed to load.
    pub categories_error: Option<&'a str>,
}

/// Number of pages needed for `total` items.
pub fn total_pages(total: usize, page_size: NonZeroUsize) -> usize {
    total.div_ceil(page_size.get())
}

/// The human readable description of a listing page.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingSummary {
    pub filter: FilterState,
    pub shown: usize,
    pub total: usize,
    pub page_size: NonZeroUsize,
}

impl ListingSummary {
    /// "Showing 1-12 of 24 products in "smartphones" for "iPhone"" or "No products found".
    pub fn status_line(&self) -> String {
        let mut line = if self.shown == 0 {
            "No products found".to_string()
        } else {
            let from = (self.filter.page.get() as usize - 1) * self.page_size.get() + 1;
            let to = (from + self.shown - 1).min(self.total);
            format!("Showing {from}-{to} of {} products", self.total)
        };
        if !self.filter.category.is_empty() {
            line.push_str(&format!(
                " in \"{}\"",
                display_category(&self.filter.category)
            ));
        }
        if !self.filter.search_query.is_empty() {
            line.push_str(&format!(" for \"{}\"", self.filter.search_query));
        }
        line
    }

    pub fn price_line(&self) -> Option<String> {
        self.filter.has_price_filter().then(|| {
            format!(
                "Price range: ${} - ${}",
                self.filter.min_price, self.filter.max_price
            )
        })
    }

    pub fn page_line(&self) -> String {
        format!(
            "Page {} of {} • {} per page",
            self.filter.page,
            self.total_pages(),
            self.page_size
        )
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.total, self.page_size)
    }
}

/// Category slugs are shown with dashes as spaces.
pub fn display_category(slug: &str) -> String {
    slug.replace('-', " ")
}

pub struct CatalogSession<C> {
    client: C,
    url: UrlState,
    controller: QueryController,
    directory: CategoryDirectory,
    activated: bool,
}

impl<C: ClientTrait> CatalogSession<C> {
    pub fn new(client: C, url: UrlState, page_size: NonZeroUsize) -> Self {
        Self {
            client,
            url,
            controller: QueryController::new(page_size),
            directory: CategoryDirectory::default(),
            activated: false,
        }
    }

    /// Load the category directory and resolve the listing the URL describes.
    ///
    /// Both requests run concurrently.
    /// The directory is only loaded on the first activation.
    pub async fn activate(&mut self) {
        let cycle = self.controller.request(self.url.read());
        let client = &self.client;

        if self.activated {
            if let Some(cycle) = cycle {
                let outcome = cycle.run(client).await;
                self.controller.complete(outcome);
            }
            return;
        }

        let (directory, outcome) = futures::join!(CategoryDirectory::load(client), async {
            match cycle {
                Some(cycle) => Some(cycle.run(client).await),
                None => None,
            }
        });
        self.directory = directory;
        self.activated = true;
        if let Some(outcome) = outcome {
            self.controller.complete(outcome);
        }
    }

    /// Write `change` to the URL and start a cycle if the listing changed.
    ///
    /// The returned cycle may run concurrently with others;
    /// pass its outcome to [Self::complete].
    pub fn dispatch(&mut self, change: FacetChange) -> Option<Cycle> {
        tracing::debug!(?change, "facet changed");
        let filter = self.url.write(&change.into_patch());
        self.controller.request(filter)
    }

    /// Publish `outcome` unless a newer cycle has started since.
    pub fn complete(&mut self, outcome: CycleOutcome) -> bool {
        self.controller.complete(outcome)
    }

    /// Apply `change` and wait for the resulting listing.
    pub async fn apply(&mut self, change: FacetChange) {
        if let Some(cycle) = self.dispatch(change) {
            let outcome = cycle.run(&self.client).await;
            self.controller.complete(outcome);
        }
    }

    /// Start the current cycle again.
    pub fn retry_cycle(&mut self) -> Option<Cycle> {
        self.controller.retry()
    }

    pub async fn retry(&mut self) {
        if let Some(cycle) = self.retry_cycle() {
            let outcome = cycle.run(&self.client).await;
            self.controller.complete(outcome);
        }
    }

    pub fn view(&self) -> CatalogView<'_> {
        let result = self.controller.result();
        CatalogView {
            products: &result.page_items,
            categories: self.directory.categories(),
            total_products: result.total_matching,
            loading: matches!(result.status, QueryStatus::Idle | QueryStatus::Loading),
            error: match &result.status {
                QueryStatus::Failed(message) => Some(message.as_str()),
                _ => None,
            },
            categories_error: self.directory.error(),
        }
    }

    /// The filter is the newest requested one; counts come from the last published result.
    pub fn summary(&self) -> ListingSummary {
        let result = self.controller.result();
        ListingSummary {
            filter: self.controller.current().cloned().unwrap_or_default(),
            shown: result.page_items.len(),
            total: result.total_matching,
            page_size: self.controller.page_size(),
        }
    }

    /// The state the URL currently describes.
    pub fn filter(&self) -> FilterState {
        self.url.read()
    }

    /// The query string reproducing this listing.
    pub fn share_query(&self) -> String {
        self.url.query_string()
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn controller(&self) -> &QueryController {
        &self.controller
    }

    pub fn directory(&self) -> &CategoryDirectory {
        &self.directory
    }
}
