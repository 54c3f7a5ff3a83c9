//! Latest-request-wins bookkeeping for listing resolutions.
//!
//! Every facet change starts a new [Cycle] tagged with a generation number.
//! Cycles may run concurrently and finish in any order;
//! [QueryController::complete] only publishes the outcome of the newest one.

use std::num::NonZeroUsize;

use serde::Serialize;
use storefront_catalog::{ClientTrait, Product};

use crate::filter::FilterState;
use crate::query::{self, FetchError, ResolvedPage};

/// Identifies one resolution cycle. Later cycles have larger generations.
pub type Generation = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum QueryStatus {
    /// No cycle has been started yet.
    Idle,
    Loading,
    Ready,
    /// The latest cycle failed, carrying the message to show to the user.
    Failed(String),
}

/// What a listing view renders from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub page_items: Vec<Product>,
    pub total_matching: usize,
    pub status: QueryStatus,
}

impl Default for QueryResult {
    fn default() -> Self {
        Self {
            page_items: Vec::new(),
            total_matching: 0,
            status: QueryStatus::Idle,
        }
    }
}

/// A pending resolution of `filter`.
///
/// Obtained from [QueryController::request] or [QueryController::retry],
/// and handed back to [QueryController::complete] once [Cycle::run] finishes.
#[derive(Debug, Clone, PartialEq)]
pub struct Cycle {
    pub generation: Generation,
    pub filter: FilterState,
    pub page_size: NonZeroUsize,
}

impl Cycle {
    pub async fn run(self, client: &impl ClientTrait) -> CycleOutcome {
        let result = query::resolve(client, &self.filter, self.page_size).await;
        CycleOutcome {
            generation: self.generation,
            result,
        }
    }
}

#[derive(Debug)]
pub struct CycleOutcome {
    pub generation: Generation,
    pub result: Result<ResolvedPage, FetchError>,
}

#[derive(Debug)]
pub struct QueryController {
    page_size: NonZeroUsize,
    current: Option<FilterState>,
    generation: Generation,
    result: QueryResult,
    last_error: Option<FetchError>,
}

impl QueryController {
    pub fn new(page_size: NonZeroUsize) -> Self {
        Self {
            page_size,
            current: None,
            generation: 0,
            result: QueryResult::default(),
            last_error: None,
        }
    }

    pub fn page_size(&self) -> NonZeroUsize {
        self.page_size
    }

    /// The filter of the newest cycle, `None` before the first request.
    pub fn current(&self) -> Option<&FilterState> {
        self.current.as_ref()
    }

    pub fn result(&self) -> &QueryResult {
        &self.result
    }

    pub fn status(&self) -> &QueryStatus {
        &self.result.status
    }

    /// The error behind a [QueryStatus::Failed] status.
    pub fn last_error(&self) -> Option<&FetchError> {
        self.last_error.as_ref()
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.generation == generation
    }

    /// Start a cycle for `filter` unless it is the filter already current.
    ///
    /// Starting a cycle makes all outstanding cycles stale.
    /// Previously published items stay in place until the new cycle completes.
    pub fn request(&mut self, filter: FilterState) -> Option<Cycle> {
        if self.current.as_ref() == Some(&filter) {
            tracing::trace!(?filter, "filter unchanged, not starting a new cycle");
            return None;
        }
        self.current = Some(filter.clone());
        Some(self.start_cycle(filter))
    }

    /// Re-issue the current filter, e.g. after a failure.
    pub fn retry(&mut self) -> Option<Cycle> {
        let filter = self.current.clone()?;
        Some(self.start_cycle(filter))
    }

    fn start_cycle(&mut self, filter: FilterState) -> Cycle {
        self.generation += 1;
        self.result.status = QueryStatus::Loading;
        tracing::debug!(generation = self.generation, ?filter, "starting query cycle");
        Cycle {
            generation: self.generation,
            filter,
            page_size: self.page_size,
        }
    }

    /// Publish `outcome` if it belongs to the newest cycle.
    ///
    /// Returns whether the outcome was published.
    pub fn complete(&mut self, outcome: CycleOutcome) -> bool {
        if !self.is_current(outcome.generation) {
            tracing::debug!(
                stale = outcome.generation,
                current = self.generation,
                "discarding stale query result"
            );
            return false;
        }

        match outcome.result {
            Ok(page) => {
                tracing::debug!(
                    generation = outcome.generation,
                    total_matching = page.total_matching,
                    "query cycle completed"
                );
                self.result = QueryResult {
                    page_items: page.page_items,
                    total_matching: page.total_matching,
                    status: QueryStatus::Ready,
                };
                self.last_error = None;
            },
            Err(err) => {
                tracing::debug!(generation = outcome.generation, error = %err, "query cycle failed");
                self.result.status = QueryStatus::Failed(err.user_message().to_string());
                self.last_error = Some(err);
            },
        }
        true
    }

    /// Request `filter` and wait for its result.
    pub async fn refresh(&mut self, client: &impl ClientTrait, filter: FilterState) -> &QueryResult {
        if let Some(cycle) = self.request(filter) {
            let outcome = cycle.run(client).await;
            self.complete(outcome);
        }
        &self.result
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use storefront_catalog::MockClient;
    use storefront_catalog::test_helpers::iphones;

    use super::*;
    use crate::query::{DEFAULT_PAGE_SIZE, FETCH_ERROR_MESSAGE};

    fn category(slug: &str) -> FilterState {
        FilterState {
            category: slug.to_string(),
            ..Default::default()
        }
    }

    fn ok_outcome(generation: Generation, total: usize) -> CycleOutcome {
        CycleOutcome {
            generation,
            result: Ok(ResolvedPage {
                page_items: iphones(total.min(12) as u64, 549.0),
                total_matching: total,
            }),
        }
    }

    #[test]
    fn starts_idle() {
        let controller = QueryController::new(DEFAULT_PAGE_SIZE);
        assert_eq!(controller.result(), &QueryResult::default());
        assert_eq!(controller.current(), None);
    }

    #[test]
    fn retry_needs_a_previous_request() {
        let mut controller = QueryController::new(DEFAULT_PAGE_SIZE);
        assert!(controller.retry().is_none());
        assert_eq!(controller.status(), &QueryStatus::Idle);
    }

    #[test]
    fn unchanged_filter_starts_no_cycle() {
        let mut controller = QueryController::new(DEFAULT_PAGE_SIZE);
        assert!(controller.request(category("laptops")).is_some());
        assert!(controller.request(category("laptops")).is_none());
        assert!(controller.request(category("tablets")).is_some());
    }

    #[test]
    fn request_moves_to_loading_and_keeps_previous_items() {
        let mut controller = QueryController::new(DEFAULT_PAGE_SIZE);
        let first = controller.request(category("laptops")).unwrap();
        assert!(controller.complete(ok_outcome(first.generation, 3)));

        controller.request(category("tablets")).unwrap();

        assert_eq!(controller.status(), &QueryStatus::Loading);
        assert_eq!(controller.result().total_matching, 3);
    }

    #[test]
    fn stale_results_are_discarded() {
        let mut controller = QueryController::new(DEFAULT_PAGE_SIZE);
        let older = controller.request(category("laptops")).unwrap();
        let newer = controller.request(category("tablets")).unwrap();

        // the newer cycle finishes first
        assert!(controller.complete(ok_outcome(newer.generation, 7)));
        assert!(!controller.complete(ok_outcome(older.generation, 30)));

        assert_eq!(controller.result().total_matching, 7);
        assert_eq!(controller.status(), &QueryStatus::Ready);
        assert_eq!(controller.current(), Some(&category("tablets")));
    }

    #[test]
    fn stale_results_do_not_settle_loading() {
        let mut controller = QueryController::new(DEFAULT_PAGE_SIZE);
        let older = controller.request(category("laptops")).unwrap();
        controller.request(category("tablets")).unwrap();

        assert!(!controller.complete(ok_outcome(older.generation, 30)));
        assert_eq!(controller.status(), &QueryStatus::Loading);
    }

    #[test]
    fn stale_failures_are_discarded() {
        let mut controller = QueryController::new(DEFAULT_PAGE_SIZE);
        let older = controller.request(category("laptops")).unwrap();
        let newer = controller.request(category("tablets")).unwrap();
        assert!(controller.complete(ok_outcome(newer.generation, 2)));

        let failed = CycleOutcome {
            generation: older.generation,
            result: Err(FetchError {
                strategy: query::FetchStrategy::Category("laptops".to_string()),
                source: storefront_catalog::CatalogClientError::Other("boom".to_string()),
            }),
        };
        assert!(!controller.complete(failed));
        assert_eq!(controller.status(), &QueryStatus::Ready);
        assert!(controller.last_error().is_none());
    }

    #[tokio::test]
    async fn concurrent_cycles_publish_only_the_latest() {
        let mut older_client = MockClient::default();
        older_client.push_listing(iphones(30, 549.0));
        let mut newer_client = MockClient::default();
        newer_client.push_listing(iphones(4, 549.0));

        let mut controller = QueryController::new(DEFAULT_PAGE_SIZE);
        let older = controller.request(category("laptops")).unwrap();
        let newer = controller.request(category("smartphones")).unwrap();

        let (older, newer) = futures::join!(older.run(&older_client), newer.run(&newer_client));
        controller.complete(newer);
        controller.complete(older);

        assert_eq!(controller.result().total_matching, 4);
    }

    #[tokio::test]
    async fn failure_then_retry_reissues_the_same_cycle() {
        let mut client = MockClient::default();
        client.push_error_response(500);
        client.push_listing(iphones(3, 549.0));

        let mut controller = QueryController::new(DEFAULT_PAGE_SIZE);
        controller.refresh(&client, category("smartphones")).await;
        assert_eq!(
            controller.status(),
            &QueryStatus::Failed(FETCH_ERROR_MESSAGE.to_string())
        );
        assert!(controller.last_error().is_some());

        let retry = controller.retry().unwrap();
        assert_eq!(retry.filter, category("smartphones"));
        assert_eq!(controller.status(), &QueryStatus::Loading);

        let outcome = retry.run(&client).await;
        assert!(controller.complete(outcome));
        assert_eq!(controller.status(), &QueryStatus::Ready);
        assert_eq!(controller.result().total_matching, 3);
        assert!(controller.last_error().is_none());
    }
}
