//! Search and infinite-scroll pagination.
//!
//! The controller never performs I/O itself. Every fetch it wants is handed
//! out as a [`FetchTicket`]; the caller runs the fetch and passes the ticket
//! back with the result. A ticket is applied only while it is the one in
//! flight, so results of superseded queries are dropped on arrival.

use crate::error::{GalleryError, GalleryResult};
use crate::fetch::AssetFetchClient;
use crate::model::{Asset, FilterOptions, SearchPage, DEFAULT_SEARCH_QUERY};

/// Distance from the end of the rendered list at which the next page is
/// requested.
pub const SCROLL_THRESHOLD_PX: f64 = 500.0;

const FETCH_FAILED_MESSAGE: &str =
    "Failed to fetch assets. Please check your network and try again.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchPhase {
    Idle,
    Loading { page: u32 },
    Loaded { has_more: bool },
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub generation: u64,
    pub query: String,
    pub filters: FilterOptions,
    pub page: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    Applied,
    /// The ticket was superseded or never issued.
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMoreRejected {
    InFlight,
    Exhausted,
    NotLoaded,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub viewport_height: f64,
    pub content_height: f64,
}

impl ScrollMetrics {
    pub fn near_end(&self) -> bool {
        self.scroll_top + self.viewport_height >= self.content_height - SCROLL_THRESHOLD_PX
    }
}

#[derive(Debug)]
pub struct SearchController {
    query: String,
    filters: FilterOptions,
    generation: u64,
    phase: SearchPhase,
    results: Vec<Asset>,
    /// Last page that was applied for the current generation.
    loaded_page: u32,
    in_flight: Option<FetchTicket>,
}

impl Default for SearchController {
    fn default() -> Self {
        Self::new(String::new(), FilterOptions::default())
    }
}

impl SearchController {
    pub fn new(query: impl Into<String>, filters: FilterOptions) -> Self {
        Self {
            query: query.into().trim().to_string(),
            filters,
            generation: 0,
            phase: SearchPhase::Idle,
            results: Vec::new(),
            loaded_page: 0,
            in_flight: None,
        }
    }

    /// Query `synthwave` with the photo filter. Call [`refresh`](Self::refresh)
    /// to issue the first fetch.
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_SEARCH_QUERY, FilterOptions::app_default())
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn filters(&self) -> FilterOptions {
        self.filters
    }

    pub fn phase(&self) -> &SearchPhase {
        &self.phase
    }

    pub fn results(&self) -> &[Asset] {
        &self.results
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn set_query(&mut self, query: &str) -> Option<FetchTicket> {
        let query = query.trim();
        if query == self.query {
            return None;
        }
        self.query = query.to_string();
        self.refresh()
    }

    pub fn set_filters(&mut self, filters: FilterOptions) -> Option<FetchTicket> {
        if filters == self.filters {
            return None;
        }
        self.filters = filters;
        self.refresh()
    }

    /// Starts over at page 1 for the current query and filters. Any fetch in
    /// flight is superseded. A blank query goes back to `Idle` without a fetch.
    pub fn refresh(&mut self) -> Option<FetchTicket> {
        self.generation += 1;
        self.results.clear();
        self.loaded_page = 0;
        if let Some(stale) = self.in_flight.take() {
            tracing::debug!(
                generation = stale.generation,
                page = stale.page,
                "superseding in-flight search"
            );
        }
        if self.query.is_empty() {
            self.phase = SearchPhase::Idle;
            return None;
        }
        Some(self.issue(1))
    }

    pub fn request_more(&mut self) -> Result<FetchTicket, LoadMoreRejected> {
        if self.in_flight.is_some() {
            return Err(LoadMoreRejected::InFlight);
        }
        match self.phase {
            SearchPhase::Loaded { has_more: true } => Ok(self.issue(self.loaded_page + 1)),
            SearchPhase::Loaded { has_more: false } => Err(LoadMoreRejected::Exhausted),
            _ => Err(LoadMoreRejected::NotLoaded),
        }
    }

    pub fn on_scroll(&mut self, metrics: ScrollMetrics) -> Option<FetchTicket> {
        if !metrics.near_end() {
            return None;
        }
        self.request_more().ok()
    }

    /// Re-issues the page that failed.
    pub fn retry(&mut self) -> Option<FetchTicket> {
        if self.in_flight.is_some() || !matches!(self.phase, SearchPhase::Error { .. }) {
            return None;
        }
        Some(self.issue(self.loaded_page + 1))
    }

    fn issue(&mut self, page: u32) -> FetchTicket {
        let ticket = FetchTicket {
            generation: self.generation,
            query: self.query.clone(),
            filters: self.filters,
            page,
        };
        self.in_flight = Some(ticket.clone());
        self.phase = SearchPhase::Loading { page };
        ticket
    }

    pub fn complete(
        &mut self,
        ticket: &FetchTicket,
        result: GalleryResult<SearchPage>,
    ) -> CompletionOutcome {
        if self.in_flight.as_ref() != Some(ticket) {
            tracing::debug!(
                generation = ticket.generation,
                current = self.generation,
                page = ticket.page,
                "discarding stale search result"
            );
            return CompletionOutcome::Discarded;
        }
        self.in_flight = None;

        match result {
            Ok(page) => {
                if ticket.page <= 1 {
                    self.results = page.assets;
                } else {
                    self.results.extend(page.assets);
                }
                self.loaded_page = ticket.page;
                self.phase = SearchPhase::Loaded {
                    has_more: page.has_more,
                };
                tracing::debug!(
                    page = ticket.page,
                    total = self.results.len(),
                    has_more = page.has_more,
                    "search page applied"
                );
            }
            Err(err) => {
                tracing::warn!(page = ticket.page, "search failed: {}", err);
                self.phase = SearchPhase::Error {
                    message: fetch_error_message(&err),
                };
            }
        }
        CompletionOutcome::Applied
    }

    pub async fn fetch_and_apply<C>(&mut self, client: &C, ticket: FetchTicket) -> CompletionOutcome
    where
        C: AssetFetchClient + ?Sized,
    {
        let result = client
            .search(&ticket.query, ticket.filters, ticket.page)
            .await;
        self.complete(&ticket, result)
    }
}

fn fetch_error_message(err: &GalleryError) -> String {
    if err.is_network_or_provider() {
        FETCH_FAILED_MESSAGE.to_string()
    } else {
        err.user_message()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MockAssetFetchClient;
    use crate::model::{AssetSource, AssetType, Orientation, TypeFilter};
    use crate::sample_catalog::SampleCatalog;

    fn asset(id: String, tags: &[&str]) -> Asset {
        Asset {
            id,
            asset_type: AssetType::Photo,
            preview_url: "p".into(),
            large_image_url: "l".into(),
            author: "a".into(),
            source: AssetSource::Pixabay,
            license: "Pixabay License".into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            download_url: "d".into(),
        }
    }

    fn page_of(page: u32, count: usize, has_more: bool) -> SearchPage {
        SearchPage {
            assets: (0..count)
                .map(|i| asset(format!("{}-{}", page, i), &["x"]))
                .collect(),
            has_more,
        }
    }

    fn at_bottom() -> ScrollMetrics {
        ScrollMetrics {
            scroll_top: 1800.0,
            viewport_height: 800.0,
            content_height: 2600.0,
        }
    }

    #[tokio::test]
    async fn three_pages_accumulate_until_exhausted() {
        let mut client = MockAssetFetchClient::new();
        client
            .expect_search()
            .times(3)
            .returning(|_, _, page| match page {
                1 => Ok(page_of(1, 12, true)),
                2 => Ok(page_of(2, 12, true)),
                _ => Ok(page_of(3, 5, false)),
            });

        let mut controller = SearchController::with_defaults();
        let first = controller.refresh().unwrap();
        controller.fetch_and_apply(&client, first).await;

        for _ in 0..3 {
            if let Some(ticket) = controller.on_scroll(at_bottom()) {
                controller.fetch_and_apply(&client, ticket).await;
            }
        }

        assert_eq!(controller.results().len(), 29);
        assert_eq!(controller.phase(), &SearchPhase::Loaded { has_more: false });
        assert_eq!(controller.request_more(), Err(LoadMoreRejected::Exhausted));
    }

    #[tokio::test]
    async fn tag_filtering_client_returns_only_matching_assets() {
        let catalog = SampleCatalog::new(
            vec![
                asset("a".into(), &["synthwave", "neon"]),
                asset("b".into(), &["retro"]),
            ],
            Vec::new(),
            30,
        );
        let mut controller = SearchController::with_defaults();
        let ticket = controller.refresh().unwrap();
        assert_eq!(
            ticket.filters,
            FilterOptions::new(TypeFilter::Photo, Orientation::All)
        );
        controller.fetch_and_apply(&catalog, ticket).await;
        let ids: Vec<&str> = controller.results().iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[test]
    fn new_query_supersedes_the_in_flight_fetch() {
        let mut controller = SearchController::with_defaults();
        let old = controller.refresh().unwrap();
        let new = controller.set_query("galaxy").unwrap();
        assert!(new.generation > old.generation);

        let outcome = controller.complete(&old, Ok(page_of(1, 3, true)));
        assert_eq!(outcome, CompletionOutcome::Discarded);
        assert!(controller.results().is_empty());
        assert_eq!(controller.phase(), &SearchPhase::Loading { page: 1 });

        assert_eq!(
            controller.complete(&new, Ok(page_of(1, 2, false))),
            CompletionOutcome::Applied
        );
        assert_eq!(controller.results().len(), 2);
    }

    #[test]
    fn only_one_page_fetch_in_flight() {
        let mut controller = SearchController::with_defaults();
        let first = controller.refresh().unwrap();
        assert_eq!(controller.request_more(), Err(LoadMoreRejected::InFlight));
        controller.complete(&first, Ok(page_of(1, 12, true)));

        let second = controller.request_more().unwrap();
        assert_eq!(second.page, 2);
        assert_eq!(controller.on_scroll(at_bottom()), None);
    }

    #[test]
    fn failure_keeps_earlier_pages_and_retry_reissues() {
        let mut controller = SearchController::with_defaults();
        let first = controller.refresh().unwrap();
        controller.complete(&first, Ok(page_of(1, 12, true)));
        let second = controller.request_more().unwrap();
        controller.complete(&second, Err(GalleryError::provider(502, "bad gateway")));

        assert_eq!(controller.results().len(), 12);
        assert_eq!(
            controller.phase(),
            &SearchPhase::Error {
                message: FETCH_FAILED_MESSAGE.to_string()
            }
        );
        assert_eq!(controller.request_more(), Err(LoadMoreRejected::NotLoaded));

        let retried = controller.retry().unwrap();
        assert_eq!(retried.page, 2);
        assert_eq!(retried.generation, second.generation);
    }

    #[test]
    fn blank_and_unchanged_queries_do_not_fetch() {
        let mut controller = SearchController::with_defaults();
        let ticket = controller.refresh().unwrap();
        controller.complete(&ticket, Ok(page_of(1, 4, false)));

        assert_eq!(controller.set_query("  synthwave "), None);
        assert_eq!(controller.results().len(), 4);

        assert_eq!(controller.set_query("   "), None);
        assert_eq!(controller.phase(), &SearchPhase::Idle);
        assert!(controller.results().is_empty());
    }

    #[test]
    fn filter_change_restarts_at_page_one() {
        let mut controller = SearchController::with_defaults();
        let ticket = controller.refresh().unwrap();
        controller.complete(&ticket, Ok(page_of(1, 12, true)));

        let video = FilterOptions::new(TypeFilter::Video, Orientation::All);
        let restarted = controller.set_filters(video).unwrap();
        assert_eq!(restarted.page, 1);
        assert_eq!(restarted.filters, video);
        assert!(controller.results().is_empty());
        assert_eq!(controller.set_filters(video), None);
    }

    #[test]
    fn scroll_far_from_the_end_does_nothing() {
        let mut controller = SearchController::with_defaults();
        let ticket = controller.refresh().unwrap();
        controller.complete(&ticket, Ok(page_of(1, 12, true)));
        let metrics = ScrollMetrics {
            scroll_top: 0.0,
            viewport_height: 800.0,
            content_height: 4000.0,
        };
        assert_eq!(controller.on_scroll(metrics), None);
    }
}
