// Paginated queries.
// Fetches pages in index order through the query cache and accumulates them.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::ClassifiedError;

use super::client::{QueryClient, QueryOptions};
use super::key::QueryKey;
use super::state::{QueryState, QueryStatus};

/// A page payload that can be folded into an accumulated result.
///
/// Implemented for lists (concatenated in page order) and maps (union by
/// key, later pages win on collision).
pub trait PagePayload: Clone + Default + Send + Sync + 'static {
    fn entry_count(&self) -> usize;

    fn absorb(&mut self, page: Self);
}

impl<T> PagePayload for Vec<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn entry_count(&self) -> usize {
        self.len()
    }

    fn absorb(&mut self, mut page: Self) {
        self.append(&mut page);
    }
}

impl<K, V> PagePayload for BTreeMap<K, V>
where
    K: Ord + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn entry_count(&self) -> usize {
        self.len()
    }

    fn absorb(&mut self, page: Self) {
        self.extend(page);
    }
}

/// Where a paginated query is in its page sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagePhase {
    Empty,
    FetchingPage(u32),
    HasPages { pages: u32, is_last: bool },
}

/// Read model published after every transition.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSnapshot<P> {
    /// Accumulated result; `None` until the first page resolves.
    pub data: Option<P>,
    pub is_fetching: bool,
    pub is_last: bool,
    /// Number of pages resolved so far.
    pub pages: u32,
    /// Number of page fetches that have settled, successfully or not.
    /// A fetch dropped before it resolves also counts.
    pub settled: u64,
    pub error: Option<ClassifiedError>,
}

impl<P> Default for PageSnapshot<P> {
    fn default() -> Self {
        Self {
            data: None,
            is_fetching: false,
            is_last: false,
            pages: 0,
            settled: 0,
            error: None,
        }
    }
}

struct Pages<P> {
    accumulated: Option<P>,
    pages: u32,
    is_last: bool,
    fetching: Option<u32>,
    settled: u64,
    error: Option<ClassifiedError>,
}

impl<P: Clone> Pages<P> {
    fn phase(&self) -> PagePhase {
        match self.fetching {
            Some(index) => PagePhase::FetchingPage(index),
            None if self.pages == 0 && self.accumulated.is_none() => PagePhase::Empty,
            None => PagePhase::HasPages {
                pages: self.pages,
                is_last: self.is_last,
            },
        }
    }

    fn snapshot(&self) -> PageSnapshot<P> {
        PageSnapshot {
            data: self.accumulated.clone(),
            is_fetching: self.fetching.is_some(),
            is_last: self.is_last,
            pages: self.pages,
            settled: self.settled,
            error: self.error.clone(),
        }
    }
}

/// Releases the page slot when `fetch_next` is dropped mid-fetch, so the
/// same index can be requested again.
struct InFlightPage<'a, P: PagePayload> {
    query: &'a InfiniteQuery<P>,
    index: u32,
    done: bool,
}

impl<P: PagePayload> Drop for InFlightPage<'_, P> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        let mut pages = self.query.lock();
        if pages.fetching == Some(self.index) {
            debug!(prefix = %self.query.prefix, page = self.index, "page fetch cancelled");
            pages.fetching = None;
            pages.settled += 1;
            self.query.publish(&pages);
        }
    }
}

type PageFetcher<P> =
    Arc<dyn Fn(u32) -> BoxFuture<'static, Result<Option<P>, ClassifiedError>> + Send + Sync>;

/// One page sequence for one key prefix.
///
/// Page `n` is cached under `prefix + [n]`. Changing a filter means building
/// a new `InfiniteQuery` with a new prefix; an existing accumulation is never
/// reset in place.
pub struct InfiniteQuery<P: PagePayload> {
    prefix: QueryKey,
    client: QueryClient,
    fetch_page: PageFetcher<P>,
    options: QueryOptions,
    pages: Mutex<Pages<P>>,
    snapshots: watch::Sender<PageSnapshot<P>>,
}

impl<P: PagePayload> InfiniteQuery<P> {
    pub fn new<F, Fut>(client: QueryClient, prefix: QueryKey, fetch_page: F) -> Self
    where
        F: Fn(u32) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<P>, ClassifiedError>> + Send + 'static,
    {
        let (snapshots, _) = watch::channel(PageSnapshot::default());
        Self {
            prefix,
            client,
            fetch_page: Arc::new(move |index| fetch_page(index).boxed()),
            options: QueryOptions::default(),
            pages: Mutex::new(Pages {
                accumulated: None,
                pages: 0,
                is_last: false,
                fetching: None,
                settled: 0,
                error: None,
            }),
            snapshots,
        }
    }

    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn prefix(&self) -> &QueryKey {
        &self.prefix
    }

    pub fn phase(&self) -> PagePhase {
        self.lock().phase()
    }

    pub fn snapshot(&self) -> PageSnapshot<P> {
        self.snapshots.borrow().clone()
    }

    /// Watch the read model; every page transition publishes a new snapshot.
    pub fn subscribe(&self) -> watch::Receiver<PageSnapshot<P>> {
        self.snapshots.subscribe()
    }

    /// Fetch the next page.
    ///
    /// Does nothing while a page is in flight or after the last page was
    /// seen. Returns whether a page was requested.
    pub async fn fetch_next(&self) -> bool {
        let index = {
            let mut pages = self.lock();
            let index = match pages.phase() {
                PagePhase::Empty => 0,
                PagePhase::FetchingPage(index) => {
                    debug!(prefix = %self.prefix, page = index, "page already in flight");
                    return false;
                }
                PagePhase::HasPages { is_last: true, .. } => return false,
                PagePhase::HasPages { pages, .. } => pages,
            };
            pages.fetching = Some(index);
            pages.error = None;
            self.publish(&pages);
            index
        };
        let mut in_flight = InFlightPage {
            query: self,
            index,
            done: false,
        };

        let fetch_page = Arc::clone(&self.fetch_page);
        let state: QueryState<P> = self
            .client
            .query(
                self.prefix.with_page(index),
                move || fetch_page(index),
                self.options,
            )
            .await;
        in_flight.done = true;

        let mut pages = self.lock();
        pages.fetching = None;
        pages.settled += 1;
        match state.status {
            QueryStatus::Success => {
                let page = state.data.unwrap_or_default();
                let entries = page.entry_count();
                pages
                    .accumulated
                    .get_or_insert_with(P::default)
                    .absorb(page);
                pages.pages = index + 1;
                pages.is_last = entries == 0;
                info!(prefix = %self.prefix, page = index, entries, is_last = pages.is_last, "page loaded");
            }
            QueryStatus::Error => {
                warn!(prefix = %self.prefix, page = index, "page fetch failed");
                pages.error = state.error;
            }
            QueryStatus::Idle | QueryStatus::Loading => {}
        }
        self.publish(&pages);
        true
    }

    fn publish(&self, pages: &Pages<P>) {
        self.snapshots.send_replace(pages.snapshot());
    }

    fn lock(&self) -> MutexGuard<'_, Pages<P>> {
        self.pages.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::scripted_client;
    use crate::api::{ApiClient, ApiResponse, MetadataWithName, TagsWithSample};
    use crate::error::ErrorKind;
    use reqwest::StatusCode;
    use serde_json::json;

    fn item(name: &str) -> serde_json::Value {
        json!({
            "creatorEmail": "a@example.com",
            "createdAt": "2023-01-02T03:04:05Z",
            "tags": ["cat"],
            "description": "",
            "name": name
        })
    }

    fn items(prefix: &str, count: usize) -> serde_json::Value {
        json!((0..count)
            .map(|i| item(&format!("{}{}.png", prefix, i)))
            .collect::<Vec<_>>())
    }

    fn all_photos(api: &ApiClient, client: &QueryClient) -> InfiniteQuery<Vec<MetadataWithName>> {
        let api = api.clone();
        InfiniteQuery::new(client.clone(), QueryKey::named("metadatas"), move |page| {
            let api = api.clone();
            async move { api.metadatas(page).await }
        })
    }

    fn names(snapshot: &PageSnapshot<Vec<MetadataWithName>>) -> Vec<String> {
        snapshot
            .data
            .iter()
            .flatten()
            .map(|m| m.name.clone())
            .collect()
    }

    #[tokio::test]
    async fn test_empty_page_ends_sequence() {
        let (api, transport, _) = scripted_client("/photo");
        transport.respond("GET /api/metadatas?page=0", StatusCode::OK, items("a", 20));
        transport.respond("GET /api/metadatas?page=1", StatusCode::OK, json!([]));
        let pages = all_photos(&api, &QueryClient::new());

        assert_eq!(pages.phase(), PagePhase::Empty);
        assert!(pages.fetch_next().await);
        assert!(!pages.snapshot().is_last);

        assert!(pages.fetch_next().await);
        let snapshot = pages.snapshot();
        assert_eq!(snapshot.data.as_ref().map(Vec::len), Some(20));
        assert!(snapshot.is_last);
        assert_eq!(snapshot.pages, 2);
        assert_eq!(pages.phase(), PagePhase::HasPages { pages: 2, is_last: true });

        assert!(!pages.fetch_next().await);
        assert_eq!(transport.calls("GET /api/metadatas?page=2"), 0);
    }

    #[tokio::test]
    async fn test_list_pages_concatenate_in_order() {
        let (api, transport, _) = scripted_client("/photo");
        transport.respond("GET /api/metadatas?page=0", StatusCode::OK, items("a", 2));
        transport.respond("GET /api/metadatas?page=1", StatusCode::OK, items("b", 2));
        let pages = all_photos(&api, &QueryClient::new());

        pages.fetch_next().await;
        pages.fetch_next().await;

        assert_eq!(names(&pages.snapshot()), vec!["a0.png", "a1.png", "b0.png", "b1.png"]);
        assert!(!pages.snapshot().is_last);
    }

    #[tokio::test]
    async fn test_map_pages_union() {
        let (api, transport, _) = scripted_client("/tag");
        transport.respond(
            "GET /api/tags-with-sample?page=0",
            StatusCode::OK,
            json!({ "t1": item("m1.png") }),
        );
        transport.respond(
            "GET /api/tags-with-sample?page=1",
            StatusCode::OK,
            json!({ "t2": item("m2.png") }),
        );
        transport.respond("GET /api/tags-with-sample?page=2", StatusCode::OK, json!({}));

        let fetcher = api.clone();
        let pages: InfiniteQuery<TagsWithSample> = InfiniteQuery::new(
            QueryClient::new(),
            QueryKey::named("tags-with-sample"),
            move |page| {
                let api = fetcher.clone();
                async move { api.tags_with_sample(page).await }
            },
        );

        while pages.fetch_next().await {}

        let tags = pages.snapshot().data.unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags["t1"].name, "m1.png");
        assert_eq!(tags["t2"].name, "m2.png");
        assert!(pages.snapshot().is_last);
    }

    #[tokio::test]
    async fn test_next_page_waits_for_current() {
        let (api, transport, _) = scripted_client("/photo");
        let release = transport.hold("GET /api/metadatas?page=0");
        let pages = all_photos(&api, &QueryClient::new());

        let first = pages.fetch_next();
        let second = async {
            tokio::task::yield_now().await;
            assert_eq!(pages.phase(), PagePhase::FetchingPage(0));
            assert!(pages.snapshot().is_fetching);
            assert!(pages.snapshot().data.is_none());
            let issued = pages.fetch_next().await;
            release
                .send(ApiResponse::new(StatusCode::OK, serde_json::to_vec(&items("a", 1)).unwrap()))
                .unwrap();
            issued
        };

        let (first, second) = tokio::join!(first, second);
        assert!(first);
        assert!(!second);
        assert_eq!(transport.calls("GET /api/metadatas?page=1"), 0);
        assert_eq!(pages.snapshot().pages, 1);
    }

    #[tokio::test]
    async fn test_cancelled_fetch_can_be_requested_again() {
        let (api, transport, _) = scripted_client("/photo");
        let release = transport.hold("GET /api/metadatas?page=0");
        let pages = all_photos(&api, &QueryClient::new());

        let cancelled =
            tokio::time::timeout(std::time::Duration::from_millis(20), pages.fetch_next()).await;
        assert!(cancelled.is_err());
        assert_eq!(pages.phase(), PagePhase::Empty);
        assert!(!pages.snapshot().is_fetching);
        assert_eq!(pages.snapshot().settled, 1);

        release
            .send(ApiResponse::new(StatusCode::OK, serde_json::to_vec(&items("a", 2)).unwrap()))
            .unwrap();
        assert!(pages.fetch_next().await);

        assert_eq!(names(&pages.snapshot()), vec!["a0.png", "a1.png"]);
        assert_eq!(pages.phase(), PagePhase::HasPages { pages: 1, is_last: false });
        assert_eq!(transport.calls("GET /api/metadatas?page=0"), 1);
    }

    #[tokio::test]
    async fn test_failed_page_keeps_accumulation_and_retries() {
        let (api, transport, _) = scripted_client("/photo");
        transport.respond("GET /api/metadatas?page=0", StatusCode::OK, items("a", 1));
        transport.respond_empty("GET /api/metadatas?page=1", StatusCode::INTERNAL_SERVER_ERROR);
        transport.respond("GET /api/metadatas?page=1", StatusCode::OK, items("b", 1));
        let pages = all_photos(&api, &QueryClient::new());

        pages.fetch_next().await;
        pages.fetch_next().await;

        let snapshot = pages.snapshot();
        assert_eq!(snapshot.error.as_ref().map(|e| e.kind), Some(ErrorKind::Transport));
        assert_eq!(names(&snapshot), vec!["a0.png"]);
        assert_eq!(snapshot.pages, 1);

        pages.fetch_next().await;
        let snapshot = pages.snapshot();
        assert!(snapshot.error.is_none());
        assert_eq!(names(&snapshot), vec!["a0.png", "b0.png"]);
        assert_eq!(transport.calls("GET /api/metadatas?page=1"), 2);
    }

    #[tokio::test]
    async fn test_absent_first_page_is_terminal_and_empty() {
        let (api, transport, _) = scripted_client("/photo");
        transport.respond_empty("GET /api/metadatas?page=0", StatusCode::NOT_FOUND);
        let pages = all_photos(&api, &QueryClient::new());

        pages.fetch_next().await;

        let snapshot = pages.snapshot();
        assert_eq!(snapshot.data, Some(Vec::new()));
        assert!(snapshot.is_last);
    }

    #[tokio::test]
    async fn test_new_prefix_starts_fresh() {
        let (api, transport, _) = scripted_client("/photos-by-tag/cat");
        transport.respond("GET /api/metadatas-by-tag?tag=cat&page=0", StatusCode::OK, items("c", 1));
        transport.respond("GET /api/metadatas-by-tag?tag=cat&page=1", StatusCode::OK, json!([]));
        transport.respond("GET /api/metadatas-by-tag?tag=dog&page=0", StatusCode::OK, items("d", 1));
        let client = QueryClient::new();

        let by_tag = |tag: &str| {
            let api = api.clone();
            let tag = tag.to_string();
            InfiniteQuery::new(
                client.clone(),
                QueryKey::named("metadatas-by-tag").with(tag.clone()),
                move |page| {
                    let api = api.clone();
                    let tag = tag.clone();
                    async move { api.metadatas_by_tag(&tag, page).await }
                },
            )
        };

        let cats = by_tag("cat");
        while cats.fetch_next().await {}
        assert!(cats.snapshot().is_last);

        let dogs = by_tag("dog");
        assert_eq!(dogs.phase(), PagePhase::Empty);
        dogs.fetch_next().await;
        assert_eq!(names(&dogs.snapshot()), vec!["d0.png"]);
        assert!(!dogs.snapshot().is_last);
        assert_eq!(names(&cats.snapshot()), vec!["c0.png"]);
    }

    #[tokio::test]
    async fn test_subscribers_see_each_transition() {
        let (api, transport, _) = scripted_client("/photo");
        transport.respond("GET /api/metadatas?page=0", StatusCode::OK, items("a", 1));
        let pages = all_photos(&api, &QueryClient::new());
        let mut rx = pages.subscribe();

        pages.fetch_next().await;

        assert!(rx.has_changed().unwrap());
        let snapshot = rx.borrow_and_update().clone();
        assert!(!snapshot.is_fetching);
        assert_eq!(snapshot.pages, 1);
    }
}
