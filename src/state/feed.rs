// Paginated feed state.
// One page sequence, its sentinel viewport, and the task that drives it.

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::error::ClassifiedError;
use crate::query::{
    InfiniteQuery, ListViewport, PagePayload, PageSnapshot, QueryClient, QueryKey, Sentinel,
    run_scheduler,
};

use super::list::SelectableList;

/// A scrolling list fed page by page as its end comes into view.
///
/// Dropping the feed stops its scheduler. A filter change builds a new feed.
pub struct Feed<P: PagePayload> {
    pages: Arc<InfiniteQuery<P>>,
    viewport: Arc<ListViewport>,
    driver: JoinHandle<()>,
    pub list: SelectableList,
}

impl<P: PagePayload> Feed<P> {
    /// Must be called inside a tokio runtime.
    pub fn spawn<F, Fut>(client: QueryClient, prefix: QueryKey, fetch_page: F) -> Self
    where
        F: Fn(u32) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<P>, ClassifiedError>> + Send + 'static,
    {
        let sentinel = Sentinel::new(prefix.to_string());
        let pages = Arc::new(InfiniteQuery::new(client, prefix, fetch_page));
        let viewport = Arc::new(ListViewport::new(sentinel.clone()));
        let driver = tokio::spawn(run_scheduler(
            Arc::clone(&pages),
            viewport.clone(),
            sentinel,
        ));

        Self {
            pages,
            viewport,
            driver,
            list: SelectableList::new(),
        }
    }

    pub fn prefix(&self) -> &QueryKey {
        self.pages.prefix()
    }

    pub fn snapshot(&self) -> PageSnapshot<P> {
        self.pages.snapshot()
    }

    /// Number of loaded entries.
    pub fn len(&self) -> usize {
        self.pages
            .snapshot()
            .data
            .as_ref()
            .map_or(0, PagePayload::entry_count)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Report the rows drawn by the last frame.
    pub fn report_viewport(&self, offset: usize, height: usize) {
        self.viewport.report(offset, height, self.len());
    }

    /// The feed is off screen; its sentinel cannot be visible.
    pub fn hide(&self) {
        self.viewport.report(0, 0, self.len());
    }

    pub fn select_next(&mut self) {
        let len = self.len();
        self.list.select_next(len);
    }

    pub fn select_prev(&mut self) {
        let len = self.len();
        self.list.select_prev(len);
    }
}

impl<P: PagePayload> Drop for Feed<P> {
    fn drop(&mut self) {
        self.driver.abort();
    }
}
