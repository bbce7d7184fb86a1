// Viewport-driven pagination.
// Fetches the next page when a sentinel past the last item becomes visible.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream::{self, BoxStream};
use tokio::sync::watch;
use tracing::debug;

use super::infinite::{InfiniteQuery, PagePayload, PageSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    Visible,
    #[default]
    Hidden,
}

/// Marker placed after the last loaded item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sentinel(pub String);

impl Sentinel {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

/// Visibility detection provided by the host.
pub trait VisibilityObserver: Send + Sync {
    /// Stream of visibility changes for `sentinel`, starting with the current one.
    fn observe(&self, sentinel: &Sentinel) -> BoxStream<'static, Visibility>;
}

/// Decides when the sentinel should pull the next page.
///
/// At most one request is outstanding: after asking for a page the
/// scheduler waits until a fetch settles before asking again. A visibility
/// reading only counts for the page state it was taken against; once a page
/// settles the observer has to report the sentinel visible again.
#[derive(Debug, Clone, Default)]
pub struct ViewportScheduler {
    /// Settled count current when the sentinel was last seen visible.
    visible_at: Option<u64>,
    requested: bool,
    seen_settled: u64,
}

impl ViewportScheduler {
    pub fn new<P>(snapshot: &PageSnapshot<P>) -> Self {
        Self {
            seen_settled: snapshot.settled,
            ..Self::default()
        }
    }

    /// The sentinel's visibility was re-evaluated against `snapshot`.
    pub fn on_visibility<P>(&mut self, visibility: Visibility, snapshot: &PageSnapshot<P>) -> bool {
        self.visible_at = match visibility {
            Visibility::Visible => Some(snapshot.settled),
            Visibility::Hidden => None,
        };
        self.evaluate(snapshot)
    }

    /// The page query published a new snapshot.
    ///
    /// Each settled fetch re-arms the scheduler. It fires here only when the
    /// sentinel was already reported visible over the settled rows. A failed
    /// page does not re-fire by itself; the next visibility change retries it.
    pub fn on_snapshot<P>(&mut self, snapshot: &PageSnapshot<P>) -> bool {
        if snapshot.settled <= self.seen_settled {
            return false;
        }
        self.seen_settled = snapshot.settled;
        self.requested = false;

        if snapshot.error.is_some() {
            return false;
        }
        self.evaluate(snapshot)
    }

    fn evaluate<P>(&mut self, snapshot: &PageSnapshot<P>) -> bool {
        let visible = self.visible_at == Some(snapshot.settled);
        let fire = visible && !self.requested && !snapshot.is_fetching && !snapshot.is_last;
        if fire {
            self.requested = true;
        }
        fire
    }
}

/// Drive `pages` from the sentinel's visibility until the observer stops.
pub async fn run_scheduler<P: PagePayload>(
    pages: Arc<InfiniteQuery<P>>,
    observer: Arc<dyn VisibilityObserver>,
    sentinel: Sentinel,
) {
    let mut visibility = observer.observe(&sentinel);
    let mut snapshots = pages.subscribe();
    let initial = snapshots.borrow_and_update().clone();
    let mut scheduler = ViewportScheduler::new(&initial);

    loop {
        let fire = tokio::select! {
            event = visibility.next() => match event {
                Some(event) => scheduler.on_visibility(event, &pages.snapshot()),
                None => break,
            },
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                scheduler.on_snapshot(&snapshot)
            }
        };

        if fire {
            debug!(sentinel = %sentinel.0, prefix = %pages.prefix(), "sentinel visible, fetching next page");
            let pages = Arc::clone(&pages);
            tokio::spawn(async move {
                pages.fetch_next().await;
            });
        }
    }
    debug!(sentinel = %sentinel.0, "scheduler stopped");
}

/// Sentinel visibility for a scrolling terminal list.
///
/// The list renderer reports the drawn window after every frame; the
/// sentinel is the row one past the last item. A report is passed on when
/// the visibility or the item count changed, so every page that lands is
/// re-checked against the rows it added.
pub struct ListViewport {
    sentinel: Sentinel,
    state: watch::Sender<(Visibility, usize)>,
}

impl ListViewport {
    pub fn new(sentinel: Sentinel) -> Self {
        let (state, _) = watch::channel((Visibility::Hidden, 0));
        Self { sentinel, state }
    }

    pub fn sentinel(&self) -> &Sentinel {
        &self.sentinel
    }

    /// Record which rows were drawn: `height` rows starting at `offset`.
    pub fn report(&self, offset: usize, height: usize, item_count: usize) {
        let visibility = if (offset..offset + height).contains(&item_count) {
            Visibility::Visible
        } else {
            Visibility::Hidden
        };
        let next = (visibility, item_count);

        self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    pub fn visibility(&self) -> Visibility {
        self.state.borrow().0
    }
}

impl VisibilityObserver for ListViewport {
    fn observe(&self, sentinel: &Sentinel) -> BoxStream<'static, Visibility> {
        if *sentinel != self.sentinel {
            return stream::empty().boxed();
        }

        let rx = self.state.subscribe();
        stream::unfold((rx, true), |(mut rx, first)| async move {
            if !first {
                rx.changed().await.ok()?;
            }
            let (visibility, _) = *rx.borrow_and_update();
            Some((visibility, (rx, false)))
        })
        .boxed()
    }
}
