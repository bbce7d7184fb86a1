// Query cache core.
// Keyed results with in-flight deduplication, retry policy, and invalidation.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::ClassifiedError;

use super::key::QueryKey;
use super::state::{QueryState, QueryStatus};

type AnyValue = Arc<dyn Any + Send + Sync>;
type FetchResult = Result<Option<AnyValue>, ClassifiedError>;
type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

/// Per-query policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// Fetch again when the cached state is an error.
    pub retry: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self { retry: true }
    }
}

impl QueryOptions {
    pub fn no_retry() -> Self {
        Self { retry: false }
    }
}

struct Slot {
    state: QueryState<AnyValue>,
    /// Identifies the fetch allowed to write this slot.
    generation: u64,
    in_flight: Option<SharedFetch>,
}

impl Slot {
    fn empty() -> Self {
        Self {
            state: QueryState::idle(),
            generation: 0,
            in_flight: None,
        }
    }
}

/// Store of query states, one per [`QueryKey`].
///
/// Clones share the same store. Construct one per application; tests build
/// their own.
#[derive(Clone)]
pub struct QueryClient {
    slots: Arc<DashMap<QueryKey, Slot>>,
    generation: Arc<AtomicU64>,
    changes: broadcast::Sender<QueryKey>,
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryClient {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            slots: Arc::new(DashMap::new()),
            generation: Arc::new(AtomicU64::new(0)),
            changes,
        }
    }

    /// Resolve the query stored under `key`.
    ///
    /// A cached success is returned as is. A missing slot, or an error slot
    /// when `options.retry` is set, runs `fetch`. While a fetch for `key` is
    /// in flight every caller awaits that same fetch; `fetch` is not called.
    pub async fn query<T, F, Fut>(
        &self,
        key: QueryKey,
        fetch: F,
        options: QueryOptions,
    ) -> QueryState<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, ClassifiedError>> + Send + 'static,
    {
        let pending = match self.slots.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                let slot = entry.get_mut();
                if let Some(in_flight) = &slot.in_flight {
                    debug!(%key, "attaching to in-flight query");
                    in_flight.clone()
                } else {
                    let reusable = match slot.state.status {
                        QueryStatus::Success => true,
                        QueryStatus::Error => !options.retry,
                        QueryStatus::Idle | QueryStatus::Loading => false,
                    };
                    match downcast_state::<T>(&slot.state) {
                        Some(state) if reusable => {
                            debug!(%key, status = ?state.status, "query cache hit");
                            return state;
                        }
                        _ => self.start(&key, slot, fetch()),
                    }
                }
            }
            Entry::Vacant(entry) => {
                let mut slot = entry.insert(Slot::empty());
                self.start(&key, &mut slot, fetch())
            }
        };

        match pending.await {
            Ok(data) => match data.map(|value| value.downcast_ref::<T>().cloned()) {
                Some(None) => {
                    warn!(%key, "cached value has a different type");
                    QueryState::failure(ClassifiedError::transport(
                        None,
                        format!("type mismatch for query {}", key),
                    ))
                }
                Some(value) => QueryState::success(value),
                None => QueryState::success(None),
            },
            Err(error) => QueryState::failure(error),
        }
    }

    fn start<T, Fut>(&self, key: &QueryKey, slot: &mut Slot, fetch: Fut) -> SharedFetch
    where
        T: Send + Sync + 'static,
        Fut: Future<Output = Result<Option<T>, ClassifiedError>> + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let slots = Arc::clone(&self.slots);
        let changes = self.changes.clone();
        let owned_key = key.clone();

        let shared = async move {
            let result: FetchResult = fetch
                .await
                .map(|data| data.map(|value| Arc::new(value) as AnyValue));

            let stored = match slots.get_mut(&owned_key) {
                Some(mut slot) if slot.generation == generation => {
                    slot.state = QueryState::from_result(result.clone());
                    slot.in_flight = None;
                    true
                }
                _ => false,
            };

            if stored {
                match &result {
                    Ok(_) => debug!(key = %owned_key, "query settled"),
                    Err(e) => warn!(key = %owned_key, kind = %e.kind, "query failed"),
                }
                let _ = changes.send(owned_key);
            } else {
                debug!(key = %owned_key, "discarding result of invalidated query");
            }
            result
        }
        .boxed()
        .shared();

        debug!(%key, generation, "fetching query");
        slot.state = QueryState::loading();
        slot.generation = generation;
        slot.in_flight = Some(shared.clone());
        shared
    }

    /// Current state of `key` without fetching.
    pub fn peek<T: Clone + 'static>(&self, key: &QueryKey) -> QueryState<T> {
        self.slots
            .get(key)
            .and_then(|slot| downcast_state(&slot.state))
            .unwrap_or_default()
    }

    /// Drop the state stored under `key`; the next query fetches again.
    ///
    /// A fetch already in flight is not cancelled. Its result is discarded,
    /// but until it resolves a new query for `key` runs a second request
    /// alongside it, so one key can briefly have two requests out.
    pub fn invalidate(&self, key: &QueryKey) {
        if self.slots.remove(key).is_some() {
            debug!(%key, "invalidated query");
            let _ = self.changes.send(key.clone());
        }
    }

    /// Drop every key that starts with `prefix`.
    pub fn invalidate_prefix(&self, prefix: &QueryKey) {
        let keys: Vec<QueryKey> = self
            .slots
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect();

        for key in keys {
            self.invalidate(&key);
        }
    }

    /// Receive the key of every slot that settled or was invalidated.
    pub fn subscribe(&self) -> broadcast::Receiver<QueryKey> {
        self.changes.subscribe()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

fn downcast_state<T: Clone + 'static>(state: &QueryState<AnyValue>) -> Option<QueryState<T>> {
    let data = match &state.data {
        Some(value) => Some(value.downcast_ref::<T>()?.clone()),
        None => None,
    };
    Some(QueryState {
        status: state.status,
        data,
        error: state.error.clone(),
        last_updated: state.last_updated,
    })
}
