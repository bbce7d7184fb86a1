// Mutation executor.
// Uncached effectful calls that report their outcome to the caller.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::api::{ApiClient, MetadataUpdateRequest, MetadataWithName, SearchRequest, UploadRequest};
use crate::error::ClassifiedError;

/// An effectful API call with a typed result.
pub trait Mutation: Send + 'static {
    type Output: Send + 'static;

    /// Short label used in logs.
    fn describe(&self) -> String;

    fn run(self, api: ApiClient) -> BoxFuture<'static, Result<Self::Output, ClassifiedError>>;
}

/// Upload a photo with its metadata; yields the stored name.
#[derive(Debug, Clone)]
pub struct UploadPhoto(pub UploadRequest);

impl Mutation for UploadPhoto {
    type Output = String;

    fn describe(&self) -> String {
        format!("upload {}", self.0.name)
    }

    fn run(self, api: ApiClient) -> BoxFuture<'static, Result<String, ClassifiedError>> {
        async move { api.upload_photo(&self.0).await }.boxed()
    }
}

/// Replace the tags and description of a photo.
#[derive(Debug, Clone)]
pub struct UpdatePhoto {
    pub name: String,
    pub request: MetadataUpdateRequest,
}

impl Mutation for UpdatePhoto {
    type Output = ();

    fn describe(&self) -> String {
        format!("update {}", self.name)
    }

    fn run(self, api: ApiClient) -> BoxFuture<'static, Result<(), ClassifiedError>> {
        async move { api.update_photo(&self.name, &self.request).await }.boxed()
    }
}

#[derive(Debug, Clone)]
pub struct DeletePhoto {
    pub name: String,
}

impl Mutation for DeletePhoto {
    type Output = ();

    fn describe(&self) -> String {
        format!("delete {}", self.name)
    }

    fn run(self, api: ApiClient) -> BoxFuture<'static, Result<(), ClassifiedError>> {
        async move { api.delete_photo(&self.name).await }.boxed()
    }
}

/// Full-text search. Issued as a POST and never cached.
#[derive(Debug, Clone)]
pub struct SearchPhotos(pub SearchRequest);

impl Mutation for SearchPhotos {
    type Output = Vec<MetadataWithName>;

    fn describe(&self) -> String {
        format!("search {:?}", self.0.token)
    }

    fn run(self, api: ApiClient) -> BoxFuture<'static, Result<Self::Output, ClassifiedError>> {
        async move { api.search(&self.0).await }.boxed()
    }
}

type SuccessFn<T> = Box<dyn FnOnce(T) + Send>;
type ErrorFn = Box<dyn FnOnce(ClassifiedError) + Send>;

/// Outcome handlers for [`MutationExecutor::mutate`].
pub struct MutationCallbacks<T> {
    pub on_success: SuccessFn<T>,
    pub on_error: ErrorFn,
}

impl<T> MutationCallbacks<T> {
    pub fn new(
        on_success: impl FnOnce(T) + Send + 'static,
        on_error: impl FnOnce(ClassifiedError) + Send + 'static,
    ) -> Self {
        Self {
            on_success: Box::new(on_success),
            on_error: Box::new(on_error),
        }
    }
}

/// One outstanding call, counted until it is dropped.
///
/// Dropping `execute` mid-await (an aborted `mutate` task) still releases it.
struct PendingCall(Arc<AtomicUsize>);

impl PendingCall {
    fn start(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for PendingCall {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Runs mutations against the API.
///
/// Holds no cache and never invalidates queries. Unauthorized responses are
/// plain errors here; no login redirect happens. Overlapping calls are the
/// caller's concern, [`pending`](Self::pending) tells it whether one is out.
#[derive(Clone)]
pub struct MutationExecutor {
    api: ApiClient,
    pending: Arc<AtomicUsize>,
}

impl MutationExecutor {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub async fn execute<M: Mutation>(&self, mutation: M) -> Result<M::Output, ClassifiedError> {
        let label = mutation.describe();
        let call = PendingCall::start(&self.pending);
        let result = mutation.run(self.api.clone()).await;
        drop(call);

        match &result {
            Ok(_) => info!(mutation = %label, "mutation succeeded"),
            Err(e) => warn!(mutation = %label, kind = %e.kind, status = ?e.status, "mutation failed"),
        }
        result
    }

    /// Run `mutation` in the background and hand its outcome to `callbacks`.
    pub fn mutate<M: Mutation>(&self, mutation: M, callbacks: MutationCallbacks<M::Output>) -> JoinHandle<()> {
        let executor = self.clone();
        tokio::spawn(async move {
            match executor.execute(mutation).await {
                Ok(output) => (callbacks.on_success)(output),
                Err(error) => (callbacks.on_error)(error),
            }
        })
    }

    /// Number of mutations currently awaiting a response.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}
