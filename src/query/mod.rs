// Query layer.
// Cached reads, paginated reads, viewport triggering, and mutations.

pub mod client;
pub mod infinite;
pub mod key;
pub mod mutation;
pub mod state;
pub mod viewport;

pub use client::{QueryClient, QueryOptions};
pub use infinite::{InfiniteQuery, PagePayload, PagePhase, PageSnapshot};
pub use key::{KeySegment, QueryKey};
pub use mutation::{
    DeletePhoto, Mutation, MutationCallbacks, MutationExecutor, SearchPhotos, UpdatePhoto,
    UploadPhoto,
};
pub use state::{QueryState, QueryStatus};
pub use viewport::{
    ListViewport, Sentinel, ViewportScheduler, Visibility, VisibilityObserver, run_scheduler,
};
