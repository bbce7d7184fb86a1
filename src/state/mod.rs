// State management module.
// Feeds, selections, forms, and the data shown by each tab.

pub mod feed;
pub mod form;
pub mod list;
pub mod photos;

pub use feed::Feed;
pub use form::{Form, FormField};
pub use list::{LoadingState, SelectableList};
pub use photos::{DetailState, SearchState, SessionState, update_request, upload_form, upload_request};
