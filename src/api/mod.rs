// Photo API module.
// Transport, response classification, endpoints, and payload types.

pub mod client;
pub mod endpoints;
pub mod navigator;
#[cfg(test)]
pub mod testing;
pub mod transport;
pub mod types;

pub use client::ApiClient;
pub use navigator::{Navigator, SessionNavigator, login_url};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, RequestBody, Transport};
pub use types::*;
