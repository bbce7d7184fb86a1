// Terminal client for the photo API.
// Cached and paginated reads, uncached mutations, and the TUI on top.

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod query;
pub mod state;
pub mod ui;
