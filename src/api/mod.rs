// src/api/mod.rs
//! Notion API interaction: authenticated requests, retries and pagination.
//!
//! Layers, bottom up:
//! - [`HttpBackend`] moves a [`WireRequest`] over the network and nothing else
//! - [`Transport`] adds deadlines, status interpretation and retries
//! - [`Paginator`] walks cursor-paginated listings lazily
//! - [`parser`] turns response JSON into domain values

pub mod client;
pub mod pagination;
pub mod parser;
pub mod transport;
pub mod types;

/// The ability to exchange one request with the Notion API.
///
/// Everything above this trait depends on it, never on reqwest, so tests
/// can script responses without a network.
#[async_trait::async_trait]
pub trait HttpBackend: Send + Sync {
    async fn execute(&self, request: &WireRequest) -> Result<WireResponse, BackendFailure>;
}

// Re-export the public interface
pub use client::NotionHttpClient;
pub use pagination::{FetchBatch, Paginator};
pub use transport::Transport;
pub use types::{BackendFailure, Batch, Cursor, PaginatedResponse, WireRequest, WireResponse};
