// src/api/types.rs
//! Wire-level types shared by the transport and the pagination layer.

use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

// --- Request / response ---

/// One HTTP exchange as the transport sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct WireRequest {
    pub method: Method,
    /// Endpoint path relative to the API base, query string included.
    pub path: String,
    pub body: Option<Value>,
    /// Whether repeating the request is harmless. Reads are idempotent even
    /// when they are POSTs (database queries, search).
    pub idempotent: bool,
}

impl WireRequest {
    pub fn read(method: Method, path: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            method,
            path: path.into(),
            body,
            idempotent: true,
        }
    }

    pub fn write(method: Method, path: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            method,
            path: path.into(),
            body,
            idempotent: false,
        }
    }
}

/// Raw response handed back by an [`HttpBackend`](super::HttpBackend).
#[derive(Debug, Clone, PartialEq)]
pub struct WireResponse {
    pub status: u16,
    /// Parsed `Retry-After` header, when present.
    pub retry_after: Option<Duration>,
    pub body: String,
}

impl WireResponse {
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            retry_after: None,
            body: body.to_string(),
        }
    }
}

/// A request that never produced an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendFailure {
    /// No connection was made; the request was not delivered.
    ConnectFailed(String),
    /// The connection dropped mid-exchange; the request may have been processed.
    ConnectionLost(String),
    TimedOut,
}

impl std::fmt::Display for BackendFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendFailure::ConnectFailed(cause) => write!(f, "connection failed: {}", cause),
            BackendFailure::ConnectionLost(cause) => write!(f, "connection lost: {}", cause),
            BackendFailure::TimedOut => write!(f, "timed out"),
        }
    }
}

// --- Pagination ---

/// Opaque continuation token. Only the pagination layer reads or builds one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor(String);

impl Cursor {
    pub(crate) fn new(token: String) -> Self {
        Self(token)
    }

    pub(crate) fn token(&self) -> &str {
        &self.0
    }
}

/// One page of results plus the cursor for the next one, if any.
#[derive(Debug, Clone)]
pub struct Batch<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<Cursor>,
}

/// Generic paginated response from the Notion API.
#[derive(Debug, Clone, Deserialize)]
pub struct PaginatedResponse<T> {
    #[serde(alias = "items")]
    pub results: Vec<T>,
    #[serde(default)]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub has_more: Option<bool>,
}

impl<T> PaginatedResponse<T> {
    /// The continuation, absent when the service says there is nothing more.
    pub fn continuation(&self) -> Option<Cursor> {
        if self.has_more == Some(false) {
            return None;
        }
        self.next_cursor
            .as_ref()
            .filter(|token| !token.is_empty())
            .map(|token| Cursor::new(token.clone()))
    }
}

/// Error response from Notion API.
#[derive(Debug, Clone, Deserialize)]
pub struct NotionApiErrorResponse {
    pub code: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn continuation_follows_has_more_and_cursor() {
        let more: PaginatedResponse<Value> = serde_json::from_value(json!({
            "object": "list", "results": [1, 2], "next_cursor": "c1", "has_more": true
        }))
        .unwrap();
        assert_eq!(more.continuation(), Some(Cursor::new("c1".to_string())));

        let done: PaginatedResponse<Value> = serde_json::from_value(json!({
            "results": [], "next_cursor": "stale", "has_more": false
        }))
        .unwrap();
        assert_eq!(done.continuation(), None);
    }

    #[test]
    fn items_is_accepted_as_results() {
        let page: PaginatedResponse<Value> =
            serde_json::from_value(json!({ "items": [1], "next_cursor": null })).unwrap();
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.continuation(), None);
    }
}
