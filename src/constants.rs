// src/constants.rs
//! Domain constants that define the operational boundaries of the system.
//!
//! Each constant is named for the domain concept it constrains, not its
//! technical role. Reading these constants should tell you how the layer
//! talks to the workspace service: how much it asks for per page, how
//! patiently it retries, and which limits the service enforces.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Notion API boundaries
// ---------------------------------------------------------------------------

/// Base URL of the public Notion REST API.
pub const NOTION_API_BASE_URL: &str = "https://api.notion.com/v1";

/// API version sent with every request.
pub const NOTION_API_VERSION: &str = "2022-06-28";

/// How many objects the Notion API returns per page of results.
///
/// The Notion API maximum is 100. We use the maximum to minimize
/// round-trips when draining a cursor.
pub const NOTION_API_PAGE_SIZE: usize = 100;

/// Maximum number of children accepted by one append request.
pub const NOTION_MAX_APPEND_BLOCKS: usize = 100;

/// Maximum characters in a single rich text `text.content`.
pub const RICH_TEXT_MAX_CHARS: usize = 2000;

/// How many levels of `and`/`or` nesting a database filter may have.
pub const NOTION_MAX_FILTER_NESTING: usize = 2;

// ---------------------------------------------------------------------------
// Resilience
// ---------------------------------------------------------------------------

/// Total attempts (first try included) for a retryable request.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;

/// Backoff before the first retry when the service gives no Retry-After.
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(500);

/// Upper bound for any single computed backoff.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Longest server-requested wait the transport will sit out. A longer
/// Retry-After fails the request as rate limited instead.
pub const DEFAULT_MAX_SERVER_WAIT: Duration = Duration::from_secs(120);

/// How long one request may take before it is abandoned.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Error display
// ---------------------------------------------------------------------------

/// Maximum characters shown when previewing error response bodies.
pub const ERROR_BODY_PREVIEW_LENGTH: usize = 200;
