// src/error.rs
//! Application error types with structured error handling.
//!
//! Error types form the vocabulary for failure modes in the system.
//! Each variant tells what went wrong and where; [`AppError::kind`]
//! collapses them into the coarse taxonomy callers branch on.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Notion API error codes as a typed vocabulary.
///
/// Instead of matching against magic strings like `"rate_limited"`,
/// the domain vocabulary is encoded in the type system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotionErrorCode {
    /// API rate limit exceeded — back off and retry
    RateLimited,
    /// The requested object does not exist or is not shared with the integration
    ObjectNotFound,
    /// API key is invalid or expired
    Unauthorized,
    /// API key lacks permission for this resource
    RestrictedResource,
    /// Request body contains invalid JSON
    InvalidJson,
    /// Request parameters failed Notion's validation
    ValidationFailed,
    /// Conflict with current state of the resource
    Conflict,
    /// Notion internal server error
    InternalError,
    /// Notion is temporarily unavailable
    ServiceUnavailable,
    /// HTTP status code fallback when the error body is unparseable
    HttpStatus(u16),
    /// An error code this client doesn't recognize yet
    Unknown(String),
}

impl NotionErrorCode {
    /// Parse a Notion API error code string into the typed vocabulary.
    pub fn from_api_response(code: &str) -> Self {
        match code {
            "rate_limited" => Self::RateLimited,
            "object_not_found" => Self::ObjectNotFound,
            "unauthorized" => Self::Unauthorized,
            "restricted_resource" => Self::RestrictedResource,
            "invalid_json" => Self::InvalidJson,
            "validation_error" | "invalid_request" | "invalid_request_url" => {
                Self::ValidationFailed
            }
            "conflict_error" => Self::Conflict,
            "internal_server_error" => Self::InternalError,
            "service_unavailable" | "database_connection_unavailable" | "gateway_timeout" => {
                Self::ServiceUnavailable
            }
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Create from an HTTP status code when the error body is unparseable.
    pub fn from_http_status(status: u16) -> Self {
        Self::HttpStatus(status)
    }
}

impl fmt::Display for NotionErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited => write!(f, "rate_limited"),
            Self::ObjectNotFound => write!(f, "object_not_found"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::RestrictedResource => write!(f, "restricted_resource"),
            Self::InvalidJson => write!(f, "invalid_json"),
            Self::ValidationFailed => write!(f, "validation_error"),
            Self::Conflict => write!(f, "conflict_error"),
            Self::InternalError => write!(f, "internal_server_error"),
            Self::ServiceUnavailable => write!(f, "service_unavailable"),
            Self::HttpStatus(code) => write!(f, "http_{}", code),
            Self::Unknown(code) => write!(f, "{}", code),
        }
    }
}

/// Coarse failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or unsupported input, or input the service rejected as invalid.
    Validation,
    Auth,
    Permission,
    NotFound,
    /// Rate limiting outlasted every retry.
    RateLimit,
    /// Remote 5xx (or an unclassified remote rejection) after retries.
    Upstream,
    Timeout,
    /// A write may or may not have been applied.
    AmbiguousWrite,
    /// A remote record lacks an expected property or has the wrong kind.
    SchemaMismatch,
    /// Connection-level failures outlasted every retry.
    Network,
    /// The service answered with a body we could not decode.
    Malformed,
    Configuration,
}

/// Main application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] crate::types::ValidationError),

    #[error("Notion rejected the request to {endpoint}: {message}")]
    Rejected {
        endpoint: String,
        code: NotionErrorCode,
        message: String,
    },

    #[error("Authentication failed for {endpoint}: {message}")]
    Auth { endpoint: String, message: String },

    #[error("Integration lacks access to {endpoint}: {message}")]
    Permission { endpoint: String, message: String },

    #[error("Not found: {endpoint}: {message}")]
    NotFound { endpoint: String, message: String },

    #[error("Rate limited by Notion on {endpoint} after {attempts} attempts")]
    RateLimited { endpoint: String, attempts: u32 },

    #[error("Notion returned an error ({code}) for {endpoint} after {attempts} attempts: {message}")]
    Upstream {
        endpoint: String,
        code: NotionErrorCode,
        status: u16,
        message: String,
        attempts: u32,
    },

    #[error("Request to {endpoint} timed out after {elapsed:?}")]
    Timeout { endpoint: String, elapsed: Duration },

    #[error("Outcome of write to {endpoint} is unknown: {cause}")]
    AmbiguousWrite { endpoint: String, cause: String },

    #[error("Network failure talking to {endpoint} after {attempts} attempts: {message}")]
    Network {
        endpoint: String,
        message: String,
        attempts: u32,
    },

    #[error("Record {record_id} does not match the expected schema: property '{property}' expected {expected}, found {found}")]
    SchemaMismatch {
        record_id: String,
        property: String,
        expected: &'static str,
        found: String,
    },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("HTTP client setup failed")]
    ClientSetup(#[from] reqwest::Error),

    #[error("Write stopped after {applied} of {total} operations were applied")]
    PartialWrite {
        applied: usize,
        total: usize,
        #[source]
        source: Box<AppError>,
    },

    #[error("Page {page_id} was created but its content was not fully written")]
    IncompletePage {
        page_id: crate::types::PageId,
        #[source]
        source: Box<AppError>,
    },

    #[error("{operation} failed for {target}")]
    Operation {
        operation: &'static str,
        target: String,
        #[source]
        source: Box<AppError>,
    },
}

impl AppError {
    /// The taxonomy bucket of this error, looking through context wrappers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::Rejected { code, .. } => match code {
                NotionErrorCode::ValidationFailed | NotionErrorCode::InvalidJson => {
                    ErrorKind::Validation
                }
                _ => ErrorKind::Upstream,
            },
            AppError::Auth { .. } => ErrorKind::Auth,
            AppError::Permission { .. } => ErrorKind::Permission,
            AppError::NotFound { .. } => ErrorKind::NotFound,
            AppError::RateLimited { .. } => ErrorKind::RateLimit,
            AppError::Upstream { .. } => ErrorKind::Upstream,
            AppError::Timeout { .. } => ErrorKind::Timeout,
            AppError::AmbiguousWrite { .. } => ErrorKind::AmbiguousWrite,
            AppError::Network { .. } => ErrorKind::Network,
            AppError::SchemaMismatch { .. } => ErrorKind::SchemaMismatch,
            AppError::MalformedResponse(_) => ErrorKind::Malformed,
            AppError::MissingConfiguration(_) | AppError::ClientSetup(_) => {
                ErrorKind::Configuration
            }
            AppError::PartialWrite { source, .. }
            | AppError::IncompletePage { source, .. }
            | AppError::Operation { source, .. } => source.kind(),
        }
    }

    /// Number of block operations applied before a partial write failed.
    pub fn applied_operations(&self) -> Option<usize> {
        match self {
            AppError::PartialWrite { applied, .. } => Some(*applied),
            AppError::IncompletePage { source, .. } | AppError::Operation { source, .. } => {
                source.applied_operations()
            }
            _ => None,
        }
    }

    /// The page that exists remotely even though the operation failed.
    pub fn created_page(&self) -> Option<&crate::types::PageId> {
        match self {
            AppError::IncompletePage { page_id, .. } => Some(page_id),
            AppError::Operation { source, .. } => source.created_page(),
            _ => None,
        }
    }

    /// Wraps the error with the operation and target it happened in.
    pub fn in_operation(self, operation: &'static str, target: impl Into<String>) -> Self {
        AppError::Operation {
            operation,
            target: target.into(),
            source: Box::new(self),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::MalformedResponse(err.to_string())
    }
}

/// Attaches operation context to a `Result`.
pub trait OperationContext<T> {
    fn in_operation(self, operation: &'static str, target: impl Into<String>) -> Result<T>;
}

impl<T> OperationContext<T> for Result<T> {
    fn in_operation(self, operation: &'static str, target: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.in_operation(operation, target))
    }
}

/// Result type alias for convenience
pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ValidationError;

    #[test]
    fn error_codes_round_trip_through_display() {
        for code in [
            "rate_limited",
            "object_not_found",
            "unauthorized",
            "restricted_resource",
            "validation_error",
            "conflict_error",
        ] {
            assert_eq!(NotionErrorCode::from_api_response(code).to_string(), code);
        }
        assert_eq!(
            NotionErrorCode::from_api_response("brand_new_code"),
            NotionErrorCode::Unknown("brand_new_code".to_string())
        );
    }

    #[test]
    fn kind_looks_through_context_wrappers() {
        let inner = AppError::Auth {
            endpoint: "pages/abc".to_string(),
            message: "API token is invalid.".to_string(),
        };
        let wrapped = inner
            .in_operation("get_page", "abc")
            .in_operation("get_task", "abc");
        assert_eq!(wrapped.kind(), ErrorKind::Auth);
        assert!(wrapped.to_string().contains("get_task failed for abc"));
    }

    #[test]
    fn remote_validation_rejection_is_a_validation_error() {
        let err = AppError::Rejected {
            endpoint: "pages/abc".to_string(),
            code: NotionErrorCode::ValidationFailed,
            message: "person does not exist".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Validation);

        let local: AppError = ValidationError::EmptyField("title").into();
        assert_eq!(local.kind(), ErrorKind::Validation);
    }

    #[test]
    fn partial_write_reports_applied_count() {
        let err = AppError::PartialWrite {
            applied: 2,
            total: 5,
            source: Box::new(AppError::Timeout {
                endpoint: "blocks/x".to_string(),
                elapsed: Duration::from_secs(30),
            }),
        }
        .in_operation("update_page_content", "page");
        assert_eq!(err.applied_operations(), Some(2));
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }

    #[test]
    fn wrapped_errors_name_their_cause_once() {
        let err = AppError::PartialWrite {
            applied: 1,
            total: 2,
            source: Box::new(AppError::MalformedResponse("bad block".to_string())),
        }
        .in_operation("update_page_content", "page");
        let chain = format!("{:#}", anyhow::Error::new(err));
        assert_eq!(chain.matches("bad block").count(), 1, "{}", chain);
        assert_eq!(
            chain,
            "update_page_content failed for page: Write stopped after 1 of 2 operations were applied: Malformed response: bad block"
        );
    }
}
