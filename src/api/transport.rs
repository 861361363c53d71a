// src/api/transport.rs
//! Rate-limited, retrying transport.
//!
//! Every request the crate makes goes through [`Transport::execute`]. It
//! applies the per-request deadline, interprets status codes into the error
//! taxonomy and retries transient failures according to [`RetryPolicy`].

use super::types::{BackendFailure, NotionApiErrorResponse, WireRequest, WireResponse};
use super::HttpBackend;
use crate::constants::{DEFAULT_REQUEST_TIMEOUT, ERROR_BODY_PREVIEW_LENGTH};
use crate::error::{AppError, NotionErrorCode};
use crate::error_recovery::{FailureClass, RetryDecision, RetryPolicy};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Authenticated request executor shared by every higher-level component.
#[derive(Clone)]
pub struct Transport {
    backend: Arc<dyn HttpBackend>,
    policy: RetryPolicy,
    timeout: Duration,
}

/// How one attempt ended.
enum Attempt {
    Success(Value),
    Fatal(AppError),
    Transient {
        class: FailureClass,
        code: NotionErrorCode,
        detail: String,
    },
}

impl Transport {
    pub fn new(backend: Arc<dyn HttpBackend>) -> Self {
        Self {
            backend,
            policy: RetryPolicy::default(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Sends a request. `GET` is treated as an idempotent read, every other
    /// method as a write.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, AppError> {
        let request = if method == Method::GET {
            WireRequest::read(method, path, body)
        } else {
            WireRequest::write(method, path, body)
        };
        self.execute(&request).await
    }

    /// A POST that only reads (database query, search) and may be repeated.
    pub async fn query(&self, path: &str, body: Value) -> Result<Value, AppError> {
        self.execute(&WireRequest::read(Method::POST, path, Some(body)))
            .await
    }

    pub async fn execute(&self, request: &WireRequest) -> Result<Value, AppError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            log::debug!(
                "{} {} (attempt {})",
                request.method,
                request.path,
                attempt
            );

            let outcome = match tokio::time::timeout(self.timeout, self.backend.execute(request))
                .await
            {
                Err(_) => transient_from(BackendFailure::TimedOut),
                Ok(Err(failure)) => transient_from(failure),
                Ok(Ok(response)) => classify_response(request, response),
            };

            let (class, code, detail) = match outcome {
                Attempt::Success(value) => return Ok(value),
                Attempt::Fatal(err) => return Err(err),
                Attempt::Transient {
                    class,
                    code,
                    detail,
                } => (class, code, detail),
            };

            let delay = match self.policy.decide(attempt, &class, request.idempotent) {
                RetryDecision::RetryAfter(delay) => self.policy.with_jitter(delay),
                RetryDecision::WaitForServer(delay) => delay,
                RetryDecision::Fail => {
                    return Err(self.give_up(request, class, code, detail, attempt));
                }
            };
            log::warn!(
                "{} {} failed ({}), retrying in {:?} (attempt {}/{})",
                request.method,
                request.path,
                detail,
                delay,
                attempt,
                self.policy.max_attempts
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Final error once the policy stops retrying a transient failure.
    fn give_up(
        &self,
        request: &WireRequest,
        class: FailureClass,
        code: NotionErrorCode,
        detail: String,
        attempts: u32,
    ) -> AppError {
        let endpoint = endpoint_of(request);
        if !request.idempotent && class.leaves_write_ambiguous() {
            return AppError::AmbiguousWrite {
                endpoint,
                cause: detail,
            };
        }
        match class {
            FailureClass::RateLimited { .. } => AppError::RateLimited { endpoint, attempts },
            FailureClass::ServerError { status } => AppError::Upstream {
                endpoint,
                code,
                status,
                message: detail,
                attempts,
            },
            FailureClass::TimedOut => AppError::Timeout {
                endpoint,
                elapsed: self.timeout,
            },
            FailureClass::ConnectFailed | FailureClass::ConnectionLost => AppError::Network {
                endpoint,
                message: detail,
                attempts,
            },
        }
    }
}

fn endpoint_of(request: &WireRequest) -> String {
    format!("{} {}", request.method, request.path)
}

fn transient_from(failure: BackendFailure) -> Attempt {
    let class = match &failure {
        BackendFailure::ConnectFailed(_) => FailureClass::ConnectFailed,
        BackendFailure::ConnectionLost(_) => FailureClass::ConnectionLost,
        BackendFailure::TimedOut => FailureClass::TimedOut,
    };
    Attempt::Transient {
        class,
        code: NotionErrorCode::HttpStatus(0),
        detail: failure.to_string(),
    }
}

/// Maps an HTTP response onto success, a fatal error, or a retryable failure.
fn classify_response(request: &WireRequest, response: WireResponse) -> Attempt {
    let status = response.status;

    if (200..300).contains(&status) {
        if response.body.trim().is_empty() {
            return Attempt::Success(Value::Null);
        }
        return match serde_json::from_str(&response.body) {
            Ok(value) => Attempt::Success(value),
            Err(e) => {
                log::error!("Failed to parse response from {}: {}", request.path, e);
                Attempt::Fatal(AppError::MalformedResponse(format!(
                    "{}: {} (body: {})",
                    endpoint_of(request),
                    e,
                    preview(&response.body)
                )))
            }
        };
    }

    let (code, message) = match serde_json::from_str::<NotionApiErrorResponse>(&response.body) {
        Ok(error) => (NotionErrorCode::from_api_response(&error.code), error.message),
        Err(_) => (
            NotionErrorCode::from_http_status(status),
            format!("HTTP {}: {}", status, preview(&response.body)),
        ),
    };
    let endpoint = endpoint_of(request);

    match status {
        429 => Attempt::Transient {
            class: FailureClass::RateLimited {
                retry_after: response.retry_after,
            },
            code,
            detail: message,
        },
        500..=599 => Attempt::Transient {
            class: FailureClass::ServerError { status },
            code,
            detail: message,
        },
        401 => Attempt::Fatal(AppError::Auth { endpoint, message }),
        403 => Attempt::Fatal(AppError::Permission { endpoint, message }),
        404 => Attempt::Fatal(AppError::NotFound { endpoint, message }),
        _ => Attempt::Fatal(AppError::Rejected {
            endpoint,
            code,
            message,
        }),
    }
}

fn preview(body: &str) -> String {
    if body.chars().count() > ERROR_BODY_PREVIEW_LENGTH {
        let head: String = body.chars().take(ERROR_BODY_PREVIEW_LENGTH).collect();
        format!("{}...", head)
    } else {
        body.to_string()
    }
}
