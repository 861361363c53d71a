// src/error_recovery.rs
//! Retry policy for API requests.
//!
//! The policy is a pure function of the attempt number and the failure
//! class; the transport owns the sleeping. Jitter is applied separately so
//! decisions stay reproducible in tests.

use crate::constants::{
    DEFAULT_INITIAL_BACKOFF, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_BACKOFF, DEFAULT_MAX_SERVER_WAIT,
};
use rand::Rng;
use std::time::Duration;

/// A transient failure observed by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureClass {
    /// HTTP 429, with the server's Retry-After if it sent one.
    RateLimited { retry_after: Option<Duration> },
    /// HTTP 5xx.
    ServerError { status: u16 },
    /// The connection could not be established; nothing reached the server.
    ConnectFailed,
    /// The connection broke after the request may have been delivered.
    ConnectionLost,
    /// No response before the request deadline.
    TimedOut,
}

impl FailureClass {
    /// Whether a write that hit this failure might have been applied.
    pub fn leaves_write_ambiguous(&self) -> bool {
        matches!(self, Self::ConnectionLost | Self::TimedOut)
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Computed backoff; the transport may jitter it.
    RetryAfter(Duration),
    /// The server's own Retry-After, slept exactly.
    WaitForServer(Duration),
    Fail,
}

/// Bounded exponential backoff.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Longest Retry-After honoured before giving up.
    pub max_server_wait: Duration,
    /// Fraction of the delay that is randomized, 0.0..=1.0.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_INITIAL_BACKOFF,
            max_delay: DEFAULT_MAX_BACKOFF,
            max_server_wait: DEFAULT_MAX_SERVER_WAIT,
            jitter: 0.25,
        }
    }
}

impl RetryPolicy {
    /// A policy that retries immediately; handy for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            max_server_wait: DEFAULT_MAX_SERVER_WAIT,
            jitter: 0.0,
        }
    }

    /// Decides whether attempt number `attempt` (1-based) that failed with
    /// `failure` should be retried.
    ///
    /// `idempotent` is false for creates and updates: those are retried only
    /// when the server definitely rejected the request (429/5xx) or the
    /// request never left the process. A Retry-After beyond
    /// `max_server_wait` fails at once, since retrying earlier would only
    /// be rate limited again.
    pub fn decide(&self, attempt: u32, failure: &FailureClass, idempotent: bool) -> RetryDecision {
        if attempt >= self.max_attempts {
            return RetryDecision::Fail;
        }
        if !idempotent && failure.leaves_write_ambiguous() {
            return RetryDecision::Fail;
        }

        match failure {
            FailureClass::RateLimited {
                retry_after: Some(wait),
            } if *wait > self.max_server_wait => RetryDecision::Fail,
            FailureClass::RateLimited {
                retry_after: Some(wait),
            } => RetryDecision::WaitForServer(*wait),
            _ => RetryDecision::RetryAfter(self.backoff(attempt)),
        }
    }

    /// Exponential delay before retry number `attempt`: initial * 2^(attempt-1), capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    /// Spreads `delay` by up to ±`jitter` so concurrent callers don't retry in lockstep.
    pub fn with_jitter(&self, delay: Duration) -> Duration {
        if self.jitter <= 0.0 || delay.is_zero() {
            return delay;
        }
        let spread = self.jitter.min(1.0);
        let factor = rand::rng().random_range((1.0 - spread)..=(1.0 + spread));
        delay.mul_f64(factor).min(self.max_delay)
    }
}
