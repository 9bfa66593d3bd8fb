//! Retry and backoff policy.
//!
//! Error classification and the backoff curve live here so the fetcher and
//! the orchestrator share one decision point for fatal-vs-retryable.

mod classify;
mod policy;

pub use classify::{classify, classify_http_status, classify_transport_error};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
