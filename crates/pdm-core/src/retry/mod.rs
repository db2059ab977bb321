//! Retry and backoff policy.
//!
//! Classifies job failures (timeouts, throttling, connection errors, 5xx)
//! and decides on exponential backoff, so the scheduler retries transient
//! network failures a bounded number of times before marking a job failed.

mod classify;
mod policy;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
