//! Request Timeout Boundary
//!
//! Wraps one provider call in a deadline. Expiry drops the in-flight
//! request (reqwest cancels on drop) and surfaces the distinct
//! timeout-flavored external-service error. Retry policy lives one layer
//! up, in the orchestrator — never here.

use std::future::Future;
use std::time::Duration;

use crate::types::{Result, RfqError};

/// Execute an async provider operation with a timeout.
///
/// Returns `RfqError::timeout` if the operation doesn't complete within the
/// specified duration.
pub async fn with_timeout<T, F>(timeout: Duration, future: F, provider: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(RfqError::timeout(provider, timeout)),
    }
}
