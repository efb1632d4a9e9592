//! Caller-level retry for profile fetches.
//!
//! [`crate::ProfileClient::fetch_profile`] makes exactly one attempt. Hosting
//! layers that want backoff on transient failures wrap it with
//! [`fetch_profile_with_retry`]. Only `rate_limited` and `network_error` are
//! retried; every other kind is returned immediately.

use std::future::Future;
use std::time::Duration;

use igscrape_core::ProfileRecord;

use crate::client::ProfileClient;
use crate::error::{ClassifiedError, ErrorKind};

/// Upper bound on a single backoff sleep.
const MAX_BACKOFF_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure. `0` disables retries.
    pub max_retries: u32,
    /// Base delay for exponential backoff: `backoff_base_secs * 2^attempt`.
    pub backoff_base_secs: u64,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_retries: u32, backoff_base_secs: u64) -> Self {
        Self {
            max_retries,
            backoff_base_secs,
        }
    }
}

/// Returns `true` if `err` is transient and worth another attempt.
///
/// - `rate_limited`: the site asked us to back off.
/// - `network_error`: connection reset, timeout, DNS.
///
/// Not-found, parse and upstream errors would come back identical.
fn is_retriable(err: &ClassifiedError) -> bool {
    matches!(
        err.kind(),
        ErrorKind::RateLimited | ErrorKind::NetworkError
    )
}

/// Runs `operation` until it succeeds, fails with a non-retriable kind, or
/// `policy.max_retries` extra attempts have been spent. Retry `n` (1-based)
/// sleeps `backoff_base_secs * 2^(n-1)` first, capped at 60 s.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T, ClassifiedError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClassifiedError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !is_retriable(&err) || attempt >= policy.max_retries {
            return Err(err);
        }

        let delay_secs = backoff_delay_secs(policy, attempt);
        tracing::warn!(
            attempt,
            max_retries = policy.max_retries,
            delay_secs,
            kind = %err.kind(),
            error = %err,
            "transient profile fetch error, retrying after backoff"
        );
        tokio::time::sleep(Duration::from_secs(delay_secs)).await;
        attempt += 1;
    }
}

fn backoff_delay_secs(policy: RetryPolicy, attempt: u32) -> u64 {
    policy
        .backoff_base_secs
        .saturating_mul(1u64 << attempt.min(62))
        .min(MAX_BACKOFF_SECS)
}

/// [`ProfileClient::fetch_profile`] with `policy` applied.
///
/// # Errors
///
/// The last [`ClassifiedError`] once retries are exhausted, or the first
/// non-retriable one.
pub async fn fetch_profile_with_retry(
    client: &ProfileClient,
    username: &str,
    policy: RetryPolicy,
) -> Result<ProfileRecord, ClassifiedError> {
    retry_with_backoff(policy, || client.fetch_profile(username)).await
}
