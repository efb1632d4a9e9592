use std::io::Write;
use std::path::Path;
use std::pin::pin;

use futures::stream::{self, StreamExt};
use igscrape_core::{AppConfig, ProfileRecord};
use igscrape_scraper::{
    extract_profile_page, fetch_profile_with_retry, normalize_profile, user_object,
    ClassifiedError, ClientConfig, ErrorKind, ProfileClient, RetryPolicy,
};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FetchOptions {
    pub concurrency: usize,
    pub retries: u32,
    pub backoff_secs: u64,
}

/// Printed in place of a record when a username fails.
#[derive(Debug, Serialize)]
pub(crate) struct FailureLine<'a> {
    pub username: &'a str,
    pub error: &'a str,
    pub kind: ErrorKind,
    pub status: u16,
}

impl<'a> FailureLine<'a> {
    pub(crate) fn new(username: &'a str, err: &'a ClassifiedError) -> Self {
        Self {
            username,
            error: err.message(),
            kind: err.kind(),
            status: err.suggested_status_code(),
        }
    }
}

/// Fetches every username with at most `options.concurrency` in flight and
/// prints one JSON line per username as each one completes.
pub(crate) async fn run_profiles(
    config: &AppConfig,
    usernames: &[String],
    options: FetchOptions,
) -> anyhow::Result<()> {
    let client = ProfileClient::new(ClientConfig::from_app_config(config))?;
    fetch_all(&client, usernames, options, &mut std::io::stdout()).await
}

/// Writes a record or [`FailureLine`] to `out` per username, flushing after
/// each so slow usernames never hold back finished ones.
///
/// # Errors
///
/// Fails after every username has been written if any of them failed, or
/// immediately if `out` cannot be written.
pub(crate) async fn fetch_all<W: Write>(
    client: &ProfileClient,
    usernames: &[String],
    options: FetchOptions,
    out: &mut W,
) -> anyhow::Result<()> {
    let policy = RetryPolicy::new(options.retries, options.backoff_secs);
    let mut results = pin!(stream::iter(usernames)
        .map(|username| async move {
            let result = fetch_profile_with_retry(client, username, policy).await;
            (username, result)
        })
        .buffer_unordered(options.concurrency.max(1)));

    let mut failed = 0usize;
    while let Some((username, result)) = results.next().await {
        let line = match &result {
            Ok(record) => serde_json::to_string(record)?,
            Err(err) => {
                failed += 1;
                serde_json::to_string(&FailureLine::new(username, err))?
            }
        };
        writeln!(out, "{line}")?;
        out.flush()?;
    }

    if failed > 0 {
        tracing::warn!(failed, total = usernames.len(), "some profiles failed");
        anyhow::bail!("{failed} of {} profiles failed", usernames.len());
    }
    Ok(())
}

/// Runs extraction and normalization over a saved page.
pub(crate) fn run_extract(file: &Path) -> anyhow::Result<()> {
    let html = std::fs::read_to_string(file)?;
    let record = extract_record(&html)?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

pub(crate) fn extract_record(html: &str) -> Result<ProfileRecord, ClassifiedError> {
    let page = extract_profile_page(html)?;
    let user = user_object(&page)?;
    Ok(normalize_profile(user))
}
