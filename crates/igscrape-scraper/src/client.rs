//! The profile pipeline: shape → fetch → classify → extract → normalize.

use igscrape_core::{AppConfig, ProfileRecord};

use crate::error::{classify_fetch, ClassifiedError};
use crate::extract::{extract_profile_page, user_object};
use crate::fetch::{DocumentFetcher, Session};
use crate::normalize::normalize_profile;
use crate::request::{JitterRange, RequestProfile};

/// Longest username the site allows.
const MAX_USERNAME_LEN: usize = 30;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub jitter: JitterRange,
    pub session: Session,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: igscrape_core::config::DEFAULT_BASE_URL.to_owned(),
            timeout_secs: 30,
            jitter: JitterRange::default(),
            session: Session::Anonymous,
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            timeout_secs: config.request_timeout_secs,
            jitter: JitterRange::new(config.jitter_min_ms, config.jitter_max_ms),
            session: Session::from_session_id(config.session_id.as_deref()),
        }
    }
}

/// Fetches and normalizes public profiles.
///
/// Every call builds its own [`RequestProfile`]; the client itself holds only
/// immutable configuration and a connection pool and is shared across
/// tasks behind an `Arc` without locking.
pub struct ProfileClient {
    fetcher: DocumentFetcher,
    jitter: JitterRange,
}

impl ProfileClient {
    /// # Errors
    ///
    /// Returns an `unexpected_error` [`ClassifiedError`] if the HTTP client
    /// cannot be constructed.
    pub fn new(config: ClientConfig) -> Result<Self, ClassifiedError> {
        let fetcher = DocumentFetcher::new(&config.base_url, config.timeout_secs, config.session)?;
        Ok(Self {
            fetcher,
            jitter: config.jitter,
        })
    }

    /// Fetches `username`'s profile page once and normalizes it.
    ///
    /// A leading `@` and surrounding whitespace are ignored.
    ///
    /// # Errors
    ///
    /// Any stage can short-circuit with a [`ClassifiedError`]; no partial
    /// record is ever returned alongside an error.
    pub async fn fetch_profile(&self, username: &str) -> Result<ProfileRecord, ClassifiedError> {
        let result = self.run_pipeline(username).await;
        match &result {
            Ok(record) => tracing::info!(
                username,
                followers = record.follower_count,
                posts = record.post_count,
                "profile fetched"
            ),
            Err(err) => tracing::warn!(
                username,
                kind = %err.kind(),
                status = err.suggested_status_code(),
                error = %err,
                "profile fetch failed"
            ),
        }
        result
    }

    async fn run_pipeline(&self, username: &str) -> Result<ProfileRecord, ClassifiedError> {
        let username = validate_username(username)?;
        let profile = RequestProfile::build(&self.jitter);

        let fetched = self.fetcher.fetch(username, &profile).await?;
        if let Some(err) = classify_fetch(&fetched) {
            return Err(err);
        }

        let page = extract_profile_page(&fetched.body)?;
        let user = user_object(&page)?;
        Ok(normalize_profile(user))
    }
}

/// Strips a leading `@` and whitespace, then checks the site's username
/// alphabet. A name outside it cannot exist, so it is reported as
/// `not_found` without touching the network.
pub(crate) fn validate_username(raw: &str) -> Result<&str, ClassifiedError> {
    let trimmed = raw.trim();
    let username = trimmed.strip_prefix('@').unwrap_or(trimmed);

    if username.is_empty() {
        return Err(ClassifiedError::not_found("Username is empty"));
    }
    if username.len() > MAX_USERNAME_LEN
        || !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_')
    {
        return Err(ClassifiedError::not_found(format!(
            "Profile does not exist: \"{username}\" is not a valid username"
        )));
    }
    Ok(username)
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
