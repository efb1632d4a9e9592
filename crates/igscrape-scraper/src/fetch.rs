//! Single-attempt document fetcher for profile pages.

use std::time::Duration;

use reqwest::header::{COOKIE, REFERER, USER_AGENT};
use reqwest::{redirect, Client};

use crate::error::ClassifiedError;
use crate::request::RequestProfile;

/// How the fetcher identifies itself to the site.
///
/// An authenticated session is the same fetch with a session cookie
/// attached; there is no separate login pipeline.
#[derive(Clone, Default, PartialEq, Eq)]
pub enum Session {
    #[default]
    Anonymous,
    Cookie { session_id: String },
}

impl Session {
    /// `Some` non-blank id yields a cookie session, anything else is anonymous.
    #[must_use]
    pub fn from_session_id(session_id: Option<&str>) -> Self {
        match session_id.map(str::trim) {
            Some(id) if !id.is_empty() => Session::Cookie {
                session_id: id.to_owned(),
            },
            _ => Session::Anonymous,
        }
    }

    fn cookie_header(&self) -> Option<String> {
        match self {
            Session::Anonymous => None,
            Session::Cookie { session_id } => Some(format!("sessionid={session_id}")),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Session::Anonymous => f.write_str("Anonymous"),
            Session::Cookie { .. } => f
                .debug_struct("Cookie")
                .field("session_id", &"[redacted]")
                .finish(),
        }
    }
}

/// Raw outcome of one GET, whatever the HTTP status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub status_code: u16,
    pub body: String,
    /// `true` for 2xx statuses.
    pub ok: bool,
    /// URL of the final response after redirects.
    pub final_url: String,
}

/// Issues profile-page GETs. Holds no per-request state, so one instance
/// can serve any number of concurrent calls.
pub struct DocumentFetcher {
    client: Client,
    base_url: String,
    session: Session,
}

impl DocumentFetcher {
    /// Creates a fetcher rooted at `base_url` (e.g. `https://www.instagram.com`).
    ///
    /// # Errors
    ///
    /// Returns an `unexpected_error` [`ClassifiedError`] if the underlying
    /// `reqwest::Client` cannot be constructed (e.g., invalid TLS config).
    pub fn new(base_url: &str, timeout_secs: u64, session: Session) -> Result<Self, ClassifiedError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .redirect(redirect::Policy::limited(5))
            .build()
            .map_err(|e| ClassifiedError::unexpected(format!("could not build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            session,
        })
    }

    /// `{base_url}/{username}/`
    #[must_use]
    pub fn profile_url(&self, username: &str) -> String {
        format!("{}/{username}/", self.base_url)
    }

    /// Waits out the profile's jitter delay, then issues one GET.
    ///
    /// Non-2xx responses are returned as a [`FetchResult`] with `ok == false`.
    /// Dropping the returned future during the delay cancels the call before
    /// anything is sent.
    ///
    /// # Errors
    ///
    /// Returns a `network_error` [`ClassifiedError`] on transport failure
    /// (DNS, connection reset, timeout, body read). No retry is attempted.
    pub async fn fetch(
        &self,
        username: &str,
        profile: &RequestProfile,
    ) -> Result<FetchResult, ClassifiedError> {
        let url = self.profile_url(username);

        let delay = profile.jitter_delay();
        if !delay.is_zero() {
            tracing::debug!(
                username,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "applying jitter delay before fetch"
            );
            tokio::time::sleep(delay).await;
        }

        let mut request = self
            .client
            .get(&url)
            .header(USER_AGENT, profile.user_agent())
            .header(REFERER, format!("{}/", self.base_url));
        for (name, value) in profile.headers() {
            request = request.header(*name, *value);
        }
        if let Some(cookie) = self.session.cookie_header() {
            request = request.header(COOKIE, cookie);
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!(username, error = %e, "profile fetch failed at transport level");
            ClassifiedError::from_transport(&e)
        })?;

        let status = response.status();
        let final_url = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| ClassifiedError::from_transport(&e))?;

        tracing::debug!(
            username,
            status = status.as_u16(),
            bytes = body.len(),
            "profile page fetched"
        );

        Ok(FetchResult {
            status_code: status.as_u16(),
            body,
            ok: status.is_success(),
            final_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_url_has_trailing_slash() {
        let fetcher =
            DocumentFetcher::new("https://www.instagram.com/", 5, Session::Anonymous).unwrap();
        assert_eq!(
            fetcher.profile_url("alice"),
            "https://www.instagram.com/alice/"
        );
    }

    #[test]
    fn session_from_blank_id_is_anonymous() {
        assert_eq!(Session::from_session_id(Some("  ")), Session::Anonymous);
        assert_eq!(Session::from_session_id(None), Session::Anonymous);
    }

    #[test]
    fn cookie_session_builds_header() {
        let session = Session::from_session_id(Some("abc123"));
        assert_eq!(session.cookie_header().as_deref(), Some("sessionid=abc123"));
    }

    #[test]
    fn session_debug_redacts_cookie() {
        let session = Session::from_session_id(Some("abc123"));
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("abc123"));
    }
}
