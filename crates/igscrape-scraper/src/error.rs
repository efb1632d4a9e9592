//! The closed error taxonomy every pipeline stage reports through.
//!
//! Raw `reqwest` and `serde_json` errors are converted here and never leave
//! the crate; callers only ever see a [`ClassifiedError`].

use serde::Serialize;
use thiserror::Error;

use crate::extract::SHARED_DATA_MARKER;
use crate::fetch::FetchResult;

/// Body text served on a 200 response when the profile does not exist.
const UNAVAILABLE_PAGE_TEXT: &str = "Sorry, this page isn't available";

/// Body text of the soft throttle page.
const THROTTLE_PAGE_TEXT: &str = "Please wait a few minutes before you try again";

/// Path the site redirects anonymous clients to once they are throttled.
const LOGIN_WALL_PATH: &str = "/accounts/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    RateLimited,
    NetworkError,
    DataNotFound,
    ParseError,
    UpstreamError,
    UnexpectedError,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::NetworkError => "network_error",
            ErrorKind::DataNotFound => "data_not_found",
            ErrorKind::ParseError => "parse_error",
            ErrorKind::UpstreamError => "upstream_error",
            ErrorKind::UnexpectedError => "unexpected_error",
        }
    }

    /// Status code suggested to the hosting layer. `UpstreamError` normally
    /// mirrors the upstream status; 502 is only used when none is known.
    #[must_use]
    pub fn default_status_code(self) -> u16 {
        match self {
            ErrorKind::NotFound | ErrorKind::DataNotFound => 404,
            ErrorKind::RateLimited => 429,
            ErrorKind::NetworkError => 503,
            ErrorKind::UpstreamError => 502,
            ErrorKind::ParseError | ErrorKind::UnexpectedError => 500,
        }
    }

    fn default_message(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "Profile does not exist",
            ErrorKind::RateLimited => "Rate limit exceeded, try again later",
            ErrorKind::NetworkError => "Connection error",
            ErrorKind::DataNotFound => "Profile data not found in page",
            ErrorKind::ParseError => "Could not parse profile data",
            ErrorKind::UpstreamError => "Upstream returned an error status",
            ErrorKind::UnexpectedError => "Unexpected error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A terminal pipeline failure with a human-readable message and the status
/// code the hosting layer should answer with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ClassifiedError {
    kind: ErrorKind,
    message: String,
    suggested_status_code: u16,
}

impl ClassifiedError {
    /// Builds an error with the kind's default status code. An empty or
    /// whitespace-only message is replaced with the kind's default message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::with_status(kind, message, kind.default_status_code())
    }

    fn with_status(kind: ErrorKind, message: impl Into<String>, status: u16) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            kind.default_message().to_string()
        } else {
            message
        };
        Self {
            kind,
            message,
            suggested_status_code: status,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateLimited, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NetworkError, message)
    }

    pub fn data_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DataNotFound, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParseError, message)
    }

    /// Upstream answered with a non-2xx status that is neither a missing
    /// profile nor throttling; the suggested code mirrors it.
    pub fn upstream(status: u16, message: impl Into<String>) -> Self {
        Self::with_status(ErrorKind::UpstreamError, message, status)
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnexpectedError, message)
    }

    /// Converts a transport failure. Request-construction failures are our
    /// own bug, not the network's, so they map to `unexpected_error`.
    pub(crate) fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_builder() {
            return Self::unexpected(format!("Unexpected error: {err}"));
        }
        if err.is_timeout() {
            return Self::network(format!("Connection error: request timed out ({err})"));
        }
        Self::network(format!("Connection error: {err}"))
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn suggested_status_code(&self) -> u16 {
        self.suggested_status_code
    }
}

/// Interprets a completed fetch. Returns `None` when the response looks like
/// a usable profile page and extraction should proceed.
///
/// Status rules take precedence; body heuristics only apply to 2xx pages that
/// do not carry the embedded-data marker, so a real profile page that happens
/// to contain the phrases is never misclassified.
#[must_use]
pub fn classify_fetch(result: &FetchResult) -> Option<ClassifiedError> {
    match result.status_code {
        404 => return Some(ClassifiedError::not_found("Profile does not exist")),
        429 => {
            return Some(ClassifiedError::rate_limited(
                "Rate limit exceeded, try again later",
            ))
        }
        401 => {
            return Some(ClassifiedError::upstream(
                401,
                "Authentication required. Check the session cookie (INSTAGRAM_SESSION_ID).",
            ))
        }
        status if !result.ok => {
            return Some(ClassifiedError::upstream(
                status,
                format!("Upstream returned HTTP {status}"),
            ))
        }
        _ => {}
    }

    if result.final_url.contains(LOGIN_WALL_PATH) {
        return Some(ClassifiedError::rate_limited(
            "Redirected to login page; anonymous access is being throttled",
        ));
    }

    if result.body.contains(SHARED_DATA_MARKER) {
        return None;
    }

    if result.body.contains(THROTTLE_PAGE_TEXT) {
        return Some(ClassifiedError::rate_limited(
            "Rate limit exceeded, try again later",
        ));
    }

    if result.body.contains(UNAVAILABLE_PAGE_TEXT) {
        return Some(ClassifiedError::not_found("Profile does not exist"));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetched(status_code: u16, body: &str) -> FetchResult {
        FetchResult {
            status_code,
            body: body.to_owned(),
            ok: (200..300).contains(&status_code),
            final_url: "https://www.instagram.com/alice/".to_owned(),
        }
    }

    #[test]
    fn suggested_codes_follow_taxonomy() {
        assert_eq!(ClassifiedError::not_found("x").suggested_status_code(), 404);
        assert_eq!(ClassifiedError::rate_limited("x").suggested_status_code(), 429);
        assert_eq!(ClassifiedError::network("x").suggested_status_code(), 503);
        assert_eq!(ClassifiedError::data_not_found("x").suggested_status_code(), 404);
        assert_eq!(ClassifiedError::parse("x").suggested_status_code(), 500);
        assert_eq!(ClassifiedError::upstream(403, "x").suggested_status_code(), 403);
        assert_eq!(ClassifiedError::unexpected("x").suggested_status_code(), 500);
    }

    #[test]
    fn empty_message_falls_back_to_default() {
        let err = ClassifiedError::unexpected("  ");
        assert_eq!(err.message(), "Unexpected error");
        assert_eq!(err.to_string(), "Unexpected error");
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::DataNotFound).unwrap();
        assert_eq!(json, "\"data_not_found\"");
        assert_eq!(ErrorKind::UnexpectedError.to_string(), "unexpected_error");
    }

    #[test]
    fn classify_404_is_not_found() {
        let err = classify_fetch(&fetched(404, "")).expect("expected an error");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn classify_429_is_rate_limited() {
        let err = classify_fetch(&fetched(429, "")).expect("expected an error");
        assert_eq!(err.kind(), ErrorKind::RateLimited);
        assert_eq!(err.suggested_status_code(), 429);
    }

    #[test]
    fn classify_other_non_2xx_mirrors_status() {
        let err = classify_fetch(&fetched(503, "down")).expect("expected an error");
        assert_eq!(err.kind(), ErrorKind::UpstreamError);
        assert_eq!(err.suggested_status_code(), 503);
        assert!(err.message().contains("503"));
    }

    #[test]
    fn classify_401_points_at_session_cookie() {
        let err = classify_fetch(&fetched(401, "")).expect("expected an error");
        assert_eq!(err.kind(), ErrorKind::UpstreamError);
        assert_eq!(err.suggested_status_code(), 401);
        assert!(err.message().starts_with("Authentication required"));
        assert!(err.message().contains("INSTAGRAM_SESSION_ID"));
    }

    #[test]
    fn classify_login_redirect_is_rate_limited() {
        let mut result = fetched(200, "<html>login</html>");
        result.final_url = "https://www.instagram.com/accounts/login/?next=/alice/".to_owned();
        let err = classify_fetch(&result).expect("expected an error");
        assert_eq!(err.kind(), ErrorKind::RateLimited);
    }

    #[test]
    fn classify_unavailable_page_is_not_found() {
        let body = "<h2>Sorry, this page isn't available.</h2>";
        let err = classify_fetch(&fetched(200, body)).expect("expected an error");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn classify_throttle_page_is_rate_limited() {
        let body = "<p>Please wait a few minutes before you try again.</p>";
        let err = classify_fetch(&fetched(200, body)).expect("expected an error");
        assert_eq!(err.kind(), ErrorKind::RateLimited);
    }

    #[test]
    fn classify_ignores_phrases_on_real_profile_page() {
        let body = r#"<script>window._sharedData = {"a":"Sorry, this page isn't available"};</script>"#;
        assert!(classify_fetch(&fetched(200, body)).is_none());
    }

    #[test]
    fn classify_plain_success_passes_through() {
        assert!(classify_fetch(&fetched(200, "<html></html>")).is_none());
    }
}
