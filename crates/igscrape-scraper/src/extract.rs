//! Embedded-data extraction from profile-page HTML.
//!
//! The page bootstraps client-side rendering with
//! `window._sharedData = {...};` inside a `<script>` tag. The object is
//! captured with a string-aware balanced-brace scan, so `;` or `};` inside
//! string values never truncate it. Pages that instead ship a
//! `<script type="application/json">` block are read from that block.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::ClassifiedError;

/// Page-global the profile data is assigned to.
pub const SHARED_DATA_MARKER: &str = "window._sharedData";

static JSON_SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script\b[^>]*\btype\s*=\s*["']application/json["'][^>]*>(.*?)</script>"#)
        .expect("valid regex")
});

/// Locates and deserializes the embedded page data.
///
/// # Errors
///
/// - `data_not_found` when neither the marker assignment nor a JSON script
///   block carrying `entry_data` is present.
/// - `parse_error` when the marker is present but the captured object is
///   unterminated or not valid JSON.
pub fn extract_profile_page(html: &str) -> Result<Value, ClassifiedError> {
    match find_marker_object(html) {
        MarkerScan::Found(span) => serde_json::from_str(span).map_err(|e| {
            ClassifiedError::parse(format!("embedded profile data is not valid JSON: {e}"))
        }),
        MarkerScan::Unterminated => Err(ClassifiedError::parse(
            "embedded profile data is truncated: object never closes",
        )),
        MarkerScan::NotAnObject => Err(ClassifiedError::parse(
            "embedded profile data is not a JSON object",
        )),
        MarkerScan::Absent => extract_json_script(html).ok_or_else(|| {
            ClassifiedError::data_not_found("profile data not found in page")
        }),
    }
}

/// Walks `entry_data.ProfilePage[0].graphql.user`.
///
/// # Errors
///
/// Returns `parse_error` naming the first missing step: the marker was
/// present, so a missing path means the document changed shape.
pub fn user_object(page: &Value) -> Result<&Map<String, Value>, ClassifiedError> {
    let shape_error = |step: &str| {
        ClassifiedError::parse(format!(
            "unexpected document shape: missing {step} in entry_data.ProfilePage[0].graphql.user"
        ))
    };

    let pages = page
        .get("entry_data")
        .ok_or_else(|| shape_error("entry_data"))?
        .get("ProfilePage")
        .and_then(Value::as_array)
        .ok_or_else(|| shape_error("ProfilePage"))?;
    let first = pages.first().ok_or_else(|| shape_error("ProfilePage[0]"))?;
    first
        .get("graphql")
        .ok_or_else(|| shape_error("graphql"))?
        .get("user")
        .and_then(Value::as_object)
        .ok_or_else(|| shape_error("user"))
}

#[derive(Debug, PartialEq, Eq)]
enum MarkerScan<'a> {
    Absent,
    Found(&'a str),
    Unterminated,
    NotAnObject,
}

/// Finds the first `window._sharedData = {` assignment and captures its
/// object. Occurrences that are not assignments (property reads, longer
/// identifiers) are skipped, as are assignments of non-objects; the latter
/// are reported only when no object assignment follows.
fn find_marker_object(html: &str) -> MarkerScan<'_> {
    let mut saw_non_object = false;
    for (idx, _) in html.match_indices(SHARED_DATA_MARKER) {
        let after = &html[idx + SHARED_DATA_MARKER.len()..];
        if after
            .chars()
            .next()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '$')
        {
            continue;
        }

        let Some(rhs) = after.trim_start().strip_prefix('=') else {
            continue;
        };
        // `==` / `===` comparisons are not assignments.
        if rhs.starts_with('=') {
            continue;
        }

        let rhs = rhs.trim_start();
        if !rhs.starts_with('{') {
            saw_non_object = true;
            continue;
        }
        return match extract_balanced_object(rhs) {
            Some(span) => MarkerScan::Found(span),
            None => MarkerScan::Unterminated,
        };
    }
    if saw_non_object {
        MarkerScan::NotAnObject
    } else {
        MarkerScan::Absent
    }
}

/// Returns the shortest prefix of `s` forming a complete `{...}` object.
///
/// Tracks nesting depth across `{}` and `[]`, skipping string literals and
/// escape sequences. `None` if the object never closes or the brackets are
/// mismatched.
pub(crate) fn extract_balanced_object(s: &str) -> Option<&str> {
    if !s.starts_with('{') {
        return None;
    }
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escape = false;
    for (i, c) in s.char_indices() {
        if escape {
            escape = false;
            continue;
        }
        if in_string {
            match c {
                '\\' => escape = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.pop() != Some(c) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// First `<script type="application/json">` block whose top-level object
/// carries `entry_data`.
fn extract_json_script(html: &str) -> Option<Value> {
    JSON_SCRIPT_RE
        .captures_iter(html)
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str().trim())
        .filter(|content| content.starts_with('{'))
        .filter_map(|content| serde_json::from_str::<Value>(content).ok())
        .find(|value| value.get("entry_data").is_some())
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
