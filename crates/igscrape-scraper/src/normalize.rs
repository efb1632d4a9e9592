//! Normalization from the raw embedded user object to [`ProfileRecord`].
//!
//! Never fails: anything missing or of the wrong JSON type degrades to
//! `None`, `0` or `false`.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use igscrape_core::ProfileRecord;
use regex::Regex;
use serde_json::{Map, Value};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("valid email regex")
});

/// Normalizes `user`, stamping `fetched_at` with the current time.
#[must_use]
pub fn normalize_profile(user: &Map<String, Value>) -> ProfileRecord {
    normalize_profile_at(user, Utc::now())
}

/// Normalizes `user` with an explicit timestamp. Identical input and
/// timestamp always yield an identical record.
#[must_use]
pub fn normalize_profile_at(user: &Map<String, Value>, fetched_at: DateTime<Utc>) -> ProfileRecord {
    let bio = string_field(user, "biography");
    let email = bio.as_deref().and_then(extract_email);
    let profile_pic_url = string_field(user, "profile_pic_url");
    let profile_pic_url_hd = string_field(user, "profile_pic_url_hd");
    let profile_picture = profile_pic_url_hd.clone().or_else(|| profile_pic_url.clone());
    let last_post = latest_post(user);

    ProfileRecord {
        username: string_field(user, "username"),
        full_name: string_field(user, "full_name"),
        bio,
        external_url: string_field(user, "external_url"),
        email,
        follower_count: edge_count(user, "edge_followed_by"),
        following_count: edge_count(user, "edge_follow"),
        post_count: edge_count(user, "edge_owner_to_timeline_media"),
        profile_pic_url,
        profile_pic_url_hd,
        profile_picture,
        is_private: flag_field(user, "is_private"),
        is_verified: flag_field(user, "is_verified"),
        is_business_account: flag_field(user, "is_business_account"),
        business_category_name: string_field(user, "business_category_name"),
        website: string_field(user, "website"),
        user_id: id_field(user, "id"),
        category_name: string_field(user, "category_name"),
        business_email: string_field(user, "business_email"),
        business_phone_number: string_field(user, "business_phone_number"),
        highlight_reel_count: user
            .get("highlight_reel_count")
            .and_then(Value::as_u64)
            .unwrap_or(0),
        mutual_follower_count: edge_count(user, "edge_mutual_followed_by"),
        pronouns: string_list(user, "pronouns"),
        last_post_timestamp: last_post
            .and_then(|node| node.get("taken_at_timestamp"))
            .and_then(Value::as_i64),
        last_post_shortcode: last_post
            .and_then(|node| node.get("shortcode"))
            .and_then(Value::as_str)
            .map(str::to_owned),
        fetched_at: ProfileRecord::format_fetched_at(fetched_at),
    }
}

/// First email-shaped substring of `text`.
#[must_use]
pub fn extract_email(text: &str) -> Option<String> {
    if text.is_empty() {
        return None;
    }
    EMAIL_RE.find(text).map(|m| m.as_str().to_owned())
}

fn string_field(user: &Map<String, Value>, key: &str) -> Option<String> {
    user.get(key).and_then(Value::as_str).map(str::to_owned)
}

fn flag_field(user: &Map<String, Value>, key: &str) -> bool {
    user.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// Reads `user[key].count`; negative, fractional or missing counts are 0.
fn edge_count(user: &Map<String, Value>, key: &str) -> u64 {
    user.get(key)
        .and_then(|edge| edge.get("count"))
        .and_then(Value::as_u64)
        .unwrap_or(0)
}

/// Non-string entries are dropped; a missing or non-array field is empty.
fn string_list(user: &Map<String, Value>, key: &str) -> Vec<String> {
    user.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

/// `edge_owner_to_timeline_media.edges[0].node`, the newest post on the page.
fn latest_post(user: &Map<String, Value>) -> Option<&Value> {
    user.get("edge_owner_to_timeline_media")?
        .get("edges")?
        .get(0)?
        .get("node")
}

/// Ids arrive as strings on newer pages and as numbers on older ones.
fn id_field(user: &Map<String, Value>, key: &str) -> Option<String> {
    match user.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
