use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `strftime` pattern for [`ProfileRecord::fetched_at`]. Fixed width, UTC, so
/// timestamps sort lexicographically.
pub const FETCHED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// A public social profile, normalized into a stable shape regardless of
/// which fields the upstream page happened to include.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub external_url: Option<String>,
    /// First email address found in the bio, if any.
    pub email: Option<String>,
    pub follower_count: u64,
    pub following_count: u64,
    pub post_count: u64,
    pub profile_pic_url: Option<String>,
    pub profile_pic_url_hd: Option<String>,
    /// `profile_pic_url_hd` when present, else `profile_pic_url`.
    pub profile_picture: Option<String>,
    pub is_private: bool,
    pub is_verified: bool,
    pub is_business_account: bool,
    pub business_category_name: Option<String>,
    pub website: Option<String>,
    /// Numeric account id, kept as a string to avoid precision loss.
    pub user_id: Option<String>,
    pub category_name: Option<String>,
    /// Contact address published through the business profile, as-is.
    pub business_email: Option<String>,
    pub business_phone_number: Option<String>,
    pub highlight_reel_count: u64,
    pub mutual_follower_count: u64,
    /// Empty when the account lists none.
    pub pronouns: Vec<String>,
    /// Unix seconds of the most recent post in the embedded timeline.
    pub last_post_timestamp: Option<i64>,
    pub last_post_shortcode: Option<String>,
    /// Normalization time formatted with [`FETCHED_AT_FORMAT`].
    pub fetched_at: String,
}

impl ProfileRecord {
    /// Formats `at` the way `fetched_at` is stored.
    #[must_use]
    pub fn format_fetched_at(at: DateTime<Utc>) -> String {
        at.format(FETCHED_AT_FORMAT).to_string()
    }
}
