pub mod client;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod normalize;
pub mod request;
pub mod retry;

pub use client::{ClientConfig, ProfileClient};
pub use error::{classify_fetch, ClassifiedError, ErrorKind};
pub use extract::{extract_profile_page, user_object};
pub use fetch::{DocumentFetcher, FetchResult, Session};
pub use normalize::{extract_email, normalize_profile, normalize_profile_at};
pub use request::{JitterRange, RequestProfile};
pub use retry::{fetch_profile_with_retry, RetryPolicy};
