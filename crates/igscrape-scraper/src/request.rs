//! Per-call request shaping: a randomized user agent, a fixed set of
//! browser headers, and a jitter delay awaited before the request goes out.

use std::time::Duration;

use rand::seq::IndexedRandom;
use rand::Rng;

/// Desktop browser user agents. One is picked uniformly per request.
pub const USER_AGENTS: [&str; 6] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4_1) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.2478.67",
];

/// Headers sent with every request alongside the randomized `User-Agent`.
pub const BROWSER_HEADERS: [(&str, &str); 5] = [
    (
        "accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
    ),
    ("accept-language", "en-US,en;q=0.9"),
    ("accept-encoding", "gzip, deflate, br"),
    ("connection", "keep-alive"),
    ("cache-control", "no-cache"),
];

/// Inclusive bounds, in milliseconds, for the pre-request jitter delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JitterRange {
    min_ms: u64,
    max_ms: u64,
}

impl JitterRange {
    /// No delay at all.
    pub const NONE: Self = Self { min_ms: 0, max_ms: 0 };

    /// Bounds given in either order are accepted; they are sorted.
    #[must_use]
    pub const fn new(a_ms: u64, b_ms: u64) -> Self {
        if a_ms <= b_ms {
            Self { min_ms: a_ms, max_ms: b_ms }
        } else {
            Self { min_ms: b_ms, max_ms: a_ms }
        }
    }

    /// A zero-width range that always yields `delay`.
    #[must_use]
    pub fn fixed(delay: Duration) -> Self {
        let ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        Self::new(ms, ms)
    }

    #[must_use]
    pub fn min_ms(&self) -> u64 {
        self.min_ms
    }

    #[must_use]
    pub fn max_ms(&self) -> u64 {
        self.max_ms
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        Duration::from_millis(rng.random_range(self.min_ms..=self.max_ms))
    }
}

impl Default for JitterRange {
    fn default() -> Self {
        Self::new(500, 3_000)
    }
}

/// Identifying headers and timing for exactly one outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestProfile {
    user_agent: &'static str,
    headers: &'static [(&'static str, &'static str)],
    jitter_delay: Duration,
}

impl RequestProfile {
    /// Builds a profile using the thread-local RNG.
    #[must_use]
    pub fn build(jitter: &JitterRange) -> Self {
        Self::build_with(&mut rand::rng(), jitter)
    }

    /// Builds a profile from an explicit RNG so selection can be reproduced.
    pub fn build_with<R: Rng + ?Sized>(rng: &mut R, jitter: &JitterRange) -> Self {
        let user_agent = USER_AGENTS.choose(rng).copied().unwrap_or(USER_AGENTS[0]);
        Self {
            user_agent,
            headers: &BROWSER_HEADERS,
            jitter_delay: jitter.sample(rng),
        }
    }

    #[must_use]
    pub fn user_agent(&self) -> &'static str {
        self.user_agent
    }

    #[must_use]
    pub fn headers(&self) -> &'static [(&'static str, &'static str)] {
        self.headers
    }

    #[must_use]
    pub fn jitter_delay(&self) -> Duration {
        self.jitter_delay
    }
}
