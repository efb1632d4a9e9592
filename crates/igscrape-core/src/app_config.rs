use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// Origin profile pages are fetched from, without a trailing slash.
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub jitter_min_ms: u64,
    pub jitter_max_ms: u64,
    pub max_concurrent_fetches: usize,
    pub max_retries: u32,
    pub retry_backoff_base_secs: u64,
    /// `sessionid` cookie value; `None` fetches anonymously.
    pub session_id: Option<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("base_url", &self.base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("jitter_min_ms", &self.jitter_min_ms)
            .field("jitter_max_ms", &self.jitter_max_ms)
            .field("max_concurrent_fetches", &self.max_concurrent_fetches)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_secs", &self.retry_backoff_base_secs)
            .field("session_id", &self.session_id.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}
