use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

pub const DEFAULT_BASE_URL: &str = "https://www.instagram.com";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let env = parse_environment(&or_default("IGSCRAPE_ENV", "development"));
    let bind_addr = parse_addr("IGSCRAPE_BIND_ADDR", "0.0.0.0:5000")?;
    let log_level = or_default("IGSCRAPE_LOG_LEVEL", "info");

    let base_url = or_default("IGSCRAPE_BASE_URL", DEFAULT_BASE_URL)
        .trim_end_matches('/')
        .to_string();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(invalid(
            "IGSCRAPE_BASE_URL",
            format!("\"{base_url}\" must start with http:// or https://"),
        ));
    }

    let request_timeout_secs = parse_u64("IGSCRAPE_REQUEST_TIMEOUT_SECS", "30")?;
    let jitter_min_ms = parse_u64("IGSCRAPE_JITTER_MIN_MS", "500")?;
    let jitter_max_ms = parse_u64("IGSCRAPE_JITTER_MAX_MS", "3000")?;
    if jitter_min_ms > jitter_max_ms {
        return Err(invalid(
            "IGSCRAPE_JITTER_MIN_MS",
            format!("{jitter_min_ms} exceeds IGSCRAPE_JITTER_MAX_MS ({jitter_max_ms})"),
        ));
    }

    let max_concurrent_fetches = parse_usize("IGSCRAPE_MAX_CONCURRENT_FETCHES", "8")?;
    if max_concurrent_fetches == 0 {
        return Err(invalid(
            "IGSCRAPE_MAX_CONCURRENT_FETCHES",
            "must be at least 1".to_string(),
        ));
    }

    let max_retries = parse_u32("IGSCRAPE_MAX_RETRIES", "0")?;
    let retry_backoff_base_secs = parse_u64("IGSCRAPE_RETRY_BACKOFF_BASE_SECS", "5")?;

    let session_id = lookup("INSTAGRAM_SESSION_ID")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        base_url,
        request_timeout_secs,
        jitter_min_ms,
        jitter_max_ms,
        max_concurrent_fetches,
        max_retries,
        retry_backoff_base_secs,
        session_id,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
