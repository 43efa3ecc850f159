//! Application configuration loaded from environment variables.

use std::time::Duration;

use serde::Deserialize;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Server Configuration ===
    /// HTTP server port.
    #[serde(default = "default_port")]
    pub port: u16,

    // === Exchange (CLOB) ===
    /// CLOB API base URL.
    #[serde(default = "default_polymarket_api")]
    pub polymarket_api: String,

    /// Requests admitted per rolling minute.
    #[serde(default = "default_clob_rate_limit")]
    pub clob_rate_limit: usize,

    // === Aggregator (Polyrouter) ===
    /// Polyrouter base URL.
    #[serde(default = "default_polyrouter_base")]
    pub polyrouter_base: String,

    /// Polyrouter API key, sent as `X-API-Key`.
    #[serde(default)]
    pub polyrouter_api_key: String,

    /// Requests admitted per rolling minute.
    #[serde(default = "default_polyrouter_rate_limit")]
    pub polyrouter_rate_limit: usize,

    // === HTTP / Caching ===
    /// Deadline applied to every upstream request.
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,

    /// TTL for cached upstream quote payloads.
    #[serde(default = "default_quote_cache_ttl_ms")]
    pub quote_cache_ttl_ms: u64,

    /// TTL for cached resolution results.
    #[serde(default = "default_resolve_cache_ttl_ms")]
    pub resolve_cache_ttl_ms: u64,

    /// User-Agent sent upstream.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    // === Logging ===
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Enable verbose logging.
    #[serde(default)]
    pub verbose: bool,
}

/// Filter used when verbose logging is requested.
pub const VERBOSE_LOG_FILTER: &str = "parlay_quotes=debug,info";

fn default_port() -> u16 {
    3001
}

fn default_polymarket_api() -> String {
    "https://clob.polymarket.com".to_string()
}

fn default_clob_rate_limit() -> usize {
    30
}

fn default_polyrouter_base() -> String {
    "https://api.polyrouter.io/functions/v1".to_string()
}

fn default_polyrouter_rate_limit() -> usize {
    9
}

fn default_http_timeout_ms() -> u64 {
    12_000
}

fn default_quote_cache_ttl_ms() -> u64 {
    10_000
}

fn default_resolve_cache_ttl_ms() -> u64 {
    60_000
}

fn default_user_agent() -> String {
    "parlay-backend/0.1 (+https://localhost)".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            polymarket_api: default_polymarket_api(),
            clob_rate_limit: default_clob_rate_limit(),
            polyrouter_base: default_polyrouter_base(),
            polyrouter_api_key: String::new(),
            polyrouter_rate_limit: default_polyrouter_rate_limit(),
            http_timeout_ms: default_http_timeout_ms(),
            quote_cache_ttl_ms: default_quote_cache_ttl_ms(),
            resolve_cache_ttl_ms: default_resolve_cache_ttl_ms(),
            user_agent: default_user_agent(),
            rust_log: default_log_level(),
            verbose: false,
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if url::Url::parse(&self.polymarket_api).is_err() {
            return Err(format!("POLYMARKET_API is not a valid URL: {}", self.polymarket_api));
        }

        if url::Url::parse(&self.polyrouter_base).is_err() {
            return Err(format!("POLYROUTER_BASE is not a valid URL: {}", self.polyrouter_base));
        }

        if self.http_timeout_ms == 0 {
            return Err("HTTP_TIMEOUT_MS must be greater than 0".to_string());
        }

        if self.clob_rate_limit == 0 || self.polyrouter_rate_limit == 0 {
            return Err("rate limits must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Upstream request deadline.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    /// TTL for cached quote payloads.
    pub fn quote_cache_ttl(&self) -> Duration {
        Duration::from_millis(self.quote_cache_ttl_ms)
    }

    /// TTL for cached resolution results.
    pub fn resolve_cache_ttl(&self) -> Duration {
        Duration::from_millis(self.resolve_cache_ttl_ms)
    }

    /// Whether an aggregator API key is configured.
    pub fn has_polyrouter_key(&self) -> bool {
        !self.polyrouter_api_key.trim().is_empty()
    }

    /// Tracing filter directive: crate debug under `VERBOSE`, else `RUST_LOG`.
    pub fn log_filter(&self) -> &str {
        if self.verbose {
            VERBOSE_LOG_FILTER
        } else {
            &self.rust_log
        }
    }
}
