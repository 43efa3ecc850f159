//! Polyrouter market-search aggregator client.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::client::{http_client_builder, read_json};
use super::source::{MarketDirectory, Params};
use crate::config::Config;
use crate::error::{QuoteError, ServiceError};
use crate::gate::RequestGate;

/// Label used for the aggregator in logs, metrics and throttle errors.
pub const POLYROUTER_UPSTREAM: &str = "polyrouter";

/// Polyrouter API client.
///
/// Responses are passed through as JSON. All calls share one gate: a 10s
/// payload cache and a 9/min admission window by default.
#[derive(Debug)]
pub struct AggregatorClient {
    /// HTTP client with the API key header installed.
    http: reqwest::Client,
    /// Base URL for Polyrouter.
    base_url: String,
    /// Cache + limiter for this upstream.
    gate: RequestGate<Value>,
}

impl AggregatorClient {
    /// Create a new aggregator client from config.
    pub fn new(config: &Config) -> Result<Self, ServiceError> {
        if !config.has_polyrouter_key() {
            warn!("POLYROUTER_API_KEY is not set, aggregator requests will likely be rejected");
        }

        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(config.polyrouter_api_key.trim())
            .map_err(|e| ServiceError::InvalidConfig(format!("POLYROUTER_API_KEY: {}", e)))?;
        headers.insert("X-API-Key", key);

        let http = http_client_builder(config.http_timeout(), &config.user_agent)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url: config.polyrouter_base.trim_end_matches('/').to_string(),
            gate: RequestGate::new(
                POLYROUTER_UPSTREAM,
                config.quote_cache_ttl(),
                config.polyrouter_rate_limit,
            ),
        })
    }

    /// Get the aggregator base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The gate in front of this upstream.
    pub fn gate(&self) -> &RequestGate<Value> {
        &self.gate
    }

    /// Gated `GET <path>?<params>`.
    async fn get(&self, path: &str, params: &Params) -> Result<Value, QuoteError> {
        let key = cache_key(path, params);

        self.gate
            .fetch(&key, || async {
                let response = self
                    .http
                    .get(format!("{}{}", self.base_url, path))
                    .query(params)
                    .send()
                    .await?;
                debug!(path, status = %response.status(), "polyrouter response");
                read_json(response).await
            })
            .await
    }
}

#[async_trait]
impl MarketDirectory for AggregatorClient {
    #[instrument(skip(self))]
    async fn platforms(&self) -> Result<Value, QuoteError> {
        self.get("/platforms", &Params::new()).await
    }

    #[instrument(skip(self))]
    async fn search(&self, q: &str, platform: &str, limit: u32) -> Result<Value, QuoteError> {
        let params = Params::from([
            ("q".to_string(), q.to_string()),
            ("platform".to_string(), platform.to_string()),
            ("limit".to_string(), limit.to_string()),
        ]);
        self.get("/search-v2", &params).await
    }

    #[instrument(skip(self))]
    async fn markets(&self, params: &Params) -> Result<Value, QuoteError> {
        self.get("/markets-v2", params).await
    }

    #[instrument(skip(self))]
    async fn events(&self, params: &Params) -> Result<Value, QuoteError> {
        self.get("/events-v2", params).await
    }
}

/// `path?{sorted params as JSON}`.
fn cache_key(path: &str, params: &Params) -> String {
    if params.is_empty() {
        return format!("{}?", path);
    }
    let encoded = serde_json::to_string(params).unwrap_or_default();
    format!("{}?{}", path, encoded)
}
