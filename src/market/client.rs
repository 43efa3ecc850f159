//! Polymarket CLOB API client.

use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use super::source::ExchangeApi;
use super::types::BookQuery;
use crate::config::Config;
use crate::error::{QuoteError, ServiceError};
use crate::gate::RequestGate;

/// Label used for the exchange in logs, metrics and throttle errors.
pub const CLOB_UPSTREAM: &str = "clob";

/// Market listing paths, tried in order.
const MARKET_LIST_PATHS: [&str; 3] = ["/markets", "/api/markets", "/v1/markets"];

/// Polymarket CLOB API client.
///
/// Every exchange call goes through one [`RequestGate`]: a 10s payload cache
/// and a 30/min admission window by default.
#[derive(Debug)]
pub struct ClobClient {
    /// HTTP client for API requests.
    http: reqwest::Client,
    /// Base URL for CLOB API.
    base_url: String,
    /// Cache + limiter for this upstream.
    gate: RequestGate<Value>,
}

impl ClobClient {
    /// Create a new CLOB client from config.
    pub fn new(config: &Config) -> Result<Self, ServiceError> {
        let http = build_http_client(config.http_timeout(), &config.user_agent)?;

        Ok(Self {
            http,
            base_url: config.polymarket_api.trim_end_matches('/').to_string(),
            gate: RequestGate::new(CLOB_UPSTREAM, config.quote_cache_ttl(), config.clob_rate_limit),
        })
    }

    /// Get the CLOB base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The gate in front of this upstream.
    pub fn gate(&self) -> &RequestGate<Value> {
        &self.gate
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, QuoteError> {
        let response = self.http.get(self.url(path)).query(query).send().await?;
        read_json(response).await
    }

    async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value, QuoteError> {
        let response = self.http.post(self.url(path)).json(body).send().await?;
        read_json(response).await
    }

    /// Try each request in order and return the first success.
    async fn first_success(&self, requests: &[(String, Vec<(&str, String)>)]) -> Result<Value, QuoteError> {
        let mut last_err = QuoteError::Transport("no paths to try".to_string());

        for (path, query) in requests {
            let query: Vec<(&str, &str)> = query.iter().map(|(k, v)| (*k, v.as_str())).collect();
            match self.get_json(path, &query).await {
                Ok(data) => {
                    debug!(path = %path, "GET ok");
                    return Ok(data);
                }
                Err(e) => {
                    debug!(path = %path, error = %e, "GET failed");
                    last_err = e;
                }
            }
        }

        Err(last_err)
    }
}

#[async_trait]
impl ExchangeApi for ClobClient {
    #[instrument(skip(self, queries), fields(count = queries.len()))]
    async fn books(&self, queries: &[BookQuery]) -> Result<Value, QuoteError> {
        let body = serde_json::to_string(queries).map_err(|e| QuoteError::Malformed(e.to_string()))?;
        let key = format!("POST:/books:{}", body);

        self.gate
            .fetch(&key, || self.post_json("/books", queries))
            .await
    }

    #[instrument(skip(self, query), fields(kind = %query.kind, id = %query.id))]
    async fn book(&self, query: &BookQuery) -> Result<Value, QuoteError> {
        let key = format!("GET:/book:{}", query.as_param());
        let params = [(query.kind.field(), query.id.as_str())];

        self.gate.fetch(&key, || self.get_json("/book", &params)).await
    }

    #[instrument(skip(self))]
    async fn book_by_post(&self, token_id: &str) -> Result<Value, QuoteError> {
        let key = format!("POST:/book:token_ids={}", token_id);
        let body = json!({ "token_ids": [token_id] });

        self.gate
            .fetch(&key, || async {
                let data = self.post_json("/book", &body).await?;
                Ok(first_payload(data))
            })
            .await
    }

    #[instrument(skip(self))]
    async fn book_untyped(&self, id: &str) -> Result<Value, QuoteError> {
        let key = format!("GET:/book:any={}", id);
        let segment = utf8_percent_encode(id, NON_ALPHANUMERIC).to_string();

        let requests = vec![
            ("/book".to_string(), vec![("token_id", id.to_string())]),
            ("/book".to_string(), vec![("asset_id", id.to_string())]),
            (format!("/markets/{}/orderbook", segment), vec![]),
            (format!("/orderbook/{}", segment), vec![]),
            ("/book".to_string(), vec![("market", id.to_string())]),
            (format!("/api/markets/{}/orderbook", segment), vec![]),
        ];

        self.gate.fetch(&key, || self.first_success(&requests)).await
    }

    #[instrument(skip(self))]
    async fn markets(&self) -> Result<Value, QuoteError> {
        let requests: Vec<(String, Vec<(&str, String)>)> = MARKET_LIST_PATHS
            .iter()
            .map(|p| (p.to_string(), Vec::new()))
            .collect();

        self.gate
            .fetch("GET:/markets", || self.first_success(&requests))
            .await
    }

    #[instrument(skip(self))]
    async fn page(&self, url: &str) -> Result<String, QuoteError> {
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(QuoteError::Transport(format!("HTTP {}", response.status())));
        }
        Ok(response.text().await?)
    }
}

/// First element of an array response, or the response itself.
fn first_payload(data: Value) -> Value {
    match data {
        Value::Array(items) => items.into_iter().next().unwrap_or(Value::Null),
        other => other,
    }
}

/// Builder for upstream clients with the request deadline applied.
pub(crate) fn http_client_builder(timeout: Duration, user_agent: &str) -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(5)))
        .user_agent(user_agent)
        // Keep connections alive for reuse
        .pool_idle_timeout(Duration::from_secs(90))
}

/// Build the shared reqwest client with the upstream deadline applied.
pub(crate) fn build_http_client(timeout: Duration, user_agent: &str) -> Result<reqwest::Client, reqwest::Error> {
    http_client_builder(timeout, user_agent).build()
}

/// Check the status and parse the body as JSON.
pub(crate) async fn read_json(response: reqwest::Response) -> Result<Value, QuoteError> {
    let status = response.status();
    if !status.is_success() {
        return Err(QuoteError::Transport(format!("HTTP {}", status)));
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| QuoteError::Malformed(format!("failed to parse response: {}", e)))
}
