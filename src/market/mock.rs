//! Mock upstreams for unit testing.
//!
//! This module provides in-memory [`ExchangeApi`] and [`MarketDirectory`]
//! implementations that can be used in tests without making real network
//! requests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::{json, Value};

use super::aggregator::POLYROUTER_UPSTREAM;
use super::client::CLOB_UPSTREAM;
use super::source::{ExchangeApi, MarketDirectory, Params, DEFAULT_PLATFORM};
use super::types::{BookQuery, IdKind};
use crate::error::QuoteError;
use crate::orderbook::normalizer::id_string;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Configuration for mock exchange behavior.
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Whether to fail `books` requests.
    pub fail_books: bool,
    /// Whether to fail single-book `GET` requests (typed and untyped).
    pub fail_book: bool,
    /// Whether to fail `POST /book` requests.
    pub fail_book_post: bool,
    /// Whether to fail market listing requests.
    pub fail_markets: bool,
    /// Whether every request reports the upstream as throttled.
    pub throttled: bool,
    /// Simulated latency in milliseconds.
    pub latency_ms: u64,
}

/// Mock order-book exchange for testing.
///
/// Books are stored as raw payloads keyed by namespace and id; unknown ids
/// answer with an empty book carrying the requested id.
#[derive(Debug, Clone, Default)]
pub struct MockExchange {
    /// Mock configuration.
    config: MockConfig,
    /// Raw book payloads.
    books: Arc<Mutex<HashMap<BookQuery, Value>>>,
    /// Payloads answered by `POST /book`, by token id.
    posted_books: Arc<Mutex<HashMap<String, Value>>>,
    /// Every token id sent to `POST /book`, in order.
    post_requests: Arc<Mutex<Vec<String>>>,
    /// Page bodies by URL.
    pages: Arc<Mutex<HashMap<String, String>>>,
    /// Raw market listing.
    markets: Arc<Mutex<Value>>,
    /// Every `books` batch received, in order.
    batches: Arc<Mutex<Vec<Vec<BookQuery>>>>,
    /// Every page URL fetched, in order.
    page_requests: Arc<Mutex<Vec<String>>>,
}

impl MockExchange {
    /// Create a new mock exchange with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock exchange with custom configuration.
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Store a book built from `(price, size)` pairs.
    pub fn set_book(&self, kind: IdKind, id: &str, bids: &[(f64, f64)], asks: &[(f64, f64)]) {
        let levels = |side: &[(f64, f64)]| -> Vec<Value> {
            side.iter()
                .map(|(price, size)| json!({ "price": price.to_string(), "size": size.to_string() }))
                .collect()
        };

        let mut payload = json!({ "bids": levels(bids), "asks": levels(asks) });
        payload[kind.field()] = Value::String(id.to_string());

        self.set_raw_book(
            BookQuery {
                kind,
                id: id.to_string(),
            },
            payload,
        );
    }

    /// Store an arbitrary payload for a query.
    pub fn set_raw_book(&self, query: BookQuery, payload: Value) {
        lock(&self.books).insert(query, payload);
    }

    /// Answer `POST /book` for `token_id` with `payload`.
    pub fn set_posted_book(&self, token_id: &str, payload: Value) {
        lock(&self.posted_books).insert(token_id.to_string(), payload);
    }

    /// Number of `POST /book` requests received.
    pub fn book_post_calls(&self) -> usize {
        lock(&self.post_requests).len()
    }

    /// Serve `body` for `url`.
    pub fn set_page(&self, url: &str, body: &str) {
        lock(&self.pages).insert(url.to_string(), body.to_string());
    }

    /// Set the raw market listing.
    pub fn set_markets(&self, listing: Value) {
        *lock(&self.markets) = listing;
    }

    /// Number of `books` requests received.
    pub fn books_calls(&self) -> usize {
        lock(&self.batches).len()
    }

    /// Every `books` batch received, in order.
    pub fn recorded_batches(&self) -> Vec<Vec<BookQuery>> {
        lock(&self.batches).clone()
    }

    /// Number of page fetches.
    pub fn page_calls(&self) -> usize {
        lock(&self.page_requests).len()
    }

    /// Clear all mock data and recorded calls.
    pub fn clear(&self) {
        lock(&self.books).clear();
        lock(&self.posted_books).clear();
        lock(&self.post_requests).clear();
        lock(&self.pages).clear();
        *lock(&self.markets) = Value::Null;
        lock(&self.batches).clear();
        lock(&self.page_requests).clear();
    }

    async fn simulate(&self) -> Result<(), QuoteError> {
        if self.config.latency_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.config.latency_ms)).await;
        }
        if self.config.throttled {
            return Err(QuoteError::Throttled {
                upstream: CLOB_UPSTREAM,
            });
        }
        Ok(())
    }

    fn stored_or_empty(&self, query: &BookQuery) -> Value {
        lock(&self.books).get(query).cloned().unwrap_or_else(|| {
            let mut empty = json!({ "bids": [], "asks": [] });
            empty[query.kind.field()] = Value::String(query.id.clone());
            empty
        })
    }
}

#[async_trait]
impl ExchangeApi for MockExchange {
    async fn books(&self, queries: &[BookQuery]) -> Result<Value, QuoteError> {
        lock(&self.batches).push(queries.to_vec());
        self.simulate().await?;

        if self.config.fail_books {
            return Err(QuoteError::Transport("Mock books failure".to_string()));
        }

        Ok(Value::Array(queries.iter().map(|q| self.stored_or_empty(q)).collect()))
    }

    async fn book(&self, query: &BookQuery) -> Result<Value, QuoteError> {
        self.simulate().await?;

        if self.config.fail_book {
            return Err(QuoteError::Transport("Mock book failure".to_string()));
        }

        Ok(self.stored_or_empty(query))
    }

    async fn book_by_post(&self, token_id: &str) -> Result<Value, QuoteError> {
        lock(&self.post_requests).push(token_id.to_string());
        self.simulate().await?;

        if self.config.fail_book_post {
            return Err(QuoteError::Transport("Mock book post failure".to_string()));
        }

        Ok(lock(&self.posted_books)
            .get(token_id)
            .cloned()
            .unwrap_or_else(|| self.stored_or_empty(&BookQuery::token(token_id))))
    }

    async fn book_untyped(&self, id: &str) -> Result<Value, QuoteError> {
        self.simulate().await?;

        if self.config.fail_book {
            return Err(QuoteError::Transport("Mock book failure".to_string()));
        }

        let books = lock(&self.books);
        let hit = books
            .get(&BookQuery::token(id))
            .or_else(|| books.get(&BookQuery::asset(id)))
            .cloned();
        hit.ok_or_else(|| QuoteError::Transport(format!("no book at any path for {}", id)))
    }

    async fn markets(&self) -> Result<Value, QuoteError> {
        self.simulate().await?;

        if self.config.fail_markets {
            return Err(QuoteError::Transport("Mock markets failure".to_string()));
        }

        Ok(lock(&self.markets).clone())
    }

    async fn page(&self, url: &str) -> Result<String, QuoteError> {
        lock(&self.page_requests).push(url.to_string());

        lock(&self.pages)
            .get(url)
            .cloned()
            .ok_or_else(|| QuoteError::Transport("HTTP 404 Not Found".to_string()))
    }
}

/// Configuration for mock directory behavior.
#[derive(Debug, Clone, Default)]
pub struct MockDirectoryConfig {
    /// Whether requests fail with a transport error.
    pub fail: bool,
    /// Whether requests report the aggregator as throttled.
    pub throttled: bool,
}

/// Mock market-search aggregator for testing.
///
/// `markets` filters the configured markets by the `id` parameter when one is
/// given; `search` returns every configured market in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MockDirectory {
    /// Mock configuration.
    config: MockDirectoryConfig,
    /// Raw market entries.
    markets: Arc<Mutex<Vec<Value>>>,
    /// Raw event entries.
    events: Arc<Mutex<Vec<Value>>>,
    /// Every request received as `(path, params)`.
    requests: Arc<Mutex<Vec<(String, Params)>>>,
}

impl MockDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory with custom configuration.
    pub fn with_config(config: MockDirectoryConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Add a market from its aggregator JSON.
    pub fn add_market(&self, market: Value) {
        lock(&self.markets).push(market);
    }

    /// Add an event from its aggregator JSON.
    pub fn add_event(&self, event: Value) {
        lock(&self.events).push(event);
    }

    /// Number of requests received.
    pub fn calls(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Every request received as `(path, params)`, in order.
    pub fn recorded_requests(&self) -> Vec<(String, Params)> {
        lock(&self.requests).clone()
    }

    fn simulate(&self, path: &str, params: Params) -> Result<(), QuoteError> {
        lock(&self.requests).push((path.to_string(), params));

        if self.config.throttled {
            return Err(QuoteError::Throttled {
                upstream: POLYROUTER_UPSTREAM,
            });
        }
        if self.config.fail {
            return Err(QuoteError::Transport("Mock directory failure".to_string()));
        }
        Ok(())
    }
}

/// Page size from `limit`, unbounded when absent or unparseable.
fn limit_of(params: &Params) -> usize {
    params
        .get("limit")
        .and_then(|l| l.parse().ok())
        .unwrap_or(usize::MAX)
}

#[async_trait]
impl MarketDirectory for MockDirectory {
    async fn platforms(&self) -> Result<Value, QuoteError> {
        self.simulate("/platforms", Params::new())?;
        Ok(json!({ "platforms": [{ "id": DEFAULT_PLATFORM, "name": "Polymarket" }] }))
    }

    async fn search(&self, q: &str, platform: &str, limit: u32) -> Result<Value, QuoteError> {
        self.simulate(
            "/search-v2",
            Params::from([
                ("q".to_string(), q.to_string()),
                ("platform".to_string(), platform.to_string()),
                ("limit".to_string(), limit.to_string()),
            ]),
        )?;

        let markets: Vec<Value> = lock(&self.markets).iter().take(limit as usize).cloned().collect();
        Ok(json!({ "markets": markets }))
    }

    async fn markets(&self, params: &Params) -> Result<Value, QuoteError> {
        self.simulate("/markets-v2", params.clone())?;

        let wanted = params.get("id");
        let markets: Vec<Value> = lock(&self.markets)
            .iter()
            .filter(|m| {
                wanted.map_or(true, |id| {
                    ["id", "platform_id"]
                        .iter()
                        .filter_map(|k| m.get(*k).and_then(id_string))
                        .any(|v| &v == id)
                })
            })
            .take(limit_of(params))
            .cloned()
            .collect();
        Ok(json!({ "markets": markets }))
    }

    async fn events(&self, params: &Params) -> Result<Value, QuoteError> {
        self.simulate("/events-v2", params.clone())?;

        let events: Vec<Value> = lock(&self.events).iter().take(limit_of(params)).cloned().collect();
        Ok(json!({ "events": events }))
    }
}
