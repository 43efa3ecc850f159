//! Upstream traits the quote operations and resolver are written against.
//!
//! [`ClobClient`](super::ClobClient) and
//! [`AggregatorClient`](super::AggregatorClient) implement these over HTTP;
//! [`mock`](super::mock) provides in-memory versions for tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use super::types::{markets_from_response, AggregatorMarket, BookQuery};
use crate::error::QuoteError;

/// Aggregator query parameters; sorted so equal sets produce equal cache keys.
pub type Params = BTreeMap<String, String>;

/// Platform every typed lookup is scoped to.
pub const DEFAULT_PLATFORM: &str = "polymarket";

/// Default search page size.
pub const DEFAULT_SEARCH_LIMIT: u32 = 10;

/// Page size for market lookups by id.
const MARKET_LOOKUP_LIMIT: u32 = 5;

/// Order-book exchange (Polymarket CLOB).
#[async_trait]
pub trait ExchangeApi: Send + Sync {
    /// `POST /books`: raw response for a batch of queries.
    async fn books(&self, queries: &[BookQuery]) -> Result<Value, QuoteError>;

    /// `GET /book?token_id=` or `?asset_id=`: raw single book.
    async fn book(&self, query: &BookQuery) -> Result<Value, QuoteError>;

    /// `POST /book` with `{ token_ids: [id] }`: the first returned payload.
    async fn book_by_post(&self, token_id: &str) -> Result<Value, QuoteError>;

    /// Single book for an id of unknown namespace.
    async fn book_untyped(&self, id: &str) -> Result<Value, QuoteError>;

    /// Raw market listing.
    async fn markets(&self) -> Result<Value, QuoteError>;

    /// Fetch an arbitrary page as text.
    async fn page(&self, url: &str) -> Result<String, QuoteError>;
}

/// Market-search aggregator (Polyrouter).
///
/// Implementors supply the raw endpoints; the typed lookups used by the
/// resolver are built on top of them.
#[async_trait]
pub trait MarketDirectory: Send + Sync {
    /// `GET /platforms`.
    async fn platforms(&self) -> Result<Value, QuoteError>;

    /// `GET /search-v2?q&platform&limit`.
    async fn search(&self, q: &str, platform: &str, limit: u32) -> Result<Value, QuoteError>;

    /// `GET /markets-v2` with arbitrary filters.
    async fn markets(&self, params: &Params) -> Result<Value, QuoteError>;

    /// `GET /events-v2` with arbitrary filters.
    async fn events(&self, params: &Params) -> Result<Value, QuoteError>;

    /// Look a market up by aggregator or platform id.
    ///
    /// Prefers the entry whose id or platform id equals `market_id`, else the
    /// first one returned.
    async fn market_by_id(&self, market_id: &str) -> Result<Option<AggregatorMarket>, QuoteError> {
        let params = Params::from([
            ("id".to_string(), market_id.to_string()),
            ("platform".to_string(), DEFAULT_PLATFORM.to_string()),
            ("limit".to_string(), MARKET_LOOKUP_LIMIT.to_string()),
        ]);
        let data = self.markets(&params).await?;
        Ok(pick_market(markets_from_response(&data), market_id))
    }

    /// Free-text market search on the Polymarket platform.
    async fn search_markets(&self, query: &str) -> Result<Vec<AggregatorMarket>, QuoteError> {
        let data = self.search(query, DEFAULT_PLATFORM, DEFAULT_SEARCH_LIMIT).await?;
        Ok(markets_from_response(&data))
    }
}

/// Prefer the market whose id or platform id equals `market_id`, else the first.
pub fn pick_market(markets: Vec<AggregatorMarket>, market_id: &str) -> Option<AggregatorMarket> {
    let exact = markets.iter().position(|m| m.matches_id(market_id));
    markets.into_iter().nth(exact.unwrap_or(0))
}
