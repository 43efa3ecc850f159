//! Market data module for the exchange and the aggregator.
//!
//! This module handles:
//! - Market types and data structures
//! - Polymarket CLOB client and Polyrouter aggregator client
//! - Quote operations (batch books, order books, prices, listings)
//! - Mock upstreams for testing

pub mod aggregator;
pub mod client;
pub mod mock;
pub mod quotes;
pub mod source;
pub mod types;

pub use aggregator::AggregatorClient;
pub use client::ClobClient;
pub use mock::{MockConfig, MockDirectory, MockDirectoryConfig, MockExchange};
pub use quotes::{fetch_books_by_token_ids, fetch_orderbook, list_markets, market_price, raw_book};
pub use source::{ExchangeApi, MarketDirectory, Params, DEFAULT_PLATFORM, DEFAULT_SEARCH_LIMIT};
pub use types::{AggregatorMarket, BookQuery, IdKind, MarketOutcome, MarketPrice, MarketSummary};
