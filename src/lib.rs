//! Quote aggregation for Polymarket parlays.
//!
//! This library pulls order-book data from the Polymarket CLOB and market
//! metadata from the Polyrouter aggregator, resolves loosely-specified market
//! references (event URLs, slugs, raw ids) into CLOB book ids, and prices
//! multi-leg parlays from per-leg probabilities.
//!
//! ```text
//! https://polymarket.com/event/x?tid=123
//!   ├─ token probe   POST /books [{token_id: 123}]   → book has levels? → token
//!   ├─ asset probe   POST /books [{asset_id: 123}]   → book has levels? → asset
//!   ├─ page scrape   GET page → ids → batched probes → first book with levels
//!   └─ unresolved
//! ```
//!
//! Every upstream request passes a per-upstream gate: a short TTL cache and a
//! sliding 60s admission window (30/min CLOB, 9/min Polyrouter). When the
//! window is full the last cached payload is served, stale or not.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`gate`]: TTL cache, sliding-window limiter and the request gate
//! - [`market`]: Upstream clients, quote operations and mocks
//! - [`orderbook`]: Canonical books and payload normalization
//! - [`resolver`]: Identifier resolution strategies
//! - [`parlay`]: Fair-value estimation
//! - [`api`]: HTTP API
//! - [`metrics`]: Prometheus metrics
//! - [`utils`]: Utility functions

pub mod api;
pub mod config;
pub mod error;
pub mod gate;
pub mod market;
pub mod metrics;
pub mod orderbook;
pub mod parlay;
pub mod resolver;
pub mod utils;

pub use config::Config;
pub use error::{QuoteError, Result, ServiceError};
