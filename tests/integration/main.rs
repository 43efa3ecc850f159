//! Integration tests for the parlay quote service.
//!
//! Offline tests drive the public API against the in-memory upstreams.
//! Live tests hit the real CLOB and Polyrouter and are ignored by default.
//! Run them with: cargo test --test integration -- --ignored

mod api;
mod live;
mod resolve;

use std::sync::Arc;
use std::time::Duration;

use parlay_quotes::api::AppState;
use parlay_quotes::market::{MockDirectory, MockExchange};
use parlay_quotes::resolver::Resolver;

pub const TTL: Duration = Duration::from_secs(60);

/// Resolver over shared mock upstreams.
pub fn resolver(exchange: &MockExchange, directory: &MockDirectory) -> Resolver {
    Resolver::new(Arc::new(exchange.clone()), Arc::new(directory.clone()), TTL)
}

/// API state over shared mock upstreams.
pub fn state(exchange: &MockExchange, directory: &MockDirectory) -> AppState {
    AppState::new(Arc::new(exchange.clone()), Arc::new(directory.clone()), TTL)
}
