//! Per-upstream request gating.
//!
//! This module handles:
//! - The TTL cache each upstream client owns
//! - Sliding-window admission control
//! - The gate composing both around one upstream request

pub mod cache;
pub mod limiter;

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::QuoteError;
use crate::metrics;

pub use cache::TtlCache;
pub use limiter::{Admission, SlidingWindowLimiter, RATE_WINDOW};

/// Cache + limiter pair owned by one upstream client.
#[derive(Debug)]
pub struct RequestGate<V> {
    upstream: &'static str,
    cache: TtlCache<V>,
    limiter: SlidingWindowLimiter,
}

impl<V: Clone> RequestGate<V> {
    /// Create a gate for `upstream` with its own cache and window.
    pub fn new(upstream: &'static str, ttl: Duration, per_minute: usize) -> Self {
        Self {
            upstream,
            cache: TtlCache::new(ttl),
            limiter: SlidingWindowLimiter::per_minute(per_minute),
        }
    }

    /// Upstream label used in logs, metrics and throttle errors.
    pub fn upstream(&self) -> &'static str {
        self.upstream
    }

    /// The cache behind this gate.
    pub fn cache(&self) -> &TtlCache<V> {
        &self.cache
    }

    /// The limiter behind this gate.
    pub fn limiter(&self) -> &SlidingWindowLimiter {
        &self.limiter
    }

    /// Serve `key` from cache, or take a slot and run `request`.
    ///
    /// A fresh hit skips admission. When throttled, the last value stored for
    /// `key` is returned even if expired; with nothing stored the call fails
    /// with [`QuoteError::Throttled`]. Only successful responses are cached.
    pub async fn fetch<F, Fut>(&self, key: &str, request: F) -> Result<V, QuoteError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, QuoteError>>,
    {
        if let Some(hit) = self.cache.get(key) {
            metrics::inc_cache_hit(self.upstream);
            debug!(upstream = self.upstream, key, "cache hit");
            return Ok(hit);
        }
        metrics::inc_cache_miss(self.upstream);

        if self.limiter.admit() == Admission::Throttled {
            metrics::inc_throttled(self.upstream);
            if let Some(stale) = self.cache.get_stale(key) {
                metrics::inc_stale_served(self.upstream);
                warn!(upstream = self.upstream, key, "rate limited, serving stale cache");
                return Ok(stale);
            }
            warn!(upstream = self.upstream, key, "rate limited, nothing cached");
            return Err(QuoteError::Throttled {
                upstream: self.upstream,
            });
        }

        let _timer = metrics::timer_upstream_request(self.upstream);
        let value = request().await?;
        self.cache.set(key, value.clone());
        Ok(value)
    }
}
