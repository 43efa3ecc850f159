//! Prometheus metrics for upstream traffic and resolution outcomes.
//!
//! This module provides metrics for:
//! - Upstream request latency per upstream
//! - Cache hits and misses per upstream
//! - Throttled admissions and stale cache serves
//! - Resolution outcomes by kind

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::debug;

// === Metric Name Constants ===

/// Upstream request latency metric name.
pub const METRIC_UPSTREAM_REQUEST_LATENCY: &str = "upstream_request_latency_ms";
/// Cache hits counter metric name.
pub const METRIC_CACHE_HITS: &str = "cache_hits_total";
/// Cache misses counter metric name.
pub const METRIC_CACHE_MISSES: &str = "cache_misses_total";
/// Throttled admissions counter metric name.
pub const METRIC_THROTTLED: &str = "upstream_throttled_total";
/// Stale cache serves counter metric name.
pub const METRIC_STALE_SERVED: &str = "stale_cache_served_total";
/// Resolutions counter metric name.
pub const METRIC_RESOLUTIONS: &str = "resolutions_total";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    describe_histogram!(
        METRIC_UPSTREAM_REQUEST_LATENCY,
        "Upstream request latency in milliseconds"
    );
    describe_counter!(METRIC_CACHE_HITS, "Requests served from a fresh cache entry");
    describe_counter!(METRIC_CACHE_MISSES, "Requests that missed the cache");
    describe_counter!(METRIC_THROTTLED, "Requests refused by the sliding-window limiter");
    describe_counter!(
        METRIC_STALE_SERVED,
        "Throttled requests answered from an expired cache entry"
    );
    describe_counter!(METRIC_RESOLUTIONS, "Identifier resolutions by outcome kind");

    debug!("Metrics initialized");
}

/// Install the Prometheus recorder and return its render handle.
pub fn install_prometheus() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    init_metrics();
    Ok(handle)
}

/// Record upstream request latency.
pub fn record_upstream_latency(start: Instant, upstream: &'static str) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_UPSTREAM_REQUEST_LATENCY, "upstream" => upstream).record(latency_ms);
}

/// Increment cache hit counter.
pub fn inc_cache_hit(upstream: &'static str) {
    counter!(METRIC_CACHE_HITS, "upstream" => upstream).increment(1);
}

/// Increment cache miss counter.
pub fn inc_cache_miss(upstream: &'static str) {
    counter!(METRIC_CACHE_MISSES, "upstream" => upstream).increment(1);
}

/// Increment throttled counter.
pub fn inc_throttled(upstream: &'static str) {
    counter!(METRIC_THROTTLED, "upstream" => upstream).increment(1);
}

/// Increment stale-served counter.
pub fn inc_stale_served(upstream: &'static str) {
    counter!(METRIC_STALE_SERVED, "upstream" => upstream).increment(1);
}

/// Increment resolution counter.
pub fn inc_resolution(kind: &'static str) {
    counter!(METRIC_RESOLUTIONS, "kind" => kind).increment(1);
}

/// RAII guard for timing upstream requests.
/// Automatically records latency when dropped.
pub struct LatencyTimer {
    start: Instant,
    upstream: &'static str,
}

impl LatencyTimer {
    /// Create a new latency timer for the given upstream.
    pub fn new(upstream: &'static str) -> Self {
        Self {
            start: Instant::now(),
            upstream,
        }
    }

    /// Get elapsed time in milliseconds (without recording).
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        record_upstream_latency(self.start, self.upstream);
    }
}

/// Create a latency timer for one upstream request.
pub fn timer_upstream_request(upstream: &'static str) -> LatencyTimer {
    LatencyTimer::new(upstream)
}
