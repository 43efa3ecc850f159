//! Keyed TTL cache with expiry checked on read.

use std::time::{Duration, Instant};

use dashmap::DashMap;

/// One cached value and when it was stored.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    stored_at: Instant,
    value: V,
}

/// Key → value store with a fixed per-instance TTL.
///
/// Expired entries are not removed on read; they stay until the next `set`
/// for the same key so the throttled path can still serve them through
/// [`TtlCache::get_stale`]. There is no background sweep.
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
    ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    /// Create an empty cache whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Entry lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get the value if it was stored no more than `ttl` ago.
    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    /// Same as [`TtlCache::get`] evaluated at `now`.
    pub fn get_at(&self, key: &str, now: Instant) -> Option<V> {
        let entry = self.entries.get(key)?;
        if now.saturating_duration_since(entry.stored_at) <= self.ttl {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    /// Get the last stored value regardless of age.
    pub fn get_stale(&self, key: &str) -> Option<V> {
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Store `value`, replacing any previous entry.
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_at(key, value, Instant::now());
    }

    /// Same as [`TtlCache::set`] with an explicit store time.
    pub fn set_at(&self, key: impl Into<String>, value: V, now: Instant) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                stored_at: now,
                value,
            },
        );
    }

    /// Number of keys held, fresh or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache holds no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
