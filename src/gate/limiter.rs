//! Sliding-window admission control.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Length of the rolling window.
pub const RATE_WINDOW: Duration = Duration::from_secs(60);

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Admission {
    /// The request was recorded and may proceed.
    Admitted,
    /// The window is full; nothing was recorded.
    Throttled,
}

/// Caps requests to `cap` per rolling [`RATE_WINDOW`].
///
/// The window lock is held only for the trim-and-push, never across an await.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    cap: usize,
    window: Duration,
    hits: Mutex<VecDeque<Instant>>,
}

impl SlidingWindowLimiter {
    /// Create a limiter admitting `cap` requests per minute.
    pub fn per_minute(cap: usize) -> Self {
        Self::new(cap, RATE_WINDOW)
    }

    /// Create a limiter with an explicit window length.
    pub fn new(cap: usize, window: Duration) -> Self {
        Self {
            cap,
            window,
            hits: Mutex::new(VecDeque::with_capacity(cap)),
        }
    }

    /// Requests allowed per window.
    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Try to take a slot now.
    pub fn admit(&self) -> Admission {
        self.admit_at(Instant::now())
    }

    /// Try to take a slot at `now`.
    pub fn admit_at(&self, now: Instant) -> Admission {
        let mut hits = self.hits.lock().unwrap_or_else(PoisonError::into_inner);

        while let Some(oldest) = hits.front() {
            if now.saturating_duration_since(*oldest) > self.window {
                hits.pop_front();
            } else {
                break;
            }
        }

        if hits.len() >= self.cap {
            return Admission::Throttled;
        }

        hits.push_back(now);
        Admission::Admitted
    }

    /// Slots currently taken (without trimming).
    pub fn in_flight(&self) -> usize {
        self.hits.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
