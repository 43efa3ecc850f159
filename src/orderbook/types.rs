//! Order book types and data structures.

use serde::{Deserialize, Serialize};

/// Single price level in an order book.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PriceLevel {
    /// Price at this level.
    pub price: f64,
    /// Total size available at this price.
    pub size: f64,
}

impl PriceLevel {
    /// Create a new price level.
    pub fn new(price: f64, size: f64) -> Self {
        Self { price, size }
    }
}

/// Canonical book for one outcome: sorted sides plus derived prices.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedBook {
    /// Token or asset id this book represents.
    pub id: String,
    /// Bid levels sorted by price descending.
    pub bids: Vec<PriceLevel>,
    /// Ask levels sorted by price ascending.
    pub asks: Vec<PriceLevel>,
    /// Average of best bid and ask, or whichever side exists.
    pub mid: Option<f64>,
    /// Highest bid.
    pub best_bid: Option<f64>,
    /// Lowest ask.
    pub best_ask: Option<f64>,
    /// `best_ask - best_bid` when both exist.
    pub spread: Option<f64>,
}

impl NormalizedBook {
    /// Build a book from unsorted sides, sorting and deriving prices.
    pub fn from_levels(id: impl Into<String>, mut bids: Vec<PriceLevel>, mut asks: Vec<PriceLevel>) -> Self {
        bids.sort_by(|a, b| b.price.total_cmp(&a.price));
        asks.sort_by(|a, b| a.price.total_cmp(&b.price));

        let best_bid = bids.first().map(|l| l.price);
        let best_ask = asks.first().map(|l| l.price);

        let (mid, spread) = match (best_bid, best_ask) {
            (Some(bid), Some(ask)) => (Some((bid + ask) / 2.0), Some(ask - bid)),
            (Some(bid), None) => (Some(bid), None),
            (None, Some(ask)) => (Some(ask), None),
            (None, None) => (None, None),
        };

        Self {
            id: id.into(),
            bids,
            asks,
            mid,
            best_bid,
            best_ask,
            spread,
        }
    }

    /// A book with no levels on either side.
    pub fn empty(id: impl Into<String>) -> Self {
        Self::from_levels(id, Vec::new(), Vec::new())
    }

    /// Check whether at least one bid or ask exists.
    pub fn has_levels(&self) -> bool {
        !self.bids.is_empty() || !self.asks.is_empty()
    }

    /// Check if the book is crossed (best_ask < best_bid).
    pub fn is_crossed(&self) -> bool {
        matches!(self.spread, Some(spread) if spread < 0.0)
    }
}
