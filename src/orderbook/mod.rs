//! Order book module for quote data.
//!
//! This module handles:
//! - Canonical book types and derived prices
//! - Normalization of heterogeneous upstream payloads

pub mod normalizer;
pub mod types;

pub use normalizer::{normalize_book, normalize_books};
pub use types::{NormalizedBook, PriceLevel};
