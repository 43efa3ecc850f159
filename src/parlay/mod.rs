//! Parlay pricing module.
//!
//! This module handles:
//! - Multi-leg bet requests and per-leg probabilities
//! - Combined probability, decimal odds and fair value

pub mod fair_value;

pub use fair_value::{compute_fair_value, price_legs, FairValueRequest, FairValueResult, Leg};
