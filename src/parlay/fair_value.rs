//! Fair value of a parlay built from binary markets.
//!
//! Legs are treated as independent and multiplied, then scaled by
//! `1 - covariance` as a rough correlation correction.

use serde::{Deserialize, Serialize};

/// Lower bound for any leg or combined probability.
pub const MIN_PROBABILITY: f64 = 1e-6;
/// Upper bound for any leg or combined probability.
pub const MAX_PROBABILITY: f64 = 1.0 - 1e-6;
/// Covariance is clamped to `[-MAX_COVARIANCE, MAX_COVARIANCE]`.
pub const MAX_COVARIANCE: f64 = 0.5;
/// YES probability assumed when none is supplied.
pub const DEFAULT_PROBABILITY: f64 = 0.5;

/// Parlay pricing request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FairValueRequest {
    /// Market ids, one per leg. Informational only.
    #[serde(default)]
    pub base_markets: Vec<String>,
    /// Whether each leg bets on YES.
    #[serde(default)]
    pub outcomes: Vec<bool>,
    /// YES probability per leg; ignored unless there is one per outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probs: Option<Vec<f64>>,
    /// Correlation adjustment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub covariance: Option<f64>,
}

impl FairValueRequest {
    /// Legs with probabilities filled in.
    ///
    /// Probabilities are clamped to `[0, 1]`; non-finite values and missing or
    /// mismatched lists fall back to 0.5.
    pub fn legs(&self) -> Vec<Leg> {
        let supplied = self.probs.as_ref().filter(|p| p.len() == self.outcomes.len());

        self.outcomes
            .iter()
            .enumerate()
            .map(|(i, &outcome_is_yes)| {
                let yes_probability = supplied
                    .map(|p| sanitize_probability(p[i]))
                    .unwrap_or(DEFAULT_PROBABILITY);
                Leg {
                    yes_probability,
                    outcome_is_yes,
                }
            })
            .collect()
    }
}

/// One leg of a parlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Leg {
    /// Probability the market resolves YES, in `[0, 1]`.
    pub yes_probability: f64,
    /// Whether the leg bets on YES.
    pub outcome_is_yes: bool,
}

impl Leg {
    /// Probability this leg wins, clamped away from 0 and 1.
    pub fn win_probability(&self) -> f64 {
        let p = if self.outcome_is_yes {
            self.yes_probability
        } else {
            1.0 - self.yes_probability
        };
        p.clamp(MIN_PROBABILITY, MAX_PROBABILITY)
    }
}

/// Priced parlay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FairValueResult {
    /// Expected payout per unit stake; equal to `probability`.
    pub fair_value: f64,
    /// Combined win probability.
    pub probability: f64,
    /// Decimal odds, `1 / probability`.
    pub odds: f64,
}

/// Price a parlay request.
pub fn compute_fair_value(request: &FairValueRequest) -> FairValueResult {
    price_legs(&request.legs(), request.covariance.unwrap_or(0.0))
}

/// Price explicit legs with a covariance adjustment.
pub fn price_legs(legs: &[Leg], covariance: f64) -> FairValueResult {
    let independent: f64 = legs.iter().map(Leg::win_probability).product();

    let covariance = if covariance.is_finite() {
        covariance.clamp(-MAX_COVARIANCE, MAX_COVARIANCE)
    } else {
        0.0
    };
    let probability = (independent * (1.0 - covariance)).clamp(MIN_PROBABILITY, MAX_PROBABILITY);

    FairValueResult {
        fair_value: probability,
        probability,
        odds: 1.0 / probability,
    }
}

fn sanitize_probability(p: f64) -> f64 {
    if p.is_finite() {
        p.clamp(0.0, 1.0)
    } else {
        DEFAULT_PROBABILITY
    }
}
