//! Resolution strategies and the runner that tries them in order.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};

use super::input::ResolveInput;
use super::scrape::{scrape_ids, MAX_SCRAPED_IDS};
use super::types::ResolutionResult;
use crate::market::source::ExchangeApi;
use crate::market::types::{BookQuery, IdKind};
use crate::orderbook::normalizer::{normalize_book, payload_id};

/// Result of one strategy attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyOutcome {
    /// A non-empty book was confirmed.
    Found(ResolutionResult),
    /// Nothing usable; the next strategy runs.
    NotFound,
}

/// One way of turning an input into a confirmed book id.
///
/// Upstream failures count as [`StrategyOutcome::NotFound`].
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Try to resolve `input`.
    async fn attempt(&self, exchange: &dyn ExchangeApi, input: &ResolveInput) -> StrategyOutcome;
}

/// Probe the candidate as a single-id `/books` batch of one namespace.
#[derive(Debug, Clone, Copy)]
pub struct BookProbe {
    kind: IdKind,
}

impl BookProbe {
    /// Probe the candidate as a token id.
    pub fn token() -> Self {
        Self { kind: IdKind::Token }
    }

    /// Probe the candidate as an asset id.
    pub fn asset() -> Self {
        Self { kind: IdKind::Asset }
    }
}

#[async_trait]
impl Strategy for BookProbe {
    fn name(&self) -> &'static str {
        match self.kind {
            IdKind::Token => "token_probe",
            IdKind::Asset => "asset_probe",
        }
    }

    async fn attempt(&self, exchange: &dyn ExchangeApi, input: &ResolveInput) -> StrategyOutcome {
        if input.candidate.is_empty() {
            return StrategyOutcome::NotFound;
        }
        probe(exchange, self.kind, std::slice::from_ref(&input.candidate)).await
    }
}

/// Fetch the input page and probe every id found on it.
///
/// Token candidates go in one batch, then asset candidates in another.
#[derive(Debug, Clone, Copy)]
pub struct PageScrape {
    max_ids: usize,
}

impl PageScrape {
    /// Scrape at most `max_ids` ids of each kind.
    pub fn new(max_ids: usize) -> Self {
        Self { max_ids }
    }
}

impl Default for PageScrape {
    fn default() -> Self {
        Self::new(MAX_SCRAPED_IDS)
    }
}

#[async_trait]
impl Strategy for PageScrape {
    fn name(&self) -> &'static str {
        "page_scrape"
    }

    async fn attempt(&self, exchange: &dyn ExchangeApi, input: &ResolveInput) -> StrategyOutcome {
        let Some(url) = input.page_url() else {
            return StrategyOutcome::NotFound;
        };

        let html = match exchange.page(url).await {
            Ok(html) => html,
            Err(e) => {
                debug!(url, error = %e, "page fetch failed");
                return StrategyOutcome::NotFound;
            }
        };

        let ids = scrape_ids(&html, self.max_ids);
        if ids.is_empty() {
            debug!(url, "no ids on page");
            return StrategyOutcome::NotFound;
        }
        debug!(tokens = ids.tokens.len(), assets = ids.assets.len(), "scraped ids");

        if let found @ StrategyOutcome::Found(_) = probe(exchange, IdKind::Token, &ids.tokens).await {
            return found;
        }
        probe(exchange, IdKind::Asset, &ids.assets).await
    }
}

/// One `/books` batch; the first returned book with levels wins.
///
/// Only as many books as ids were requested are considered. The hit's id is
/// the one its payload names, else the requested id at the same position.
async fn probe(exchange: &dyn ExchangeApi, kind: IdKind, ids: &[String]) -> StrategyOutcome {
    if ids.is_empty() {
        return StrategyOutcome::NotFound;
    }

    let queries: Vec<BookQuery> = ids
        .iter()
        .map(|id| BookQuery {
            kind,
            id: id.clone(),
        })
        .collect();

    let raw = match exchange.books(&queries).await {
        Ok(raw) => raw,
        Err(e) => {
            debug!(%kind, error = %e, "probe failed");
            return StrategyOutcome::NotFound;
        }
    };

    let entries: Vec<&Value> = match &raw {
        Value::Array(items) => items.iter().collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    };

    entries
        .into_iter()
        .zip(ids)
        .find(|(entry, id)| normalize_book(entry, id).has_levels())
        .map(|(entry, id)| {
            let found_id = payload_id(entry).unwrap_or_else(|| id.clone());
            StrategyOutcome::Found(ResolutionResult::found(kind, found_id))
        })
        .unwrap_or(StrategyOutcome::NotFound)
}

/// Ordered strategy list, stopping at the first hit.
pub struct StrategyRunner {
    strategies: Vec<Box<dyn Strategy>>,
}

impl std::fmt::Debug for StrategyRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.strategies.iter().map(|s| s.name()).collect();
        f.debug_struct("StrategyRunner").field("strategies", &names).finish()
    }
}

impl StrategyRunner {
    /// Run `strategies` in the given order.
    pub fn new(strategies: Vec<Box<dyn Strategy>>) -> Self {
        Self { strategies }
    }

    /// Token probe, asset probe, page scrape.
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(BookProbe::token()),
            Box::new(BookProbe::asset()),
            Box::new(PageScrape::default()),
        ])
    }

    /// Strategy names in run order.
    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// First hit, or `None` when every strategy comes up empty.
    #[instrument(skip(self, exchange, input), fields(candidate = %input.candidate))]
    pub async fn run(&self, exchange: &dyn ExchangeApi, input: &ResolveInput) -> Option<ResolutionResult> {
        for strategy in &self.strategies {
            match strategy.attempt(exchange, input).await {
                StrategyOutcome::Found(result) => {
                    debug!(strategy = strategy.name(), id = %result.id, "strategy hit");
                    return Some(result);
                }
                StrategyOutcome::NotFound => {
                    debug!(strategy = strategy.name(), "strategy miss");
                }
            }
        }
        None
    }
}

impl Default for StrategyRunner {
    fn default() -> Self {
        Self::standard()
    }
}
