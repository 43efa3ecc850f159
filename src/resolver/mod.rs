//! Identifier resolution for loosely-specified market references.
//!
//! This module handles:
//! - Input cleanup (wrappers, percent-encoding, `tid` extraction)
//! - Ordered resolution strategies (token probe, asset probe, page scrape)
//! - Aggregator-backed lookups by market id and event slug
//! - Caching of resolution results

pub mod input;
pub mod scrape;
pub mod strategy;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::error::QuoteError;
use crate::gate::TtlCache;
use crate::market::source::{ExchangeApi, MarketDirectory};
use crate::market::types::IdKind;
use crate::metrics;

pub use input::ResolveInput;
pub use strategy::{BookProbe, PageScrape, Strategy, StrategyOutcome, StrategyRunner};
pub use types::{MarketRef, ResolutionKind, ResolutionResult};

/// Resolves URLs, slugs and raw ids into exchange book ids.
pub struct Resolver {
    exchange: Arc<dyn ExchangeApi>,
    directory: Arc<dyn MarketDirectory>,
    runner: StrategyRunner,
    cache: TtlCache<ResolutionResult>,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("runner", &self.runner)
            .field("cached", &self.cache.len())
            .finish()
    }
}

impl Resolver {
    /// Resolver with the standard strategy order.
    pub fn new(exchange: Arc<dyn ExchangeApi>, directory: Arc<dyn MarketDirectory>, ttl: Duration) -> Self {
        Self::with_runner(exchange, directory, StrategyRunner::standard(), ttl)
    }

    /// Resolver with a custom strategy list.
    pub fn with_runner(
        exchange: Arc<dyn ExchangeApi>,
        directory: Arc<dyn MarketDirectory>,
        runner: StrategyRunner,
        ttl: Duration,
    ) -> Self {
        Self {
            exchange,
            directory,
            runner,
            cache: TtlCache::new(ttl),
        }
    }

    /// The resolution cache.
    pub fn cache(&self) -> &TtlCache<ResolutionResult> {
        &self.cache
    }

    /// Resolve a URL or raw id. Never fails.
    ///
    /// Strategies run in order until one confirms a non-empty book; if none
    /// does, the result is unresolved with the candidate id.
    #[instrument(skip(self))]
    pub async fn resolve(&self, raw: &str) -> ResolutionResult {
        let input = ResolveInput::parse(raw);
        let key = format!("input:{}", input.original);

        if let Some(hit) = self.cache.get(&key) {
            return hit;
        }

        let result = match self.runner.run(self.exchange.as_ref(), &input).await {
            Some(result) => result,
            None => ResolutionResult::unresolved(input.candidate.clone()),
        };

        self.record(&key, &result);
        result
    }

    /// Resolve a market by aggregator or platform id.
    ///
    /// Fails with [`QuoteError::NotFound`] when the aggregator has no such
    /// market; upstream failures surface unchanged.
    #[instrument(skip(self))]
    pub async fn resolve_by_market_id(&self, market_id: &str) -> Result<ResolutionResult, QuoteError> {
        let market_id = market_id.trim();
        let key = format!("market:{}", market_id);

        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let market = self
            .directory
            .market_by_id(market_id)
            .await?
            .ok_or_else(|| QuoteError::NotFound(format!("market {}", market_id)))?;

        let market_ref = MarketRef::from_market(&market, market_id);
        let result = match market.clob_token_ids().and_then(<[String]>::first) {
            Some(first) => ResolutionResult::found(IdKind::Token, first.clone()).with_market(market_ref),
            None => ResolutionResult::unresolved(market_id).with_market(MarketRef {
                market_id: market_id.to_string(),
                ..market_ref
            }),
        };

        self.record(&key, &result);
        Ok(result)
    }

    /// Resolve an event slug through aggregator search.
    ///
    /// The first market with CLOB token ids wins. Search failures other than
    /// throttling give an uncached unresolved result.
    #[instrument(skip(self))]
    pub async fn resolve_by_event_slug(&self, slug: &str) -> Result<ResolutionResult, QuoteError> {
        let slug = slug.trim();
        let key = format!("slug:{}", slug);

        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let markets = match self.directory.search_markets(slug).await {
            Ok(markets) => markets,
            Err(e) if e.is_throttled() => return Err(e),
            Err(e) => {
                warn!(error = %e, "event search failed");
                return Ok(ResolutionResult::unresolved(slug));
            }
        };

        let result = markets
            .iter()
            .find_map(|m| {
                let first = m.clob_token_ids()?.first()?;
                Some(ResolutionResult::found(IdKind::Token, first.clone()).with_market(MarketRef::from_market(m, slug)))
            })
            .unwrap_or_else(|| ResolutionResult::unresolved(slug));

        self.record(&key, &result);
        Ok(result)
    }

    fn record(&self, key: &str, result: &ResolutionResult) {
        metrics::inc_resolution(result.kind.as_str());
        if result.is_resolved() {
            info!(kind = result.kind.as_str(), id = %result.id, "resolved");
        } else {
            info!(id = %result.id, "no book found");
        }
        self.cache.set(key, result.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::mock::{MockConfig, MockDirectory, MockDirectoryConfig, MockExchange};
    use crate::market::types::BookQuery;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const TTL: Duration = Duration::from_secs(60);

    fn resolver(exchange: &MockExchange, directory: &MockDirectory) -> Resolver {
        Resolver::new(Arc::new(exchange.clone()), Arc::new(directory.clone()), TTL)
    }

    #[tokio::test]
    async fn token_book_resolves_without_scraping() {
        let exchange = MockExchange::new();
        exchange.set_book(IdKind::Token, "123", &[(0.45, 10.0)], &[(0.55, 10.0)]);
        let resolver = resolver(&exchange, &MockDirectory::new());

        let result = resolver.resolve("https://polymarket.com/event/x?tid=123").await;

        assert_eq!(result, ResolutionResult::found(IdKind::Token, "123"));
        assert_eq!(exchange.books_calls(), 1);
        assert_eq!(exchange.page_calls(), 0);
    }

    #[tokio::test]
    async fn asset_probe_runs_after_empty_token_book() {
        let exchange = MockExchange::new();
        exchange.set_book(IdKind::Asset, "77", &[(0.1, 1.0)], &[]);
        let resolver = resolver(&exchange, &MockDirectory::new());

        let result = resolver.resolve("77").await;

        assert_eq!(result.kind, ResolutionKind::Asset);
        assert!(result.has_book);
        assert_eq!(
            exchange.recorded_batches(),
            vec![vec![BookQuery::token("77")], vec![BookQuery::asset("77")]]
        );
    }

    #[tokio::test]
    async fn raw_id_never_scrapes() {
        let exchange = MockExchange::new();
        let resolver = resolver(&exchange, &MockDirectory::new());

        let result = resolver.resolve("  [\"999\"] ").await;

        assert_eq!(result, ResolutionResult::unresolved("999"));
        assert_eq!(exchange.page_calls(), 0);
    }

    #[tokio::test]
    async fn url_falls_back_to_scrape() {
        let url = "https://polymarket.com/event/rain";
        let exchange = MockExchange::new();
        exchange.set_page(url, r#"<a href="/book?token_id=4242">"#);
        exchange.set_book(IdKind::Token, "4242", &[(0.3, 5.0)], &[]);
        let resolver = resolver(&exchange, &MockDirectory::new());

        let result = resolver.resolve(url).await;

        assert_eq!(result, ResolutionResult::found(IdKind::Token, "4242"));
        assert_eq!(exchange.page_calls(), 1);
        assert_eq!(exchange.books_calls(), 3);
    }

    #[tokio::test]
    async fn page_without_ids_skips_book_batches() {
        let url = "https://polymarket.com/event/quiet";
        let exchange = MockExchange::new();
        exchange.set_page(url, "<html>nothing here</html>");
        let resolver = resolver(&exchange, &MockDirectory::new());

        let result = resolver.resolve(url).await;

        assert!(!result.is_resolved());
        assert_eq!(exchange.page_calls(), 1);
        assert_eq!(exchange.books_calls(), 2);
    }

    #[tokio::test]
    async fn throttled_probes_are_swallowed() {
        let exchange = MockExchange::with_config(MockConfig {
            throttled: true,
            ..Default::default()
        });
        let resolver = resolver(&exchange, &MockDirectory::new());

        let result = resolver.resolve("5").await;
        assert_eq!(result, ResolutionResult::unresolved("5"));
    }

    #[tokio::test]
    async fn resolution_is_idempotent_and_cached() {
        let exchange = MockExchange::new();
        exchange.set_book(IdKind::Token, "1", &[(0.5, 1.0)], &[]);
        let resolver = resolver(&exchange, &MockDirectory::new());

        let first = resolver.resolve("1").await;
        let second = resolver.resolve(" 1 ").await;

        assert_eq!(first, second);
        assert_eq!(exchange.books_calls(), 1);
        assert_eq!(resolver.cache().len(), 1);
    }

    #[tokio::test]
    async fn market_id_with_clob_ids_resolves_to_first_token() {
        let directory = MockDirectory::new();
        directory.add_market(json!({
            "id": "pr-1",
            "platform_id": "516725",
            "title": "Rain?",
            "metadata": { "clobTokenIds": ["111", "222"] },
            "outcomes": [{ "id": "y", "name": "Yes" }, { "id": "n", "name": "No" }]
        }));
        let resolver = resolver(&MockExchange::new(), &directory);

        let result = resolver.resolve_by_market_id("516725").await.unwrap();

        assert_eq!(result.kind, ResolutionKind::Token);
        assert_eq!(result.id, "111");
        assert!(result.has_book);
        let market = result.market.unwrap();
        assert_eq!(market.market_id, "516725");
        assert_eq!(market.clob_token_ids, Some(vec!["111".to_string(), "222".to_string()]));
        assert_eq!(market.title.as_deref(), Some("Rain?"));
    }

    #[tokio::test]
    async fn market_without_clob_ids_is_unresolved() {
        let directory = MockDirectory::new();
        directory.add_market(json!({ "id": "pr-2", "outcomes": ["Yes", "No"] }));
        let resolver = resolver(&MockExchange::new(), &directory);

        let result = resolver.resolve_by_market_id("pr-2").await.unwrap();

        assert_eq!(result.kind, ResolutionKind::Unresolved);
        assert_eq!(result.id, "pr-2");
        assert!(!result.has_book);
        assert_eq!(result.market.unwrap().clob_token_ids, None);
    }

    #[tokio::test]
    async fn null_outcomes_still_resolve_by_market_id() {
        let directory = MockDirectory::new();
        directory.add_market(json!({
            "id": "pr-1",
            "platform_id": "516725",
            "outcomes": null,
            "metadata": { "clobTokenIds": ["111", "222"] }
        }));
        let resolver = resolver(&MockExchange::new(), &directory);

        let result = resolver.resolve_by_market_id("516725").await.unwrap();

        assert_eq!(result.kind, ResolutionKind::Token);
        assert_eq!(result.id, "111");
        assert!(result.market.unwrap().outcomes.is_empty());
    }

    #[tokio::test]
    async fn string_clob_ids_leave_market_unresolved() {
        let directory = MockDirectory::new();
        directory.add_market(json!({
            "id": "pr-2",
            "title": "Encoded ids",
            "metadata": { "clobTokenIds": "[\"111\",\"222\"]" }
        }));
        let resolver = resolver(&MockExchange::new(), &directory);

        let result = resolver.resolve_by_market_id("pr-2").await.unwrap();

        assert_eq!(result.kind, ResolutionKind::Unresolved);
        assert_eq!(result.id, "pr-2");
        let market = result.market.unwrap();
        assert_eq!(market.clob_token_ids, None);
        assert_eq!(market.title.as_deref(), Some("Encoded ids"));
    }

    #[tokio::test]
    async fn unknown_market_is_not_found() {
        let resolver = resolver(&MockExchange::new(), &MockDirectory::new());

        let err = resolver.resolve_by_market_id("nope").await.unwrap_err();
        assert_eq!(err, QuoteError::NotFound("market nope".to_string()));
    }

    #[tokio::test]
    async fn market_lookup_failure_surfaces() {
        let directory = MockDirectory::with_config(MockDirectoryConfig {
            fail: true,
            ..Default::default()
        });
        let resolver = resolver(&MockExchange::new(), &directory);

        let err = resolver.resolve_by_market_id("1").await.unwrap_err();
        assert!(matches!(err, QuoteError::Transport(_)));
    }

    #[tokio::test]
    async fn slug_picks_first_market_with_clob_ids() {
        let directory = MockDirectory::new();
        directory.add_market(json!({ "id": "a", "title": "no ids" }));
        directory.add_market(json!({ "id": "b", "metadata": { "clobTokenIds": ["555"] } }));
        let resolver = resolver(&MockExchange::new(), &directory);

        let result = resolver.resolve_by_event_slug("rain-tomorrow").await.unwrap();

        assert_eq!(result.id, "555");
        assert_eq!(result.market.unwrap().market_id, "b");
    }

    #[tokio::test]
    async fn slug_search_failure_is_unresolved_and_not_cached() {
        let directory = MockDirectory::with_config(MockDirectoryConfig {
            fail: true,
            ..Default::default()
        });
        let resolver = resolver(&MockExchange::new(), &directory);

        let result = resolver.resolve_by_event_slug("rain").await.unwrap();

        assert_eq!(result, ResolutionResult::unresolved("rain"));
        assert!(resolver.cache().is_empty());
    }

    #[tokio::test]
    async fn slug_search_throttling_surfaces() {
        let directory = MockDirectory::with_config(MockDirectoryConfig {
            throttled: true,
            ..Default::default()
        });
        let resolver = resolver(&MockExchange::new(), &directory);

        let err = resolver.resolve_by_event_slug("rain").await.unwrap_err();
        assert!(err.is_throttled());
    }
}
