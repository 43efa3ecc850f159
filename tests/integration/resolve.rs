use parlay_quotes::market::{BookQuery, IdKind, MockConfig, MockDirectory, MockDirectoryConfig, MockExchange};
use parlay_quotes::resolver::{ResolutionKind, ResolutionResult};
use parlay_quotes::QuoteError;
use pretty_assertions::assert_eq;
use serde_json::json;

use super::resolver;

#[tokio::test]
async fn encoded_url_resolves_through_tid() {
    let exchange = MockExchange::new();
    exchange.set_book(IdKind::Token, "8812", &[(0.41, 20.0)], &[(0.44, 15.0)]);
    let resolver = resolver(&exchange, &MockDirectory::new());

    let result = resolver
        .resolve("\"https://polymarket.com/event/will-it-rain%3Ftid%3D8812\"")
        .await;

    assert_eq!(result, ResolutionResult::found(IdKind::Token, "8812"));
    assert_eq!(exchange.recorded_batches(), vec![vec![BookQuery::token("8812")]]);
    assert_eq!(exchange.page_calls(), 0);
}

#[tokio::test]
async fn scraped_asset_id_is_found_after_token_ids_miss() {
    let url = "https://polymarket.com/event/election";
    let exchange = MockExchange::new();
    exchange.set_page(url, r#"<script>{"token_id":"111","asset_id":"222"}</script>"#);
    exchange.set_book(IdKind::Asset, "222", &[], &[(0.6, 3.0)]);
    let resolver = resolver(&exchange, &MockDirectory::new());

    let result = resolver.resolve(url).await;

    assert_eq!(result.kind, ResolutionKind::Asset);
    assert_eq!(result.id, "222");
    assert!(result.has_book);
    assert_eq!(exchange.page_calls(), 1);
}

#[tokio::test]
async fn unreachable_page_leaves_url_unresolved() {
    let url = "https://polymarket.com/event/gone";
    let exchange = MockExchange::new();
    let resolver = resolver(&exchange, &MockDirectory::new());

    let result = resolver.resolve(url).await;

    assert_eq!(result, ResolutionResult::unresolved(url));
    assert!(!result.is_resolved());
}

#[tokio::test]
async fn unresolved_results_are_cached_too() {
    let exchange = MockExchange::new();
    let resolver = resolver(&exchange, &MockDirectory::new());

    let first = resolver.resolve("404").await;
    let calls = exchange.books_calls();
    let second = resolver.resolve("404").await;

    assert_eq!(first, second);
    assert_eq!(exchange.books_calls(), calls);
}

#[tokio::test]
async fn market_id_uses_first_clob_token() {
    let directory = MockDirectory::new();
    directory.add_market(json!({
        "id": "pr-1",
        "platform_id": "516725",
        "title": "Rain in NYC?",
        "metadata": { "clobTokenIds": ["t-yes", "t-no"] },
        "outcomes": [{ "id": 1, "name": "Yes" }, { "id": 2, "name": "No" }]
    }));
    let resolver = resolver(&MockExchange::new(), &directory);

    let result = resolver.resolve_by_market_id("516725").await.unwrap();

    assert_eq!(result.kind, ResolutionKind::Token);
    assert_eq!(result.id, "t-yes");
    let market = result.market.expect("market ref");
    assert_eq!(market.clob_token_ids, Some(vec!["t-yes".to_string(), "t-no".to_string()]));
    assert_eq!(market.title.as_deref(), Some("Rain in NYC?"));

    let cached = resolver.resolve_by_market_id("516725").await.unwrap();
    assert_eq!(cached.id, "t-yes");
    assert_eq!(directory.calls(), 1);
}

#[tokio::test]
async fn missing_market_is_not_found() {
    let resolver = resolver(&MockExchange::new(), &MockDirectory::new());

    let err = resolver.resolve_by_market_id("nope").await.unwrap_err();
    assert!(matches!(err, QuoteError::NotFound(_)));
}

#[tokio::test]
async fn event_slug_skips_markets_without_tokens() {
    let directory = MockDirectory::new();
    directory.add_market(json!({ "id": "a", "title": "no tokens" }));
    directory.add_market(json!({
        "id": "b",
        "title": "with tokens",
        "metadata": { "clobTokenIds": ["tok-b"] }
    }));
    let resolver = resolver(&MockExchange::new(), &directory);

    let result = resolver.resolve_by_event_slug("rain-in-nyc").await.unwrap();

    assert_eq!(result.kind, ResolutionKind::Token);
    assert_eq!(result.id, "tok-b");
    assert_eq!(
        result.market.and_then(|m| m.title).as_deref(),
        Some("with tokens")
    );
}

#[tokio::test]
async fn throttled_search_surfaces_and_failed_search_does_not() {
    let throttled = MockDirectory::with_config(MockDirectoryConfig {
        throttled: true,
        ..Default::default()
    });
    let resolver_a = resolver(&MockExchange::new(), &throttled);
    let err = resolver_a.resolve_by_event_slug("x").await.unwrap_err();
    assert!(err.is_throttled());

    let failing = MockDirectory::with_config(MockDirectoryConfig {
        fail: true,
        ..Default::default()
    });
    let resolver_b = resolver(&MockExchange::new(), &failing);
    let result = resolver_b.resolve_by_event_slug("x").await.unwrap();
    assert_eq!(result, ResolutionResult::unresolved("x"));
    assert!(resolver_b.cache().is_empty());
}

#[tokio::test]
async fn failing_exchange_never_errors_resolution() {
    let exchange = MockExchange::with_config(MockConfig {
        fail_books: true,
        ..Default::default()
    });
    let resolver = resolver(&exchange, &MockDirectory::new());

    let result = resolver.resolve("https://polymarket.com/event/x?tid=9").await;
    assert_eq!(result, ResolutionResult::unresolved("9"));
}
