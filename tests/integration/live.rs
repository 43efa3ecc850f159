use std::sync::Arc;

use parlay_quotes::config::Config;
use parlay_quotes::market::{fetch_orderbook, list_markets, AggregatorClient, ClobClient, MarketDirectory};
use parlay_quotes::resolver::Resolver;

/// Config from the environment, if a Polyrouter key is present.
fn live_config() -> Option<Config> {
    dotenvy::dotenv().ok();
    let config = Config::load().ok()?;
    config.has_polyrouter_key().then_some(config)
}

#[tokio::test]
#[ignore = "requires network access"]
async fn test_clob_market_listing() {
    dotenvy::dotenv().ok();
    let config = Config::load().unwrap_or_default();
    let clob = ClobClient::new(&config).unwrap();

    let markets = list_markets(&clob).await;
    println!("Found {} markets", markets.len());
    assert!(!markets.is_empty(), "CLOB listing should not be empty");
}

#[tokio::test]
#[ignore = "requires network access"]
async fn test_unknown_id_has_empty_orderbook() {
    dotenvy::dotenv().ok();
    let config = Config::load().unwrap_or_default();
    let clob = ClobClient::new(&config).unwrap();

    let book = fetch_orderbook(&clob, "0", None).await.unwrap();
    assert_eq!(book.id, "0");
    assert!(!book.has_levels());
}

#[tokio::test]
#[ignore = "requires POLYROUTER_API_KEY"]
async fn test_polyrouter_search_and_resolve() {
    let Some(config) = live_config() else {
        println!("Skipping: POLYROUTER_API_KEY not set");
        return;
    };

    let clob = Arc::new(ClobClient::new(&config).unwrap());
    let directory = Arc::new(AggregatorClient::new(&config).unwrap());

    let markets = directory.search_markets("election").await.unwrap();
    println!("Search returned {} markets", markets.len());

    let Some(market_id) = markets.iter().find_map(|m| m.market_id()) else {
        println!("Skipping: search returned no markets");
        return;
    };

    let resolver = Resolver::new(clob, directory, config.resolve_cache_ttl());
    let result = resolver.resolve_by_market_id(&market_id).await.unwrap();
    println!("Resolved {} -> {:?} {}", market_id, result.kind, result.id);
}
