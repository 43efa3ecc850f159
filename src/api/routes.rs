//! HTTP API route definitions.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{
    books, fair_value, health, index, markets, metrics, orderbook, polyrouter_clob_ids, polyrouter_events,
    polyrouter_markets, polyrouter_platforms, polyrouter_search, price, raw_book_by_token, resolve, AppState,
};

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/markets", get(markets))
        .route("/resolve", get(resolve))
        .route("/raw-book/:tid", get(raw_book_by_token))
        .route("/market/:id/price", get(price))
        .route("/market/:id/orderbook", get(orderbook))
        .route("/books", post(books))
        .route("/fair-value", get(fair_value))
        // Aggregator passthroughs
        .route("/polyrouter/platforms", get(polyrouter_platforms))
        .route("/polyrouter/search", get(polyrouter_search))
        .route("/polyrouter/search-v2", get(polyrouter_search))
        .route("/polyrouter/markets-v2", get(polyrouter_markets))
        .route("/polyrouter/events-v2", get(polyrouter_events))
        .route("/polyrouter/clob-ids", get(polyrouter_clob_ids));

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Create a minimal health-only router (for startup).
pub fn health_router() -> Router {
    Router::new().route("/health", get(health))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::mock::{MockConfig, MockDirectory, MockExchange};
    use crate::market::IdKind;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn state(exchange: &MockExchange, directory: &MockDirectory) -> AppState {
        AppState::new(
            Arc::new(exchange.clone()),
            Arc::new(directory.clone()),
            Duration::from_secs(60),
        )
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let app = health_router();

        let (status, body) = get_json(app, "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert!(body["timestamp"].as_i64().unwrap() > 0);
    }

    #[tokio::test]
    async fn index_lists_endpoints() {
        let app = create_router(state(&MockExchange::new(), &MockDirectory::new()));

        let (status, body) = get_json(app, "/").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "running");
        assert!(body["endpoints"]["resolve"].is_string());
    }

    #[tokio::test]
    async fn metrics_endpoint_renders_when_installed() {
        let handle = PrometheusBuilder::new().build_recorder().handle();
        let app = create_router(state(&MockExchange::new(), &MockDirectory::new()).with_prometheus(handle));

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let app = create_router(state(&MockExchange::new(), &MockDirectory::new()));
        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn resolve_requires_an_input() {
        let app = create_router(state(&MockExchange::new(), &MockDirectory::new()));

        let (status, body) = get_json(app, "/api/resolve").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn resolve_by_id() {
        let exchange = MockExchange::new();
        exchange.set_book(IdKind::Token, "123", &[(0.4, 1.0)], &[(0.6, 1.0)]);
        let app = create_router(state(&exchange, &MockDirectory::new()));

        let (status, body) = get_json(app, "/api/resolve?id=123").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "type": "token", "id": "123", "hasBook": true }));
    }

    #[tokio::test]
    async fn resolve_unknown_market_is_404() {
        let app = create_router(state(&MockExchange::new(), &MockDirectory::new()));

        let (status, body) = get_json(app, "/api/resolve?market_id=516725").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "market 516725 not found");
    }

    #[tokio::test]
    async fn resolve_market_id_takes_precedence() {
        let directory = MockDirectory::new();
        directory.add_market(json!({
            "id": "516725",
            "title": "Rain?",
            "metadata": { "clobTokenIds": ["111", "222"] }
        }));
        let app = create_router(state(&MockExchange::new(), &directory));

        let (status, body) = get_json(app, "/api/resolve?market_id=516725&id=999").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "111");
        assert_eq!(body["market_id"], "516725");
        assert_eq!(body["clobTokenIds"], json!(["111", "222"]));
    }

    #[tokio::test]
    async fn orderbook_and_price_by_type() {
        let exchange = MockExchange::new();
        exchange.set_book(IdKind::Asset, "9", &[(0.2, 1.0)], &[(0.4, 1.0)]);
        let app = create_router(state(&exchange, &MockDirectory::new()));

        let (status, book) = get_json(app.clone(), "/api/market/9/orderbook?type=asset").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(book["bestBid"], 0.2);
        assert_eq!(book["spread"].as_f64().map(|s| (s - 0.2).abs() < 1e-9), Some(true));

        let (status, price) = get_json(app, "/api/market/9/price?type=asset").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(price["id"], "9");
        assert!((price["price"].as_f64().unwrap() - 0.3).abs() < 1e-9);
    }

    #[tokio::test]
    async fn throttled_exchange_is_429() {
        let exchange = MockExchange::with_config(MockConfig {
            throttled: true,
            ..Default::default()
        });
        let app = create_router(state(&exchange, &MockDirectory::new()));

        let (status, body) = get_json(app, "/api/market/1/orderbook").await;

        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"], "clob rate limited");
    }

    #[tokio::test]
    async fn books_by_token_ids() {
        let exchange = MockExchange::new();
        exchange.set_book(IdKind::Token, "1", &[(0.5, 2.0)], &[]);
        let app = create_router(state(&exchange, &MockDirectory::new()));

        let (status, body) = post_json(app, "/api/books", json!({ "token_ids": ["1", 2] })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["books"].as_array().unwrap().len(), 2);
        assert_eq!(body["books"][1]["id"], "2");
        assert!(body["mapping"].is_null());
    }

    #[tokio::test]
    async fn books_by_market_id_include_mapping() {
        let directory = MockDirectory::new();
        directory.add_market(json!({
            "id": "m1",
            "metadata": { "clobTokenIds": ["111", "222"] },
            "outcomes": [{ "id": "o1", "name": "Yes" }, { "id": "o2", "name": "No" }]
        }));
        let app = create_router(state(&MockExchange::new(), &directory));

        let (status, body) = post_json(app, "/api/books", json!({ "market_id": "m1" })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["mapping"],
            json!([
                { "token_id": "111", "outcome_id": "o1", "outcome_name": "Yes" },
                { "token_id": "222", "outcome_id": "o2", "outcome_name": "No" }
            ])
        );
    }

    #[tokio::test]
    async fn books_without_ids_is_400() {
        let app = create_router(state(&MockExchange::new(), &MockDirectory::new()));

        let (status, _) = post_json(app, "/api/books", json!({ "token_ids": [] })).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn fair_value_from_query() {
        let app = create_router(state(&MockExchange::new(), &MockDirectory::new()));

        let (status, body) = get_json(app, "/api/fair-value?baseMarkets=a,b&outcomes=true,true&covariance=0.2").await;

        assert_eq!(status, StatusCode::OK);
        assert!((body["probability"].as_f64().unwrap() - 0.2).abs() < 1e-9);
        assert!((body["odds"].as_f64().unwrap() - 5.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn polyrouter_search_needs_q_and_defaults_platform() {
        let directory = MockDirectory::new();
        let app = create_router(state(&MockExchange::new(), &directory));

        let (status, _) = get_json(app.clone(), "/api/polyrouter/search").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = get_json(app.clone(), "/api/polyrouter/search-v2?q=rain").await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = get_json(app, "/api/polyrouter/events-v2?limit=3").await;
        assert_eq!(status, StatusCode::OK);

        let requests = directory.recorded_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].1.get("limit").map(String::as_str), Some("10"));
        assert_eq!(requests[1].0, "/events-v2");
        assert_eq!(requests[1].1.get("platform").map(String::as_str), Some("polymarket"));
    }

    #[tokio::test]
    async fn clob_ids_lookup() {
        let directory = MockDirectory::new();
        directory.add_market(json!({
            "id": "pr-1",
            "platform_id": "516725",
            "title": "Rain?",
            "event_id": 77,
            "metadata": { "clobTokenIds": ["111"] },
            "outcomes": ["Yes"]
        }));
        let app = create_router(state(&MockExchange::new(), &directory));

        let (status, _) = get_json(app.clone(), "/api/polyrouter/clob-ids").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = get_json(app.clone(), "/api/polyrouter/clob-ids?market_id=nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = get_json(app, "/api/polyrouter/clob-ids?market_id=pr-1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "market_id": "516725",
                "title": "Rain?",
                "event_id": 77,
                "clobTokenIds": ["111"],
                "outcomes": ["Yes"]
            })
        );
    }

    #[tokio::test]
    async fn markets_listing_is_empty_on_failure() {
        let exchange = MockExchange::with_config(MockConfig {
            fail_markets: true,
            ..Default::default()
        });
        let app = create_router(state(&exchange, &MockDirectory::new()));

        let (status, body) = get_json(app, "/api/markets").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "markets": [] }));
    }
}
