use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use parlay_quotes::api::create_router;
use parlay_quotes::market::{IdKind, MockConfig, MockDirectory, MockExchange};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::state;

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

async fn post(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

fn rain_market() -> Value {
    json!({
        "id": "pr-9",
        "platform_id": "516725",
        "title": "Rain in NYC?",
        "metadata": { "clobTokenIds": ["101", "102"] },
        "outcomes": [{ "id": "o1", "name": "Yes" }, { "id": "o2", "name": "No" }]
    })
}

#[tokio::test]
async fn market_to_books_to_parlay_price() {
    let exchange = MockExchange::new();
    exchange.set_book(IdKind::Token, "101", &[(0.25, 100.0)], &[(0.75, 80.0)]);
    exchange.set_book(IdKind::Token, "102", &[(0.38, 90.0)], &[(0.42, 70.0)]);
    let directory = MockDirectory::new();
    directory.add_market(rain_market());
    let app = create_router(state(&exchange, &directory));

    let (status, resolved) = get(app.clone(), "/api/resolve?market_id=516725").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved["type"], "token");
    assert_eq!(resolved["id"], "101");
    assert_eq!(resolved["clobTokenIds"], json!(["101", "102"]));

    let (status, books) = post(app.clone(), "/api/books", json!({ "market_id": 516725 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(books["books"].as_array().map(Vec::len), Some(2));
    assert_eq!(books["books"][0]["mid"], json!(0.5));
    assert_eq!(
        books["mapping"],
        json!([
            { "token_id": "101", "outcome_id": "o1", "outcome_name": "Yes" },
            { "token_id": "102", "outcome_id": "o2", "outcome_name": "No" }
        ])
    );

    let (status, priced) = get(
        app,
        "/api/fair-value?baseMarkets=516725,516725&outcomes=true,false&probs=0.5,0.5",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(priced["probability"], json!(0.25));
    assert_eq!(priced["odds"], json!(4.0));
}

#[tokio::test]
async fn pasted_url_resolves_then_quotes() {
    let exchange = MockExchange::new();
    exchange.set_book(IdKind::Token, "4242", &[(0.2, 10.0)], &[(0.3, 10.0)]);
    let app = create_router(state(&exchange, &MockDirectory::new()));

    let (status, resolved) = get(
        app.clone(),
        "/api/resolve?url=https%3A%2F%2Fpolymarket.com%2Fevent%2Fx%3Ftid%3D4242",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved, json!({ "type": "token", "id": "4242", "hasBook": true }));

    let (status, book) = get(app.clone(), "/api/market/4242/orderbook?type=token").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(book["bestBid"], json!(0.2));
    assert_eq!(book["bestAsk"], json!(0.3));

    let (status, price) = get(app, "/api/market/4242/price").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(price["id"], "4242");
}

#[tokio::test]
async fn unresolvable_id_still_answers_ok() {
    let app = create_router(state(&MockExchange::new(), &MockDirectory::new()));

    let (status, resolved) = get(app, "/api/resolve?id=777").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved, json!({ "type": null, "id": "777", "hasBook": false }));
}

#[tokio::test]
async fn failed_batch_degrades_to_empty_books() {
    let exchange = MockExchange::with_config(MockConfig {
        fail_books: true,
        ..Default::default()
    });
    let app = create_router(state(&exchange, &MockDirectory::new()));

    let (status, body) = post(app, "/api/books", json!({ "token_ids": ["1", 2] })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["books"][0]["id"], "1");
    assert_eq!(body["books"][1]["id"], "2");
    assert_eq!(body["books"][1]["bids"], json!([]));
    assert_eq!(body["mapping"], Value::Null);
}

#[tokio::test]
async fn throttled_exchange_is_too_many_requests() {
    let exchange = MockExchange::with_config(MockConfig {
        throttled: true,
        ..Default::default()
    });
    let app = create_router(state(&exchange, &MockDirectory::new()));

    let (status, body) = post(app, "/api/books", json!({ "token_ids": ["1"] })).await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn raw_book_reports_errors_in_body() {
    let exchange = MockExchange::with_config(MockConfig {
        fail_book: true,
        fail_book_post: true,
        ..Default::default()
    });
    let app = create_router(state(&exchange, &MockDirectory::new()));

    let (status, body) = get(app, "/api/raw-book/55").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["error"].is_string());
}
