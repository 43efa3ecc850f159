//! HTTP API handlers.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use time::OffsetDateTime;
use tracing::warn;

use crate::config::Config;
use crate::error::{QuoteError, ServiceError};
use crate::market::{
    fetch_books_by_token_ids, fetch_orderbook, list_markets, market_price, raw_book, AggregatorClient,
    ClobClient, ExchangeApi, IdKind, MarketDirectory, MarketOutcome, MarketPrice, Params,
    DEFAULT_PLATFORM, DEFAULT_SEARCH_LIMIT,
};
use crate::orderbook::normalizer::id_string;
use crate::orderbook::NormalizedBook;
use crate::parlay::{compute_fair_value, FairValueRequest, FairValueResult};
use crate::resolver::{ResolutionResult, Resolver};

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Order-book exchange.
    pub exchange: Arc<dyn ExchangeApi>,
    /// Market-search aggregator.
    pub directory: Arc<dyn MarketDirectory>,
    /// Resolver over the same upstreams.
    pub resolver: Arc<Resolver>,
    /// Prometheus handle for `/metrics`, when a recorder is installed.
    pub prometheus: Option<PrometheusHandle>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("resolver", &self.resolver)
            .field("prometheus", &self.prometheus.is_some())
            .finish()
    }
}

impl AppState {
    /// Create app state over the given upstreams.
    pub fn new(exchange: Arc<dyn ExchangeApi>, directory: Arc<dyn MarketDirectory>, resolve_ttl: Duration) -> Self {
        let resolver = Resolver::new(exchange.clone(), directory.clone(), resolve_ttl);
        Self {
            exchange,
            directory,
            resolver: Arc::new(resolver),
            prometheus: None,
        }
    }

    /// Create app state with the HTTP clients described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, ServiceError> {
        let exchange: Arc<dyn ExchangeApi> = Arc::new(ClobClient::new(config)?);
        let directory: Arc<dyn MarketDirectory> = Arc::new(AggregatorClient::new(config)?);
        Ok(Self::new(exchange, directory, config.resolve_cache_ttl()))
    }

    /// Serve `/metrics` from `handle`.
    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }
}

/// JSON error body with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// 400 with `message`.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    /// 404 with `message`.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<QuoteError> for ApiError {
    fn from(err: QuoteError) -> Self {
        let status = match err {
            QuoteError::Throttled { .. } => StatusCode::TOO_MANY_REQUESTS,
            QuoteError::NotFound(_) => StatusCode::NOT_FOUND,
            QuoteError::Transport(_) | QuoteError::Malformed(_) => StatusCode::BAD_GATEWAY,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short message.
    pub error: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
    /// Unix time in milliseconds.
    pub timestamp: i64,
}

/// `?type=token|asset`; anything else means untyped.
#[derive(Debug, Deserialize)]
pub struct KindQuery {
    /// Book namespace.
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl KindQuery {
    fn id_kind(&self) -> Option<IdKind> {
        self.kind.as_deref().and_then(|k| IdKind::from_str(k).ok())
    }
}

/// `/api/resolve` parameters, checked in field order.
#[derive(Debug, Deserialize)]
pub struct ResolveQuery {
    /// Aggregator or platform market id.
    pub market_id: Option<String>,
    /// Event slug.
    pub event_slug: Option<String>,
    /// Event URL.
    pub url: Option<String>,
    /// Raw id.
    pub id: Option<String>,
}

/// `POST /api/books` body.
#[derive(Debug, Default, Deserialize)]
pub struct BooksRequest {
    /// Token ids, strings or numbers.
    #[serde(default)]
    pub token_ids: Option<Vec<Value>>,
    /// Market whose CLOB token ids to fetch.
    #[serde(default)]
    pub market_id: Option<Value>,
}

/// Token to outcome pairing for a market's books.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeMapping {
    /// CLOB token id.
    pub token_id: String,
    /// Aggregator outcome id at the same position.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome_id: Option<String>,
    /// Outcome name at the same position.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome_name: Option<String>,
}

/// `POST /api/books` response.
#[derive(Debug, Serialize)]
pub struct BooksResponse {
    /// One normalized book per returned payload.
    pub books: Vec<NormalizedBook>,
    /// Present when the ids came from a market.
    pub mapping: Option<Vec<OutcomeMapping>>,
}

/// `/api/fair-value` parameters as comma-separated lists.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FairValueQuery {
    /// Market ids.
    pub base_markets: Option<String>,
    /// `true`/`false` per leg.
    pub outcomes: Option<String>,
    /// YES probability per leg.
    pub probs: Option<String>,
    /// Correlation adjustment.
    pub covariance: Option<String>,
}

impl FairValueQuery {
    /// Parse into a request. Unparseable probabilities count as NaN.
    pub fn into_request(self) -> FairValueRequest {
        let split = |s: &str| s.split(',').map(|v| v.trim().to_string()).collect::<Vec<_>>();

        FairValueRequest {
            base_markets: self.base_markets.as_deref().map(split).unwrap_or_default(),
            outcomes: self
                .outcomes
                .as_deref()
                .map(|s| split(s).iter().map(|v| v == "true").collect())
                .unwrap_or_default(),
            probs: self.probs.as_deref().map(|s| {
                split(s)
                    .iter()
                    .map(|v| v.parse::<f64>().unwrap_or(f64::NAN))
                    .collect()
            }),
            covariance: self
                .covariance
                .as_deref()
                .filter(|c| !c.trim().is_empty())
                .map(|c| c.trim().parse::<f64>().unwrap_or(f64::NAN)),
        }
    }
}

/// Polyrouter search parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Search text.
    pub q: Option<String>,
    /// Platform filter.
    pub platform: Option<String>,
    /// Page size.
    pub limit: Option<String>,
}

/// `/api/polyrouter/clob-ids` parameters.
#[derive(Debug, Deserialize)]
pub struct ClobIdsQuery {
    /// Aggregator or platform market id.
    pub market_id: Option<String>,
}

/// `/api/polyrouter/clob-ids` response.
#[derive(Debug, Serialize)]
pub struct ClobIdsResponse {
    /// Exchange-native market id.
    pub market_id: String,
    /// Market title.
    pub title: Option<String>,
    /// Parent event id.
    pub event_id: Option<Value>,
    /// CLOB token ids.
    #[serde(rename = "clobTokenIds")]
    pub clob_token_ids: Option<Vec<String>>,
    /// Outcomes in token order.
    pub outcomes: Vec<MarketOutcome>,
}

/// Trimmed, non-empty query value.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Service banner and endpoint index.
pub async fn index() -> impl IntoResponse {
    Json(json!({
        "name": "Parlay Prediction Market API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "health": "/health",
            "metrics": "/metrics",
            "resolve": "/api/resolve?market_id=516725",
            "markets": "/api/markets",
            "books": "POST /api/books",
            "fairValue": "/api/fair-value?outcomes=true,true&probs=0.5,0.5",
            "polyrouter": "/api/polyrouter/platforms"
        }
    }))
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    let timestamp = (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64;
    Json(HealthResponse { status: "ok", timestamp })
}

/// Prometheus text exposition.
pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.prometheus {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed").into_response(),
    }
}

/// Exchange market listing; empty on failure.
pub async fn markets(State(state): State<AppState>) -> impl IntoResponse {
    let markets = list_markets(state.exchange.as_ref()).await;
    Json(json!({ "markets": markets }))
}

/// Resolve a market id, event slug, URL or raw id.
pub async fn resolve(State(state): State<AppState>, Query(query): Query<ResolveQuery>) -> ApiResult<ResolutionResult> {
    if let Some(market_id) = present(&query.market_id) {
        return Ok(Json(state.resolver.resolve_by_market_id(market_id).await?));
    }

    if let Some(slug) = present(&query.event_slug) {
        return Ok(Json(state.resolver.resolve_by_event_slug(slug).await?));
    }

    let input = present(&query.url)
        .or_else(|| present(&query.id))
        .ok_or_else(|| ApiError::bad_request("url or id or market_id is required"))?;

    Ok(Json(state.resolver.resolve(input).await))
}

/// Raw exchange book payload for a token id.
pub async fn raw_book_by_token(State(state): State<AppState>, Path(token_id): Path<String>) -> impl IntoResponse {
    Json(raw_book(state.exchange.as_ref(), &token_id).await)
}

/// Mid price for a book.
pub async fn price(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<KindQuery>,
) -> ApiResult<MarketPrice> {
    Ok(Json(market_price(state.exchange.as_ref(), &id, query.id_kind()).await?))
}

/// Normalized order book.
pub async fn orderbook(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<KindQuery>,
) -> ApiResult<NormalizedBook> {
    Ok(Json(fetch_orderbook(state.exchange.as_ref(), &id, query.id_kind()).await?))
}

/// Batch books by token ids, or by a market's CLOB token ids.
pub async fn books(State(state): State<AppState>, Json(request): Json<BooksRequest>) -> ApiResult<BooksResponse> {
    let mut ids: Vec<String> = request
        .token_ids
        .unwrap_or_default()
        .iter()
        .filter_map(id_string)
        .collect();
    let mut mapping = None;

    if ids.is_empty() {
        if let Some(market_id) = request.market_id.as_ref().and_then(id_string) {
            if let Some(market) = state.directory.market_by_id(&market_id).await? {
                if let Some(clob_ids) = market.clob_token_ids() {
                    ids = clob_ids.to_vec();
                    mapping = Some(outcome_mapping(&ids, &market.outcomes));
                }
            }
        }
    }

    if ids.is_empty() {
        return Err(ApiError::bad_request(
            "Provide token_ids[] or market_id with clobTokenIds",
        ));
    }

    let books = fetch_books_by_token_ids(state.exchange.as_ref(), &ids).await?;
    Ok(Json(BooksResponse { books, mapping }))
}

/// Pair token ids with outcomes by position.
pub fn outcome_mapping(token_ids: &[String], outcomes: &[MarketOutcome]) -> Vec<OutcomeMapping> {
    token_ids
        .iter()
        .enumerate()
        .map(|(i, token_id)| OutcomeMapping {
            token_id: token_id.clone(),
            outcome_id: outcomes.get(i).and_then(MarketOutcome::id),
            outcome_name: outcomes.get(i).and_then(|o| o.name()).map(str::to_string),
        })
        .collect()
}

/// Parlay fair value from query parameters.
pub async fn fair_value(Query(query): Query<FairValueQuery>) -> Json<FairValueResult> {
    Json(compute_fair_value(&query.into_request()))
}

/// Polyrouter platform list.
pub async fn polyrouter_platforms(State(state): State<AppState>) -> ApiResult<Value> {
    Ok(Json(state.directory.platforms().await?))
}

/// Polyrouter search passthrough.
pub async fn polyrouter_search(State(state): State<AppState>, Query(query): Query<SearchQuery>) -> ApiResult<Value> {
    let q = present(&query.q).ok_or_else(|| ApiError::bad_request("q required"))?;
    let platform = present(&query.platform).unwrap_or(DEFAULT_PLATFORM);
    let limit = present(&query.limit)
        .and_then(|l| l.parse::<u32>().ok())
        .unwrap_or(DEFAULT_SEARCH_LIMIT);

    Ok(Json(state.directory.search(q, platform, limit).await?))
}

fn with_default_platform(mut params: Params) -> Params {
    let missing = params.get("platform").map_or(true, |p| p.trim().is_empty());
    if missing {
        params.insert("platform".to_string(), DEFAULT_PLATFORM.to_string());
    }
    params
}

/// Polyrouter markets passthrough.
pub async fn polyrouter_markets(State(state): State<AppState>, Query(params): Query<Params>) -> ApiResult<Value> {
    Ok(Json(state.directory.markets(&with_default_platform(params)).await?))
}

/// Polyrouter events passthrough.
pub async fn polyrouter_events(State(state): State<AppState>, Query(params): Query<Params>) -> ApiResult<Value> {
    Ok(Json(state.directory.events(&with_default_platform(params)).await?))
}

/// CLOB token ids and outcomes for one market.
pub async fn polyrouter_clob_ids(
    State(state): State<AppState>,
    Query(query): Query<ClobIdsQuery>,
) -> ApiResult<ClobIdsResponse> {
    let market_id = present(&query.market_id).ok_or_else(|| ApiError::bad_request("market_id required"))?;

    let market = state
        .directory
        .market_by_id(market_id)
        .await?
        .ok_or_else(|| {
            warn!(market_id, "clob-ids lookup found no market");
            ApiError::not_found("market not found")
        })?;

    Ok(Json(ClobIdsResponse {
        market_id: market.market_id().unwrap_or_else(|| market_id.to_string()),
        clob_token_ids: market.clob_token_ids().map(<[String]>::to_vec),
        title: market.title,
        event_id: market.event_id,
        outcomes: market.outcomes,
    }))
}
