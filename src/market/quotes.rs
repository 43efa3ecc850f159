//! Quote operations built on the exchange client.
//!
//! Transport and parse failures degrade to empty books, null prices or empty
//! listings. Only [`QuoteError::Throttled`] reaches the caller.

use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use super::source::ExchangeApi;
use super::types::{BookQuery, IdKind, MarketPrice, MarketSummary};
use crate::error::QuoteError;
use crate::orderbook::normalizer::{first_present, id_string};
use crate::orderbook::{normalize_book, normalize_books, NormalizedBook};

/// Outcome labels used when a listing entry carries none.
const DEFAULT_OUTCOMES: [&str; 2] = ["YES", "NO"];

/// Batch books for token ids, one `POST /books`.
///
/// Returns one empty book per requested id when the exchange fails.
#[instrument(skip(exchange, token_ids), fields(count = token_ids.len()))]
pub async fn fetch_books_by_token_ids(
    exchange: &dyn ExchangeApi,
    token_ids: &[String],
) -> Result<Vec<NormalizedBook>, QuoteError> {
    if token_ids.is_empty() {
        return Ok(Vec::new());
    }

    let queries: Vec<BookQuery> = token_ids.iter().map(BookQuery::token).collect();
    match exchange.books(&queries).await {
        Ok(raw) => Ok(normalize_books(&raw, token_ids)),
        Err(e) if e.is_throttled() => Err(e),
        Err(e) => {
            warn!(error = %e, "books batch failed, returning empty books");
            Ok(token_ids.iter().map(|id| NormalizedBook::empty(id.as_str())).collect())
        }
    }
}

/// Single normalized book.
///
/// With a `kind` the typed `/book` lookup is used; without one the untyped
/// path list is walked.
#[instrument(skip(exchange))]
pub async fn fetch_orderbook(
    exchange: &dyn ExchangeApi,
    id: &str,
    kind: Option<IdKind>,
) -> Result<NormalizedBook, QuoteError> {
    let result = match kind {
        Some(kind) => {
            exchange
                .book(&BookQuery {
                    kind,
                    id: id.to_string(),
                })
                .await
        }
        None => exchange.book_untyped(id).await,
    };

    match result {
        Ok(raw) => Ok(normalize_book(&raw, id)),
        Err(e) if e.is_throttled() => Err(e),
        Err(e) => {
            debug!(error = %e, "order book lookup failed");
            Ok(NormalizedBook::empty(id))
        }
    }
}

/// Mid price of a book, `None` when it has no levels.
pub async fn market_price(
    exchange: &dyn ExchangeApi,
    id: &str,
    kind: Option<IdKind>,
) -> Result<MarketPrice, QuoteError> {
    let book = fetch_orderbook(exchange, id, kind).await?;
    Ok(MarketPrice {
        id: id.to_string(),
        price: book.mid,
    })
}

/// Exchange market listing, normalized. Empty on any failure.
#[instrument(skip(exchange))]
pub async fn list_markets(exchange: &dyn ExchangeApi) -> Vec<MarketSummary> {
    let raw = match exchange.markets().await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "market listing failed");
            return Vec::new();
        }
    };

    let entries = match &raw {
        Value::Array(items) => items.as_slice(),
        other => other
            .get("markets")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default(),
    };

    entries.iter().filter_map(summarize_market).collect()
}

/// Raw book payload for a token id, or `{ "error": .. }`.
///
/// The `GET /book?token_id=` payload is used when it has levels; otherwise
/// the first entry of `POST /book` is returned as-is.
#[instrument(skip(exchange))]
pub async fn raw_book(exchange: &dyn ExchangeApi, token_id: &str) -> Value {
    match exchange.book(&BookQuery::token(token_id)).await {
        Ok(raw) if normalize_book(&raw, token_id).has_levels() => return raw,
        Ok(_) => debug!("GET /book empty, trying POST /book"),
        Err(e) => debug!(error = %e, "GET /book failed, trying POST /book"),
    }

    match exchange.book_by_post(token_id).await {
        Ok(raw) => raw,
        Err(e) => json!({ "error": e.to_string() }),
    }
}

/// Normalize one listing entry; entries without an id are dropped.
pub fn summarize_market(entry: &Value) -> Option<MarketSummary> {
    let id = field(entry, &["id", "market_id", "slug"])
        .and_then(id_string)
        .filter(|id| !id.is_empty())?;

    let question = field(entry, &["question", "title", "name"])
        .and_then(Value::as_str)
        .map(str::to_string);

    Some(MarketSummary {
        id,
        question,
        outcomes: outcome_labels(entry),
        volume24h: field(entry, &["volume24h", "volume_24h", "volume"]).and_then(nonzero_number),
        liquidity: field(entry, &["liquidity", "tvl"]).and_then(nonzero_number),
        end_date: field(entry, &["endDate", "end_time", "expires_at"])
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// `outcomes` as a list (or JSON-encoded list), else token tickers, else YES/NO.
fn outcome_labels(entry: &Value) -> Vec<String> {
    let listed = match entry.get("outcomes") {
        Some(Value::Array(items)) => Some(string_items(items)),
        Some(Value::String(encoded)) => serde_json::from_str::<Vec<Value>>(encoded)
            .ok()
            .map(|items| string_items(&items)),
        _ => None,
    };
    if let Some(labels) = listed {
        return labels;
    }

    if let Some(tokens) = entry.get("tokens").and_then(Value::as_array) {
        return tokens
            .iter()
            .filter_map(|t| field(t, &["ticker", "symbol"]))
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
    }

    DEFAULT_OUTCOMES.iter().map(|s| s.to_string()).collect()
}

/// First non-null field of an object among `keys`.
fn field<'a>(entry: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    entry.as_object().and_then(|map| first_present(map, keys))
}

fn string_items(items: &[Value]) -> Vec<String> {
    items.iter().filter_map(Value::as_str).map(str::to_string).collect()
}

/// Finite, non-zero number from a JSON number or numeric string.
fn nonzero_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    (n.is_finite() && n != 0.0).then_some(n)
}
