//! Shape-agnostic order book parsing.
//!
//! Upstream books arrive in several shapes: levels as `[price, size]` pairs or
//! as objects with `price`/`p` and `size`/`q`, numbers as JSON numbers or
//! numeric strings, and sides named `bids`/`buy`/`bid` or `asks`/`sell`/`ask`.
//! Whatever cannot be read is dropped; the result is always a valid book.

use serde_json::Value;

use super::types::{NormalizedBook, PriceLevel};

/// Field names accepted for the bid side, in lookup order.
const BID_ALIASES: [&str; 3] = ["bids", "buy", "bid"];
/// Field names accepted for the ask side, in lookup order.
const ASK_ALIASES: [&str; 3] = ["asks", "sell", "ask"];

/// How one raw level entry is laid out.
#[derive(Debug)]
enum LevelShape<'a> {
    /// `[price, size, ...]`
    Pair(&'a Value, &'a Value),
    /// `{ "p" | "price": .., "q" | "size": .. }`
    Object(Option<&'a Value>, Option<&'a Value>),
    /// Anything else.
    Unknown,
}

impl<'a> LevelShape<'a> {
    fn classify(entry: &'a Value) -> Self {
        match entry {
            Value::Array(items) if items.len() >= 2 => LevelShape::Pair(&items[0], &items[1]),
            Value::Object(map) => LevelShape::Object(
                first_present(map, &["p", "price"]),
                first_present(map, &["q", "size"]),
            ),
            _ => LevelShape::Unknown,
        }
    }

    fn into_level(self) -> Option<PriceLevel> {
        let (price, size) = match self {
            LevelShape::Pair(price, size) => (Some(price), Some(size)),
            LevelShape::Object(price, size) => (price, size),
            LevelShape::Unknown => return None,
        };
        Some(PriceLevel::new(parse_amount(price?)?, parse_amount(size?)?))
    }
}

/// First non-null field among `keys`.
pub(crate) fn first_present<'a>(map: &'a serde_json::Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| map.get(*k))
        .find(|v| !v.is_null())
}

/// Read a finite, non-negative number from a JSON number or numeric string.
pub fn parse_amount(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (n.is_finite() && n >= 0.0).then_some(n)
}

/// Parse one side's level list; non-arrays read as empty.
fn parse_side(raw: Option<&Value>) -> Vec<PriceLevel> {
    match raw {
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(|entry| LevelShape::classify(entry).into_level())
            .collect(),
        _ => Vec::new(),
    }
}

/// Identifier the payload carries for itself, `token_id` before `asset_id`.
pub fn payload_id(raw: &Value) -> Option<String> {
    let map = raw.as_object()?;
    first_present(map, &["token_id", "asset_id"]).and_then(id_string)
}

/// Render a string or numeric id as text.
pub fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Normalize one raw book payload.
///
/// The id comes from the payload's `token_id`/`asset_id` when present, else
/// `fallback_id`. Non-object payloads yield an empty book.
pub fn normalize_book(raw: &Value, fallback_id: &str) -> NormalizedBook {
    let id = payload_id(raw).unwrap_or_else(|| fallback_id.to_string());

    let Some(map) = raw.as_object() else {
        return NormalizedBook::empty(id);
    };

    let bids = parse_side(first_present(map, &BID_ALIASES));
    let asks = parse_side(first_present(map, &ASK_ALIASES));

    NormalizedBook::from_levels(id, bids, asks)
}

/// Normalize a `POST /books` response.
///
/// A single object is treated as a one-element list. Books without their own
/// id take the requested id at the same position.
pub fn normalize_books(raw: &Value, requested: &[String]) -> Vec<NormalizedBook> {
    let entries: Vec<&Value> = match raw {
        Value::Array(items) => items.iter().collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| {
            let fallback = requested.get(i).map(String::as_str).unwrap_or_default();
            normalize_book(entry, fallback)
        })
        .collect()
}
