//! Market-related types shared by the upstream clients.

use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use strum::{Display, EnumString};

use crate::orderbook::normalizer::id_string;

/// Which exchange namespace an order-book id belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum IdKind {
    /// CLOB token id.
    Token,
    /// CLOB asset id.
    Asset,
}

impl IdKind {
    /// Query/body field name for this namespace.
    pub fn field(&self) -> &'static str {
        match self {
            IdKind::Token => "token_id",
            IdKind::Asset => "asset_id",
        }
    }
}

/// One entry of a `/books` request body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BookQuery {
    /// Namespace of `id`.
    pub kind: IdKind,
    /// The identifier.
    pub id: String,
}

impl BookQuery {
    /// Query an id as a token id.
    pub fn token(id: impl Into<String>) -> Self {
        Self {
            kind: IdKind::Token,
            id: id.into(),
        }
    }

    /// Query an id as an asset id.
    pub fn asset(id: impl Into<String>) -> Self {
        Self {
            kind: IdKind::Asset,
            id: id.into(),
        }
    }

    /// `token_id=<id>` / `asset_id=<id>` form used in cache keys.
    pub fn as_param(&self) -> String {
        format!("{}={}", self.kind.field(), self.id)
    }
}

impl Serialize for BookQuery {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.kind.field(), &self.id)?;
        map.end()
    }
}

/// Outcome entry on an aggregator market: an object or a bare label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MarketOutcome {
    /// `{ "id": .., "name": .. }`
    Detailed {
        /// Aggregator outcome id.
        #[serde(default)]
        id: Option<Value>,
        /// Display name.
        #[serde(default, deserialize_with = "lenient")]
        name: Option<String>,
    },
    /// `"YES"`
    Label(String),
}

impl MarketOutcome {
    /// Outcome id as text, if present.
    pub fn id(&self) -> Option<String> {
        match self {
            MarketOutcome::Detailed { id, .. } => id.as_ref().and_then(id_string),
            MarketOutcome::Label(_) => None,
        }
    }

    /// Outcome display name.
    pub fn name(&self) -> Option<&str> {
        match self {
            MarketOutcome::Detailed { name, .. } => name.as_deref(),
            MarketOutcome::Label(label) => Some(label),
        }
    }
}

/// `metadata` block of an aggregator market.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketMetadata {
    /// CLOB token ids, one per outcome. Anything but an array reads as absent.
    #[serde(rename = "clobTokenIds", default, deserialize_with = "lenient_ids")]
    pub clob_token_ids: Option<Vec<String>>,
}

/// Market entry returned by the aggregator.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AggregatorMarket {
    /// Aggregator id.
    #[serde(default)]
    pub id: Option<Value>,
    /// Exchange-native id.
    #[serde(default)]
    pub platform_id: Option<Value>,
    /// Market title.
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    /// Parent event id.
    #[serde(default)]
    pub event_id: Option<Value>,
    /// Extra data, including CLOB token ids.
    #[serde(default, deserialize_with = "lenient")]
    pub metadata: Option<MarketMetadata>,
    /// Outcomes in token order; unreadable entries are dropped.
    #[serde(default, deserialize_with = "lenient_list")]
    pub outcomes: Vec<MarketOutcome>,
}

impl AggregatorMarket {
    /// Aggregator id as text.
    pub fn id_str(&self) -> Option<String> {
        self.id.as_ref().and_then(id_string)
    }

    /// Exchange-native id as text.
    pub fn platform_id_str(&self) -> Option<String> {
        self.platform_id.as_ref().and_then(id_string)
    }

    /// Preferred market id: platform id, then aggregator id.
    pub fn market_id(&self) -> Option<String> {
        self.platform_id_str().or_else(|| self.id_str())
    }

    /// Whether `id` names this market in either namespace.
    pub fn matches_id(&self, id: &str) -> bool {
        self.id_str().as_deref() == Some(id) || self.platform_id_str().as_deref() == Some(id)
    }

    /// Non-empty CLOB token ids.
    pub fn clob_token_ids(&self) -> Option<&[String]> {
        self.metadata
            .as_ref()
            .and_then(|m| m.clob_token_ids.as_deref())
            .filter(|ids| !ids.is_empty())
    }
}

/// Read `T`, or its default when the field is null or of another shape.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Array entries that read as `T`; a non-array is an empty list.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// String or numeric ids from an array; a non-array is `None`.
fn lenient_ids<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_array().map(|items| items.iter().filter_map(id_string).collect()))
}

/// Pull the market list out of an aggregator response.
///
/// Entries that do not deserialize are skipped.
pub fn markets_from_response(data: &Value) -> Vec<AggregatorMarket> {
    let list = data
        .get("markets")
        .and_then(Value::as_array)
        .or_else(|| data.get("results").and_then(Value::as_array));

    list.map(|items| {
        items
            .iter()
            .filter_map(|m| serde_json::from_value(m.clone()).ok())
            .collect()
    })
    .unwrap_or_default()
}

/// Market entry from the exchange listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSummary {
    /// Market id.
    pub id: String,
    /// Question text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    /// Outcome labels.
    pub outcomes: Vec<String>,
    /// 24h volume.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume24h: Option<f64>,
    /// Liquidity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liquidity: Option<f64>,
    /// End date as sent upstream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

/// Point price for one book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketPrice {
    /// Book id.
    pub id: String,
    /// Mid price, `None` for an empty book.
    pub price: Option<f64>,
}
