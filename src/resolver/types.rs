//! Resolution result types.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

use crate::market::types::{AggregatorMarket, IdKind, MarketOutcome};

/// What a reference resolved to.
///
/// On the wire `Token`/`Asset` are `"token"`/`"asset"` and `Unresolved` is
/// `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionKind {
    /// A CLOB token id with a book.
    Token,
    /// A CLOB asset id with a book.
    Asset,
    /// Nothing with a book was found.
    Unresolved,
}

impl ResolutionKind {
    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionKind::Token => "token",
            ResolutionKind::Asset => "asset",
            ResolutionKind::Unresolved => "unresolved",
        }
    }

    /// The book namespace, if resolved.
    pub fn id_kind(&self) -> Option<IdKind> {
        match self {
            ResolutionKind::Token => Some(IdKind::Token),
            ResolutionKind::Asset => Some(IdKind::Asset),
            ResolutionKind::Unresolved => None,
        }
    }
}

impl From<IdKind> for ResolutionKind {
    fn from(kind: IdKind) -> Self {
        match kind {
            IdKind::Token => ResolutionKind::Token,
            IdKind::Asset => ResolutionKind::Asset,
        }
    }
}

impl Serialize for ResolutionKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.id_kind() {
            Some(kind) => kind.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for ResolutionKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Option::<String>::deserialize(deserializer)?.as_deref() {
            Some("token") => Ok(ResolutionKind::Token),
            Some("asset") => Ok(ResolutionKind::Asset),
            None | Some("unresolved") => Ok(ResolutionKind::Unresolved),
            Some(other) => Err(de::Error::unknown_variant(other, &["token", "asset"])),
        }
    }
}

/// Aggregator market a resolution came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketRef {
    /// Exchange-native market id.
    pub market_id: String,
    /// CLOB token ids, one per outcome.
    #[serde(rename = "clobTokenIds", default)]
    pub clob_token_ids: Option<Vec<String>>,
    /// Outcomes in token order.
    #[serde(default)]
    pub outcomes: Vec<MarketOutcome>,
    /// Market title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl MarketRef {
    /// Build from an aggregator market, falling back to `requested_id`.
    pub fn from_market(market: &AggregatorMarket, requested_id: &str) -> Self {
        Self {
            market_id: market.market_id().unwrap_or_else(|| requested_id.to_string()),
            clob_token_ids: market.clob_token_ids().map(<[String]>::to_vec),
            outcomes: market.outcomes.clone(),
            title: market.title.clone(),
        }
    }
}

/// Outcome of resolving one reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionResult {
    /// What the id is.
    #[serde(rename = "type")]
    pub kind: ResolutionKind,
    /// The resolved id, or the best candidate when unresolved.
    pub id: String,
    /// Whether a non-empty book was seen for `id`.
    #[serde(rename = "hasBook")]
    pub has_book: bool,
    /// Market metadata for aggregator-backed resolutions.
    #[serde(flatten)]
    pub market: Option<MarketRef>,
}

impl ResolutionResult {
    /// A confirmed book id.
    pub fn found(kind: IdKind, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
            has_book: true,
            market: None,
        }
    }

    /// Nothing found; `id` is the best candidate.
    pub fn unresolved(id: impl Into<String>) -> Self {
        Self {
            kind: ResolutionKind::Unresolved,
            id: id.into(),
            has_book: false,
            market: None,
        }
    }

    /// Attach market metadata.
    pub fn with_market(mut self, market: MarketRef) -> Self {
        self.market = Some(market);
        self
    }

    /// Whether a book id was found.
    pub fn is_resolved(&self) -> bool {
        self.kind != ResolutionKind::Unresolved
    }
}
