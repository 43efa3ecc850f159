//! Order-book id extraction from event pages.

use once_cell::sync::Lazy;
use regex::Regex;

/// Most ids of each kind probed from one page.
pub const MAX_SCRAPED_IDS: usize = 20;

static TOKEN_ID_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""token_id"\s*:\s*"(\d+)""#).expect("valid regex"));
static TOKEN_ID_QUERY: Lazy<Regex> = Lazy::new(|| Regex::new(r"token_id=([0-9]+)").expect("valid regex"));
static ASSET_ID_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""asset_id"\s*:\s*"(\d+)""#).expect("valid regex"));

/// Ids found on a page, deduplicated in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapedIds {
    /// Token id candidates.
    pub tokens: Vec<String>,
    /// Asset id candidates.
    pub assets: Vec<String>,
}

impl ScrapedIds {
    /// Whether nothing was found.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty() && self.assets.is_empty()
    }
}

/// Extract token and asset ids from page text, at most `cap` of each.
pub fn scrape_ids(html: &str, cap: usize) -> ScrapedIds {
    ScrapedIds {
        tokens: collect_ids(html, &[&*TOKEN_ID_JSON, &*TOKEN_ID_QUERY], cap),
        assets: collect_ids(html, &[&*ASSET_ID_JSON], cap),
    }
}

/// All matches of each pattern in turn, deduplicated, truncated to `cap`.
fn collect_ids(html: &str, patterns: &[&Regex], cap: usize) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();

    for pattern in patterns {
        for caps in pattern.captures_iter(html) {
            if ids.len() >= cap {
                return ids;
            }
            let id = &caps[1];
            if !ids.iter().any(|seen| seen == id) {
                ids.push(id.to_string());
            }
        }
    }

    ids
}
