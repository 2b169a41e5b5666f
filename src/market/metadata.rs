//! Market metadata resolution
//!
//! Token ids are resolved to display metadata once and cached for the
//! lifetime of the process. Each token gets its own in-flight cell so that
//! concurrent callers for the same token share a single lookup, while
//! lookups for different tokens proceed independently.

use super::gamma::json_list;
use super::{MarketLookup, MarketMetadata};
use crate::feed::value_as_text;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};

/// Token-id filter spellings, tried in order; deployed API versions disagree
const QUERY_STYLES: [&str; 3] = ["clob_token_ids", "clobTokenIds", "id"];

/// Resolves token ids to [`MarketMetadata`], never failing
pub struct MetadataResolver {
    lookup: Arc<dyn MarketLookup>,
    cache: RwLock<HashMap<String, Arc<OnceCell<MarketMetadata>>>>,
}

impl MetadataResolver {
    pub fn new(lookup: Arc<dyn MarketLookup>) -> Self {
        Self {
            lookup,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Metadata for `token_id`, from cache or a single shared lookup
    pub async fn resolve(&self, token_id: &str) -> MarketMetadata {
        let cached = self
            .cache
            .read()
            .await
            .get(token_id)
            .and_then(|cell| cell.get().cloned());
        if let Some(metadata) = cached {
            return metadata;
        }

        let cell = self
            .cache
            .write()
            .await
            .entry(token_id.to_string())
            .or_default()
            .clone();

        cell.get_or_init(|| self.fetch(token_id)).await.clone()
    }

    /// Number of tokens with resolved metadata
    pub async fn cached_count(&self) -> usize {
        self.cache
            .read()
            .await
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    async fn fetch(&self, token_id: &str) -> MarketMetadata {
        for style in QUERY_STYLES {
            let query = [(style, token_id), ("limit", "1")];
            let data = match self.lookup.query_markets(&query).await {
                Ok(data) => data,
                Err(e) => {
                    tracing::debug!(token_id, style, error = %e, "Market metadata request failed");
                    continue;
                }
            };

            if let Some(market) = extract_market(&data, token_id) {
                return metadata_from_market(market, token_id);
            }
        }

        tracing::debug!(token_id, "No market found, using fallback title");
        MarketMetadata::fallback(token_id)
    }
}

/// Pick the market describing `token_id` out of a lookup response
///
/// Accepts a list of markets, an object wrapping a `markets` list, or a bare
/// market object. Falls back to the first market when none matches exactly.
fn extract_market<'a>(data: &'a Value, token_id: &str) -> Option<&'a Map<String, Value>> {
    let markets: Vec<&Map<String, Value>> = match data {
        Value::Array(items) => items.iter().filter_map(Value::as_object).collect(),
        Value::Object(map) => match map.get("markets").and_then(Value::as_array) {
            Some(items) => items.iter().filter_map(Value::as_object).collect(),
            None if map.contains_key("id") && map.contains_key("question") => vec![map],
            None => Vec::new(),
        },
        _ => Vec::new(),
    };

    let matches = |market: &Map<String, Value>| {
        let by_token = match market.get("clobTokenIds") {
            Some(Value::String(ids)) => ids.contains(token_id),
            Some(Value::Array(ids)) => ids
                .iter()
                .filter_map(value_as_text)
                .any(|id| id == token_id),
            _ => false,
        };
        by_token
            || market
                .get("id")
                .and_then(value_as_text)
                .is_some_and(|id| id == token_id)
    };

    markets
        .iter()
        .copied()
        .find(|market| matches(*market))
        .or_else(|| markets.first().copied())
}

fn metadata_from_market(market: &Map<String, Value>, token_id: &str) -> MarketMetadata {
    let title = ["question", "title", "groupItemTitle"]
        .into_iter()
        .find_map(|key| market.get(key).and_then(value_as_text))
        .unwrap_or_else(|| MarketMetadata::fallback_title(token_id));

    MarketMetadata {
        title,
        outcome: extract_outcome(market, token_id),
        event_slug: extract_event_slug(market),
    }
}

/// Outcome label for `token_id`
///
/// `clobTokenIds` and `outcomes` are parallel lists; when both decode and
/// have the same length the label is picked by position. Otherwise the
/// single-outcome `outcome`/`subtitle` fields are used.
fn extract_outcome(market: &Map<String, Value>, token_id: &str) -> Option<String> {
    let token_ids = market.get("clobTokenIds").and_then(json_list);
    let outcomes = market.get("outcomes").and_then(json_list);

    if let (Some(token_ids), Some(outcomes)) = (token_ids, outcomes) {
        if !token_ids.is_empty() && token_ids.len() == outcomes.len() {
            let position = token_ids
                .iter()
                .position(|id| value_as_text(id).as_deref() == Some(token_id));
            if let Some(Value::String(label)) = position.map(|i| &outcomes[i]) {
                if !label.trim().is_empty() {
                    return Some(label.clone());
                }
            }
        }
    }

    ["outcome", "subtitle"].into_iter().find_map(|key| {
        market
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(String::from)
    })
}

fn extract_event_slug(market: &Map<String, Value>) -> Option<String> {
    let non_empty = |value: Option<&Value>| {
        value
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(String::from)
    };

    let event_slug = market
        .get("events")
        .and_then(Value::as_array)
        .and_then(|events| events.first())
        .and_then(|event| non_empty(event.get("slug")));

    event_slug.or_else(|| non_empty(market.get("slug")))
}
