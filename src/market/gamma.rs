//! Gamma API client
//!
//! Serves two purposes: paging through open events to discover every
//! tradable CLOB token id, and looking up individual markets for display
//! metadata.

use super::MarketLookup;
use crate::feed::{value_as_text, AssetDiscovery};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

/// Gamma API base URL
pub const GAMMA_API_URL: &str = "https://gamma-api.polymarket.com";

/// Configuration for the Gamma client
#[derive(Debug, Clone)]
pub struct GammaConfig {
    /// Base URL for the Gamma API
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Events requested per discovery page
    pub page_size: usize,
}

impl Default for GammaConfig {
    fn default() -> Self {
        Self {
            base_url: GAMMA_API_URL.to_string(),
            timeout: Duration::from_secs(20),
            page_size: 100,
        }
    }
}

/// Client for Polymarket's Gamma API
pub struct GammaClient {
    config: GammaConfig,
    client: Client,
}

impl GammaClient {
    /// Create a new client with custom configuration
    pub fn with_config(mut config: GammaConfig) -> anyhow::Result<Self> {
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &GammaConfig {
        &self.config
    }

    /// Every CLOB token id across open events, in first-seen order
    pub async fn fetch_active_asset_ids(&self) -> anyhow::Result<Vec<String>> {
        let limit = self.config.page_size.max(1);
        collect_paged_token_ids(limit, move |offset| {
            let query = [
                ("closed", "false".to_string()),
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
            ];
            async move { self.get_json("/events", &query).await }
        })
        .await
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> anyhow::Result<Value> {
        let url = format!("{}{}", self.config.base_url, path);

        tracing::debug!(url = %url, ?query, "Gamma API request");

        let response = self.client.get(&url).query(query).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Gamma API error: {} - {}", status, body);
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl AssetDiscovery for GammaClient {
    async fn discover_asset_ids(&self) -> anyhow::Result<Vec<String>> {
        self.fetch_active_asset_ids().await
    }
}

#[async_trait]
impl MarketLookup for GammaClient {
    async fn query_markets(&self, query: &[(&str, &str)]) -> anyhow::Result<Value> {
        let query: Vec<(&str, String)> = query.iter().map(|(k, v)| (*k, v.to_string())).collect();
        self.get_json("/markets", &query).await
    }
}

/// Page through `/events` by `limit`/`offset` collecting token ids
///
/// `fetch_page` receives the offset of each page. Paging stops at an empty
/// or non-array page, or at one shorter than `limit`.
async fn collect_paged_token_ids<F, Fut>(
    limit: usize,
    mut fetch_page: F,
) -> anyhow::Result<Vec<String>>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = anyhow::Result<Value>>,
{
    let limit = limit.max(1);
    let mut offset = 0;
    let mut pages = 0;
    let mut seen = HashSet::new();
    let mut asset_ids = Vec::new();

    loop {
        let page = fetch_page(offset).await?;
        pages += 1;

        let events = match page.as_array() {
            Some(events) if !events.is_empty() => events,
            _ => break,
        };

        collect_token_ids(events, &mut seen, &mut asset_ids);

        if events.len() < limit {
            break;
        }
        offset += limit;
    }

    tracing::info!(
        assets = asset_ids.len(),
        pages,
        "Fetched active asset ids from Gamma API"
    );

    Ok(asset_ids)
}

/// Append the token ids of every market in `events`, skipping duplicates
fn collect_token_ids(events: &[Value], seen: &mut HashSet<String>, out: &mut Vec<String>) {
    let markets = events
        .iter()
        .filter_map(|event| event.get("markets")?.as_array())
        .flatten();

    for market in markets {
        let Some(token_ids) = market.get("clobTokenIds").and_then(json_list) else {
            continue;
        };
        for token_id in token_ids.iter().filter_map(value_as_text) {
            if seen.insert(token_id.clone()) {
                out.push(token_id);
            }
        }
    }
}

/// A list given either directly or as a JSON-encoded string
///
/// Gamma serializes `clobTokenIds` and `outcomes` as strings like
/// `"[\"123\", \"456\"]"` on most endpoints, but not all.
pub(crate) fn json_list(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items.clone()),
        Value::String(raw) => serde_json::from_str::<Vec<Value>>(raw).ok(),
        _ => None,
    }
}
