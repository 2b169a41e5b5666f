//! CLOB trade-history client

use super::TradeHistory;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// CLOB API base URL
pub const CLOB_API_URL: &str = "https://clob.polymarket.com";

/// Read-only client for the CLOB `trades-history` endpoint
pub struct ClobClient {
    base_url: String,
    client: Client,
}

impl ClobClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl TradeHistory for ClobClient {
    async fn recent_trades(&self, token_id: &str) -> anyhow::Result<Vec<Value>> {
        let url = format!("{}/trades-history", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("market", token_id)])
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("CLOB API error: {}", response.status());
        }

        Ok(history_rows(response.json().await?))
    }
}

/// Rows come either bare or wrapped as `{"data": [...]}`
fn history_rows(payload: Value) -> Vec<Value> {
    match payload {
        Value::Array(rows) => rows,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(rows)) => rows,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}
