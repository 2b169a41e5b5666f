//! Market data module
//!
//! Asset discovery and metadata lookups via the Gamma API, plus trade
//! history from the CLOB API

mod clob;
mod gamma;
mod metadata;

pub use clob::{ClobClient, CLOB_API_URL};
pub use gamma::{GammaClient, GammaConfig, GAMMA_API_URL};
pub use metadata::MetadataResolver;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Display metadata for one CLOB token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketMetadata {
    /// Market question, never empty
    pub title: String,
    /// Outcome the token represents, e.g. "Yes"
    pub outcome: Option<String>,
    /// Event slug for building a market link
    pub event_slug: Option<String>,
}

impl MarketMetadata {
    /// Metadata for a token no lookup could describe
    pub fn fallback(token_id: &str) -> Self {
        Self {
            title: Self::fallback_title(token_id),
            outcome: None,
            event_slug: None,
        }
    }

    pub(crate) fn fallback_title(token_id: &str) -> String {
        format!("Token {}", token_id)
    }
}

/// Raw market queries against the metadata API
#[async_trait]
pub trait MarketLookup: Send + Sync {
    /// `GET /markets` with the given query parameters
    async fn query_markets(&self, query: &[(&str, &str)]) -> anyhow::Result<serde_json::Value>;
}

/// Recent trades for a token, used to fill in missing trade details
#[async_trait]
pub trait TradeHistory: Send + Sync {
    async fn recent_trades(&self, token_id: &str) -> anyhow::Result<Vec<serde_json::Value>>;
}
