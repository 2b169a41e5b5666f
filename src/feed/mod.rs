//! Trade feed module
//!
//! Real-time trades from the Polymarket market channel

mod connector;
mod normalizer;
mod types;

pub use connector::{StreamConfig, StreamConnector, POLYMARKET_WS_URL, SUBSCRIPTION_CHUNK};
pub use normalizer::parse_ws_message;
pub use types::{FeedMessage, NormalizedTrade, Side};

pub(crate) use normalizer::{seconds_from_raw, value_as_f64, value_as_text};

use async_trait::async_trait;

/// Source of the token ids to subscribe to
#[async_trait]
pub trait AssetDiscovery: Send + Sync {
    /// Current universe of tradable token ids, de-duplicated
    async fn discover_asset_ids(&self) -> anyhow::Result<Vec<String>>;
}
