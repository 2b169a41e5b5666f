//! Trade feed types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Aggressor side of a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
    Unknown,
}

impl Side {
    /// Case-insensitive parse; anything unrecognised is `Unknown`
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "BUY" => Side::Buy,
            "SELL" => Side::Sell,
            _ => Side::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
            Side::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A trade in canonical form
///
/// Only the normalizer constructs these, so `price > 0` and `size > 0` hold
/// for every instance that reaches the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTrade {
    /// Stable identity, explicit or synthesized
    pub trade_id: String,
    pub tx_hash: Option<String>,
    /// Unix seconds
    pub timestamp: i64,
    pub token_id: String,
    pub side: Side,
    pub price: f64,
    pub size: f64,
    /// `price * size`
    pub notional_usd: f64,
    pub maker_address: Option<String>,
    pub taker_address: Option<String>,
}

impl NormalizedTrade {
    /// Address to credit the trade to, by aggressor side
    pub fn actor(&self) -> Option<&str> {
        let (first, second) = match self.side {
            Side::Sell => (&self.maker_address, &self.taker_address),
            Side::Buy | Side::Unknown => (&self.taker_address, &self.maker_address),
        };
        first.as_deref().or(second.as_deref())
    }
}

/// Everything read from one inbound frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedMessage {
    /// Zero for heartbeats and control frames
    pub trades: Vec<NormalizedTrade>,
}
