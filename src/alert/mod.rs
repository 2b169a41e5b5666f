//! Alerting module
//!
//! Threshold filtering, de-duplication, enrichment and message rendering for
//! large trades

mod backfill;
mod dedup;
mod format;
mod pipeline;

pub use backfill::{apply_history, needs_backfill, HISTORY_SCAN_LIMIT, TIMESTAMP_TOLERANCE_SECS};
pub use dedup::DedupCache;
pub use format::{
    build_market_link, build_trade_link, dedupe_key, escape_html, format_alert_message,
    format_usd, side_to_text, trade_time_iso, POLYGONSCAN_TX_URL,
};
pub use pipeline::{
    report_health, AlertPipeline, PipelineConfig, TradeOutcome, POLYMARKET_EVENT_URL,
};

use serde::Serialize;

/// Everything needed to render one alert
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertPayload {
    pub market_title: String,
    pub outcome: Option<String>,
    /// `Bought`, `Sold` or `Traded`
    pub side_text: String,
    pub amount_usd: f64,
    pub trader_tag: String,
    pub timestamp_iso: String,
    pub market_url: Option<String>,
    pub trade_url: Option<String>,
}
