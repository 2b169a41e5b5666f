//! Alert message rendering

use super::AlertPayload;
use crate::feed::{NormalizedTrade, Side};
use chrono::{DateTime, Utc};

/// Block explorer used for trade links
pub const POLYGONSCAN_TX_URL: &str = "https://polygonscan.com/tx";

/// Past-tense verb for the alert's action line
pub fn side_to_text(side: Side) -> &'static str {
    match side {
        Side::Buy => "Bought",
        Side::Sell => "Sold",
        Side::Unknown => "Traded",
    }
}

/// `2024-10-27T03:33:20Z`, or `unix <seconds>` when chrono cannot
/// represent the timestamp
pub fn trade_time_iso(timestamp: i64) -> String {
    match DateTime::<Utc>::from_timestamp(timestamp, 0) {
        Some(time) => time.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        None => {
            tracing::debug!(timestamp, "Trade timestamp out of range");
            format!("unix {}", timestamp)
        }
    }
}

pub fn build_trade_link(tx_hash: Option<&str>) -> Option<String> {
    tx_hash
        .filter(|hash| !hash.is_empty())
        .map(|hash| format!("{}/{}", POLYGONSCAN_TX_URL, hash))
}

pub fn build_market_link(base_url: &str, event_slug: Option<&str>) -> Option<String> {
    event_slug
        .filter(|slug| !slug.is_empty())
        .map(|slug| format!("{}/{}", base_url.trim_end_matches('/'), slug))
}

/// Whole dollars with thousands separators, e.g. `125,000`
pub fn format_usd(amount: f64) -> String {
    let rounded = amount.round_ties_even();
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if rounded < 0.0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Escape text for Telegram's HTML parse mode
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Render the Telegram HTML body for one alert
pub fn format_alert_message(payload: &AlertPayload) -> String {
    let mut links = Vec::with_capacity(2);
    if let Some(url) = &payload.market_url {
        links.push(format!(r#"<a href="{}">Open market</a>"#, escape_html(url)));
    }
    if let Some(url) = &payload.trade_url {
        links.push(format!(r#"<a href="{}">View trade</a>"#, escape_html(url)));
    }
    let link_line = if links.is_empty() {
        "No links available".to_string()
    } else {
        links.join(" | ")
    };

    format!(
        "🚨 <b>Large Polymarket Trade</b>\n\n\
         🧠 <b>Market:</b> {}\n\
         📈 <b>Action:</b> {} {}\n\
         💵 <b>Amount:</b> ${}\n\
         👤 <b>Trader:</b> {}\n\
         🕒 <b>Time:</b> {}\n\n\
         🔗 {}",
        escape_html(&payload.market_title),
        escape_html(&payload.side_text),
        escape_html(payload.outcome.as_deref().unwrap_or("N/A")),
        format_usd(payload.amount_usd),
        escape_html(&payload.trader_tag),
        escape_html(&payload.timestamp_iso),
        link_line,
    )
}

/// Identity used for de-duplication
pub fn dedupe_key(trade: &NormalizedTrade) -> String {
    if !trade.trade_id.is_empty() {
        return trade.trade_id.clone();
    }
    format!(
        "{}_{}_{}",
        trade.tx_hash.as_deref().unwrap_or("nohash"),
        trade.timestamp,
        trade.token_id
    )
}
