//! Fill missing trade details from recent trade history

use crate::feed::{seconds_from_raw, value_as_f64, value_as_text, NormalizedTrade, Side};
use serde_json::Value;

/// Only the most recent rows are compared
pub const HISTORY_SCAN_LIMIT: usize = 25;
/// Max timestamp distance for a history row to count as the same trade
pub const TIMESTAMP_TOLERANCE_SECS: i64 = 10;
const PRICE_SIZE_TOLERANCE: f64 = 1e-6;

/// True when the trade lacks a transaction hash or both counterparties
pub fn needs_backfill(trade: &NormalizedTrade) -> bool {
    let has_party = trade.maker_address.is_some() || trade.taker_address.is_some();
    trade.tx_hash.is_none() || !has_party
}

/// Merge the first matching history row into `trade`
///
/// Returns the trade unchanged when nothing matches.
pub fn apply_history(trade: NormalizedTrade, rows: &[Value]) -> NormalizedTrade {
    rows.iter()
        .take(HISTORY_SCAN_LIMIT)
        .find_map(|row| merge_row(&trade, row))
        .unwrap_or(trade)
}

fn merge_row(trade: &NormalizedTrade, row: &Value) -> Option<NormalizedTrade> {
    let row = row.as_object()?;

    let number = |key: &str| match row.get(key) {
        None | Some(Value::Null) => Some(0.0),
        Some(value) => value_as_f64(value),
    };
    let text = |keys: &[&str]| keys.iter().find_map(|key| row.get(*key).and_then(value_as_text));

    let price = number("price")?;
    let size = number("size")?;
    let timestamp = seconds_from_raw(number("timestamp")? as i64);

    if (timestamp - trade.timestamp).abs() > TIMESTAMP_TOLERANCE_SECS
        || (price - trade.price).abs() > PRICE_SIZE_TOLERANCE
        || (size - trade.size).abs() > PRICE_SIZE_TOLERANCE
    {
        return None;
    }

    Some(NormalizedTrade {
        tx_hash: text(&["transactionHash", "transaction_hash"]).or_else(|| trade.tx_hash.clone()),
        maker_address: text(&["maker_address", "maker"]).or_else(|| trade.maker_address.clone()),
        taker_address: text(&["taker_address", "taker"]).or_else(|| trade.taker_address.clone()),
        side: text(&["side"]).map(|s| Side::parse(&s)).unwrap_or(trade.side),
        ..trade.clone()
    })
}
