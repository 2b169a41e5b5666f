//! Feed payload normalization
//!
//! The market channel does not commit to one payload shape: trades arrive
//! bare, wrapped in envelopes, or batched in arrays. Each frame is classified
//! into a small set of node kinds and walked through the known envelope keys;
//! every trade-shaped object is then decoded into a typed [`RawTrade`] and
//! validated into a [`NormalizedTrade`].

use super::types::{NormalizedTrade, Side};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Wrapper keys searched, in order, on objects that are not trades themselves
const ENVELOPE_KEYS: [&str; 5] = ["data", "trades", "payload", "message", "result"];

/// Raw timestamps above this are milliseconds
const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

/// Parse one raw feed frame into zero or more trades
///
/// Malformed JSON, heartbeats and records that fail validation all yield
/// nothing; a bad record never hides its siblings in the same batch.
pub fn parse_ws_message(raw: &str) -> Vec<NormalizedTrade> {
    let payload: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::trace!(error = %e, "Dropping non-JSON frame");
            return Vec::new();
        }
    };

    let mut records = Vec::new();
    collect_records(&payload, &mut records);

    records.into_iter().filter_map(normalize_record).collect()
}

/// Shape of a node in the payload tree
enum Node<'a> {
    Batch(&'a [Value]),
    Trade(&'a Value),
    Envelope(&'a Map<String, Value>),
    Scalar,
}

impl<'a> Node<'a> {
    fn classify(value: &'a Value) -> Self {
        match value {
            Value::Array(items) => Node::Batch(items),
            Value::Object(map) if looks_like_trade(map) => Node::Trade(value),
            Value::Object(map) => Node::Envelope(map),
            _ => Node::Scalar,
        }
    }
}

fn collect_records<'a>(value: &'a Value, out: &mut Vec<&'a Value>) {
    match Node::classify(value) {
        Node::Batch(items) => {
            for item in items {
                collect_records(item, out);
            }
        }
        Node::Trade(record) => out.push(record),
        Node::Envelope(map) => {
            for key in ENVELOPE_KEYS {
                if let Some(inner) = map.get(key) {
                    collect_records(inner, out);
                }
            }
        }
        Node::Scalar => {}
    }
}

/// Price-like, size-like and token-like keys must all be present
fn looks_like_trade(map: &Map<String, Value>) -> bool {
    let has_price = map.contains_key("price") || map.contains_key("last_trade_price");
    let has_size = map.contains_key("size") || map.contains_key("amount");
    let has_token =
        map.contains_key("asset_id") || map.contains_key("token_id") || map.contains_key("market");
    has_price && has_size && has_token
}

/// Trade-shaped record as it appears on the wire
///
/// Numeric fields keep an explicit `null` as `Some(Value::Null)`: a present
/// key shadows its fallback even when null, and null is never a number.
/// Text fields treat null like a missing key.
#[derive(Debug, Default, Deserialize)]
struct RawTrade {
    id: Option<Value>,
    trade_id: Option<Value>,
    asset_id: Option<Value>,
    token_id: Option<Value>,
    market: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    price: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    last_trade_price: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    size: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    amount: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    timestamp: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    ts: Option<Value>,
    side: Option<Value>,
    #[serde(rename = "transactionHash")]
    transaction_hash_camel: Option<Value>,
    tx_hash: Option<Value>,
    transaction_hash: Option<Value>,
    maker_address: Option<Value>,
    maker: Option<Value>,
    taker_address: Option<Value>,
    taker: Option<Value>,
}

/// Any present value, `null` included
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

fn normalize_record(record: &Value) -> Option<NormalizedTrade> {
    let raw = RawTrade::deserialize(record).ok()?;

    let token_id = first_text([&raw.asset_id, &raw.token_id, &raw.market])?;

    let price = raw.price.as_ref().or(raw.last_trade_price.as_ref());
    let size = raw.size.as_ref().or(raw.amount.as_ref());
    let price = price.map_or(Some(0.0), value_as_f64)?;
    let size = size.map_or(Some(0.0), value_as_f64)?;
    if price <= 0.0 || size <= 0.0 {
        return None;
    }

    let timestamp = match raw.timestamp.as_ref().or(raw.ts.as_ref()) {
        Some(value) => seconds_from_raw(value_as_f64(value)? as i64),
        None => 0,
    };

    let tx_hash = first_text([
        &raw.transaction_hash_camel,
        &raw.tx_hash,
        &raw.transaction_hash,
    ]);

    let side = raw
        .side
        .as_ref()
        .and_then(value_as_text)
        .map_or(Side::Unknown, |s| Side::parse(&s));

    let trade_id = first_text([&raw.id, &raw.trade_id]).unwrap_or_else(|| {
        format!(
            "{}_{}_{}_{}_{}",
            tx_hash.as_deref().unwrap_or("notx"),
            timestamp,
            token_id,
            price,
            size
        )
    });

    Some(NormalizedTrade {
        trade_id,
        tx_hash,
        timestamp,
        token_id,
        side,
        price,
        size,
        notional_usd: price * size,
        maker_address: first_text([&raw.maker_address, &raw.maker]),
        taker_address: first_text([&raw.taker_address, &raw.taker]),
    })
}

/// Integer seconds from a raw epoch value that may be in milliseconds
pub(crate) fn seconds_from_raw(raw: i64) -> i64 {
    if raw > MILLIS_THRESHOLD {
        raw / 1000
    } else {
        raw
    }
}

/// Lenient float coercion: JSON numbers and numeric strings, finite only
pub(crate) fn value_as_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

/// Trimmed, non-empty textual form of a scalar
pub(crate) fn value_as_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn first_text<const N: usize>(candidates: [&Option<Value>; N]) -> Option<String> {
    candidates
        .into_iter()
        .filter_map(Option::as_ref)
        .find_map(value_as_text)
}
