//! Feed normalization and connector tests

use crate::common::{ReplayTransport, StaticDiscovery};
use futures_util::StreamExt;
use poly_alert::feed::{parse_ws_message, Side, StreamConfig, StreamConnector};
use poly_alert::ws::WsConfig;
use std::sync::Arc;
use std::time::Duration;

const TRADE_FRAME: &str = r#"{"data":{"price":"0.52","size":"300000","side":"BUY","asset_id":"123","timestamp":1730000000,"transactionHash":"0xabc"}}"#;

#[test]
fn test_data_envelope_trade() {
    let trades = parse_ws_message(TRADE_FRAME);

    assert_eq!(trades.len(), 1);
    let trade = &trades[0];
    assert_eq!(trade.token_id, "123");
    assert_eq!(trade.notional_usd, 156000.0);
    assert_eq!(trade.side, Side::Buy);
    assert_eq!(trade.tx_hash.as_deref(), Some("0xabc"));
    assert_eq!(trade.timestamp, 1_730_000_000);
}

#[test]
fn test_millisecond_timestamps_match_seconds() {
    let seconds = parse_ws_message(TRADE_FRAME);
    let millis = parse_ws_message(&TRADE_FRAME.replace("1730000000", "1730000000000"));

    assert_eq!(seconds[0].timestamp, millis[0].timestamp);
}

#[test]
fn test_heartbeat_yields_nothing() {
    assert!(parse_ws_message(r#"{"type":"heartbeat","timestamp":1730000000}"#).is_empty());
    assert!(parse_ws_message("PONG").is_empty());
}

#[test]
fn test_bad_records_do_not_hide_siblings() {
    let frame = r#"{"trades":[
        {"price":"0","size":"10","asset_id":"1"},
        {"price":"abc","size":"10","asset_id":"2"},
        {"price":"0.4","size":"-1","asset_id":"3"},
        {"price":"0.4","size":"10","asset_id":"4"}
    ]}"#;

    let trades = parse_ws_message(frame);
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].token_id, "4");
}

#[tokio::test]
async fn test_connector_reconnects_and_resubscribes() {
    let transport = Arc::new(ReplayTransport::new(vec![
        vec![TRADE_FRAME],
        vec![r#"{"type":"heartbeat"}"#, TRADE_FRAME],
    ]));
    let config = StreamConfig {
        ws_url: "wss://feed.test".to_string(),
        ws: WsConfig::default()
            .initial_delay(Duration::from_millis(1))
            .max_delay(Duration::from_millis(4)),
        ..Default::default()
    };
    let discovery = Arc::new(StaticDiscovery(vec!["123".to_string(), "456".to_string()]));
    let connector = StreamConnector::new(config, discovery, transport.clone());

    let messages: Vec<_> = tokio::time::timeout(
        Duration::from_secs(2),
        connector.messages().take(3).collect::<Vec<_>>(),
    )
    .await
    .expect("connector stalled");

    assert_eq!(messages[0].trades.len(), 1);
    assert!(messages[1].trades.is_empty());
    assert_eq!(messages[2].trades.len(), 1);
    assert_eq!(*transport.connects.lock().unwrap(), 2);

    let sent = transport.sent.lock().unwrap();
    assert_eq!(sent.len(), 2);
    let frame: serde_json::Value = serde_json::from_str(&sent[1]).unwrap();
    assert_eq!(frame["type"], "market");
    assert_eq!(frame["assets_ids"], serde_json::json!(["123", "456"]));
}
