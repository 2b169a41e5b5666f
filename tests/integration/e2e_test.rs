//! End-to-end pipeline tests

use crate::common::{CannedMarkets, ChannelNotifier, ReplayTransport, StaticDiscovery};
use poly_alert::alert::{AlertPipeline, PipelineConfig};
use poly_alert::config::Config;
use poly_alert::feed::{StreamConfig, StreamConnector};
use poly_alert::identity::IdentityResolver;
use poly_alert::market::MetadataResolver;
use poly_alert::ws::WsConfig;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const WHALE_FRAME: &str = r#"{"data":{"price":"0.52","size":"300000","side":"BUY","asset_id":"123","timestamp":1730000000,"transactionHash":"0xabc","taker":"0x1234567890abcdef1234567890abcdef12345678"}}"#;
const SMALL_FRAME: &str =
    r#"{"price":"0.5","size":"100","side":"SELL","asset_id":"123","timestamp":1730000001}"#;
const HEARTBEAT: &str = r#"{"type":"heartbeat"}"#;

#[test]
fn test_config_example_loads() {
    let config = Config::from_toml_str(include_str!("../../config.toml.example")).unwrap();
    assert_eq!(config.alert.threshold_usd, 100_000.0);
    assert!(config.validate_settings().is_ok());
}

#[tokio::test]
async fn test_feed_to_telegram() {
    let transport = Arc::new(ReplayTransport::new(vec![vec![
        HEARTBEAT,
        SMALL_FRAME,
        WHALE_FRAME,
        WHALE_FRAME,
    ]]));
    let stream_config = StreamConfig {
        ws_url: "wss://feed.test".to_string(),
        ws: WsConfig::default().initial_delay(Duration::from_millis(1)),
        ..Default::default()
    };
    let connector = StreamConnector::new(
        stream_config,
        Arc::new(StaticDiscovery(vec!["123".to_string()])),
        transport,
    );

    let markets = CannedMarkets(json!([{
        "id": "m1",
        "question": "Will <X> happen?",
        "clobTokenIds": ["123", "456"],
        "outcomes": ["Yes", "No"],
        "slug": "will-x-happen"
    }]));
    let (notifier, mut delivered) = ChannelNotifier::new();

    let pipeline = AlertPipeline::new(
        PipelineConfig::default(),
        MetadataResolver::new(Arc::new(markets)),
        IdentityResolver::default(),
        notifier.clone(),
    );
    let metrics = pipeline.metrics();

    let shutdown = async move {
        delivered.recv().await;
        // let the duplicate frame drain
        tokio::time::sleep(Duration::from_millis(50)).await;
    };
    tokio::time::timeout(
        Duration::from_secs(5),
        pipeline.run(connector.messages(), shutdown),
    )
    .await
    .expect("pipeline did not finish");

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.messages_observed, 4);
    assert_eq!(snapshot.trades_observed, 3);
    assert_eq!(snapshot.trades_over_threshold, 2);
    assert_eq!(snapshot.alerts_sent, 1);
    assert_eq!(snapshot.alerts_failed, 0);

    let sent = notifier.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let text = &sent[0];
    assert!(text.contains("Will &lt;X&gt; happen?"));
    assert!(text.contains("Bought Yes"));
    assert!(text.contains("$156,000"));
    assert!(text.contains("0x1234...5678"));
    assert!(text.contains("2024-10-27T03:33:20Z"));
    assert!(text.contains("https://polymarket.com/event/will-x-happen"));
    assert!(text.contains("https://polygonscan.com/tx/0xabc"));
}
