//! Metadata resolution tests

use crate::common::CannedMarkets;
use poly_alert::market::{MarketMetadata, MetadataResolver};
use serde_json::json;
use std::sync::Arc;

fn binary_market() -> serde_json::Value {
    json!([{
        "id": "m1",
        "question": "Will it rain tomorrow?",
        "clobTokenIds": "[\"111\", \"222\"]",
        "outcomes": "[\"Yes\", \"No\"]",
        "events": [{"slug": "rain-tomorrow"}]
    }])
}

#[tokio::test]
async fn test_outcome_follows_token_position() {
    let resolver = MetadataResolver::new(Arc::new(CannedMarkets(binary_market())));

    let yes = resolver.resolve("111").await;
    let no = resolver.resolve("222").await;

    assert_eq!(yes.title, "Will it rain tomorrow?");
    assert_eq!(yes.outcome.as_deref(), Some("Yes"));
    assert_eq!(no.outcome.as_deref(), Some("No"));
    assert_eq!(no.event_slug.as_deref(), Some("rain-tomorrow"));
    assert_eq!(resolver.cached_count().await, 2);
}

#[tokio::test]
async fn test_unknown_token_gets_fallback() {
    let resolver = MetadataResolver::new(Arc::new(CannedMarkets(json!([]))));

    assert_eq!(resolver.resolve("999").await, MarketMetadata::fallback("999"));
    assert_eq!(resolver.resolve("999").await.title, "Token 999");
}
