//! Market channel connector
//!
//! Drives discovery, connection, subscription and streaming as one state
//! machine that loops forever:
//!
//! ```text
//! Discovering -> Connecting -> (subscribed) Streaming -> Reconnecting -> Discovering
//! ```
//!
//! Failures anywhere before or during streaming go through `Reconnecting`,
//! which sleeps the current backoff and doubles it. A successful subscribe
//! resets the backoff. The only way out is dropping the stream.

use super::normalizer::parse_ws_message;
use super::types::{FeedMessage, NormalizedTrade};
use super::AssetDiscovery;
use crate::ws::{Backoff, FeedSession, FeedTransport, WsConfig};
use anyhow::Context;
use futures_util::stream::{self, Stream, StreamExt};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Polymarket CLOB WebSocket URL for market data
pub const POLYMARKET_WS_URL: &str = "wss://ws-subscriptions-clob.polymarket.com/ws/market";

/// Asset ids per subscription frame
pub const SUBSCRIPTION_CHUNK: usize = 300;

/// Configuration for the market channel connection
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// WebSocket URL; `/ws/{channel}` is appended unless already present
    pub ws_url: String,
    /// Channel name, also the `type` of subscription frames
    pub channel: String,
    /// Cap on the number of discovered assets subscribed to
    pub max_assets: usize,
    /// Operator-supplied subscription frame, sent verbatim instead of the
    /// discovered asset list
    pub subscribe_message: Option<Map<String, Value>>,
    /// Keepalive and backoff settings
    pub ws: WsConfig,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            ws_url: POLYMARKET_WS_URL.to_string(),
            channel: "market".to_string(),
            max_assets: 5000,
            subscribe_message: None,
            ws: WsConfig::default(),
        }
    }
}

impl StreamConfig {
    /// URL actually dialled
    pub fn connect_url(&self) -> String {
        if self.ws_url.contains("/ws/") {
            self.ws_url.clone()
        } else {
            format!("{}/ws/{}", self.ws_url.trim_end_matches('/'), self.channel)
        }
    }

    /// Frames to send right after connecting
    pub fn subscription_frames(&self, asset_ids: &[String]) -> Vec<String> {
        if let Some(message) = &self.subscribe_message {
            return vec![Value::Object(message.clone()).to_string()];
        }

        let total = asset_ids.len().min(self.max_assets);
        asset_ids[..total]
            .chunks(SUBSCRIPTION_CHUNK)
            .filter_map(|chunk| {
                serde_json::to_string(&SubscriptionMessage {
                    msg_type: &self.channel,
                    assets_ids: chunk,
                })
                .ok()
            })
            .collect()
    }
}

/// Subscription message for the market channel
#[derive(Debug, Serialize)]
struct SubscriptionMessage<'a> {
    #[serde(rename = "type")]
    msg_type: &'a str,
    assets_ids: &'a [String],
}

/// Owns the feed connection for the lifetime of the process
pub struct StreamConnector {
    config: StreamConfig,
    discovery: Arc<dyn AssetDiscovery>,
    transport: Arc<dyn FeedTransport>,
}

impl StreamConnector {
    pub fn new(
        config: StreamConfig,
        discovery: Arc<dyn AssetDiscovery>,
        transport: Arc<dyn FeedTransport>,
    ) -> Self {
        Self {
            config,
            discovery,
            transport,
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// One item per inbound frame, forever
    ///
    /// The stream is lazy: nothing connects until it is first polled.
    pub fn messages(self) -> impl Stream<Item = FeedMessage> + Send {
        let backoff = self.config.ws.backoff();
        let state = ConnectorState {
            connector: self,
            backoff,
            phase: Phase::Discovering,
        };

        stream::unfold(state, |mut state| async move {
            let message = state.next_message().await;
            Some((message, state))
        })
    }

    /// Trades only, flattened out of [`messages`](Self::messages)
    pub fn trades(self) -> impl Stream<Item = NormalizedTrade> + Send {
        self.messages()
            .flat_map(|message| stream::iter(message.trades))
    }

    async fn discover(&self) -> anyhow::Result<Vec<String>> {
        let asset_ids = self
            .discovery
            .discover_asset_ids()
            .await
            .context("Asset discovery failed")?;

        if asset_ids.is_empty() && self.config.subscribe_message.is_none() {
            anyhow::bail!("No asset ids discovered for market subscription");
        }

        tracing::debug!(assets = asset_ids.len(), "Discovered tradable assets");
        Ok(asset_ids)
    }

    async fn open_session(&self, asset_ids: &[String]) -> anyhow::Result<Box<dyn FeedSession>> {
        let url = self.config.connect_url();
        let mut session = self.transport.connect(&url).await?;

        let frames = self.config.subscription_frames(asset_ids);
        let frame_count = frames.len();
        for frame in frames {
            session
                .send_text(frame)
                .await
                .context("Failed to send subscription")?;
        }

        tracing::info!(
            url = %url,
            assets = asset_ids.len().min(self.config.max_assets),
            frames = frame_count,
            "Subscribed to market channel"
        );

        Ok(session)
    }
}

enum Phase {
    Discovering,
    Connecting(Vec<String>),
    Streaming(Box<dyn FeedSession>),
    Reconnecting(anyhow::Error),
}

struct ConnectorState {
    connector: StreamConnector,
    backoff: Backoff,
    phase: Phase,
}

impl ConnectorState {
    async fn next_message(&mut self) -> FeedMessage {
        loop {
            self.phase = match std::mem::replace(&mut self.phase, Phase::Discovering) {
                Phase::Discovering => match self.connector.discover().await {
                    Ok(asset_ids) => Phase::Connecting(asset_ids),
                    Err(e) => Phase::Reconnecting(e),
                },
                Phase::Connecting(asset_ids) => {
                    match self.connector.open_session(&asset_ids).await {
                        Ok(session) => {
                            self.backoff.reset();
                            Phase::Streaming(session)
                        }
                        Err(e) => Phase::Reconnecting(e),
                    }
                }
                Phase::Streaming(mut session) => match session.next_text().await {
                    Ok(text) => {
                        self.phase = Phase::Streaming(session);
                        return FeedMessage {
                            trades: parse_ws_message(&text),
                        };
                    }
                    Err(e) => Phase::Reconnecting(e.into()),
                },
                Phase::Reconnecting(error) => {
                    let delay = self.backoff.next_delay();
                    tracing::warn!(
                        error = %format!("{error:#}"),
                        delay_ms = delay.as_millis() as u64,
                        "Market feed disconnected, reconnecting"
                    );
                    tokio::time::sleep(delay).await;
                    Phase::Discovering
                }
            };
        }
    }
}
