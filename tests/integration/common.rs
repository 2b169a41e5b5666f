//! Fake collaborators shared by the integration tests

use async_trait::async_trait;
use poly_alert::feed::AssetDiscovery;
use poly_alert::market::MarketLookup;
use poly_alert::notify::{Notifier, NotifyError};
use poly_alert::ws::{FeedSession, FeedTransport, WsError};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

pub struct StaticDiscovery(pub Vec<String>);

#[async_trait]
impl AssetDiscovery for StaticDiscovery {
    async fn discover_asset_ids(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.0.clone())
    }
}

/// Replays frames, then either stays open silently or closes
pub struct ReplaySession {
    frames: VecDeque<String>,
    hold_open: bool,
    sent: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl FeedSession for ReplaySession {
    async fn send_text(&mut self, text: String) -> Result<(), WsError> {
        self.sent.lock().unwrap().push(text);
        Ok(())
    }

    async fn next_text(&mut self) -> Result<String, WsError> {
        match self.frames.pop_front() {
            Some(frame) => Ok(frame),
            None if self.hold_open => std::future::pending().await,
            None => Err(WsError::Closed),
        }
    }
}

/// Hands out one scripted session per connect; the last stays open
#[derive(Default)]
pub struct ReplayTransport {
    sessions: Mutex<VecDeque<Vec<String>>>,
    pub sent: Arc<Mutex<Vec<String>>>,
    pub connects: Mutex<usize>,
}

impl ReplayTransport {
    pub fn new(sessions: Vec<Vec<&str>>) -> Self {
        Self {
            sessions: Mutex::new(
                sessions
                    .into_iter()
                    .map(|frames| frames.into_iter().map(String::from).collect())
                    .collect(),
            ),
            ..Default::default()
        }
    }
}

#[async_trait]
impl FeedTransport for ReplayTransport {
    async fn connect(&self, _url: &str) -> Result<Box<dyn FeedSession>, WsError> {
        *self.connects.lock().unwrap() += 1;
        let mut sessions = self.sessions.lock().unwrap();
        let frames = sessions.pop_front().unwrap_or_default();
        let hold_open = sessions.is_empty();

        Ok(Box::new(ReplaySession {
            frames: frames.into(),
            hold_open,
            sent: self.sent.clone(),
        }))
    }
}

/// Always returns the same `/markets` response
pub struct CannedMarkets(pub Value);

#[async_trait]
impl MarketLookup for CannedMarkets {
    async fn query_markets(&self, _query: &[(&str, &str)]) -> anyhow::Result<Value> {
        Ok(self.0.clone())
    }
}

/// Records alert text and signals each delivery
pub struct ChannelNotifier {
    pub sent: Mutex<Vec<String>>,
    delivered: mpsc::UnboundedSender<()>,
}

impl ChannelNotifier {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let notifier = Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            delivered: tx,
        });
        (notifier, rx)
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(text.to_string());
        let _ = self.delivered.send(());
        Ok(())
    }
}
