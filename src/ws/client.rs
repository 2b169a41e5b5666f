//! WebSocket transport with ping/pong keepalive

use super::types::{WsConfig, WsError};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::{
    connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// One live connection to the feed
///
/// Reconnection is the caller's job; a session is dead after the first error.
#[async_trait]
pub trait FeedSession: Send {
    /// Send a single text frame
    async fn send_text(&mut self, text: String) -> Result<(), WsError>;
    /// Wait for the next text payload
    async fn next_text(&mut self) -> Result<String, WsError>;
}

/// Opens feed sessions
#[async_trait]
pub trait FeedTransport: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn FeedSession>, WsError>;
}

/// tokio-tungstenite backed transport
#[derive(Debug, Clone, Default)]
pub struct WsTransport {
    config: WsConfig,
}

impl WsTransport {
    pub fn new(config: WsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WsConfig {
        &self.config
    }
}

#[async_trait]
impl FeedTransport for WsTransport {
    async fn connect(&self, url: &str) -> Result<Box<dyn FeedSession>, WsError> {
        tracing::info!(url = %url, "Connecting to WebSocket");

        let (ws_stream, _response) = connect_async(url)
            .await
            .map_err(|e| WsError::ConnectionFailed(e.to_string()))?;

        tracing::debug!("WebSocket connected");

        Ok(Box::new(WsSession::spawn(ws_stream, &self.config)))
    }
}

/// A connected WebSocket driven by a background task
///
/// The task owns the socket: it reads frames, answers server pings and
/// sends its own pings whether or not anyone is calling `next_text`.
/// Payloads are queued for the consumer, so a slow consumer never stalls
/// keepalive.
pub struct WsSession {
    outgoing: mpsc::UnboundedSender<String>,
    incoming: mpsc::UnboundedReceiver<Result<String, WsError>>,
    driver: JoinHandle<()>,
}

impl WsSession {
    fn spawn(stream: WsStream, config: &WsConfig) -> Self {
        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
        let (incoming_tx, incoming) = mpsc::unbounded_channel();

        let ping_every = config.ping_interval;
        let pong_timeout = config.pong_timeout;
        let driver = tokio::spawn(async move {
            if let Err(e) =
                drive_connection(stream, ping_every, pong_timeout, outgoing_rx, &incoming_tx).await
            {
                tracing::debug!(error = %e, "WebSocket session ended");
                let _ = incoming_tx.send(Err(e));
            }
        });

        Self {
            outgoing,
            incoming,
            driver,
        }
    }
}

impl Drop for WsSession {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

#[async_trait]
impl FeedSession for WsSession {
    async fn send_text(&mut self, text: String) -> Result<(), WsError> {
        self.outgoing
            .send(text)
            .map_err(|_| WsError::SendFailed("session closed".into()))
    }

    async fn next_text(&mut self) -> Result<String, WsError> {
        self.incoming.recv().await.unwrap_or(Err(WsError::Closed))
    }
}

/// Read, keepalive and write loop for one connection
///
/// Returns `Ok` only when the session handle is dropped.
async fn drive_connection(
    stream: WsStream,
    ping_every: Duration,
    pong_timeout: Duration,
    mut outgoing: mpsc::UnboundedReceiver<String>,
    incoming: &mpsc::UnboundedSender<Result<String, WsError>>,
) -> Result<(), WsError> {
    let (mut write, mut read) = stream.split();

    let mut ping_interval = tokio::time::interval(ping_every);
    ping_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // Set when a ping goes out, cleared by any pong
    let mut pong_deadline: Option<Instant> = None;

    loop {
        let deadline = pong_deadline;

        tokio::select! {
            biased;

            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => deliver(incoming, text)?,
                    Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                        Ok(text) => deliver(incoming, text)?,
                        Err(_) => tracing::trace!("Ignoring non-UTF-8 binary frame"),
                    },
                    Some(Ok(Message::Ping(data))) => {
                        write.send(Message::Pong(data)).await
                            .map_err(|e| WsError::SendFailed(e.to_string()))?;
                    }
                    Some(Ok(Message::Pong(_))) => {
                        pong_deadline = None;
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("Received close frame");
                        return Err(WsError::Closed);
                    }
                    Some(Ok(Message::Frame(_))) => {}
                    Some(Err(e)) => {
                        return Err(WsError::ConnectionFailed(e.to_string()));
                    }
                    None => {
                        return Err(WsError::ConnectionFailed("Stream ended unexpectedly".into()));
                    }
                }
            }

            text = outgoing.recv() => {
                match text {
                    Some(text) => {
                        write.send(Message::Text(text)).await
                            .map_err(|e| WsError::SendFailed(e.to_string()))?;
                    }
                    None => {
                        let _ = write.close().await;
                        return Ok(());
                    }
                }
            }

            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                return Err(WsError::PongTimeout);
            }

            _ = ping_interval.tick() => {
                if pong_deadline.is_none() {
                    write.send(Message::Ping(Vec::new())).await
                        .map_err(|e| WsError::SendFailed(e.to_string()))?;
                    pong_deadline = Some(Instant::now() + pong_timeout);
                }
            }
        }
    }
}

fn deliver(
    incoming: &mpsc::UnboundedSender<Result<String, WsError>>,
    text: String,
) -> Result<(), WsError> {
    incoming.send(Ok(text)).map_err(|_| WsError::Closed)
}
