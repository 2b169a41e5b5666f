//! WebSocket transport
//!
//! Provides the feed transport seam plus a tokio-tungstenite implementation
//! with ping/pong keepalive and a doubling reconnect backoff.

mod client;
mod types;

pub use client::{FeedSession, FeedTransport, WsSession, WsTransport};
pub use types::{Backoff, WsConfig, WsError};
