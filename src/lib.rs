//! poly-alert: Large-trade alerts for Polymarket, delivered to Telegram
//!
//! This library provides the core components for:
//! - Real-time trades from the Polymarket market channel
//! - Tolerant normalization of arbitrary trade payloads
//! - Asset discovery and market metadata via the Gamma API
//! - Trade-detail backfill from CLOB trade history
//! - Threshold filtering and time-bounded de-duplication
//! - Telegram delivery with retry and rate-limit handling
//! - Structured logging and pipeline metrics

pub mod alert;
pub mod cli;
pub mod config;
pub mod feed;
pub mod identity;
pub mod market;
pub mod notify;
pub mod telemetry;
pub mod ws;
