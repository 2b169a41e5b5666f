//! Pipeline counters
//!
//! Counters live in process as atomics for health reporting and are mirrored
//! to the `metrics` facade so a Prometheus exporter can scrape them.

use serde::Serialize;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineCounter {
    /// Inbound feed frames, including heartbeats
    Messages,
    /// Normalized trades
    Trades,
    /// Trades strictly above the alert threshold
    OverThreshold,
    /// Alerts delivered
    AlertsSent,
    /// Alerts that exhausted their retries
    AlertsFailed,
}

impl PipelineCounter {
    pub fn name(self) -> &'static str {
        match self {
            PipelineCounter::Messages => "polyalert_messages_total",
            PipelineCounter::Trades => "polyalert_trades_total",
            PipelineCounter::OverThreshold => "polyalert_trades_over_threshold_total",
            PipelineCounter::AlertsSent => "polyalert_alerts_sent_total",
            PipelineCounter::AlertsFailed => "polyalert_alerts_failed_total",
        }
    }
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub messages_observed: u64,
    pub trades_observed: u64,
    pub trades_over_threshold: u64,
    pub alerts_sent: u64,
    pub alerts_failed: u64,
}

/// Monotonic counters shared between the pipeline and the health reporter
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    messages_observed: AtomicU64,
    trades_observed: AtomicU64,
    trades_over_threshold: AtomicU64,
    alerts_sent: AtomicU64,
    alerts_failed: AtomicU64,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self, counter: PipelineCounter) {
        let cell = match counter {
            PipelineCounter::Messages => &self.messages_observed,
            PipelineCounter::Trades => &self.trades_observed,
            PipelineCounter::OverThreshold => &self.trades_over_threshold,
            PipelineCounter::AlertsSent => &self.alerts_sent,
            PipelineCounter::AlertsFailed => &self.alerts_failed,
        };
        cell.fetch_add(1, Ordering::Relaxed);
        ::metrics::counter!(counter.name()).increment(1);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_observed: self.messages_observed.load(Ordering::Relaxed),
            trades_observed: self.trades_observed.load(Ordering::Relaxed),
            trades_over_threshold: self.trades_over_threshold.load(Ordering::Relaxed),
            alerts_sent: self.alerts_sent.load(Ordering::Relaxed),
            alerts_failed: self.alerts_failed.load(Ordering::Relaxed),
        }
    }
}

/// Serve `/metrics` on `0.0.0.0:port`
///
/// Must be called from within a Tokio runtime.
pub fn install_prometheus(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to start metrics exporter: {}", e))?;

    tracing::info!(%addr, "Prometheus exporter listening");
    Ok(())
}
