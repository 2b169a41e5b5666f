//! Telemetry module
//!
//! Logging and pipeline metrics

mod logging;
mod metrics;

pub use logging::{init_logging, LogFormat};
pub use metrics::{install_prometheus, MetricsSnapshot, PipelineCounter, PipelineMetrics};
