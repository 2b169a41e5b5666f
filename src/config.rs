//! Configuration types for poly-alert

use crate::alert::{PipelineConfig, POLYMARKET_EVENT_URL};
use crate::feed::{StreamConfig, POLYMARKET_WS_URL};
use crate::market::{GammaConfig, CLOB_API_URL, GAMMA_API_URL};
use crate::notify::{TelegramConfig, TELEGRAM_API_URL};
use crate::telemetry::LogFormat;
use crate::ws::WsConfig;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const REDACTED: &str = "<redacted>";

/// Configuration errors; all are fatal at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("missing required setting: {0}")]
    Missing(&'static str),
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramSection,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub alert: AlertConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Telegram credentials and endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramSection {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub chat_id: String,
    #[serde(default = "default_telegram_api")]
    pub api_base: String,
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

fn default_telegram_api() -> String {
    TELEGRAM_API_URL.to_string()
}
fn default_http_timeout() -> u64 {
    15
}

impl Default for TelegramSection {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            api_base: default_telegram_api(),
            timeout_secs: default_http_timeout(),
        }
    }
}

/// Market channel connection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeedConfig {
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    #[serde(default = "default_channel")]
    pub channel: String,
    #[serde(default = "default_max_assets")]
    pub max_assets: usize,
    /// Static subscription frame as a JSON object string; skips discovery
    #[serde(default)]
    pub subscribe_message: Option<String>,
    #[serde(default = "default_ping_interval")]
    pub ping_interval_secs: u64,
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_secs: u64,
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,
}

fn default_ws_url() -> String {
    POLYMARKET_WS_URL.to_string()
}
fn default_channel() -> String {
    "market".to_string()
}
fn default_max_assets() -> usize {
    5000
}
fn default_ping_interval() -> u64 {
    20
}
fn default_initial_backoff() -> u64 {
    1
}
fn default_max_backoff() -> u64 {
    30
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            channel: default_channel(),
            max_assets: default_max_assets(),
            subscribe_message: None,
            ping_interval_secs: default_ping_interval(),
            initial_backoff_secs: default_initial_backoff(),
            max_backoff_secs: default_max_backoff(),
        }
    }
}

impl FeedConfig {
    /// Parsed `subscribe_message`, if set
    pub fn subscribe_object(&self) -> Result<Option<Map<String, Value>>, ConfigError> {
        let Some(raw) = self.subscribe_message.as_deref() else {
            return Ok(None);
        };

        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Ok(Some(map)),
            Ok(_) => Err(ConfigError::Invalid {
                field: "feed.subscribe_message",
                reason: "must be a JSON object".to_string(),
            }),
            Err(e) => Err(ConfigError::Invalid {
                field: "feed.subscribe_message",
                reason: e.to_string(),
            }),
        }
    }

    pub fn stream_config(&self) -> Result<StreamConfig, ConfigError> {
        let ws = WsConfig::default()
            .initial_delay(Duration::from_secs(self.initial_backoff_secs))
            .max_delay(Duration::from_secs(self.max_backoff_secs))
            .ping_interval(Duration::from_secs(self.ping_interval_secs));

        Ok(StreamConfig {
            ws_url: self.ws_url.clone(),
            channel: self.channel.clone(),
            max_assets: self.max_assets,
            subscribe_message: self.subscribe_object()?,
            ws,
        })
    }
}

/// HTTP API endpoints
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default = "default_gamma_base")]
    pub gamma_base: String,
    #[serde(default = "default_clob_base")]
    pub clob_base: String,
    #[serde(default = "default_market_base")]
    pub market_base: String,
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

fn default_gamma_base() -> String {
    GAMMA_API_URL.to_string()
}
fn default_clob_base() -> String {
    CLOB_API_URL.to_string()
}
fn default_market_base() -> String {
    POLYMARKET_EVENT_URL.to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            gamma_base: default_gamma_base(),
            clob_base: default_clob_base(),
            market_base: default_market_base(),
            timeout_secs: default_http_timeout(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn gamma_config(&self) -> GammaConfig {
        GammaConfig {
            base_url: self.gamma_base.clone(),
            timeout: self.timeout(),
            ..GammaConfig::default()
        }
    }
}

/// Alert rules
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AlertConfig {
    /// Alerts fire strictly above this notional
    #[serde(default = "default_threshold")]
    pub threshold_usd: f64,
    #[serde(default = "default_dedup_ttl")]
    pub dedup_ttl_secs: u64,
    #[serde(default = "default_true")]
    pub backfill_trade_details: bool,
}

fn default_threshold() -> f64 {
    100_000.0
}
fn default_dedup_ttl() -> u64 {
    3600
}
fn default_true() -> bool {
    true
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            threshold_usd: default_threshold(),
            dedup_ttl_secs: default_dedup_ttl(),
            backfill_trade_details: true,
        }
    }
}

/// Trader tag lookup
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct IdentityConfig {
    #[serde(default)]
    pub name_service_url: Option<String>,
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default = "default_health_interval")]
    pub health_interval_secs: u64,
    /// Prometheus exporter port; disabled when unset
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_health_interval() -> u64 {
    60
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            health_interval_secs: default_health_interval(),
            metrics_port: None,
        }
    }
}

fn parse_env<T>(field: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
        field,
        reason: e.to_string(),
    })
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Load from `path` if it exists, else start from defaults, then apply
    /// environment overrides
    pub fn load_with_env(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::load(path)?
        } else {
            eprintln!(
                "Config file {} not found, using defaults and environment",
                path.display()
            );
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment overrides from `lookup`
    ///
    /// | Variable | Setting |
    /// |----------|---------|
    /// | `TELEGRAM_BOT_TOKEN` | `telegram.bot_token` |
    /// | `TELEGRAM_CHAT_ID` | `telegram.chat_id` |
    /// | `POLY_WS_URL` | `feed.ws_url` |
    /// | `POLY_WS_CHANNEL` | `feed.channel` |
    /// | `POLY_WS_SUBSCRIBE_MESSAGE` | `feed.subscribe_message` |
    /// | `POLY_MAX_ASSETS` | `feed.max_assets` |
    /// | `POLY_API_BASE` | `api.gamma_base` |
    /// | `POLY_CLOB_BASE` | `api.clob_base` |
    /// | `POLY_MARKET_BASE` | `api.market_base` |
    /// | `ALERT_THRESHOLD_USD` | `alert.threshold_usd` |
    /// | `DEDUP_TTL_SECONDS` | `alert.dedup_ttl_secs` |
    /// | `ENS_RPC_URL` | `identity.name_service_url` |
    /// | `LOG_LEVEL` | `telemetry.log_level` |
    /// | `HEALTH_LOG_INTERVAL_SECONDS` | `telemetry.health_interval_secs` |
    ///
    /// Blank values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(token) = lookup("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = token;
        }
        if let Some(chat_id) = lookup("TELEGRAM_CHAT_ID") {
            self.telegram.chat_id = chat_id;
        }

        if let Some(url) = lookup("POLY_WS_URL") {
            self.feed.ws_url = url;
        }
        if let Some(channel) = lookup("POLY_WS_CHANNEL") {
            self.feed.channel = channel;
        }
        if let Some(message) = lookup("POLY_WS_SUBSCRIBE_MESSAGE") {
            self.feed.subscribe_message = Some(message);
        }
        if let Some(raw) = lookup("POLY_MAX_ASSETS") {
            self.feed.max_assets = parse_env("POLY_MAX_ASSETS", &raw)?;
        }

        if let Some(url) = lookup("POLY_API_BASE") {
            self.api.gamma_base = url;
        }
        if let Some(url) = lookup("POLY_CLOB_BASE") {
            self.api.clob_base = url;
        }
        if let Some(url) = lookup("POLY_MARKET_BASE") {
            self.api.market_base = url;
        }

        if let Some(raw) = lookup("ALERT_THRESHOLD_USD") {
            self.alert.threshold_usd = parse_env("ALERT_THRESHOLD_USD", &raw)?;
        }
        if let Some(raw) = lookup("DEDUP_TTL_SECONDS") {
            self.alert.dedup_ttl_secs = parse_env("DEDUP_TTL_SECONDS", &raw)?;
        }

        if let Some(url) = lookup("ENS_RPC_URL") {
            self.identity.name_service_url = Some(url);
        }

        if let Some(level) = lookup("LOG_LEVEL") {
            self.telemetry.log_level = level;
        }
        if let Some(raw) = lookup("HEALTH_LOG_INTERVAL_SECONDS") {
            self.telemetry.health_interval_secs = parse_env("HEALTH_LOG_INTERVAL_SECONDS", &raw)?;
        }
        Ok(())
    }

    /// Check everything the alert pipeline needs to start
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(ConfigError::Missing("telegram.bot_token"));
        }
        if self.telegram.chat_id.trim().is_empty() {
            return Err(ConfigError::Missing("telegram.chat_id"));
        }
        self.validate_settings()
    }

    /// [`validate`](Self::validate) minus the Telegram credentials
    pub fn validate_settings(&self) -> Result<(), ConfigError> {
        self.feed.subscribe_object()?;

        if !self.alert.threshold_usd.is_finite() || self.alert.threshold_usd <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "alert.threshold_usd",
                reason: format!("must be positive, got {}", self.alert.threshold_usd),
            });
        }

        let positive = [
            ("alert.dedup_ttl_secs", self.alert.dedup_ttl_secs),
            ("telemetry.health_interval_secs", self.telemetry.health_interval_secs),
            ("feed.ping_interval_secs", self.feed.ping_interval_secs),
            ("feed.initial_backoff_secs", self.feed.initial_backoff_secs),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        if self.feed.max_backoff_secs < self.feed.initial_backoff_secs {
            return Err(ConfigError::Invalid {
                field: "feed.max_backoff_secs",
                reason: "must not be below feed.initial_backoff_secs".to_string(),
            });
        }

        Ok(())
    }

    pub fn telegram_config(&self) -> TelegramConfig {
        let mut config = TelegramConfig::new(&self.telegram.bot_token, &self.telegram.chat_id);
        config.api_base = self.telegram.api_base.clone();
        config.timeout = Duration::from_secs(self.telegram.timeout_secs);
        config
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            threshold_usd: self.alert.threshold_usd,
            dedup_ttl: Duration::from_secs(self.alert.dedup_ttl_secs),
            health_interval: Duration::from_secs(self.telemetry.health_interval_secs),
            market_base: self.api.market_base.clone(),
            backfill_trade_details: self.alert.backfill_trade_details,
        }
    }

    /// Copy with secrets masked, for display
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if !config.telegram.bot_token.is_empty() {
            config.telegram.bot_token = REDACTED.to_string();
        }
        config
    }

    /// Effective configuration as TOML, secrets masked
    pub fn to_display_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(&self.redacted())?)
    }
}
