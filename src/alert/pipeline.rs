//! Trade-to-alert pipeline

use super::backfill::{apply_history, needs_backfill};
use super::dedup::DedupCache;
use super::format::{
    build_market_link, build_trade_link, dedupe_key, format_alert_message, side_to_text,
    trade_time_iso,
};
use super::AlertPayload;
use crate::feed::{FeedMessage, NormalizedTrade};
use crate::identity::IdentityResolver;
use crate::market::{MetadataResolver, TradeHistory};
use crate::notify::Notifier;
use crate::telemetry::{PipelineCounter, PipelineMetrics};
use futures_util::{Stream, StreamExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Market page base used when none is configured
pub const POLYMARKET_EVENT_URL: &str = "https://polymarket.com/event";

/// Pipeline settings
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Alerts fire for notional strictly above this
    pub threshold_usd: f64,
    pub dedup_ttl: Duration,
    pub health_interval: Duration,
    /// Base for market links, joined with the event slug
    pub market_base: String,
    /// Query trade history when a trade lacks its hash or counterparties
    pub backfill_trade_details: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threshold_usd: 100_000.0,
            dedup_ttl: Duration::from_secs(3600),
            health_interval: Duration::from_secs(60),
            market_base: POLYMARKET_EVENT_URL.to_string(),
            backfill_trade_details: true,
        }
    }
}

/// What happened to one trade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeOutcome {
    BelowThreshold,
    Duplicate,
    Sent,
    Failed,
}

/// Filters, enriches and dispatches trades
pub struct AlertPipeline {
    config: PipelineConfig,
    metrics: Arc<PipelineMetrics>,
    dedup: DedupCache,
    metadata: MetadataResolver,
    identity: IdentityResolver,
    notifier: Arc<dyn Notifier>,
    history: Option<Arc<dyn TradeHistory>>,
}

impl AlertPipeline {
    pub fn new(
        config: PipelineConfig,
        metadata: MetadataResolver,
        identity: IdentityResolver,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let dedup = DedupCache::new(config.dedup_ttl);
        Self {
            config,
            metrics: Arc::new(PipelineMetrics::new()),
            dedup,
            metadata,
            identity,
            notifier,
            history: None,
        }
    }

    /// Enable trade-detail backfill from `history`
    pub fn with_trade_history(mut self, history: Arc<dyn TradeHistory>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn metrics(&self) -> Arc<PipelineMetrics> {
        self.metrics.clone()
    }

    /// Consume `messages` until it ends or `shutdown` resolves
    ///
    /// The health reporter runs alongside and is stopped before returning.
    pub async fn run<S, F>(mut self, messages: S, shutdown: F)
    where
        S: Stream<Item = FeedMessage>,
        F: Future<Output = ()>,
    {
        info!(
            threshold_usd = self.config.threshold_usd,
            dedup_ttl_secs = self.config.dedup_ttl.as_secs(),
            "Alert pipeline started"
        );

        let health = tokio::spawn(report_health(
            self.metrics.clone(),
            self.config.health_interval,
        ));

        tokio::select! {
            _ = self.consume(messages) => warn!("Trade stream ended"),
            _ = shutdown => info!("Shutdown requested"),
        }

        health.abort();
        if let Err(e) = health.await {
            if !e.is_cancelled() {
                error!(error = %e, "Health reporter failed");
            }
        }

        let snapshot = self.metrics.snapshot();
        info!(
            messages = snapshot.messages_observed,
            trades = snapshot.trades_observed,
            over_threshold = snapshot.trades_over_threshold,
            alerts_sent = snapshot.alerts_sent,
            alerts_failed = snapshot.alerts_failed,
            "Alert pipeline stopped"
        );
    }

    async fn consume<S>(&mut self, messages: S)
    where
        S: Stream<Item = FeedMessage>,
    {
        futures_util::pin_mut!(messages);
        while let Some(message) = messages.next().await {
            self.handle_message(message).await;
        }
    }

    /// Count the frame, then process its trades in order
    pub async fn handle_message(&mut self, message: FeedMessage) -> Vec<TradeOutcome> {
        self.metrics.increment(PipelineCounter::Messages);

        let mut outcomes = Vec::with_capacity(message.trades.len());
        for trade in message.trades {
            outcomes.push(self.handle_trade(trade).await);
        }
        outcomes
    }

    pub async fn handle_trade(&mut self, trade: NormalizedTrade) -> TradeOutcome {
        self.metrics.increment(PipelineCounter::Trades);

        if trade.notional_usd <= self.config.threshold_usd {
            return TradeOutcome::BelowThreshold;
        }
        self.metrics.increment(PipelineCounter::OverThreshold);

        let key = dedupe_key(&trade);
        if !self.dedup.is_new(&key) {
            debug!(key = %key, "Duplicate trade suppressed");
            return TradeOutcome::Duplicate;
        }

        let trade = self.backfill(trade).await;
        let payload = self.build_payload(&trade).await;
        let text = format_alert_message(&payload);

        match self.notifier.send(&text).await {
            Ok(()) => {
                self.metrics.increment(PipelineCounter::AlertsSent);
                info!(
                    trade_id = %trade.trade_id,
                    amount_usd = trade.notional_usd,
                    market = %payload.market_title,
                    "Alert sent"
                );
                TradeOutcome::Sent
            }
            Err(e) => {
                self.metrics.increment(PipelineCounter::AlertsFailed);
                error!(
                    trade_id = %trade.trade_id,
                    amount_usd = trade.notional_usd,
                    error = %e,
                    "Alert delivery failed"
                );
                TradeOutcome::Failed
            }
        }
    }

    async fn backfill(&self, trade: NormalizedTrade) -> NormalizedTrade {
        if !self.config.backfill_trade_details || !needs_backfill(&trade) {
            return trade;
        }
        let Some(history) = &self.history else {
            return trade;
        };

        match history.recent_trades(&trade.token_id).await {
            Ok(rows) => apply_history(trade, &rows),
            Err(e) => {
                debug!(token_id = %trade.token_id, error = %e, "Trade history lookup failed");
                trade
            }
        }
    }

    async fn build_payload(&self, trade: &NormalizedTrade) -> AlertPayload {
        let metadata = self.metadata.resolve(&trade.token_id).await;
        let trader_tag = self.identity.resolve_tag(trade.actor()).await;

        AlertPayload {
            market_url: build_market_link(&self.config.market_base, metadata.event_slug.as_deref()),
            trade_url: build_trade_link(trade.tx_hash.as_deref()),
            market_title: metadata.title,
            outcome: metadata.outcome,
            side_text: side_to_text(trade.side).to_string(),
            amount_usd: trade.notional_usd,
            trader_tag,
            timestamp_iso: trade_time_iso(trade.timestamp),
        }
    }
}

/// Log a metrics snapshot every `interval`, forever
pub async fn report_health(metrics: Arc<PipelineMetrics>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // first tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let snapshot = metrics.snapshot();
        info!(
            messages = snapshot.messages_observed,
            trades = snapshot.trades_observed,
            over_threshold = snapshot.trades_over_threshold,
            alerts_sent = snapshot.alerts_sent,
            alerts_failed = snapshot.alerts_failed,
            "Pipeline health"
        );
    }
}
