//! Run command implementation

use crate::alert::AlertPipeline;
use crate::config::Config;
use crate::feed::StreamConnector;
use crate::identity::IdentityResolver;
use crate::market::{ClobClient, GammaClient, MetadataResolver};
use crate::notify::{LogNotifier, Notifier, TelegramNotifier};
use crate::telemetry::install_prometheus;
use crate::ws::WsTransport;
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Override the alert threshold in USD
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Log alerts instead of sending them to Telegram
    #[arg(long)]
    pub dry_run: bool,
}

impl RunArgs {
    pub async fn execute(&self, mut config: Config) -> anyhow::Result<()> {
        if let Some(threshold) = self.threshold {
            config.alert.threshold_usd = threshold;
        }

        if self.dry_run {
            config.validate_settings()?;
        } else {
            config.validate()?;
        }

        if let Some(port) = config.telemetry.metrics_port {
            install_prometheus(port)?;
        }

        let gamma = Arc::new(GammaClient::with_config(config.api.gamma_config())?);
        let notifier: Arc<dyn Notifier> = if self.dry_run {
            tracing::warn!("Dry run: alerts will be logged, not sent");
            Arc::new(LogNotifier)
        } else {
            Arc::new(TelegramNotifier::new(config.telegram_config())?)
        };

        let stream_config = config.feed.stream_config()?;
        let transport = Arc::new(WsTransport::new(stream_config.ws.clone()));
        let connector = StreamConnector::new(stream_config, gamma.clone(), transport);

        let mut pipeline = AlertPipeline::new(
            config.pipeline_config(),
            MetadataResolver::new(gamma),
            IdentityResolver::new(config.identity.name_service_url.clone()),
            notifier,
        );
        if config.alert.backfill_trade_details {
            let clob = ClobClient::new(&config.api.clob_base, config.api.timeout())?;
            pipeline = pipeline.with_trade_history(Arc::new(clob));
        }

        pipeline.run(connector.messages(), shutdown_signal()).await;
        Ok(())
    }
}

/// Resolves on Ctrl-C
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
