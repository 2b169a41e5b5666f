//! Test-alert command implementation

use crate::alert::{format_alert_message, trade_time_iso, AlertPayload, POLYGONSCAN_TX_URL};
use crate::config::Config;
use crate::notify::{Notifier, TelegramNotifier};
use clap::Args;

#[derive(Args, Debug)]
pub struct TestAlertArgs {
    /// Amount shown in the sample alert
    #[arg(long, default_value_t = 125_000.0)]
    pub amount: f64,
}

impl TestAlertArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        config.validate()?;

        let notifier = TelegramNotifier::new(config.telegram_config())?;
        let text = format_alert_message(&sample_payload(self.amount, &config.api.market_base));

        notifier.send(&text).await?;
        tracing::info!(chat_id = %config.telegram.chat_id, "Test alert sent");
        Ok(())
    }
}

/// Clearly-labelled fake alert
pub fn sample_payload(amount_usd: f64, market_base: &str) -> AlertPayload {
    AlertPayload {
        market_title: "[Test] Will this alert reach the chat?".to_string(),
        outcome: Some("Yes".to_string()),
        side_text: "Bought".to_string(),
        amount_usd,
        trader_tag: "0x0000...0000".to_string(),
        timestamp_iso: trade_time_iso(chrono::Utc::now().timestamp()),
        market_url: Some(format!("{}/", market_base.trim_end_matches('/'))),
        trade_url: Some(format!("{}/0x0", POLYGONSCAN_TX_URL)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_alert_renders() {
        let text = format_alert_message(&sample_payload(125_000.0, "https://polymarket.com/event"));
        assert!(text.contains("[Test]"));
        assert!(text.contains("$125,000"));
        assert!(text.contains("Open market"));
        assert!(text.contains("View trade"));
    }
}
