//! Alert delivery
//!
//! Delivers formatted alerts to Telegram with retry and rate-limit backoff

mod telegram;

pub use telegram::{RetryPolicy, TelegramConfig, TelegramNotifier, TELEGRAM_API_URL};

use async_trait::async_trait;
use thiserror::Error;

/// Delivery errors, surfaced only after retries are exhausted
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Request never got a response
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// Non-success HTTP status other than 429
    #[error("Telegram API returned {status}: {body}")]
    Status { status: u16, body: String },
    /// HTTP success but `ok` was not true
    #[error("Telegram rejected message: {0}")]
    Rejected(String),
}

/// Sink for formatted alert text
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), NotifyError>;
}

/// Logs alerts instead of delivering them
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        tracing::info!(text = %text, "Dry run alert");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_notifier_always_succeeds() {
        tokio_test::assert_ok!(LogNotifier.send("<b>hello</b>").await);
    }
}
