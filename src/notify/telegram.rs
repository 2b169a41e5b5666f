//! Telegram Bot API notifier

use super::{Notifier, NotifyError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Telegram Bot API base URL
pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Attempt budget and delays for message delivery
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts before giving up; rate-limited responses do not count
    pub max_attempts: u32,
    /// Delay after the first failure, doubled after each further failure
    pub initial_backoff: Duration,
    /// Wait used when a 429 carries no usable `retry_after`
    pub default_retry_after: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_backoff: Duration::from_secs(1),
            default_retry_after: Duration::from_secs(2),
        }
    }
}

/// Configuration for the Telegram notifier
#[derive(Clone)]
pub struct TelegramConfig {
    pub api_base: String,
    pub bot_token: String,
    pub chat_id: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl TelegramConfig {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            api_base: TELEGRAM_API_URL.to_string(),
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            timeout: Duration::from_secs(15),
            retry: RetryPolicy::default(),
        }
    }
}

/// Sends alerts via `sendMessage` as HTML with link previews off
pub struct TelegramNotifier {
    config: TelegramConfig,
    client: Client,
    url: String,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        let url = format!(
            "{}/bot{}/sendMessage",
            config.api_base.trim_end_matches('/'),
            config.bot_token
        );

        Ok(Self {
            config,
            client,
            url,
        })
    }

    async fn attempt(&self, text: &str) -> Delivery {
        let request = SendMessage {
            chat_id: &self.config.chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };

        let response = match self.client.post(&self.url).json(&request).send().await {
            Ok(response) => response,
            Err(e) => return Delivery::Failed(e.into()),
        };

        let status = response.status().as_u16();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);

        classify(status, &body, self.config.retry.default_retry_after)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        deliver_with_retry(&self.config.retry, || self.attempt(text)).await
    }
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
    disable_web_page_preview: bool,
}

/// Outcome of a single delivery attempt
#[derive(Debug)]
enum Delivery {
    Delivered,
    RateLimited(Duration),
    Failed(NotifyError),
}

fn classify(status: u16, body: &Value, default_retry_after: Duration) -> Delivery {
    if status == 429 {
        let retry_after = body
            .pointer("/parameters/retry_after")
            .and_then(crate::feed::value_as_f64)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .unwrap_or(default_retry_after);
        return Delivery::RateLimited(retry_after);
    }

    if !(200..300).contains(&status) {
        return Delivery::Failed(NotifyError::Status {
            status,
            body: body.to_string(),
        });
    }

    if body.get("ok").and_then(Value::as_bool) == Some(true) {
        Delivery::Delivered
    } else {
        let reason = body
            .get("description")
            .and_then(Value::as_str)
            .map(String::from)
            .unwrap_or_else(|| body.to_string());
        Delivery::Failed(NotifyError::Rejected(reason))
    }
}

/// Run `attempt` until it delivers or the failure budget is spent
///
/// Rate-limited attempts sleep for the server-provided duration and are not
/// counted against `max_attempts`.
async fn deliver_with_retry<F, Fut>(policy: &RetryPolicy, mut attempt: F) -> Result<(), NotifyError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Delivery>,
{
    let mut failures = 0;
    let mut delay = policy.initial_backoff;

    loop {
        match attempt().await {
            Delivery::Delivered => return Ok(()),
            Delivery::RateLimited(wait) => {
                tracing::warn!(wait_ms = wait.as_millis() as u64, "Telegram rate limited");
                sleep(wait).await;
            }
            Delivery::Failed(e) => {
                failures += 1;
                if failures >= policy.max_attempts {
                    return Err(e);
                }
                tracing::warn!(attempt = failures, error = %e, "Telegram send attempt failed");
                sleep(delay).await;
                delay *= 2;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Instant;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 4,
            initial_backoff: Duration::from_millis(1),
            default_retry_after: Duration::from_millis(1),
        }
    }

    fn failed() -> Delivery {
        Delivery::Failed(NotifyError::Rejected("nope".to_string()))
    }

    async fn run_script(script: Vec<Delivery>) -> (Result<(), NotifyError>, usize) {
        let remaining = Mutex::new(VecDeque::from(script));
        let calls = Mutex::new(0usize);

        let result = deliver_with_retry(&fast_policy(), || {
            *calls.lock().unwrap() += 1;
            let next = remaining.lock().unwrap().pop_front().unwrap_or_else(failed);
            async move { next }
        })
        .await;

        let calls = *calls.lock().unwrap();
        (result, calls)
    }

    #[test]
    fn test_classify_success() {
        let delivery = classify(200, &json!({"ok": true}), Duration::from_secs(2));
        assert!(matches!(delivery, Delivery::Delivered));
    }

    #[test]
    fn test_classify_application_failure() {
        let delivery = classify(
            200,
            &json!({"ok": false, "description": "chat not found"}),
            Duration::from_secs(2),
        );
        match delivery {
            Delivery::Failed(NotifyError::Rejected(reason)) => assert_eq!(reason, "chat not found"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_classify_rate_limit() {
        let body = json!({"ok": false, "parameters": {"retry_after": 7}});
        assert!(matches!(
            classify(429, &body, Duration::from_secs(2)),
            Delivery::RateLimited(d) if d == Duration::from_secs(7)
        ));

        assert!(matches!(
            classify(429, &Value::Null, Duration::from_secs(2)),
            Delivery::RateLimited(d) if d == Duration::from_secs(2)
        ));

        let negative = json!({"parameters": {"retry_after": -3}});
        assert!(matches!(
            classify(429, &negative, Duration::from_secs(2)),
            Delivery::RateLimited(d) if d == Duration::from_secs(2)
        ));
    }

    #[test]
    fn test_classify_http_error() {
        assert!(matches!(
            classify(502, &Value::Null, Duration::from_secs(2)),
            Delivery::Failed(NotifyError::Status { status: 502, .. })
        ));
    }

    #[tokio::test]
    async fn test_gives_up_after_four_failures() {
        let (result, calls) = run_script(vec![]).await;
        assert!(result.is_err());
        assert_eq!(calls, 4);
    }

    #[tokio::test]
    async fn test_recovers_after_failures() {
        let (result, calls) = run_script(vec![failed(), failed(), Delivery::Delivered]).await;
        assert!(result.is_ok());
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_rate_limits_do_not_consume_attempts() {
        let limited = || Delivery::RateLimited(Duration::from_millis(1));
        let script = vec![limited(), failed(), limited(), limited(), failed(), failed(), limited()];

        let (result, calls) = run_script(script).await;

        // 3 failures + 4 rate limits, then the default script failure is the 4th
        assert!(result.is_err());
        assert_eq!(calls, 8);
    }

    #[tokio::test]
    async fn test_backoff_doubles_between_failures() {
        let policy = RetryPolicy {
            initial_backoff: Duration::from_millis(20),
            ..fast_policy()
        };

        let started = Instant::now();
        let result = deliver_with_retry(&policy, || async { failed() }).await;

        assert!(result.is_err());
        // 20 + 40 + 80 ms between the four attempts
        assert!(started.elapsed() >= Duration::from_millis(140));
    }

    #[test]
    fn test_send_message_body() {
        let body = serde_json::to_value(SendMessage {
            chat_id: "-100",
            text: "<b>hi</b>",
            parse_mode: "HTML",
            disable_web_page_preview: true,
        })
        .unwrap();

        assert_eq!(
            body,
            json!({
                "chat_id": "-100",
                "text": "<b>hi</b>",
                "parse_mode": "HTML",
                "disable_web_page_preview": true
            })
        );
    }

    #[test]
    fn test_notifier_url() {
        let mut config = TelegramConfig::new("123:abc", "-100");
        config.api_base = "https://tg.test/".to_string();
        let notifier = TelegramNotifier::new(config).unwrap();
        assert_eq!(notifier.url, "https://tg.test/bot123:abc/sendMessage");
    }
}
