//! Channel delivery client
//!
//! The orchestrator only depends on the [`ChannelClient`] trait; the
//! production implementation talks to the Telegram Bot API. Tests swap in a
//! scripted fake.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Result type for channel operations
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Errors from channel delivery
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Channel configuration is unusable
    #[error("Invalid channel config: {0}")]
    InvalidConfig(String),

    /// Transport-level failure (connect, timeout)
    #[error("Channel transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The channel accepted the request but rejected the message
    #[error("Channel rejected message ({status}): {description}")]
    Rejected { status: u16, description: String },

    /// Response arrived but could not be understood
    #[error("Unexpected channel response: {0}")]
    UnexpectedResponse(String),
}

/// Identifier of a delivered message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentMessage {
    pub message_id: i64,
}

/// One-way delivery into the posting channel
#[async_trait]
pub trait ChannelClient: Send + Sync {
    /// Channel name for logs
    fn name(&self) -> &str;

    /// Deliver one message, returning the channel's message id
    async fn send(&self, text: &str) -> ChannelResult<SentMessage>;
}

// ============================================================================
// Telegram Channel
// ============================================================================

/// Telegram channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot API token
    pub bot_token: String,

    /// Target chat: a numeric id or an `@channelname`
    pub chat_id: String,

    /// API base URL, overridable for tests
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Disable link previews in posted messages
    #[serde(default)]
    pub disable_link_preview: bool,
}

fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_timeout() -> u64 {
    15
}

impl TelegramConfig {
    /// Create a config with the required fields
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            api_base: default_api_base(),
            timeout_secs: default_timeout(),
            disable_link_preview: false,
        }
    }

    /// Override the API base URL
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.bot_token.is_empty() {
            return Err("Telegram bot token cannot be empty".to_string());
        }
        if self.chat_id.is_empty() {
            return Err("Telegram chat id cannot be empty".to_string());
        }
        if !self.api_base.starts_with("http://") && !self.api_base.starts_with("https://") {
            return Err("Telegram API base must start with http:// or https://".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("Timeout must be greater than 0".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    result: Option<TelegramMessage>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramMessage {
    message_id: i64,
}

/// Telegram Bot API channel
///
/// Sends messages with HTML parse mode; the formatter is responsible for
/// escaping and for keeping text under the 4096-character limit.
pub struct TelegramChannel {
    config: TelegramConfig,
    client: Client,
}

impl TelegramChannel {
    /// Create a new Telegram channel
    pub fn new(config: TelegramConfig) -> ChannelResult<Self> {
        config.validate().map_err(ChannelError::InvalidConfig)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    fn send_url(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.config.api_base, self.config.bot_token
        )
    }
}

#[async_trait]
impl ChannelClient for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, text: &str) -> ChannelResult<SentMessage> {
        let request = SendMessageRequest {
            chat_id: &self.config.chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: self.config.disable_link_preview,
        };

        let response = self
            .client
            .post(self.send_url())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body: TelegramResponse = response.json().await.map_err(|e| {
            ChannelError::UnexpectedResponse(format!("invalid response body: {e}"))
        })?;

        if !body.ok {
            return Err(ChannelError::Rejected {
                status: status.as_u16(),
                description: body
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            });
        }

        let message = body.result.ok_or_else(|| {
            ChannelError::UnexpectedResponse("ok response without result".to_string())
        })?;

        tracing::debug!(
            message_id = message.message_id,
            chat = %self.config.chat_id,
            "Message delivered to Telegram"
        );

        Ok(SentMessage {
            message_id: message.message_id,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        assert!(TelegramConfig::new("123:abc", "@channel").validate().is_ok());
        assert!(TelegramConfig::new("", "@channel").validate().is_err());
        assert!(TelegramConfig::new("123:abc", "").validate().is_err());
        assert!(TelegramConfig::new("123:abc", "@c")
            .with_api_base("ftp://example.com")
            .validate()
            .is_err());
        assert!(TelegramConfig::new("123:abc", "@c")
            .with_timeout(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_send_url_shape() {
        let config = TelegramConfig::new("123:abc", "@channel")
            .with_api_base("http://localhost:9999");
        let channel = TelegramChannel::new(config).unwrap();

        assert_eq!(channel.send_url(), "http://localhost:9999/bot123:abc/sendMessage");
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let config = TelegramConfig::new("", "@channel");
        assert!(matches!(
            TelegramChannel::new(config),
            Err(ChannelError::InvalidConfig(_))
        ));
    }
}
