//! Chat-completion proxy
//!
//! Forwards chat requests from the site to an OpenAI-compatible upstream so
//! the API key never reaches the browser. Prompt construction happens on the
//! client; this module only relays messages and fills in server-side
//! defaults (model, token ceiling, temperature).

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the chat proxy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Upstream endpoint base, e.g. `https://api.openai.com/v1`
    pub endpoint: String,

    /// Upstream API key, sent as a bearer token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default model when the request does not name one
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Token ceiling applied when the request does not set one
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_timeout() -> u64 {
    60
}

fn default_max_tokens() -> u32 {
    1024
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            timeout_secs: default_timeout(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl ChatConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self {
            endpoint: std::env::var("BAEUM_CHAT_ENDPOINT")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            api_key: std::env::var("BAEUM_CHAT_API_KEY").ok(),
            model: std::env::var("BAEUM_CHAT_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            timeout_secs: std::env::var("BAEUM_CHAT_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_timeout),
            max_tokens: std::env::var("BAEUM_CHAT_MAX_TOKENS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_max_tokens),
        }
    }
}

/// One chat message as the upstream API expects it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Incoming proxy request from the site
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,

    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub temperature: Option<f32>,

    #[serde(default)]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct UpstreamRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Chat proxy client
pub struct ChatProxy {
    client: Client,
    config: ChatConfig,
}

impl ChatProxy {
    /// Create a proxy with the given config
    pub fn new(config: ChatConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, config })
    }

    /// Create a proxy from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(ChatConfig::from_env())
    }

    /// Forward one chat request upstream and relay the raw JSON response
    pub async fn complete(&self, request: ChatRequest) -> Result<serde_json::Value> {
        if request.messages.is_empty() {
            anyhow::bail!("Chat request has no messages");
        }

        let model = request.model.as_deref().unwrap_or(&self.config.model);
        let upstream = UpstreamRequest {
            model,
            messages: &request.messages,
            max_tokens: request.max_tokens.unwrap_or(self.config.max_tokens),
            temperature: request.temperature,
        };

        let url = format!("{}/chat/completions", self.config.endpoint);
        let mut builder = self.client.post(&url).json(&upstream);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .context("Failed to reach chat upstream")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Chat upstream returned {status}: {body}");
        }

        response
            .json()
            .await
            .context("Failed to parse chat upstream response")
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_config_default() {
        let config = ChatConfig::default();
        assert_eq!(config.max_tokens, 1024);
        assert_eq!(config.timeout_secs, 60);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_chat_request_deserializes_minimal_body() {
        let request: ChatRequest =
            serde_json::from_str(r#"{"messages":[{"role":"user","content":"hi"}]}"#).unwrap();

        assert_eq!(request.messages.len(), 1);
        assert!(request.model.is_none());
        assert!(request.temperature.is_none());
    }

    #[tokio::test]
    async fn test_empty_messages_rejected() {
        let proxy = ChatProxy::new(ChatConfig::default()).unwrap();
        let request = ChatRequest {
            messages: vec![],
            model: None,
            temperature: None,
            max_tokens: None,
        };

        assert!(proxy.complete(request).await.is_err());
    }
}
