//! Configuration management for the posting bot
//!
//! This module handles loading and validating configuration from environment
//! variables and TOML files. Environment variables use the `BAEUM_` prefix
//! except for the Telegram credentials, which keep their conventional names.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::chat::ChatConfig;
use crate::posting::TelegramConfig;
use crate::scheduler::ScheduleConfig;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Catalog location
    pub catalog: CatalogConfig,

    /// Posting pipeline configuration
    pub posting: PostingConfig,

    /// Telegram channel credentials
    pub telegram: TelegramConfig,

    /// Chat-completion proxy configuration
    pub chat: ChatConfig,

    /// Posting schedule
    pub schedule: ScheduleConfig,

    /// HTTP server configuration
    pub server: ServerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Catalog configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Path to the catalog JSON file
    pub path: PathBuf,
}

/// Posting pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostingConfig {
    /// Rotation state file path
    pub state_path: PathBuf,

    /// Posting log file path (JSONL)
    pub log_path: PathBuf,

    /// Pause between consecutive sends in a batch, in seconds
    pub pause_between_sends_secs: u64,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address
    pub bind_address: SocketAddr,

    /// Shared secret required in the `X-Api-Secret` header
    ///
    /// When unset, gated endpoints are open; only do that locally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_secret: Option<String>,

    /// Enable CORS for the API
    pub enable_cors: bool,

    /// Enable request logging
    pub enable_request_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".parse().unwrap(),
            api_secret: None,
            enable_cors: true,
            enable_request_logging: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let catalog_path = std::env::var("BAEUM_CATALOG_PATH")
            .unwrap_or_else(|_| String::from("data/catalog.json"))
            .into();

        let state_path = std::env::var("BAEUM_STATE_PATH")
            .unwrap_or_else(|_| String::from("data/rotation_state.json"))
            .into();

        let log_path = std::env::var("BAEUM_POST_LOG_PATH")
            .unwrap_or_else(|_| String::from("data/posting_log.jsonl"))
            .into();

        let pause_between_sends_secs = std::env::var("BAEUM_PAUSE_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(2);

        let mut telegram = TelegramConfig::new(
            std::env::var("TELEGRAM_BOT_TOKEN").unwrap_or_default(),
            std::env::var("TELEGRAM_CHAT_ID").unwrap_or_default(),
        );
        if let Ok(base) = std::env::var("TELEGRAM_API_BASE") {
            telegram = telegram.with_api_base(base);
        }

        let post_times = std::env::var("BAEUM_POST_TIMES")
            .map(|v| {
                v.split(',')
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or_else(|_| vec!["09:00".to_string(), "18:00".to_string()]);

        let topics_per_run = std::env::var("BAEUM_TOPICS_PER_RUN")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(1);

        let bind_address = std::env::var("BAEUM_BIND_ADDRESS")
            .unwrap_or_else(|_| String::from("0.0.0.0:8080"))
            .parse()
            .context("Invalid BAEUM_BIND_ADDRESS")?;

        let api_secret = std::env::var("BAEUM_API_SECRET").ok();

        let enable_cors = std::env::var("BAEUM_ENABLE_CORS")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(true);

        let log_level = std::env::var("BAEUM_LOG_LEVEL").unwrap_or_else(|_| String::from("info"));
        let log_format = std::env::var("BAEUM_LOG_FORMAT").unwrap_or_else(|_| String::from("text"));

        Ok(Self {
            catalog: CatalogConfig { path: catalog_path },
            posting: PostingConfig {
                state_path,
                log_path,
                pause_between_sends_secs,
            },
            telegram,
            chat: ChatConfig::from_env(),
            schedule: ScheduleConfig {
                post_times,
                topics_per_run,
                run_on_startup: false,
            },
            server: ServerConfig {
                bind_address,
                api_secret,
                enable_cors,
                enable_request_logging: true,
            },
            logging: LoggingConfig {
                level: log_level,
                format: log_format,
            },
        })
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate the parts every command depends on
    ///
    /// Channel credentials are validated separately by [`validate_channel`],
    /// since read-only commands (`status`, `preview`, `logs`) run without
    /// them.
    ///
    /// [`validate_channel`]: Config::validate_channel
    pub fn validate(&self) -> Result<()> {
        self.schedule
            .validate()
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;

        if self.catalog.path.as_os_str().is_empty() {
            anyhow::bail!("catalog path cannot be empty");
        }

        Ok(())
    }

    /// Validate the channel credentials needed for posting
    pub fn validate_channel(&self) -> Result<()> {
        self.telegram
            .validate()
            .map_err(|e| anyhow::anyhow!("Telegram config invalid: {e}"))
    }

    /// Get the pause between sends as a Duration
    #[must_use]
    pub fn pause_between_sends(&self) -> Duration {
        Duration::from_secs(self.posting.pause_between_sends_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog: CatalogConfig {
                path: PathBuf::from("data/catalog.json"),
            },
            posting: PostingConfig {
                state_path: PathBuf::from("data/rotation_state.json"),
                log_path: PathBuf::from("data/posting_log.jsonl"),
                pause_between_sends_secs: 2,
            },
            telegram: TelegramConfig::new("", ""),
            chat: ChatConfig::default(),
            schedule: ScheduleConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig {
                level: String::from("info"),
                format: String::from("text"),
            },
        }
    }
}
