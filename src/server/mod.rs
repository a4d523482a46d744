//! HTTP trigger layer
//!
//! Exposes the manual trigger, log retrieval, rotation status, health, and
//! the chat-completion proxy over a small axum API. Everything except the
//! health check sits behind a static shared-secret header.

pub mod api;

pub use api::create_router;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::chat::ChatProxy;
use crate::config::ServerConfig;
use crate::posting::{PostLog, Poster};

/// Server-level errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {reason}")]
    BindError { addr: SocketAddr, reason: String },

    #[error("Server terminated: {0}")]
    ServeError(String),
}

// ============================================================================
// App State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Posting orchestrator
    pub poster: Arc<Poster>,

    /// Posting audit log (read side for the logs endpoint)
    pub log: Arc<dyn PostLog>,

    /// Chat-completion proxy
    pub chat: Arc<ChatProxy>,

    /// Server configuration
    pub config: ServerConfig,

    /// Server start time
    pub start_time: Instant,
}

// ============================================================================
// Bot Server
// ============================================================================

/// HTTP server wrapping the posting bot
pub struct BotServer {
    config: ServerConfig,
    state: AppState,
}

impl BotServer {
    /// Create a new server over the shared components
    pub fn new(
        config: ServerConfig,
        poster: Arc<Poster>,
        log: Arc<dyn PostLog>,
        chat: Arc<ChatProxy>,
    ) -> Self {
        let state = AppState {
            poster,
            log,
            chat,
            config: config.clone(),
            start_time: Instant::now(),
        };

        Self { config, state }
    }

    /// Get the application state
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Build the router with all routes and layers
    pub fn build_router(&self) -> Router {
        let mut router = create_router(self.state.clone());

        if self.config.enable_cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        if self.config.enable_request_logging {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Start the server
    pub async fn start(&self) -> Result<(), ServerError> {
        let router = self.build_router();
        let addr = self.config.bind_address;

        if self.config.api_secret.is_none() {
            tracing::warn!("No API secret configured, gated endpoints are open");
        }
        tracing::info!("Starting bot server on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError {
                addr,
                reason: e.to_string(),
            })?;

        axum::serve(listener, router)
            .await
            .map_err(|e| ServerError::ServeError(e.to_string()))?;

        Ok(())
    }

    /// Start with graceful shutdown
    pub async fn start_with_shutdown(
        &self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let router = self.build_router();
        let addr = self.config.bind_address;

        if self.config.api_secret.is_none() {
            tracing::warn!("No API secret configured, gated endpoints are open");
        }
        tracing::info!("Starting bot server on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError {
                addr,
                reason: e.to_string(),
            })?;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ServerError::ServeError(e.to_string()))?;

        Ok(())
    }
}
