//! Web layer module
//!
//! HTTP interface of channelcast. Handlers are thin and delegate to the feed
//! service; errors are mapped to status codes in [`responses`].
//!
//! Routes:
//! - `GET /health`: status and cache counters
//! - `GET /channels?q=`: resolve a channel query
//! - `GET /feed/:query`: RSS document for a channel query or id
//! - `DELETE /feed/:channel_id`: drop a cached document

use anyhow::Result;
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::{config::Config, services::FeedService};

pub mod handlers;
pub mod responses;

pub use responses::{handle_error, ApiResponse};

/// Web server configuration and setup
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(config: Arc<Config>, feed_service: Arc<FeedService>) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", config.web.host, config.web.port).parse()?;
        let app = Self::create_router(AppState {
            feed_service,
            config,
        });

        Ok(Self { app, addr })
    }

    /// Create the router with all routes and middleware
    pub fn create_router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(handlers::health::health_check))
            .route("/channels", get(handlers::channels::find_channel))
            .route(
                "/feed/:query",
                get(handlers::feeds::get_feed).delete(handlers::feeds::invalidate_feed),
            )
            // Middleware (applied in reverse order)
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Start the web server
    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        info!("Listening on http://{}", self.addr);
        axum::serve(listener, self.app).await?;
        Ok(())
    }

    /// Get the host address
    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    /// Get the port number
    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub feed_service: Arc<FeedService>,
    pub config: Arc<Config>,
}
