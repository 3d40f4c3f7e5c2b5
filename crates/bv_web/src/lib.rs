use axum::{
    routing::{get, post},
    Router,
};
use bv_core::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub mod error;
pub mod extract;
pub mod handlers;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use extract::{ApiJson, ApiQuery};
pub use state::AppState;

pub const DEFAULT_API_PREFIX: &str = "/api/v1";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Mount point for everything but `/health`
    pub prefix: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            prefix: DEFAULT_API_PREFIX.to_string(),
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// `/api/v1/`, `api/v1` and `/api/v1` all mount at `/api/v1`; empty mounts at the root.
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

pub fn create_app(state: AppState, prefix: &str) -> Router {
    let api = Router::new()
        .route("/articles", get(handlers::list_articles))
        .route("/articles/daily", get(handlers::daily_article))
        .route("/articles/:id", get(handlers::get_article))
        .route("/search", get(handlers::search))
        .route("/search/suggestions", get(handlers::suggestions))
        .route("/users", post(handlers::create_user))
        .route("/users/:id/likes", get(handlers::user_likes))
        .route(
            "/users/:id/likes/:article_id",
            post(handlers::like_article).delete(handlers::unlike_article),
        );

    let prefix = normalize_prefix(prefix);
    let router = if prefix.is_empty() {
        api
    } else {
        Router::new().nest(&prefix, api)
    };

    router
        .route("/health", get(handlers::health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(Arc::new(state))
}

pub async fn serve(state: AppState, config: &ServerConfig) -> Result<()> {
    let app = create_app(state, &config.prefix);
    let listener = tokio::net::TcpListener::bind(config.addr()).await?;
    let addr: SocketAddr = listener.local_addr()?;
    info!("🌐 API listening on http://{}{}", addr, normalize_prefix(&config.prefix));
    axum::serve(listener, app).await?;
    Ok(())
}

pub mod prelude {
    pub use crate::{create_app, serve, AppState, ServerConfig};
    pub use bv_core::{Article, Error, Result};
}
