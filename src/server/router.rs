use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Router, routing::get};
use chrono::Utc;

use super::admin::admin_router;
use super::response::PageError;
use super::site::site_router;
use crate::auth::{Argon2Policy, Authenticator, SessionManager};
use crate::config::ServerConfig;
use crate::error::Result;
use crate::store::{SqliteStore, Store};

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub auth: Authenticator,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, auth: Authenticator) -> Self {
        Self { store, auth }
    }

    /// Opens and migrates the configured database, then drops stale sessions.
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        let secret = config.require_secret()?;

        let store = SqliteStore::open(&config.database_url)?;
        store.initialize()?;

        let purged = store.delete_expired_sessions(Utc::now())?;
        if purged > 0 {
            tracing::info!("Purged {purged} expired sessions");
        }

        let auth = Authenticator::new(
            Arc::new(Argon2Policy::new()),
            SessionManager::new(secret, config.session_ttl_hours),
        );

        Ok(Self::new(Arc::new(store), auth))
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn not_found() -> PageError {
    PageError::not_found("Page not found")
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(site_router())
        .merge(admin_router())
        .fallback(not_found)
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
