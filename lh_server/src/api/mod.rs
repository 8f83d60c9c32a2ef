//! HTTP surface of the hold'em server.
//!
//! - `GET /ws`: one player per connection. The player is seated at a
//!   waiting table and receives that table's envelopes until they leave.
//! - `GET /health`: table, seat and connection counts as JSON.
//!
//! CORS is permissive; the browser client may be served from anywhere.
//!
//! ```rust,no_run
//! use lh_server::api::{create_router, AppState};
//! use lh_server::config::ServerConfig;
//! use live_holdem::{liveness::LivenessRegistry, TableManager};
//! use std::sync::Arc;
//! # async fn run() -> anyhow::Result<()> {
//! let config = ServerConfig::from_env(None)?;
//! let manager = TableManager::new(config.table.clone(), config.resolver.build());
//! let router = create_router(AppState {
//!     table_manager: Arc::new(manager),
//!     liveness: LivenessRegistry::new(),
//!     config: Arc::new(config),
//! });
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, router).await?;
//! # Ok(())
//! # }
//! ```

pub mod rate_limiter;
pub mod websocket;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
};
use live_holdem::{TableManager, liveness::LivenessRegistry};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::config::ServerConfig;

/// Shared by every connection; each field is a cheap handle.
#[derive(Clone)]
pub struct AppState {
    /// Table registry
    pub table_manager: Arc<TableManager>,
    /// Heartbeat timestamps, locked apart from any table
    pub liveness: LivenessRegistry,
    /// Loaded server configuration
    pub config: Arc<ServerConfig>,
}

/// `/ws` for players, `/health` for monitoring.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(websocket::websocket_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Liveness report for load balancers and operators.
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","tables":{"active_count":2,"in_hand":1,"seated":5},"connections":5,...}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let statuses = state.table_manager.statuses().await;
    let in_hand = statuses.iter().filter(|s| s.phase.is_betting()).count();
    let seated: usize = statuses.iter().map(|s| s.seated).sum();

    let response = json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "tables": {
            "active_count": statuses.len(),
            "in_hand": in_hand,
            "seated": seated,
        },
        "connections": state.liveness.len().await,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (StatusCode::OK, Json(response))
}
