//! Server: Axum HTTP + WebSocket transport for the opportunity stream.
//!
//! CORS is open so browser clients on any origin can connect.

pub mod publisher;
pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header, Method},
    routing::get,
    Router,
};
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

pub use publisher::Publisher;
pub use routes::{AppState, ServerState};

/// Bind the listener and serve in a background task.
///
/// Binding happens before returning so a taken port fails startup.
pub async fn spawn_server(state: AppState, host: &str, port: u16) -> Result<JoinHandle<()>> {
    let app = build_router(state);
    let addr = format!("{host}:{port}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind server on {addr}"))?;
    info!(%addr, "Server listening on http://{addr}");

    Ok(tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "Server error");
        }
    }))
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(routes::get_status))
        .route("/health", get(routes::health))
        .route("/api/scan", get(routes::scan))
        .route("/ws", get(routes::ws_upgrade))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
