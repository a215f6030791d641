//! HTTP and WebSocket route handlers.
//!
//! State is shared via `Arc<ServerState>`.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::engine::ScanScheduler;
use crate::server::publisher::Publisher;
use crate::types::Opportunity;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct ServerState {
    pub scheduler: Arc<ScanScheduler>,
    pub publisher: Arc<Publisher>,
}

pub type AppState = Arc<ServerState>;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub exchanges: Vec<String>,
    pub active_connections: usize,
}

/// Client → server control message.
#[derive(Debug, Deserialize)]
struct ClientMessage {
    #[serde(rename = "type")]
    kind: String,
}

// ---------------------------------------------------------------------------
// HTTP handlers
// ---------------------------------------------------------------------------

/// GET /: service status.
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "running".into(),
        exchanges: state.scheduler.config().exchanges.clone(),
        active_connections: state.publisher.subscriber_count().await,
    })
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// GET /api/scan: one on-demand scan, best first.
pub async fn scan(State(state): State<AppState>) -> Result<Json<Vec<Opportunity>>, Response> {
    state.scheduler.scan_once().await.map(Json).map_err(|e| {
        warn!(error = %e, "Diagnostic scan rejected");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response()
    })
}

// ---------------------------------------------------------------------------
// WebSocket
// ---------------------------------------------------------------------------

/// GET /ws: upgrade to the event stream.
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();

    let hello = json!({
        "type": "connected",
        "message": "Connected to ARBSCAN opportunity stream",
    });
    if sink.send(Message::Text(hello.to_string())).await.is_err() {
        return;
    }

    let (id, mut events) = state.publisher.subscribe().await;

    loop {
        tokio::select! {
            event = events.recv() => {
                // None means the publisher pruned us
                let Some(text) = event else { break };
                if sink.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = control_reply(&text) {
                            if sink.send(Message::Text(reply)).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(subscriber = %id, error = %e, "WebSocket receive error");
                        break;
                    }
                }
            }
        }
    }

    state.publisher.unsubscribe(id).await;
    info!(subscriber = %id, "WebSocket closed");
}

/// Reply to a client control message, if it warrants one.
///
/// Malformed JSON and unknown message types are ignored.
fn control_reply(text: &str) -> Option<String> {
    let msg: ClientMessage = serde_json::from_str(text).ok()?;
    match msg.kind.as_str() {
        "ping" => Some(json!({ "type": "pong" }).to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_gets_pong() {
        let reply = control_reply(r#"{"type":"ping"}"#).unwrap();
        let json: serde_json::Value = serde_json::from_str(&reply).unwrap();
        assert_eq!(json["type"], "pong");
    }

    #[test]
    fn test_malformed_and_unknown_are_ignored() {
        assert!(control_reply("not json").is_none());
        assert!(control_reply(r#"{"foo":1}"#).is_none());
        assert!(control_reply(r#"{"type":"subscribe"}"#).is_none());
    }
}
