//! WebSocket progress channel.
//!
//! Every connection gets a session id (its socket id) and receives the
//! snapshots of that session. Inbound `pause`, `resume` and `stop` messages
//! control the connection's own session. Closing the socket stops and
//! removes the session.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use loader_core::{validate_session_id, EncryptedCredential, ProgressSnapshot, ResumeRequest};
use loader_pipeline::ProgressReporter;

use crate::state::AppState;

// ── WebSocket Messages ──────────────────────────────────────────

#[derive(Serialize)]
struct WsMessage<T: Serialize> {
    #[serde(rename = "type")]
    msg_type: &'static str,
    data: T,
}

fn ws_json<T: Serialize>(msg_type: &'static str, data: T) -> String {
    serde_json::to_string(&WsMessage { msg_type, data }).unwrap_or_default()
}

/// Control messages a client may send over its socket.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
enum ClientMessage {
    Pause,
    Stop,
    #[serde(rename_all = "camelCase")]
    Resume {
        upload_path: String,
        upload_type: Option<String>,
        is_stop_on_error: Option<bool>,
        redis_con_url: Option<String>,
        redis_con_url_encrypted: Option<EncryptedCredential>,
    },
}

type Outbound = mpsc::UnboundedSender<String>;

// ── Socket registry ─────────────────────────────────────────────

/// Outbound channels per session id. Doubles as the pipeline's
/// [`ProgressReporter`].
#[derive(Default)]
pub struct SocketRegistry {
    channels: RwLock<HashMap<String, Outbound>>,
}

impl SocketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a channel for `socket_id`. Fails if the id is already
    /// connected. The returned sender identifies this registration in
    /// [`SocketRegistry::release`].
    fn register(&self, socket_id: &str) -> Option<(Outbound, mpsc::UnboundedReceiver<String>)> {
        let mut channels = self.channels.write().unwrap_or_else(|p| p.into_inner());
        if channels.get(socket_id).map(|tx| !tx.is_closed()).unwrap_or(false) {
            return None;
        }
        let (tx, rx) = mpsc::unbounded_channel();
        channels.insert(socket_id.to_string(), tx.clone());
        Some((tx, rx))
    }

    /// Drop the channel for `socket_id` if it is still `own`. Returns false
    /// when a newer connection has taken the id over.
    fn release(&self, socket_id: &str, own: &Outbound) -> bool {
        let mut channels = self.channels.write().unwrap_or_else(|p| p.into_inner());
        match channels.get(socket_id) {
            Some(current) if current.same_channel(own) => {
                channels.remove(socket_id);
                true
            }
            _ => false,
        }
    }

    fn send(&self, socket_id: &str, message: String) {
        let channels = self.channels.read().unwrap_or_else(|p| p.into_inner());
        if let Some(tx) = channels.get(socket_id) {
            let _ = tx.send(message);
        }
    }

    pub fn len(&self) -> usize {
        self.channels.read().unwrap_or_else(|p| p.into_inner()).len()
    }
}

impl ProgressReporter for SocketRegistry {
    fn report(&self, snapshot: &ProgressSnapshot) {
        self.send(&snapshot.session_id, ws_json("importStats", snapshot));
    }

    fn is_connected(&self, session_id: &str) -> bool {
        self.channels
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(session_id)
            .map(|tx| !tx.is_closed())
            .unwrap_or(false)
    }
}

// ── WebSocket Handler ───────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsParams {
    /// Reconnect to an existing session instead of getting a fresh id.
    socket_id: Option<String>,
}

pub async fn ws_upgrade(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let socket_id = params
        .socket_id
        .filter(|id| validate_session_id(id).is_ok())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    ws.on_upgrade(move |socket| handle_ws(socket, state, socket_id))
}

async fn handle_ws(socket: WebSocket, state: Arc<AppState>, socket_id: String) {
    let (mut sender, mut receiver) = socket.split();

    let Some((own, mut rx)) = state.sockets.register(&socket_id) else {
        let msg = ws_json(
            "error",
            serde_json::json!({ "error": "socket id already connected", "kind": "session" }),
        );
        let _ = sender.send(Message::Text(msg.into())).await;
        return;
    };
    info!(socket_id = %socket_id, "websocket connected");

    let hello = ws_json("connected", serde_json::json!({ "socketId": socket_id }));
    if sender.send(Message::Text(hello.into())).await.is_err() {
        disconnect(&state, &socket_id, &own).await;
        return;
    }
    if let Some(session) = state.orchestrator.registry().get(&socket_id) {
        let _ = sender
            .send(Message::Text(ws_json("importStats", session.snapshot()).into()))
            .await;
    }

    // Forward progress snapshots to this client.
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_state = state.clone();
    let recv_id = socket_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => handle_client_message(&recv_state, &recv_id, text.as_str()).await,
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    disconnect(&state, &socket_id, &own).await;
}

async fn handle_client_message(state: &Arc<AppState>, socket_id: &str, text: &str) {
    let msg: ClientMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            debug!(socket_id, error = %e, "ignoring malformed client message");
            return;
        }
    };

    let result = match msg {
        ClientMessage::Pause => state.orchestrator.pause(socket_id).map(|_| ()),
        ClientMessage::Stop => state.orchestrator.stop(socket_id).await.map(|_| ()),
        ClientMessage::Resume {
            upload_path,
            upload_type,
            is_stop_on_error,
            redis_con_url,
            redis_con_url_encrypted,
        } => {
            // The loop runs until its next suspension point; keep reading
            // control messages meanwhile.
            let orchestrator = state.orchestrator.clone();
            let sockets = state.sockets.clone();
            let request = ResumeRequest {
                socket_id: socket_id.to_string(),
                redis_con_url,
                redis_con_url_encrypted,
                is_stop_on_error,
                upload_type,
                upload_path,
            };
            let id = socket_id.to_string();
            tokio::spawn(async move {
                if let Err(e) = orchestrator.resume(request).await {
                    warn!(socket_id = %id, error = %e, "resume over websocket failed");
                    sockets.send(&id, error_message(&e));
                }
            });
            Ok(())
        }
    };

    if let Err(e) = result {
        warn!(socket_id, error = %e, "websocket control message rejected");
        state.sockets.send(socket_id, error_message(&e));
    }
}

fn error_message(e: &loader_pipeline::ImportError) -> String {
    ws_json(
        "error",
        serde_json::json!({ "error": e.to_string(), "kind": e.kind() }),
    )
}

/// A handler whose id was taken over by a reconnect leaves the session to
/// the new socket.
async fn disconnect(state: &AppState, socket_id: &str, own: &Outbound) {
    if !state.sockets.release(socket_id, own) {
        debug!(socket_id, "websocket replaced by a newer connection");
        return;
    }
    state.orchestrator.disconnect(socket_id).await;
    info!(socket_id, "websocket disconnected");
}
