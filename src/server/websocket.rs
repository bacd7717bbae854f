//! Realtime WebSocket service
//!
//! Gates connection establishment, not individual messages: the first
//! frame must be an `auth` message carrying a service token. The
//! handshake either attaches verified claims to the connection for its
//! whole lifetime or refuses before any connection state is registered.
//! An origin allow-list is enforced before the upgrade completes.

use crate::auth::{AuthContext, TokenVerifier};
use crate::server::connections::{ClientConnection, ConnectionManager, OutboundMessage};
use crate::server::rooms::{JoinOptions, RoomRegistry};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Shared state for WebSocket handlers
#[derive(Clone)]
pub struct WsState {
    pub connections: Arc<ConnectionManager>,
    pub rooms: Arc<RoomRegistry>,
    pub verifier: TokenVerifier,
    pub allowed_origins: Arc<Vec<String>>,
}

/// Messages from client to server
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Authenticate with a service token; must be the first message
    Auth { token: Option<String> },
    /// Ask for the claims attached to this connection
    Whoami,
    /// Join a room
    Join { room: String },
    /// Leave a room
    Leave { room: String },
    /// Ping for keepalive
    Ping { seq: u64 },
}

/// Messages from server to client
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Handshake accepted; claims are attached for the connection's life
    AuthOk { subject: String, role: String },
    /// Handshake refused
    AuthError { message: String },
    /// The claims attached at handshake
    Whoami {
        subject: String,
        role: String,
        email: Option<String>,
        name: Option<String>,
    },
    /// Join confirmed
    Joined { room: String },
    /// Join denied
    JoinError { room: String, message: String },
    /// Leave confirmed
    Left { room: String },
    /// Pong response
    Pong { seq: u64 },
    /// Generic error
    Error { message: String },
}

/// Why a handshake was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeRefusal {
    /// No token in the handshake payload
    MissingToken,
    /// Token failed verification
    InvalidToken,
}

impl HandshakeRefusal {
    /// The reason reported to the client. Verification failure subtypes
    /// are never exposed.
    pub fn reason(&self) -> &'static str {
        match self {
            HandshakeRefusal::MissingToken => "missing token",
            HandshakeRefusal::InvalidToken => "invalid or expired token",
        }
    }
}

/// Authorize a handshake payload.
///
/// Synchronous and side-effect free; the transport translates `Err` into
/// its own refusal mechanism before any connection state exists.
pub fn authorize_handshake(
    token: Option<&str>,
    verifier: &TokenVerifier,
) -> Result<AuthContext, HandshakeRefusal> {
    let token = token.ok_or(HandshakeRefusal::MissingToken)?;

    match verifier.verify(token) {
        Ok(claims) => Ok(AuthContext::new(claims)),
        Err(err) => {
            debug!(error = %err, "handshake token rejected");
            Err(HandshakeRefusal::InvalidToken)
        }
    }
}

/// Check a handshake's `Origin` header against the allow-list.
///
/// An empty allow-list accepts anything; otherwise the origin must be
/// present and match exactly.
pub fn origin_allowed(allowed: &[String], origin: Option<&str>) -> bool {
    if allowed.is_empty() {
        return true;
    }

    match origin {
        Some(origin) => allowed.iter().any(|a| a == origin),
        None => false,
    }
}

/// Create the WebSocket router
pub fn create_router(state: WsState) -> Router {
    Router::new().route("/ws", get(ws_handler)).with_state(state)
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<WsState>,
) -> Response {
    let origin = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok());
    if !origin_allowed(&state.allowed_origins, origin) {
        warn!(origin = ?origin, "realtime connection refused: origin not allowed");
        return StatusCode::FORBIDDEN.into_response();
    }

    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: WsState) {
    let (mut sender, mut receiver) = socket.split();

    // The first frame must authenticate; nothing is registered until then
    let auth_result: Result<(AuthContext, String), String> = match receiver.next().await {
        Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientMessage>(&text) {
            Ok(ClientMessage::Auth { token }) => {
                authorize_handshake(token.as_deref(), &state.verifier)
                    .map(|ctx| (ctx, token.unwrap_or_default()))
                    .map_err(|refusal| refusal.reason().to_string())
            }
            Ok(_) => Err("must authenticate first".to_string()),
            Err(e) => Err(format!("invalid message: {}", e)),
        },
        Some(Ok(Message::Binary(data))) => match serde_json::from_slice::<ClientMessage>(&data) {
            Ok(ClientMessage::Auth { token }) => {
                authorize_handshake(token.as_deref(), &state.verifier)
                    .map(|ctx| (ctx, token.unwrap_or_default()))
                    .map_err(|refusal| refusal.reason().to_string())
            }
            _ => Err("must authenticate first".to_string()),
        },
        _ => return,
    };

    let (context, token) = match auth_result {
        Ok((context, token)) => {
            let response = ServerMessage::AuthOk {
                subject: context.subject().to_string(),
                role: context.role().to_string(),
            };
            if sender
                .send(Message::Text(serde_json::to_string(&response).unwrap().into()))
                .await
                .is_err()
            {
                return;
            }
            (context, token)
        }
        Err(message) => {
            let response = ServerMessage::AuthError { message };
            let _ = sender
                .send(Message::Text(serde_json::to_string(&response).unwrap().into()))
                .await;
            return;
        }
    };

    // Create connection with channel for outbound messages
    let (tx, mut rx) = mpsc::channel::<OutboundMessage>(100);
    let client_conn = Arc::new(ClientConnection::new(context, token, tx));

    let conn_id = client_conn.id;
    state.connections.add(client_conn.clone());

    info!(conn_id = %conn_id, subject = %client_conn.context.subject(), "realtime client authenticated");

    // Spawn task to forward outbound messages to the socket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender
                .send(Message::Text(
                    String::from_utf8_lossy(&msg.payload).into_owned().into(),
                ))
                .await
                .is_err()
            {
                break;
            }
        }
    });

    // Process incoming messages; claims stay attached without re-verification
    while let Some(msg_result) = receiver.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                if let Ok(msg) = serde_json::from_str::<ClientMessage>(&text) {
                    handle_client_message(&msg, &client_conn, &state).await;
                }
            }
            Ok(Message::Binary(data)) => {
                if let Ok(msg) = serde_json::from_slice::<ClientMessage>(&data) {
                    handle_client_message(&msg, &client_conn, &state).await;
                }
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                // Handled automatically by axum
            }
            Ok(Message::Close(_)) => break,
            Err(e) => {
                warn!(conn_id = %conn_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Cleanup: drop room memberships, then the connection itself
    debug!(conn_id = %conn_id, "realtime client disconnected");
    if let Some(conn) = state.connections.remove(conn_id) {
        let member_id = conn_id.to_string();
        for room in conn.rooms.read().iter() {
            state.rooms.leave(room, &member_id);
        }
    }
    send_task.abort();
}

async fn handle_client_message(
    msg: &ClientMessage,
    conn: &Arc<ClientConnection>,
    state: &WsState,
) {
    match msg {
        ClientMessage::Auth { .. } => {
            // Already authenticated, ignore
        }
        ClientMessage::Whoami => {
            let claims = conn.context.claims();
            let response = ServerMessage::Whoami {
                subject: claims.sub.clone(),
                role: claims.role.clone(),
                email: claims.email.clone(),
                name: claims.name.clone(),
            };
            send_to(conn, &response).await;
        }
        ClientMessage::Join { room } => {
            // The room owns extraction: the credential travels in join
            // options, and the room's guard re-verifies it independently
            let options = JoinOptions {
                token: Some(conn.token.clone()),
            };

            match state.rooms.join(room, &conn.id.to_string(), &options) {
                Ok(_) => {
                    conn.track_room(room);
                    send_to(conn, &ServerMessage::Joined { room: room.clone() }).await;
                }
                Err(err) => {
                    debug!(conn_id = %conn.id, room = %room, error = %err, "room join denied");
                    send_to(
                        conn,
                        &ServerMessage::JoinError {
                            room: room.clone(),
                            message: "not authorized".to_string(),
                        },
                    )
                    .await;
                }
            }
        }
        ClientMessage::Leave { room } => {
            state.rooms.leave(room, &conn.id.to_string());
            conn.untrack_room(room);
            send_to(conn, &ServerMessage::Left { room: room.clone() }).await;
        }
        ClientMessage::Ping { seq } => {
            send_to(conn, &ServerMessage::Pong { seq: *seq }).await;
        }
    }
}

async fn send_to(conn: &Arc<ClientConnection>, msg: &ServerMessage) {
    let _ = conn
        .send(OutboundMessage {
            payload: serde_json::to_vec(msg).unwrap(),
        })
        .await;
}
