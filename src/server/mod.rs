//! Gateway server: the REST and realtime surfaces and the room service
//!
//! Each transport adapter consumes the same verifier; the adapters share
//! nothing else. A failure in one call or connection never affects the
//! process.

mod connections;
pub mod http;
pub mod rooms;
pub mod websocket;

pub use connections::{ClientConnection, ConnectionManager, OutboundMessage};
pub use http::{AppState, AuthBearer, Rejection};
pub use rooms::{JoinOptions, Room, RoomGuard, RoomRegistry, TokenRoomGuard};
pub use websocket::{
    authorize_handshake, ClientMessage, HandshakeRefusal, ServerMessage, WsState,
};

use crate::auth::{TokenIssuer, TokenVerifier};
use crate::config::GatewayConfig;
use crate::session::SessionProvider;
use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tracing::info;

/// The combined gateway server
pub struct GatewayServer {
    config: GatewayConfig,
    app_state: AppState,
    ws_state: WsState,
}

impl GatewayServer {
    pub fn new(config: GatewayConfig, sessions: Arc<dyn SessionProvider>) -> Self {
        let issuer = TokenIssuer::new(config.token_secret.clone());
        let verifier = TokenVerifier::new(config.token_secret.clone());

        let connections = Arc::new(ConnectionManager::new());
        let rooms = Arc::new(RoomRegistry::new(Arc::new(TokenRoomGuard::new(
            verifier.clone(),
        ))));

        let app_state = AppState {
            sessions,
            issuer,
            verifier: verifier.clone(),
            token_lifetime_secs: config.token_lifetime_secs,
        };
        let ws_state = WsState {
            connections,
            rooms,
            verifier,
            allowed_origins: Arc::new(config.allowed_origins.clone()),
        };

        Self {
            config,
            app_state,
            ws_state,
        }
    }

    /// The combined REST + realtime router.
    pub fn router(&self) -> Router {
        http::create_router(self.app_state.clone())
            .merge(websocket::create_router(self.ws_state.clone()))
    }

    /// Get connection count
    pub fn connection_count(&self) -> usize {
        self.ws_state.connections.count()
    }

    /// Run the server
    pub async fn run(&self) -> Result<()> {
        let app = self.router();

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;
        info!(addr = %self.config.bind_addr, "gatepass listening");

        axum::serve(listener, app).await?;

        Ok(())
    }
}
