//! Gatepass - service-token gateway for multi-service trust
//!
//! Mints short-lived, self-contained signed tokens from an established
//! login session and lets independently-owned services (a REST API, a
//! realtime WebSocket service, a room-based service) verify them locally
//! without sharing the login flow's session mechanism.

pub mod auth;
pub mod config;
pub mod server;
pub mod session;

pub use auth::{AuthContext, AuthError, ServiceClaims, SigningSecret, TokenIssuer, TokenVerifier};
pub use config::GatewayConfig;
pub use server::GatewayServer;
pub use session::{Session, SessionProvider};
