//! Gateway configuration
//!
//! All values are constructed once at process start and passed by
//! reference into the issuer/verifier; nothing reads global state after
//! startup, which keeps the secret injectable in tests.

use crate::auth::{SigningSecret, DEFAULT_LIFETIME_SECS};
use std::net::SocketAddr;

/// Configuration for the gateway process.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Address the HTTP/WebSocket server binds to.
    pub bind_addr: SocketAddr,
    /// Secret for signing service tokens.
    pub token_secret: SigningSecret,
    /// Lifetime applied to issued tokens, in seconds.
    pub token_lifetime_secs: i64,
    /// Origins allowed to open realtime connections. Empty means any.
    pub allowed_origins: Vec<String>,
}

impl GatewayConfig {
    pub fn new(bind_addr: SocketAddr, token_secret: SigningSecret) -> Self {
        Self {
            bind_addr,
            token_secret,
            token_lifetime_secs: DEFAULT_LIFETIME_SECS,
            allowed_origins: Vec::new(),
        }
    }
}
