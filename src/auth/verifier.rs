//! Token verification

use crate::auth::tokens::{self, SigningSecret};
use crate::auth::{AuthError, ServiceClaims};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the current time, injectable so expiry behavior is
/// deterministic in tests.
pub trait Clock: Send + Sync {
    /// Seconds since the Unix epoch.
    fn now_unix(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before Unix epoch")
            .as_secs() as i64
    }
}

/// Validates presented tokens.
///
/// A pure function of token + secret + clock: no side effects, no state
/// beyond the immutable secret, safe to call from any number of
/// concurrent tasks.
#[derive(Clone)]
pub struct TokenVerifier {
    secret: SigningSecret,
    clock: Arc<dyn Clock>,
}

impl TokenVerifier {
    pub fn new(secret: SigningSecret) -> Self {
        Self::with_clock(secret, Arc::new(SystemClock))
    }

    pub fn with_clock(secret: SigningSecret, clock: Arc<dyn Clock>) -> Self {
        Self { secret, clock }
    }

    /// Verify a token and return its claims.
    ///
    /// Integrity is checked before expiry: a tampered token reports
    /// `SignatureInvalid` even when its (unauthenticated) expiry has
    /// already passed.
    pub fn verify(&self, token: &str) -> Result<ServiceClaims, AuthError> {
        let claims = tokens::verify(token, &self.secret)?;

        if self.clock.now_unix() > claims.exp {
            return Err(AuthError::CredentialExpired);
        }

        Ok(claims)
    }
}
