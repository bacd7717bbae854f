//! Token issuance from verified sessions

use crate::auth::claims::DEFAULT_ROLE;
use crate::auth::tokens::{self, SigningSecret};
use crate::auth::verifier::{Clock, SystemClock};
use crate::auth::{AuthError, ServiceClaims};
use crate::session::Session;
use std::sync::Arc;

/// Default token lifetime: 15 minutes.
pub const DEFAULT_LIFETIME_SECS: i64 = 900;

/// Mints service tokens from established login sessions.
///
/// Callers must have checked that a session exists; issuance only guards
/// against a session that carries no usable identity.
#[derive(Clone)]
pub struct TokenIssuer {
    secret: SigningSecret,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    pub fn new(secret: SigningSecret) -> Self {
        Self::with_clock(secret, Arc::new(SystemClock))
    }

    pub fn with_clock(secret: SigningSecret, clock: Arc<dyn Clock>) -> Self {
        Self { secret, clock }
    }

    /// Issue a token with the default lifetime.
    pub fn issue(&self, session: &Session) -> Result<String, AuthError> {
        self.issue_with_lifetime(session, DEFAULT_LIFETIME_SECS)
    }

    /// Issue a token expiring `lifetime_secs` from now.
    ///
    /// Fails with `IdentityMissing` when the session has no user id; a
    /// token must never be minted for an unauthenticated or malformed
    /// session.
    pub fn issue_with_lifetime(
        &self,
        session: &Session,
        lifetime_secs: i64,
    ) -> Result<String, AuthError> {
        if session.user_id.is_empty() {
            return Err(AuthError::IdentityMissing);
        }

        let now = self.clock.now_unix();
        let claims = ServiceClaims {
            sub: session.user_id.clone(),
            role: session
                .role
                .clone()
                .unwrap_or_else(|| DEFAULT_ROLE.to_string()),
            email: session.email.clone(),
            name: session.display_name.clone(),
            iat: now,
            // exp must always exceed iat, even for degenerate lifetimes
            exp: now + lifetime_secs.max(1),
        };

        Ok(tokens::sign(&claims, &self.secret))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenVerifier;

    const TEST_SECRET: &[u8] = b"issuer-test-secret";

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(SigningSecret::new(TEST_SECRET))
    }

    fn verifier() -> TokenVerifier {
        TokenVerifier::new(SigningSecret::new(TEST_SECRET))
    }

    #[test]
    fn test_issue_copies_session_identity() {
        let session = Session::new("u42")
            .with_role("admin")
            .with_email("u42@example.com")
            .with_display_name("User 42");

        let token = issuer().issue(&session).unwrap();
        let claims = verifier().verify(&token).unwrap();

        assert_eq!(claims.sub, "u42");
        assert_eq!(claims.role, "admin");
        assert_eq!(claims.email.as_deref(), Some("u42@example.com"));
        assert_eq!(claims.name.as_deref(), Some("User 42"));
        assert!(claims.exp > claims.iat);
        assert_eq!(claims.exp - claims.iat, DEFAULT_LIFETIME_SECS);
    }

    #[test]
    fn test_role_defaults_to_user() {
        let token = issuer().issue(&Session::new("u1")).unwrap();
        let claims = verifier().verify(&token).unwrap();

        assert_eq!(claims.role, "user");
        assert!(claims.email.is_none());
        assert!(claims.name.is_none());
    }

    #[test]
    fn test_empty_user_id_rejected() {
        let result = issuer().issue(&Session::new(""));
        assert_eq!(result, Err(AuthError::IdentityMissing));
    }

    #[test]
    fn test_custom_lifetime() {
        let session = Session::new("u1");
        let token = issuer().issue_with_lifetime(&session, 60).unwrap();
        let claims = verifier().verify(&token).unwrap();

        assert_eq!(claims.exp - claims.iat, 60);
    }

    #[test]
    fn test_degenerate_lifetime_clamped() {
        let token = issuer().issue_with_lifetime(&Session::new("u1"), 0).unwrap();
        let claims = verifier().verify(&token).unwrap();

        assert!(claims.exp > claims.iat);
    }
}
