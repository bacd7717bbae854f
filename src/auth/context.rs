//! Authenticated request/connection context and the role gate

use crate::auth::{AuthError, ServiceClaims};

/// Verified claims attached to exactly one request or connection.
///
/// Created by a transport adapter immediately after successful
/// verification and dropped when the call completes or the connection
/// closes. Never persisted, never shared between concurrent calls; always
/// threaded explicitly by parameter passing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    claims: ServiceClaims,
}

impl AuthContext {
    pub fn new(claims: ServiceClaims) -> Self {
        Self { claims }
    }

    pub fn claims(&self) -> &ServiceClaims {
        &self.claims
    }

    pub fn subject(&self) -> &str {
        &self.claims.sub
    }

    pub fn role(&self) -> &str {
        &self.claims.role
    }
}

/// Role gate: allow only if the verified context carries `required`.
///
/// Runs strictly after an adapter has populated the context. A missing
/// context is a caller error and rejects as unauthorized rather than
/// treating the absent role as merely non-matching.
pub fn require_role(context: Option<&AuthContext>, required: &str) -> Result<(), AuthError> {
    match context {
        None => Err(AuthError::CredentialMissing),
        Some(ctx) if ctx.role() == required => Ok(()),
        Some(_) => Err(AuthError::RoleInsufficient),
    }
}
