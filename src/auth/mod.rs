//! Token issuance, verification, and authorization
//!
//! The trust boundary between "has a valid login session" and "may call a
//! protected operation":
//! - `tokens`: HMAC-SHA256 codec over the claim payload (`svt-` prefix)
//! - `issuer`: mints claims from a verified session
//! - `verifier`: validates presented tokens against an injectable clock
//! - `context`: the per-request/per-connection authenticated context and
//!   the role gate layered on top of it

mod claims;
mod context;
mod issuer;
mod tokens;
mod verifier;

pub use claims::{ServiceClaims, ADMIN_ROLE, DEFAULT_ROLE};
pub use context::{require_role, AuthContext};
pub use issuer::{TokenIssuer, DEFAULT_LIFETIME_SECS};
pub use tokens::{SigningSecret, TOKEN_PREFIX};
pub use verifier::{Clock, SystemClock, TokenVerifier};

use thiserror::Error;

/// Authentication and authorization failures.
///
/// Everything except `RoleInsufficient` collapses to a single unauthorized
/// outcome at the transport boundary; the distinct variants exist for
/// logging and tests only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("cannot mint a token without a session identity")]
    IdentityMissing,

    #[error("no credential supplied")]
    CredentialMissing,

    #[error("credential is not decodable")]
    CredentialMalformed,

    #[error("credential signature mismatch")]
    SignatureInvalid,

    #[error("credential has expired")]
    CredentialExpired,

    #[error("role does not permit this operation")]
    RoleInsufficient,
}
