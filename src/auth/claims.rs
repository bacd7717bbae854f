//! Service token claims

use serde::{Deserialize, Serialize};

/// Role assigned at issuance when the session carries none.
pub const DEFAULT_ROLE: &str = "user";

/// Role required by the admin surface.
pub const ADMIN_ROLE: &str = "admin";

/// Payload encoded inside a service token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceClaims {
    /// User id copied from the session; never empty.
    pub sub: String,
    /// Role, defaulted to [`DEFAULT_ROLE`] at issuance.
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,
    /// Expiry, seconds since the Unix epoch; always greater than `iat`.
    pub exp: i64,
}

impl ServiceClaims {
    pub fn subject(&self) -> &str {
        &self.sub
    }

    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}
