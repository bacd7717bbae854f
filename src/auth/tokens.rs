//! Token codec: the sign/verify primitive
//!
//! Format: `svt-<payload>.<signature>` where the payload is the
//! JSON-encoded claims and the signature is HMAC-SHA256 over the encoded
//! payload, truncated to 16 bytes, both base64url without padding.

use crate::auth::{AuthError, ServiceClaims};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

/// Token prefix
pub const TOKEN_PREFIX: &str = "svt-";

/// Signature bytes kept from the HMAC-SHA256 output
const SIGNATURE_LEN: usize = 16;

type HmacSha256 = Hmac<Sha256>;

/// Process-wide signing secret, immutable after startup.
#[derive(Clone)]
pub struct SigningSecret {
    key: Vec<u8>,
}

impl SigningSecret {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.key).expect("HMAC can take key of any size")
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningSecret([REDACTED])")
    }
}

/// Sign claims into an opaque token string.
pub(crate) fn sign(claims: &ServiceClaims, secret: &SigningSecret) -> String {
    let payload_json = serde_json::to_vec(claims).expect("serialize claims");
    let payload_b64 = URL_SAFE_NO_PAD.encode(&payload_json);

    let mut mac = secret.mac();
    mac.update(payload_b64.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = URL_SAFE_NO_PAD.encode(&signature[..SIGNATURE_LEN]);

    format!("{}{}.{}", TOKEN_PREFIX, payload_b64, signature_b64)
}

/// Recompute the integrity check and decode the claims.
///
/// Expiry is not checked here; the verifier owns the clock. The signature
/// covers the encoded payload, so any mutation of either half fails the
/// integrity check before the payload is ever decoded.
pub(crate) fn verify(token: &str, secret: &SigningSecret) -> Result<ServiceClaims, AuthError> {
    let content = token
        .strip_prefix(TOKEN_PREFIX)
        .ok_or(AuthError::CredentialMalformed)?;

    let (payload_b64, signature_b64) = content
        .split_once('.')
        .ok_or(AuthError::CredentialMalformed)?;
    if payload_b64.is_empty() || signature_b64.is_empty() || signature_b64.contains('.') {
        return Err(AuthError::CredentialMalformed);
    }

    let mut mac = secret.mac();
    mac.update(payload_b64.as_bytes());
    let expected = mac.finalize().into_bytes();
    let expected_b64 = URL_SAFE_NO_PAD.encode(&expected[..SIGNATURE_LEN]);

    if !constant_time_eq(signature_b64.as_bytes(), expected_b64.as_bytes()) {
        return Err(AuthError::SignatureInvalid);
    }

    let payload_json = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| AuthError::CredentialMalformed)?;

    serde_json::from_slice(&payload_json).map_err(|_| AuthError::CredentialMalformed)
}

// Constant-time comparison to prevent timing attacks
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
