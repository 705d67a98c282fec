//! Signed Identity Tokens
//!
//! Compact HS256 claims tokens: `base64url(header).base64url(claims).
//! base64url(signature)`, presented by callers as `Authorization: Bearer`.
//!
//! The signing key is generated once at process startup and injected into
//! [`TokenService::new`] - an explicit immutable value, not a global. It is
//! never persisted, so a restart invalidates every outstanding token.
//!
//! Tokens are validated statelessly on every use; there is no session
//! table and no revocation. The `blocked` claim is whatever was true at
//! issuance and can go stale until the token expires naturally.

use std::fmt;

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use platform::crypto::{from_base64url, random_array, to_base64url};

use crate::error::{VaultError, VaultResult};

type HmacSha256 = Hmac<Sha256>;

/// Fixed token lifetime: 24 hours from issuance
pub const TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

const HEADER_JSON: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

// ============================================================================
// Signing key
// ============================================================================

/// Process-wide HMAC signing key (32 bytes)
#[derive(Clone)]
pub struct TokenSigningKey([u8; 32]);

impl TokenSigningKey {
    /// Generate a fresh random key. Done once at startup.
    pub fn generate() -> Self {
        Self(random_array::<32>())
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for TokenSigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TokenSigningKey")
            .field(&"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// Claims
// ============================================================================

/// The identity facts embedded in a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User identity (email)
    #[serde(rename = "sub")]
    pub subject: String,
    /// Role at issuance ("user" or "admin")
    pub role: String,
    /// Blocked flag at issuance - not re-checked while the token lives
    pub blocked: bool,
    /// Issuance time, unix seconds
    #[serde(rename = "iat")]
    pub issued_at: i64,
    /// Expiry time, unix seconds; always `issued_at + 24h`
    #[serde(rename = "exp")]
    pub expires_at: i64,
}

// ============================================================================
// Token service
// ============================================================================

/// Issues and validates signed tokens under one immutable key.
///
/// Stateless per call; safe to share across request threads since the key
/// is never mutated after construction.
pub struct TokenService {
    key: TokenSigningKey,
}

impl TokenService {
    pub fn new(key: TokenSigningKey) -> Self {
        Self { key }
    }

    /// Issue a token for `subject`, expiring 24 hours from now.
    pub fn issue(&self, subject: &str, role: &str, blocked: bool) -> String {
        self.issue_at(subject, role, blocked, chrono::Utc::now().timestamp())
    }

    fn issue_at(&self, subject: &str, role: &str, blocked: bool, now: i64) -> String {
        let claims = Claims {
            subject: subject.to_string(),
            role: role.to_string(),
            blocked,
            issued_at: now,
            expires_at: now + TOKEN_TTL_SECS,
        };

        let header = to_base64url(HEADER_JSON.as_bytes());
        let payload = to_base64url(
            &serde_json::to_vec(&claims).expect("claims struct always serializes"),
        );

        let signature = self.sign(&header, &payload);
        format!("{}.{}.{}", header, payload, to_base64url(&signature))
    }

    /// Validate a token and return its claims.
    ///
    /// `TokenInvalid` on structural corruption or signature mismatch;
    /// `TokenExpired` when the lifetime has passed, checked independently
    /// even for a signature-valid token.
    pub fn parse(&self, token: &str) -> VaultResult<Claims> {
        self.parse_at(token, chrono::Utc::now().timestamp())
    }

    fn parse_at(&self, token: &str, now: i64) -> VaultResult<Claims> {
        let mut segments = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(VaultError::TokenInvalid);
        };

        let signature = from_base64url(signature).map_err(|_| VaultError::TokenInvalid)?;

        // Constant-time signature verification before anything is trusted
        let mut mac = HmacSha256::new_from_slice(&self.key.0)
            .expect("HMAC can take key of any size");
        mac.update(header.as_bytes());
        mac.update(b".");
        mac.update(payload.as_bytes());
        if mac.verify_slice(&signature).is_err() {
            return Err(VaultError::TokenInvalid);
        }

        let payload = from_base64url(payload).map_err(|_| VaultError::TokenInvalid)?;
        let claims: Claims =
            serde_json::from_slice(&payload).map_err(|_| VaultError::TokenInvalid)?;

        // Signature-valid but stale tokens are still rejected
        if claims.expires_at < now {
            return Err(VaultError::TokenExpired);
        }

        Ok(claims)
    }

    fn sign(&self, header: &str, payload: &str) -> [u8; 32] {
        let mut mac = HmacSha256::new_from_slice(&self.key.0)
            .expect("HMAC can take key of any size");
        mac.update(header.as_bytes());
        mac.update(b".");
        mac.update(payload.as_bytes());
        mac.finalize().into_bytes().into()
    }
}
