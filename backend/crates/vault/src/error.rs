//! Vault Error Types
//!
//! Typed failure taxonomy for the confidentiality core. Cryptographic
//! mismatches are recovered into these variants locally and never leak
//! internal detail (no expected-vs-actual values in messages). Rate
//! limiting is deliberately absent: an admitted/rejected decision is a
//! value, not an error.

use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

/// Vault-specific result type alias
pub type VaultResult<T> = Result<T, VaultError>;

/// Failures produced by the confidentiality core
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    /// Tag or password mismatch - tampering, wrong key, or wrong password.
    /// Intentionally carries no detail about what failed to match.
    #[error("Authentication failed")]
    AuthenticationFailure,

    /// Token signature is valid no longer than 24h after issuance
    #[error("Token has expired")]
    TokenExpired,

    /// Token signature mismatch or structural corruption
    #[error("Invalid token")]
    TokenInvalid,

    /// Underlying cipher primitive failed - fatal and unexpected
    #[error("Encryption primitive failed")]
    EncryptionFailure,

    /// Stored representation cannot be parsed. Distinct from
    /// `AuthenticationFailure` so operators can tell corruption from attack.
    #[error("Malformed stored data: {0}")]
    MalformedData(&'static str),
}

impl VaultError {
    /// Classify for the HTTP layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            VaultError::AuthenticationFailure
            | VaultError::TokenExpired
            | VaultError::TokenInvalid => ErrorKind::Unauthorized,
            VaultError::EncryptionFailure | VaultError::MalformedData(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    /// Log the error with the appropriate level.
    fn log(&self) {
        match self {
            VaultError::EncryptionFailure => {
                tracing::error!("Cipher primitive failure");
            }
            VaultError::MalformedData(detail) => {
                tracing::error!(detail, "Malformed stored data");
            }
            VaultError::AuthenticationFailure => {
                tracing::warn!("Authentication failure");
            }
            VaultError::TokenExpired | VaultError::TokenInvalid => {
                tracing::warn!(error = %self, "Token rejected");
            }
        }
    }
}

impl From<VaultError> for AppError {
    fn from(err: VaultError) -> Self {
        err.log();
        let message = match &err {
            // Client-safe wording; nothing about which byte or field failed
            VaultError::AuthenticationFailure => "Authentication failed",
            VaultError::TokenExpired => "JWT token has expired",
            VaultError::TokenInvalid => "Invalid JWT token",
            VaultError::EncryptionFailure | VaultError::MalformedData(_) => {
                "Internal server error"
            }
        };
        AppError::new(err.kind(), message).with_source(err)
    }
}
