//! Vault - Credential and Message Confidentiality Core
//!
//! The security-sensitive heart of the message backend:
//! - `password` - salted PBKDF2 password digests and verification
//! - `cipher` - authenticated AES-256-GCM message encryption
//! - `token` - signed, time-bound identity tokens (HS256)
//! - `error` - the typed failure taxonomy for all of the above
//!
//! Everything here is a pure, synchronous computation. The crate holds no
//! session table and no storage: collaborators persist the serialized
//! outputs (`salt:key` credentials, `ciphertext:nonce:tag` messages,
//! compact tokens) and hand them back verbatim.
//!
//! ## Security Model
//! - Passwords: PBKDF2-HMAC-SHA256, 100k iterations, per-hash random salt
//! - Messages: AES-256-GCM under one process-wide key derived from
//!   `crypto.key` (a documented architectural weakness, preserved on purpose)
//! - Tokens: HMAC-SHA256 over canonical claims, 24h fixed lifetime, signing
//!   key regenerated per process so tokens never survive a restart
//! - All secret comparisons are constant-time

pub mod cipher;
pub mod error;
pub mod password;
pub mod token;

// Re-exports for convenience
pub use cipher::{EncryptedMessage, MessageKey, decrypt, derive_message_key, encrypt};
pub use error::{VaultError, VaultResult};
pub use password::{Credential, PasswordPolicyError, check_password_policy, verify_password};
pub use token::{Claims, TokenService, TokenSigningKey};
