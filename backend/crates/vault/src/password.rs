//! Password Hashing and Verification
//!
//! PBKDF2-HMAC-SHA256 credentials with:
//! - A fresh 16-byte random salt per hash call, never reused
//! - 100,000 iterations deriving a 256-bit key
//! - Constant-time comparison on verification
//! - The storable form `base64(salt):base64(derived_key)`
//!
//! Verification never errors for a normal mismatch: a wrong password and a
//! malformed stored value both verify false.

use std::fmt;

use sha2::Sha256;
use thiserror::Error;

use platform::crypto::{constant_time_eq, from_base64, random_array, to_base64};

use crate::error::{VaultError, VaultResult};

/// PBKDF2 iteration count
pub const PBKDF2_ITERATIONS: u32 = 100_000;

const SALT_LEN: usize = 16;
const DERIVED_KEY_LEN: usize = 32;

// ============================================================================
// Password policy
// ============================================================================

/// Password policy violations, surfaced verbatim at registration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordPolicyError {
    #[error("Password must be at least {min} characters long")]
    TooShort { min: usize },

    #[error("Password must contain at least one uppercase letter")]
    MissingUppercase,

    #[error("Password must contain at least one lowercase letter")]
    MissingLowercase,

    #[error("Password must contain at least one number")]
    MissingDigit,

    #[error("Password must contain at least one special character (like !, @, #)")]
    MissingSpecial,
}

const MIN_PASSWORD_LENGTH: usize = 12;
const SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";

/// Validate a candidate password against the registration policy.
pub fn check_password_policy(password: &str) -> Result<(), PasswordPolicyError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(PasswordPolicyError::TooShort {
            min: MIN_PASSWORD_LENGTH,
        });
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(PasswordPolicyError::MissingUppercase);
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(PasswordPolicyError::MissingLowercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(PasswordPolicyError::MissingDigit);
    }
    if !password.chars().any(|c| SPECIAL_CHARS.contains(c)) {
        return Err(PasswordPolicyError::MissingSpecial);
    }
    Ok(())
}

// ============================================================================
// Credential
// ============================================================================

/// A verifiable password digest, safe to store.
///
/// Created at registration and replaced only by an explicit password
/// change; never mutated otherwise.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    salt: [u8; SALT_LEN],
    iterations: u32,
    derived_key: [u8; DERIVED_KEY_LEN],
}

impl Credential {
    /// Hash a password under a fresh random salt.
    pub fn from_password(password: &str) -> Self {
        let salt = random_array::<SALT_LEN>();
        let derived_key = derive_key(password, &salt, PBKDF2_ITERATIONS);
        Self {
            salt,
            iterations: PBKDF2_ITERATIONS,
            derived_key,
        }
    }

    /// Verify a password against this credential in constant time.
    pub fn verify(&self, password: &str) -> bool {
        let candidate = derive_key(password, &self.salt, self.iterations);
        constant_time_eq(&candidate, &self.derived_key)
    }

    /// Serialize as `base64(salt):base64(derived_key)`.
    pub fn encode(&self) -> String {
        format!(
            "{}:{}",
            to_base64(&self.salt),
            to_base64(&self.derived_key)
        )
    }

    /// Parse the stored form. The serialized representation does not carry
    /// the iteration count; stored credentials were all derived with
    /// [`PBKDF2_ITERATIONS`].
    pub fn parse(stored: &str) -> VaultResult<Self> {
        let parts: Vec<&str> = stored.split(':').collect();
        if parts.len() != 2 {
            return Err(VaultError::MalformedData("credential field count"));
        }

        let salt_bytes =
            from_base64(parts[0]).map_err(|_| VaultError::MalformedData("credential base64"))?;
        let key_bytes =
            from_base64(parts[1]).map_err(|_| VaultError::MalformedData("credential base64"))?;

        let salt: [u8; SALT_LEN] = salt_bytes
            .try_into()
            .map_err(|_| VaultError::MalformedData("credential salt length"))?;
        let derived_key: [u8; DERIVED_KEY_LEN] = key_bytes
            .try_into()
            .map_err(|_| VaultError::MalformedData("credential key length"))?;

        Ok(Self {
            salt,
            iterations: PBKDF2_ITERATIONS,
            derived_key,
        })
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("salt", &"[REDACTED]")
            .field("iterations", &self.iterations)
            .field("derived_key", &"[REDACTED]")
            .finish()
    }
}

/// Verify a password against a stored serialized credential.
///
/// Returns false on any mismatch or on a malformed stored value.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match Credential::parse(stored) {
        Ok(credential) => credential.verify(password),
        Err(_) => false,
    }
}

fn derive_key(password: &str, salt: &[u8], iterations: u32) -> [u8; DERIVED_KEY_LEN] {
    let mut key = [0u8; DERIVED_KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let credential = Credential::from_password("Sup3rSecret!!");
        assert!(credential.verify("Sup3rSecret!!"));
        assert!(!credential.verify("Sup3rSecret!?"));
        assert!(!credential.verify(""));
    }

    #[test]
    fn test_same_password_fresh_salt() {
        let a = Credential::from_password("Sup3rSecret!!");
        let b = Credential::from_password("Sup3rSecret!!");
        assert_ne!(a.encode(), b.encode(), "salt must be fresh per hash call");
    }

    #[test]
    fn test_encode_parse_roundtrip() {
        let credential = Credential::from_password("Sup3rSecret!!");
        let stored = credential.encode();

        let parsed = Credential::parse(&stored).unwrap();
        assert!(parsed.verify("Sup3rSecret!!"));
        assert!(!parsed.verify("WrongPassword1!"));
    }

    #[test]
    fn test_verify_password_against_stored_string() {
        let stored = Credential::from_password("Sup3rSecret!!").encode();
        assert!(verify_password("Sup3rSecret!!", &stored));
        assert!(!verify_password("sup3rsecret!!", &stored));
    }

    #[test]
    fn test_malformed_stored_value_verifies_false() {
        assert!(!verify_password("Sup3rSecret!!", ""));
        assert!(!verify_password("Sup3rSecret!!", "only-one-field"));
        assert!(!verify_password("Sup3rSecret!!", "a:b:c"));
        assert!(!verify_password("Sup3rSecret!!", "!!!notbase64:AAAA"));

        // Valid base64, wrong decoded lengths
        let short = format!("{}:{}", to_base64(&[0u8; 4]), to_base64(&[0u8; 32]));
        assert!(!verify_password("Sup3rSecret!!", &short));
    }

    #[test]
    fn test_parse_errors_are_malformed_data() {
        assert_eq!(
            Credential::parse("a:b:c").unwrap_err(),
            VaultError::MalformedData("credential field count")
        );
        assert!(matches!(
            Credential::parse("!!!:AAAA").unwrap_err(),
            VaultError::MalformedData("credential base64")
        ));
    }

    #[test]
    fn test_stored_form_shape() {
        let stored = Credential::from_password("Sup3rSecret!!").encode();
        let parts: Vec<&str> = stored.split(':').collect();
        assert_eq!(parts.len(), 2);
        assert_eq!(from_base64(parts[0]).unwrap().len(), 16);
        assert_eq!(from_base64(parts[1]).unwrap().len(), 32);
    }

    #[test]
    fn test_debug_redaction() {
        let credential = Credential::from_password("Sup3rSecret!!");
        let debug = format!("{:?}", credential);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains(&to_base64(&credential.derived_key)));
    }

    #[test]
    fn test_password_policy() {
        assert!(check_password_policy("Sup3rSecret!!").is_ok());

        assert_eq!(
            check_password_policy("Sh0rt!"),
            Err(PasswordPolicyError::TooShort { min: 12 })
        );
        assert_eq!(
            check_password_policy("alllowercase1!!!"),
            Err(PasswordPolicyError::MissingUppercase)
        );
        assert_eq!(
            check_password_policy("ALLUPPERCASE1!!!"),
            Err(PasswordPolicyError::MissingLowercase)
        );
        assert_eq!(
            check_password_policy("NoDigitsHere!!!!"),
            Err(PasswordPolicyError::MissingDigit)
        );
        assert_eq!(
            check_password_policy("NoSpecials12345a"),
            Err(PasswordPolicyError::MissingSpecial)
        );
    }
}
