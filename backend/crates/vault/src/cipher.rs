//! Message Encryption
//!
//! AES-256-GCM with a 12-byte random nonce and a 16-byte authentication
//! tag, serialized as `base64(ciphertext):base64(nonce):base64(tag)`.
//!
//! The stored ciphertext keeps the trailing GCM tag, and the tag is also
//! stored as its own field. Decryption compares the stored tag against the
//! trailing bytes in constant time before the AEAD runs, so a mismatch
//! between the two stored copies fails closed instead of trusting either.
//!
//! One key derived from the `crypto.key` secret encrypts every message in
//! the system. That is the documented contract of the stored data, not an
//! oversight - per-conversation keys would orphan everything already
//! persisted. Known architectural weakness.

use std::fmt;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use zeroize::{Zeroize, ZeroizeOnDrop};

use platform::crypto::{constant_time_eq, from_base64, random_array, sha256, to_base64};

use crate::error::{VaultError, VaultResult};

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

// ============================================================================
// Key derivation
// ============================================================================

/// 256-bit message encryption key, zeroized on drop
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MessageKey([u8; 32]);

impl MessageKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MessageKey").field(&"[REDACTED]").finish()
    }
}

/// Derive the message key from the shared `crypto.key` secret.
///
/// Deterministic: the same secret always yields the same key. The key is
/// the first 32 bytes of the base64-encoded SHA-256 digest, not the raw
/// digest - every message already stored was encrypted under this exact
/// mapping, so it must not change.
pub fn derive_message_key(shared_secret: &str) -> MessageKey {
    let digest = sha256(shared_secret.as_bytes());
    let encoded = to_base64(&digest);

    let mut key = [0u8; 32];
    key.copy_from_slice(&encoded.as_bytes()[..32]);
    MessageKey(key)
}

// ============================================================================
// Encrypted message
// ============================================================================

/// An encrypted message body, immutable once created.
///
/// `ciphertext` carries the trailing 16-byte GCM tag; `tag` is the same
/// tag stored separately so the two can be cross-checked on read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedMessage {
    pub ciphertext: Vec<u8>,
    pub nonce: [u8; NONCE_LEN],
    pub tag: [u8; TAG_LEN],
}

impl EncryptedMessage {
    /// Serialize as `base64(ciphertext):base64(nonce):base64(tag)`.
    pub fn encode(&self) -> String {
        format!(
            "{}:{}:{}",
            to_base64(&self.ciphertext),
            to_base64(&self.nonce),
            to_base64(&self.tag)
        )
    }

    /// Parse the stored triple.
    pub fn parse(stored: &str) -> VaultResult<Self> {
        let parts: Vec<&str> = stored.split(':').collect();
        if parts.len() != 3 {
            return Err(VaultError::MalformedData("message field count"));
        }

        let ciphertext =
            from_base64(parts[0]).map_err(|_| VaultError::MalformedData("message base64"))?;
        let nonce_bytes =
            from_base64(parts[1]).map_err(|_| VaultError::MalformedData("message base64"))?;
        let tag_bytes =
            from_base64(parts[2]).map_err(|_| VaultError::MalformedData("message base64"))?;

        if ciphertext.len() < TAG_LEN {
            return Err(VaultError::MalformedData("ciphertext shorter than tag"));
        }
        let nonce: [u8; NONCE_LEN] = nonce_bytes
            .try_into()
            .map_err(|_| VaultError::MalformedData("nonce length"))?;
        let tag: [u8; TAG_LEN] = tag_bytes
            .try_into()
            .map_err(|_| VaultError::MalformedData("tag length"))?;

        Ok(Self {
            ciphertext,
            nonce,
            tag,
        })
    }
}

// ============================================================================
// Encrypt / decrypt
// ============================================================================

/// Encrypt a message body under a fresh random nonce.
pub fn encrypt(plaintext: &str, key: &MessageKey) -> VaultResult<EncryptedMessage> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key.0));
    let nonce = random_array::<NONCE_LEN>();

    // The aead API appends the tag to the ciphertext
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
        .map_err(|_| VaultError::EncryptionFailure)?;

    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&ciphertext[ciphertext.len() - TAG_LEN..]);

    Ok(EncryptedMessage {
        ciphertext,
        nonce,
        tag,
    })
}

/// Decrypt a stored message, verifying integrity before trusting anything.
///
/// Fails with `AuthenticationFailure` when either the stored tag disagrees
/// with the tag embedded in the ciphertext or the AEAD tag check fails -
/// corrupted plaintext is never returned.
pub fn decrypt(msg: &EncryptedMessage, key: &MessageKey) -> VaultResult<String> {
    if msg.ciphertext.len() < TAG_LEN {
        return Err(VaultError::MalformedData("ciphertext shorter than tag"));
    }

    // Structural check: stored tag vs the tag the ciphertext carries
    let embedded_tag = &msg.ciphertext[msg.ciphertext.len() - TAG_LEN..];
    if !constant_time_eq(embedded_tag, &msg.tag) {
        return Err(VaultError::AuthenticationFailure);
    }

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key.0));
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&msg.nonce), msg.ciphertext.as_slice())
        .map_err(|_| VaultError::AuthenticationFailure)?;

    String::from_utf8(plaintext).map_err(|_| VaultError::MalformedData("plaintext encoding"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> MessageKey {
        derive_message_key("test crypto.key value")
    }

    #[test]
    fn test_derive_message_key_deterministic() {
        let a = derive_message_key("secret");
        let b = derive_message_key("secret");
        assert_eq!(a.0, b.0);

        let c = derive_message_key("other secret");
        assert_ne!(a.0, c.0);
    }

    #[test]
    fn test_derive_message_key_is_encoded_digest_prefix() {
        let key = derive_message_key("secret");
        let expected = to_base64(&sha256(b"secret"));
        assert_eq!(&key.0, &expected.as_bytes()[..32]);
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = test_key();
        let msg = encrypt("Hello!", &key).unwrap();
        assert_eq!(decrypt(&msg, &key).unwrap(), "Hello!");
    }

    #[test]
    fn test_roundtrip_survives_serialization() {
        let key = test_key();
        let stored = encrypt("Hello, until tomorrow! 🦀", &key).unwrap().encode();

        let parsed = EncryptedMessage::parse(&stored).unwrap();
        assert_eq!(decrypt(&parsed, &key).unwrap(), "Hello, until tomorrow! 🦀");
    }

    #[test]
    fn test_fresh_nonce_per_call() {
        let key = test_key();
        let a = encrypt("same plaintext", &key).unwrap();
        let b = encrypt("same plaintext", &key).unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_wrong_key_fails_authentication() {
        let msg = encrypt("Hello!", &test_key()).unwrap();
        let wrong = derive_message_key("not the configured secret");
        assert_eq!(
            decrypt(&msg, &wrong).unwrap_err(),
            VaultError::AuthenticationFailure
        );
    }

    #[test]
    fn test_ciphertext_bit_flip_fails_authentication() {
        let key = test_key();
        let mut msg = encrypt("Hello!", &key).unwrap();
        msg.ciphertext[0] ^= 0x01;
        assert_eq!(
            decrypt(&msg, &key).unwrap_err(),
            VaultError::AuthenticationFailure
        );
    }

    #[test]
    fn test_nonce_bit_flip_fails_authentication() {
        let key = test_key();
        let mut msg = encrypt("Hello!", &key).unwrap();
        msg.nonce[3] ^= 0x80;
        assert_eq!(
            decrypt(&msg, &key).unwrap_err(),
            VaultError::AuthenticationFailure
        );
    }

    #[test]
    fn test_stored_tag_bit_flip_fails_authentication() {
        let key = test_key();
        let mut msg = encrypt("Hello!", &key).unwrap();
        msg.tag[15] ^= 0x01;
        assert_eq!(
            decrypt(&msg, &key).unwrap_err(),
            VaultError::AuthenticationFailure
        );
    }

    #[test]
    fn test_embedded_tag_bit_flip_fails_authentication() {
        let key = test_key();
        let mut msg = encrypt("Hello!", &key).unwrap();
        let last = msg.ciphertext.len() - 1;
        msg.ciphertext[last] ^= 0x01;
        assert_eq!(
            decrypt(&msg, &key).unwrap_err(),
            VaultError::AuthenticationFailure
        );
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        assert_eq!(
            EncryptedMessage::parse("onlyonefield").unwrap_err(),
            VaultError::MalformedData("message field count")
        );
        assert_eq!(
            EncryptedMessage::parse("a:b:c:d").unwrap_err(),
            VaultError::MalformedData("message field count")
        );
        assert_eq!(
            EncryptedMessage::parse("!!!:AAAA:AAAA").unwrap_err(),
            VaultError::MalformedData("message base64")
        );

        // Structurally valid base64 with wrong component sizes
        let short_ct = format!(
            "{}:{}:{}",
            to_base64(&[0u8; 4]),
            to_base64(&[0u8; 12]),
            to_base64(&[0u8; 16])
        );
        assert_eq!(
            EncryptedMessage::parse(&short_ct).unwrap_err(),
            VaultError::MalformedData("ciphertext shorter than tag")
        );

        let bad_nonce = format!(
            "{}:{}:{}",
            to_base64(&[0u8; 32]),
            to_base64(&[0u8; 8]),
            to_base64(&[0u8; 16])
        );
        assert_eq!(
            EncryptedMessage::parse(&bad_nonce).unwrap_err(),
            VaultError::MalformedData("nonce length")
        );

        let bad_tag = format!(
            "{}:{}:{}",
            to_base64(&[0u8; 32]),
            to_base64(&[0u8; 12]),
            to_base64(&[0u8; 8])
        );
        assert_eq!(
            EncryptedMessage::parse(&bad_tag).unwrap_err(),
            VaultError::MalformedData("tag length")
        );
    }

    #[test]
    fn test_empty_plaintext_roundtrip() {
        let key = test_key();
        let msg = encrypt("", &key).unwrap();
        // Even an empty message carries a full tag
        assert_eq!(msg.ciphertext.len(), TAG_LEN);
        assert_eq!(decrypt(&msg, &key).unwrap(), "");
    }

    #[test]
    fn test_debug_redacts_key() {
        let debug = format!("{:?}", test_key());
        assert!(debug.contains("REDACTED"));
    }
}
