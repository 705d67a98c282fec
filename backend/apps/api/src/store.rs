//! In-Memory Stores
//!
//! The confidentiality core deals only in plain serialized values; these
//! stores are the collaborator that keeps them. Process-lifetime maps
//! behind `RwLock` - durable storage is outside this system's scope.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

/// A registered user. `credential` is the serialized `salt:key` digest;
/// the plaintext password is never stored.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub email: String,
    pub credential: String,
    pub role: String,
    pub blocked: bool,
}

#[derive(Debug, Default)]
pub struct UserStore {
    inner: RwLock<HashMap<String, UserRecord>>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new user. Returns false when the email is already taken.
    pub fn insert(&self, record: UserRecord) -> bool {
        let mut map = self.inner.write().expect("user store lock poisoned");
        if map.contains_key(&record.email) {
            return false;
        }
        map.insert(record.email.clone(), record);
        true
    }

    pub fn get(&self, email: &str) -> Option<UserRecord> {
        self.inner
            .read()
            .expect("user store lock poisoned")
            .get(email)
            .cloned()
    }

    pub fn list(&self) -> Vec<UserRecord> {
        let mut users: Vec<UserRecord> = self
            .inner
            .read()
            .expect("user store lock poisoned")
            .values()
            .cloned()
            .collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        users
    }

    /// Set the blocked flag. Returns false when the user does not exist.
    ///
    /// Tokens issued before this call keep their stale `blocked` claim
    /// until they expire; there is no revocation.
    pub fn set_blocked(&self, email: &str, blocked: bool) -> bool {
        let mut map = self.inner.write().expect("user store lock poisoned");
        match map.get_mut(email) {
            Some(user) => {
                user.blocked = blocked;
                true
            }
            None => false,
        }
    }
}

/// A stored message. `body` is the serialized `ciphertext:nonce:tag`
/// triple exactly as the cipher produced it.
#[derive(Debug, Clone)]
pub struct MessageRecord {
    pub sender: String,
    pub receiver: String,
    pub body: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct MessageStore {
    inner: RwLock<Vec<MessageRecord>>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, record: MessageRecord) {
        self.inner
            .write()
            .expect("message store lock poisoned")
            .push(record);
    }

    /// All messages for a receiver, newest first.
    pub fn for_receiver(&self, email: &str) -> Vec<MessageRecord> {
        let mut messages: Vec<MessageRecord> = self
            .inner
            .read()
            .expect("message store lock poisoned")
            .iter()
            .filter(|m| m.receiver == email)
            .cloned()
            .collect();
        messages.sort_by(|a, b| b.date.cmp(&a.date));
        messages
    }
}
