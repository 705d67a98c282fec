//! Application State
//!
//! Everything a request handler needs, constructed once in `main` and
//! shared by `Arc`. The message key and the token service's signing key
//! are immutable after startup; the stores and the rate limiter own their
//! own interior locking.

use platform::rate_limit::RateLimiter;
use vault::{MessageKey, TokenService};

use crate::store::{MessageStore, UserStore};

pub struct AppState {
    /// Message encryption key derived from the `CRYPTO_KEY` secret
    pub message_key: MessageKey,
    /// Token issuance/validation under the per-process signing key
    pub tokens: TokenService,
    /// Per-client, per-endpoint-class throttling
    pub limiter: RateLimiter,
    pub users: UserStore,
    pub messages: MessageStore,
}

impl AppState {
    pub fn new(message_key: MessageKey, tokens: TokenService) -> Self {
        Self {
            message_key,
            tokens,
            limiter: RateLimiter::new(),
            users: UserStore::new(),
            messages: MessageStore::new(),
        }
    }
}
