//! Rate Limiting Infrastructure
//!
//! In-process token-bucket throttling keyed by client identity and
//! endpoint class. Buckets are created lazily on first request and live
//! for the process lifetime; nothing is persisted.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Endpoint classes with distinct throttling policies.
///
/// Endpoints outside these two classes bypass the limiter entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointClass {
    /// Login and registration
    Auth,
    /// General message traffic
    Api,
}

impl EndpointClass {
    /// The policy applied to buckets of this class.
    pub const fn policy(&self) -> RateLimitPolicy {
        match self {
            EndpointClass::Auth => RateLimitPolicy {
                capacity: 5,
                refill: 5,
                window: Duration::from_secs(60),
            },
            EndpointClass::Api => RateLimitPolicy {
                capacity: 100,
                refill: 100,
                window: Duration::from_secs(60),
            },
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            EndpointClass::Auth => "auth",
            EndpointClass::Api => "api",
        }
    }
}

/// Rate limit policy for one endpoint class
#[derive(Debug, Clone, Copy)]
pub struct RateLimitPolicy {
    /// Maximum tokens a bucket can hold
    pub capacity: u32,
    /// Tokens restored per window
    pub refill: u32,
    /// Refill window duration
    pub window: Duration,
}

/// Outcome of a rate limit check. Not an error - callers branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Rejected,
}

impl RateLimitDecision {
    pub const fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed)
    }
}

/// One token bucket. Refilled lazily on access.
#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    fn new(policy: &RateLimitPolicy, now: Instant) -> Self {
        Self {
            tokens: policy.capacity as f64,
            last_refill: now,
        }
    }

    /// Greedy refill: tokens accrue continuously with elapsed time,
    /// capped at capacity.
    fn refill(&mut self, policy: &RateLimitPolicy, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        let gained = elapsed.as_secs_f64() / policy.window.as_secs_f64() * policy.refill as f64;
        self.tokens = (self.tokens + gained).min(policy.capacity as f64);
        self.last_refill = now;
    }

    /// Refill, then consume one token if a whole token is available.
    /// A rejected request consumes nothing.
    fn try_consume(&mut self, policy: &RateLimitPolicy, now: Instant) -> bool {
        self.refill(policy, now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Concurrent token-bucket rate limiter.
///
/// The bucket map uses a single lock so that get-or-create is one
/// indivisible operation: concurrent first requests for the same key
/// observe exactly one bucket. Refill-and-consume then runs under the
/// bucket's own lock, so concurrent requests from one identity cannot
/// double-admit on a stale token count.
#[derive(Debug, Default)]
pub struct RateLimiter {
    buckets: Mutex<HashMap<(String, EndpointClass), Arc<Mutex<Bucket>>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Check whether a request from `client` against `class` is admitted.
    pub fn check(&self, client: &str, class: EndpointClass) -> RateLimitDecision {
        self.check_at(client, class, Instant::now())
    }

    fn check_at(&self, client: &str, class: EndpointClass, now: Instant) -> RateLimitDecision {
        let policy = class.policy();

        let bucket = {
            let mut map = self.buckets.lock().expect("rate limiter map lock poisoned");
            map.entry((client.to_string(), class))
                .or_insert_with(|| Arc::new(Mutex::new(Bucket::new(&policy, now))))
                .clone()
        };

        let mut bucket = bucket.lock().expect("rate limiter bucket lock poisoned");
        if bucket.try_consume(&policy, now) {
            RateLimitDecision::Allowed
        } else {
            RateLimitDecision::Rejected
        }
    }

    /// Number of live buckets (diagnostics and tests).
    pub fn bucket_count(&self) -> usize {
        self.buckets
            .lock()
            .expect("rate limiter map lock poisoned")
            .len()
    }
}
