//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Cryptographic utilities (secure RNG, SHA-256, Base64, constant-time compare)
//! - In-process rate limiting (token buckets per client and endpoint class)

pub mod crypto;
pub mod rate_limit;
