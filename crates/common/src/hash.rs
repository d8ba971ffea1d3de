//! Hashing helpers for client identity and content deduplication.

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 digest of `input`.
#[must_use]
pub fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// Normalize free text for duplicate detection.
///
/// Trims, collapses runs of whitespace to a single space and lower-cases.
#[must_use]
pub fn normalize_text(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Derives salted pseudonymous hashes of client attributes.
///
/// Raw IPs and user agents are never stored; only these hashes are.
#[derive(Debug, Clone)]
pub struct ClientHasher {
    salt: String,
}

impl ClientHasher {
    /// Create a hasher with the deployment salt.
    #[must_use]
    pub fn new(salt: impl Into<String>) -> Self {
        Self { salt: salt.into() }
    }

    /// Hash of a client IP address.
    #[must_use]
    pub fn ip_hash(&self, ip: &str) -> String {
        sha256_hex(&format!("{}|ip|{ip}", self.salt))
    }

    /// Hash of a client user agent.
    #[must_use]
    pub fn ua_hash(&self, user_agent: &str) -> String {
        sha256_hex(&format!("{}|ua|{user_agent}", self.salt))
    }
}
