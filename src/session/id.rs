//! Session identifiers.
//!
//! Format: `<prefix>_<unix-seconds>_<address fingerprint>_<sequence>`.
//! The fingerprint is the first 8 hex characters of SHA-256 over the
//! address string; the sequence is a process-wide counter in hex. Ids carry
//! no secret material and are safe to log.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::borrow::Borrow;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Shared by every manager in the process so ids never collide, even across
/// managers using the same prefix.
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Opaque session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Mint a fresh id for `address` at time `now`.
    pub fn mint(prefix: &str, address: &str, now: Duration) -> Self {
        let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self(format!(
            "{}_{}_{}_{:x}",
            prefix,
            now.as_secs(),
            fingerprint(address),
            seq
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Short deterministic fingerprint of an address.
pub fn fingerprint(address: &str) -> String {
    let digest = Sha256::digest(address.as_bytes());
    let mut hex = alloy::hex::encode(digest);
    hex.truncate(8);
    hex
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for SessionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}
