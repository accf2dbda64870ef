//! Secret material held by a session.

use std::fmt;
use zeroize::{Zeroize, Zeroizing};

/// Private key material.
///
/// The backing buffer is zeroed when the value is dropped or wiped. Every
/// clone is an independent buffer with the same guarantee.
#[derive(Clone)]
pub struct Secret(Zeroizing<String>);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    /// Borrow the raw secret. Callers must not log or persist it.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    /// Overwrite the buffer in place.
    pub fn wipe(&mut self) {
        self.0.zeroize();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl Eq for Secret {}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret([REDACTED])")
    }
}
