//! Scoped access to a session's secret.

use std::sync::Arc;
use thiserror::Error;

use crate::session::id::SessionId;
use crate::session::manager::SessionManager;
use crate::session::secret::Secret;

/// Why a secret could not be checked out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Unknown, expired or already cleared.
    #[error("Invalid or expired session ID")]
    NotFound,

    /// The session exists but no secret has been attached yet.
    #[error("No private key added to this session")]
    NotArmed,
}

/// A secret in hand. The session record is already gone from the table;
/// dropping the guard wipes the secret.
pub struct ArmedSession {
    manager: Arc<SessionManager>,
    session_id: SessionId,
    public_address: String,
    secret: Secret,
}

impl ArmedSession {
    pub(crate) fn new(
        manager: Arc<SessionManager>,
        session_id: SessionId,
        public_address: String,
        secret: Secret,
    ) -> Self {
        Self {
            manager,
            session_id,
            public_address,
            secret,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Address the session was created for.
    pub fn public_address(&self) -> &str {
        &self.public_address
    }

    pub fn secret(&self) -> &Secret {
        &self.secret
    }
}

impl Drop for ArmedSession {
    fn drop(&mut self) {
        self.secret.wipe();
        tracing::debug!(namespace = %self.manager.prefix(), session_id = %self.session_id, "Checked-out secret wiped");
    }
}

impl std::fmt::Debug for ArmedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArmedSession")
            .field("session_id", &self.session_id)
            .field("public_address", &self.public_address)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_cleared_even_on_panic() {
        let manager = Arc::new(SessionManager::new("session", Duration::from_secs(300)));
        let id = manager.create_session("0xAAA");
        manager.add_secret(id.as_str(), Secret::new("0xdeadbeef"));

        let m = manager.clone();
        let sid = id.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _armed = m.checkout(sid.as_str()).unwrap();
            panic!("chain call blew up");
        }));
        assert!(result.is_err());
        assert!(manager.get_session(id.as_str()).is_none());
    }

    #[test]
    fn test_debug_hides_secret() {
        let manager = Arc::new(SessionManager::new("session", Duration::from_secs(300)));
        let id = manager.create_session("0xAAA");
        manager.add_secret(id.as_str(), Secret::new("0xdeadbeef"));

        let armed = manager.checkout(id.as_str()).unwrap();
        assert!(!format!("{:?}", armed).contains("deadbeef"));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(SessionError::NotFound.to_string(), "Invalid or expired session ID");
        assert!(SessionError::NotArmed.to_string().contains("No private key"));
    }
}
