//! Session table with absolute TTL expiry.
//!
//! # Design Decisions
//! - One coarse mutex over the whole table; every operation is short,
//!   CPU-only and never awaits while holding it
//! - Expiry is lazy (checked on access) with an optional proactive sweep
//! - Expected misses are reported as `false` / `None`, never as errors

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;

use crate::observability::metrics;
use crate::session::clock::{Clock, SystemClock};
use crate::session::guard::{ArmedSession, SessionError};
use crate::session::id::SessionId;
use crate::session::secret::Secret;

/// Default session lifetime.
pub const DEFAULT_TTL_SECS: u64 = 300;

/// A session record.
#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: SessionId,
    /// Address the session is scoped to, stored verbatim.
    pub public_address: String,
    /// Creation time since the Unix epoch.
    pub created_at: Duration,
    pub secret: Option<Secret>,
}

impl Session {
    /// Whether a secret has been attached.
    pub fn is_armed(&self) -> bool {
        self.secret.is_some()
    }

    fn is_expired_at(&self, now: Duration, ttl: Duration) -> bool {
        now.saturating_sub(self.created_at) > ttl
    }
}

/// Point-in-time counts, safe to expose.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    /// Live records (not yet past TTL).
    pub active: usize,
    /// Live records holding a secret.
    pub armed: usize,
    /// Records past TTL that nobody has touched since.
    pub expired: usize,
}

/// Owns every session of one namespace.
pub struct SessionManager {
    prefix: String,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    sessions: Mutex<HashMap<SessionId, Session>>,
}

impl SessionManager {
    /// Create a manager using wall-clock time.
    ///
    /// # Arguments
    /// * `prefix` - Namespace prefix for minted ids (e.g. "session", "aave")
    /// * `ttl` - Lifetime of every session, measured from creation
    pub fn new(prefix: impl Into<String>, ttl: Duration) -> Self {
        Self::with_clock(prefix, ttl, Arc::new(SystemClock))
    }

    /// Create a manager with an injected time source.
    pub fn with_clock(prefix: impl Into<String>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            prefix: prefix.into(),
            ttl,
            clock,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Start a new, unarmed session for `public_address`.
    pub fn create_session(&self, public_address: &str) -> SessionId {
        let now = self.clock.now();
        let session_id = SessionId::mint(&self.prefix, public_address, now);

        let mut table = self.table();
        table.insert(
            session_id.clone(),
            Session {
                session_id: session_id.clone(),
                public_address: public_address.to_string(),
                created_at: now,
                secret: None,
            },
        );
        let live = table.len();
        drop(table);

        tracing::info!(
            namespace = %self.prefix,
            session_id = %session_id,
            address = %public_address,
            ttl_secs = self.ttl.as_secs(),
            "Session created"
        );
        metrics::record_session_event(&self.prefix, "created");
        metrics::record_live_sessions(&self.prefix, live);

        session_id
    }

    /// Attach `secret` to a live session.
    ///
    /// Returns `false` if the session is unknown or expired. An expired
    /// record is purged. A later call overwrites an earlier secret.
    pub fn add_secret(&self, session_id: &str, secret: Secret) -> bool {
        let now = self.clock.now();
        let mut table = self.table();

        match table.get(session_id).map(|s| s.is_expired_at(now, self.ttl)) {
            None => return false,
            Some(true) => {
                self.purge(&mut table, session_id, "expired");
                return false;
            }
            Some(false) => {}
        }

        if let Some(session) = table.get_mut(session_id) {
            if let Some(old) = session.secret.as_mut() {
                old.wipe();
            }
            session.secret = Some(secret);
        }
        drop(table);

        tracing::info!(namespace = %self.prefix, session_id = %session_id, "Secret attached to session");
        metrics::record_session_event(&self.prefix, "armed");
        true
    }

    /// Look up a live session.
    ///
    /// Expired records are purged and reported as absent.
    pub fn get_session(&self, session_id: &str) -> Option<Session> {
        let now = self.clock.now();
        let mut table = self.table();

        let expired = table.get(session_id)?.is_expired_at(now, self.ttl);
        if expired {
            self.purge(&mut table, session_id, "expired");
            return None;
        }

        table.get(session_id).cloned()
    }

    /// Remove a session, wiping its secret first. No-op if absent.
    pub fn clear_session(&self, session_id: &str) {
        let mut table = self.table();
        self.purge(&mut table, session_id, "cleared");
    }

    /// Purge every session past its TTL. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut table = self.table();

        let expired: Vec<SessionId> = table
            .values()
            .filter(|s| s.is_expired_at(now, self.ttl))
            .map(|s| s.session_id.clone())
            .collect();

        for session_id in &expired {
            self.purge(&mut table, session_id.as_str(), "expired");
        }

        if !expired.is_empty() {
            tracing::debug!(namespace = %self.prefix, purged = expired.len(), "Swept expired sessions");
        }
        expired.len()
    }

    /// Take the secret out of a session for one signing operation.
    ///
    /// The record leaves the table in the same critical section that checks
    /// it, so a second checkout of the id reports `NotFound` while the first
    /// guard is still alive. An unarmed session is left untouched so a key
    /// can still be attached.
    pub fn checkout(self: &Arc<Self>, session_id: &str) -> Result<ArmedSession, SessionError> {
        let now = self.clock.now();
        let mut table = self.table();

        match table
            .get(session_id)
            .map(|s| (s.is_expired_at(now, self.ttl), s.is_armed()))
        {
            None => return Err(SessionError::NotFound),
            Some((true, _)) => {
                self.purge(&mut table, session_id, "expired");
                return Err(SessionError::NotFound);
            }
            Some((false, false)) => return Err(SessionError::NotArmed),
            Some((false, true)) => {}
        }

        let mut session = table.remove(session_id).ok_or(SessionError::NotFound)?;
        let live = table.len();
        drop(table);

        let secret = session.secret.take().ok_or(SessionError::NotArmed)?;
        tracing::info!(namespace = %self.prefix, session_id = %session_id, "Secret checked out, session closed");
        metrics::record_session_event(&self.prefix, "checked_out");
        metrics::record_live_sessions(&self.prefix, live);

        Ok(ArmedSession::new(
            Arc::clone(self),
            session.session_id,
            session.public_address,
            secret,
        ))
    }

    /// Number of records currently held, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn summary(&self) -> SessionSummary {
        let now = self.clock.now();
        let table = self.table();

        let mut summary = SessionSummary::default();
        for session in table.values() {
            if session.is_expired_at(now, self.ttl) {
                summary.expired += 1;
            } else {
                summary.active += 1;
                if session.is_armed() {
                    summary.armed += 1;
                }
            }
        }
        summary
    }

    fn table(&self) -> MutexGuard<'_, HashMap<SessionId, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn purge(&self, table: &mut HashMap<SessionId, Session>, session_id: &str, reason: &'static str) {
        if let Some(session) = table.get_mut(session_id) {
            if let Some(secret) = session.secret.as_mut() {
                secret.wipe();
            }
            session.secret = None;
        }

        if table.remove(session_id).is_some() {
            tracing::info!(namespace = %self.prefix, session_id = %session_id, reason, "Session removed");
            metrics::record_session_event(&self.prefix, reason);
            metrics::record_live_sessions(&self.prefix, table.len());
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("prefix", &self.prefix)
            .field("ttl_secs", &self.ttl.as_secs())
            .field("sessions", &self.len())
            .finish()
    }
}
