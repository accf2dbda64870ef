//! Time-boxed credential sessions.
//!
//! # Data Flow
//! ```text
//! create_transaction_session(address)
//!     → manager.rs (mint id, insert CREATED record)
//! add_private_key(session_id, key)
//!     → manager.rs (TTL check, attach secret → ARMED)
//! send_celo / supply_celo / ...
//!     → guard.rs (checkout: secret in hand)
//!     → drop(guard) → manager.rs clear_session → CLEARED
//! sweeper.rs
//!     → periodic sweep_expired() for records nobody looks up again
//! ```
//!
//! # Security Constraints
//! - Secrets live only in process memory, in zeroize-on-drop buffers
//! - Secrets are never logged; `Debug` output is redacted
//! - Expired and cleared ids are indistinguishable from unknown ids
//! - The TTL is absolute from creation, never refreshed by use

pub mod clock;
pub mod guard;
pub mod id;
pub mod manager;
pub mod secret;
pub mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use guard::{ArmedSession, SessionError};
pub use id::SessionId;
pub use manager::{Session, SessionManager, SessionSummary, DEFAULT_TTL_SECS};
pub use secret::Secret;
pub use sweeper::SessionSweeper;
