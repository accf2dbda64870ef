//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → MCP loop, sweeper and admin API stop → exit
//! ```
//!
//! EOF on stdin also ends the MCP loop, which triggers the same shutdown.

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
