//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, env overrides)
//!     → validation.rs (semantic checks)
//!     → McpConfig (validated, immutable)
//!     → handed to the session managers, chain clients and tools
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the session TTL is fixed per manager
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, resolve_config, ConfigError};
pub use schema::McpConfig;
pub use schema::{
    AaveConfig, AdminConfig, BlockchainConfig, NetworkConfig, NetworksConfig,
    ObservabilityConfig, SessionConfig,
};
