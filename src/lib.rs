//! Celo MCP server library: time-boxed signing sessions and the tools that
//! consume them.

pub mod admin;
pub mod blockchain;
pub mod config;
pub mod lifecycle;
pub mod mcp;
pub mod observability;
pub mod session;
pub mod tools;

pub use config::schema::McpConfig;
pub use lifecycle::Shutdown;
pub use mcp::McpServer;
pub use session::SessionManager;
pub use tools::ToolContext;
