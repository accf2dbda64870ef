//! Model Context Protocol surface.
//!
//! # Data Flow
//! ```text
//! stdin line
//!     → server.rs (JSON-RPC framing, method dispatch)
//!     → tool.rs (McpTool::call with raw arguments)
//!     → protocol.rs (response encoding)
//!     → stdout line
//! ```

pub mod protocol;
pub mod server;
pub mod tool;

pub use server::McpServer;
pub use tool::{parse_args, McpTool, ToolError, ToolResult};
