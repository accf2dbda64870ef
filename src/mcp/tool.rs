//! Tool trait and errors shared by every MCP tool.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Errors that abort a tool call before it produces a payload.
///
/// Domain failures (bad address, expired session, reverted transaction) are
/// not errors here: tools report them as payloads with `success: false`.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments: {0}")]
    InvalidParams(String),
}

pub type ToolResult<T> = Result<T, ToolError>;

/// Base trait for all MCP tools.
#[async_trait]
pub trait McpTool: Send + Sync {
    /// Get the tool name/identifier.
    fn name(&self) -> &str;

    /// Get a human-readable description of this tool.
    fn description(&self) -> &str;

    /// Get the JSON schema for the tool's input arguments.
    fn input_schema(&self) -> Value;

    /// Execute the tool with the given arguments.
    async fn call(&self, args: Value) -> ToolResult<Value>;
}

/// Deserialize tool arguments, treating absent arguments as `{}`.
pub fn parse_args<T: DeserializeOwned>(args: Value) -> ToolResult<T> {
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args
    };
    serde_json::from_value(args).map_err(|e| ToolError::InvalidParams(e.to_string()))
}
