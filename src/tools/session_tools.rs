//! Session lifecycle tools, registered once per namespace.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use zeroize::Zeroize;

use super::response::{failure, success};
use super::{parse_address, SessionNamespace};
use crate::mcp::{parse_args, McpTool, ToolResult};
use crate::session::Secret;

/// Opens a session for a public address.
pub struct CreateSessionTool {
    ns: SessionNamespace,
    description: String,
}

impl CreateSessionTool {
    pub fn new(ns: SessionNamespace) -> Self {
        let description = format!(
            "Create a time-limited session for a Celo address. Attach a key with {} before signing.",
            ns.add_key_tool
        );
        Self { ns, description }
    }
}

#[derive(Deserialize)]
struct CreateArgs {
    address: String,
}

#[async_trait]
impl McpTool for CreateSessionTool {
    fn name(&self) -> &str {
        self.ns.create_tool
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "address": {
                    "type": "string",
                    "description": "Celo address the session is for"
                }
            },
            "required": ["address"]
        })
    }

    async fn call(&self, args: Value) -> ToolResult<Value> {
        let args: CreateArgs = parse_args(args)?;
        let address = match parse_address(&args.address, "address") {
            Ok(address) => address.to_checksum(None),
            Err(payload) => return Ok(payload),
        };

        let session_id = self.ns.manager.create_session(&address);

        Ok(success(json!({
            "session_id": session_id,
            "public_address": address,
            "expires_in_seconds": self.ns.manager.ttl().as_secs(),
            "message": format!(
                "Session created. Use this session_id with {} to enable transactions.",
                self.ns.add_key_tool
            )
        })))
    }
}

/// Attaches a private key to an open session.
pub struct AddPrivateKeyTool {
    ns: SessionNamespace,
    description: String,
}

impl AddPrivateKeyTool {
    pub fn new(ns: SessionNamespace) -> Self {
        let description = format!(
            "Add a private key to a session from {}. The key is held in memory until first use or expiry.",
            ns.create_tool
        );
        Self { ns, description }
    }
}

#[derive(Deserialize)]
struct AddKeyArgs {
    session_id: String,
    private_key: String,
}

/// Canonical `0x`-prefixed form of a hex key.
fn canonical_key(raw: &str) -> Secret {
    let trimmed = raw.trim();
    let hex = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    Secret::new(format!("0x{}", hex))
}

#[async_trait]
impl McpTool for AddPrivateKeyTool {
    fn name(&self) -> &str {
        self.ns.add_key_tool
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "session_id": { "type": "string" },
                "private_key": {
                    "type": "string",
                    "description": "Hex private key, with or without 0x prefix"
                }
            },
            "required": ["session_id", "private_key"]
        })
    }

    async fn call(&self, args: Value) -> ToolResult<Value> {
        let mut args: AddKeyArgs = parse_args(args)?;
        let secret = canonical_key(&args.private_key);
        args.private_key.zeroize();

        if !self.ns.manager.add_secret(&args.session_id, secret) {
            return Ok(failure(
                "Invalid or expired session ID. Please create a new session.",
            ));
        }

        Ok(success(json!({
            "message": "Private key added to session. You can now perform transactions until the session expires.",
            "warning": format!(
                "Your private key is held in memory and will be cleared after first use or {} seconds.",
                self.ns.manager.ttl().as_secs()
            )
        })))
    }
}

/// Drops a session and its key.
pub struct ClearSessionTool {
    ns: SessionNamespace,
}

impl ClearSessionTool {
    pub fn new(ns: SessionNamespace) -> Self {
        Self { ns }
    }
}

#[derive(Deserialize)]
struct ClearArgs {
    session_id: String,
}

#[async_trait]
impl McpTool for ClearSessionTool {
    fn name(&self) -> &str {
        self.ns.clear_tool
    }

    fn description(&self) -> &str {
        "Manually clear a session and the private key it holds"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "session_id": { "type": "string" }
            },
            "required": ["session_id"]
        })
    }

    async fn call(&self, args: Value) -> ToolResult<Value> {
        let args: ClearArgs = parse_args(args)?;

        if self.ns.manager.get_session(&args.session_id).is_none() {
            return Ok(failure("Invalid or expired session ID."));
        }
        self.ns.manager.clear_session(&args.session_id);

        Ok(success(json!({ "message": "Session cleared successfully." })))
    }
}
