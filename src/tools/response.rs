//! Tool payload helpers.
//!
//! Every tool answers with a JSON object carrying a `success` flag; the
//! dispatcher maps `success: false` to `isError: true`.

use serde_json::{json, Map, Value};

use crate::session::SessionError;

/// Successful payload: `fields` plus `success: true`.
pub fn success(fields: Value) -> Value {
    with_flag(fields, true)
}

/// Failed payload with an error message.
pub fn failure(error: impl Into<String>) -> Value {
    json!({ "success": false, "error": error.into() })
}

/// Failed payload with extra context fields.
pub fn failure_with(error: impl Into<String>, fields: Value) -> Value {
    let mut payload = with_flag(fields, false);
    if let Value::Object(map) = &mut payload {
        map.insert("error".into(), Value::String(error.into()));
    }
    payload
}

/// Failure reported after a secret was checked out; the session is gone.
pub fn failure_cleared(error: impl Into<String>) -> Value {
    failure_with(error, json!({ "session_cleared": true }))
}

/// Failure for a session that could not be checked out.
///
/// `key_tool` names the tool that attaches a key in this namespace.
pub fn session_failure(err: SessionError, key_tool: &str) -> Value {
    match err {
        SessionError::NotFound => failure("Invalid or expired session ID. Please create a new session."),
        SessionError::NotArmed => failure(format!(
            "No private key added to this session. Use {} first.",
            key_tool
        )),
    }
}

/// Transaction explorer link.
pub fn explorer_url(prefix: &str, tx_hash: impl std::fmt::Display) -> String {
    format!("{}{}", prefix, tx_hash)
}

fn with_flag(fields: Value, flag: bool) -> Value {
    let mut map = match fields {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("result".into(), other);
            map
        }
    };
    map.insert("success".into(), Value::Bool(flag));
    Value::Object(map)
}
