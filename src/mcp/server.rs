//! MCP server: newline-delimited JSON-RPC over stdio.
//!
//! stdout carries protocol frames only; all logging goes to stderr.
//! Each request runs on its own task, so a slow tool call does not hold up
//! other requests. Responses are written as they complete and may arrive out
//! of order; clients match them by id.

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinSet;

use crate::mcp::protocol::{
    JsonRpcRequest, JsonRpcResponse, McpToolDef, ToolCallParams, ToolCallResult, INVALID_PARAMS,
    INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR, PROTOCOL_VERSION,
};
use crate::mcp::tool::{McpTool, ToolError};
use crate::observability::metrics;

/// Dispatches JSON-RPC requests to registered tools. Cloning is cheap.
#[derive(Clone)]
pub struct McpServer {
    tools: Arc<[Arc<dyn McpTool>]>,
}

impl McpServer {
    pub fn new(tools: Vec<Arc<dyn McpTool>>) -> Self {
        Self { tools: tools.into() }
    }

    /// Names of the registered tools, in registration order.
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Serve requests from stdin until EOF or shutdown.
    pub async fn serve_stdio(&self, shutdown: broadcast::Receiver<()>) -> std::io::Result<()> {
        tracing::info!(tools = self.tools.len(), "MCP server listening on stdio");
        self.run(BufReader::new(tokio::io::stdin()), tokio::io::stdout(), shutdown)
            .await
    }

    /// Serve requests from `reader`, writing one response line per request.
    ///
    /// On EOF the loop waits for in-flight requests and writes their
    /// responses. On shutdown in-flight requests are aborted.
    pub async fn run<R, W>(
        &self,
        reader: R,
        mut writer: W,
        mut shutdown: broadcast::Receiver<()>,
    ) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        let (responses_tx, mut responses) = mpsc::unbounded_channel::<String>();
        let mut in_flight = JoinSet::new();
        let mut reading = true;

        loop {
            tokio::select! {
                line = lines.next_line(), if reading => {
                    match line? {
                        None => {
                            tracing::info!(in_flight = in_flight.len(), "Input closed, stopping MCP server");
                            reading = false;
                        }
                        Some(line) if line.trim().is_empty() => {}
                        Some(line) => {
                            let server = self.clone();
                            let tx = responses_tx.clone();
                            in_flight.spawn(async move {
                                if let Some(response) = server.handle_message(&line).await {
                                    let _ = tx.send(response);
                                }
                            });
                        }
                    }
                }
                Some(response) = responses.recv() => {
                    write_line(&mut writer, &response).await?;
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!(error = %e, "Request task failed");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!(aborted = in_flight.len(), "MCP server received shutdown signal");
                    return Ok(());
                }
            }

            if !reading && in_flight.is_empty() {
                break;
            }
        }

        // Every task has finished, so everything it sent is already queued
        while let Ok(response) = responses.try_recv() {
            write_line(&mut writer, &response).await?;
        }
        Ok(())
    }

    /// Handle one incoming message. Returns `None` for notifications.
    pub async fn handle_message(&self, message: &str) -> Option<String> {
        let response = match serde_json::from_str::<Value>(message) {
            Err(e) => {
                tracing::warn!(error = %e, "Unparseable MCP message");
                Some(JsonRpcResponse::failure(
                    Value::Null,
                    PARSE_ERROR,
                    format!("Parse error: {}", e),
                ))
            }
            Ok(raw) => {
                let id = raw.get("id").cloned();
                match serde_json::from_value::<JsonRpcRequest>(raw) {
                    Ok(request) => self.dispatch(request).await,
                    Err(e) => Some(JsonRpcResponse::failure(
                        id.unwrap_or(Value::Null),
                        INVALID_REQUEST,
                        format!("Invalid request: {}", e),
                    )),
                }
            }
        };

        response.and_then(|r| serde_json::to_string(&r).ok())
    }

    async fn dispatch(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id else {
            tracing::debug!(method = %request.method, "Notification received");
            return None;
        };

        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(id, self.initialize_result()),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, self.list_tools()),
            "tools/call" => self.call_tool(id, request.params).await,
            method => {
                tracing::warn!(method, "Unknown method");
                JsonRpcResponse::failure(id, METHOD_NOT_FOUND, format!("Method not found: {}", method))
            }
        };
        Some(response)
    }

    fn initialize_result(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": { "listChanged": false }
            },
            "serverInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION")
            }
        })
    }

    fn list_tools(&self) -> Value {
        let tools: Vec<McpToolDef> = self
            .tools
            .iter()
            .map(|t| McpToolDef {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.input_schema(),
            })
            .collect();
        json!({ "tools": tools })
    }

    async fn call_tool(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let params: ToolCallParams = match params.map(serde_json::from_value) {
            Some(Ok(p)) => p,
            Some(Err(e)) => {
                return JsonRpcResponse::failure(id, INVALID_PARAMS, format!("Invalid params: {}", e))
            }
            None => return JsonRpcResponse::failure(id, INVALID_PARAMS, "Missing params"),
        };

        let Some(tool) = self.tools.iter().find(|t| t.name() == params.name) else {
            let err = ToolError::UnknownTool(params.name);
            return JsonRpcResponse::failure(id, INVALID_PARAMS, err.to_string());
        };

        // Arguments may carry key material; only the tool name is logged
        tracing::info!(tool = %params.name, "Tool call");
        let start = Instant::now();

        match tool.call(params.arguments).await {
            Ok(payload) => {
                let is_error = payload.get("success") == Some(&Value::Bool(false));
                metrics::record_tool_call(&params.name, !is_error, start);
                let result = ToolCallResult::text(&payload, is_error);
                match serde_json::to_value(result) {
                    Ok(value) => JsonRpcResponse::success(id, value),
                    Err(e) => JsonRpcResponse::failure(id, INVALID_PARAMS, e.to_string()),
                }
            }
            Err(e) => {
                metrics::record_tool_call(&params.name, false, start);
                tracing::warn!(tool = %params.name, error = %e, "Tool call rejected");
                JsonRpcResponse::failure(id, INVALID_PARAMS, e.to_string())
            }
        }
    }
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> std::io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

impl std::fmt::Debug for McpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpServer")
            .field("tools", &self.tool_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Shutdown;
    use crate::mcp::tool::{parse_args, ToolResult};
    use async_trait::async_trait;
    use serde::Deserialize;

    struct EchoTool;

    /// Holds its call open until released.
    struct GateTool {
        gate: Arc<tokio::sync::Notify>,
    }

    #[async_trait]
    impl McpTool for GateTool {
        fn name(&self) -> &str {
            "gate"
        }

        fn description(&self) -> &str {
            "Wait until released"
        }

        fn input_schema(&self) -> Value {
            json!({ "type": "object" })
        }

        async fn call(&self, _args: Value) -> ToolResult<Value> {
            self.gate.notified().await;
            Ok(json!({ "success": true, "released": true }))
        }
    }

    #[derive(Deserialize)]
    struct EchoArgs {
        text: String,
        #[serde(default)]
        fail: bool,
    }

    #[async_trait]
    impl McpTool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo text back"
        }

        fn input_schema(&self) -> Value {
            json!({
                "type": "object",
                "properties": { "text": { "type": "string" } },
                "required": ["text"]
            })
        }

        async fn call(&self, args: Value) -> ToolResult<Value> {
            let args: EchoArgs = parse_args(args)?;
            Ok(json!({ "success": !args.fail, "text": args.text }))
        }
    }

    fn server() -> McpServer {
        McpServer::new(vec![Arc::new(EchoTool)])
    }

    async fn roundtrip(server: &McpServer, msg: Value) -> Value {
        let resp = server.handle_message(&msg.to_string()).await.unwrap();
        serde_json::from_str(&resp).unwrap()
    }

    #[tokio::test]
    async fn test_initialize() {
        let resp = roundtrip(&server(), json!({"jsonrpc":"2.0","id":1,"method":"initialize","params":{}})).await;
        assert_eq!(resp["id"], 1);
        assert_eq!(resp["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert!(resp["result"]["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn test_notification_has_no_response() {
        let msg = json!({"jsonrpc":"2.0","method":"notifications/initialized"});
        assert!(server().handle_message(&msg.to_string()).await.is_none());
    }

    #[tokio::test]
    async fn test_tools_list() {
        let resp = roundtrip(&server(), json!({"jsonrpc":"2.0","id":2,"method":"tools/list"})).await;
        let tools = resp["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], "echo");
        assert_eq!(tools[0]["inputSchema"]["required"][0], "text");
    }

    #[tokio::test]
    async fn test_tools_call_success_and_failure() {
        let server = server();
        let ok = roundtrip(
            &server,
            json!({"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"echo","arguments":{"text":"hi"}}}),
        )
        .await;
        assert_eq!(ok["result"]["isError"], false);
        assert!(ok["result"]["content"][0]["text"].as_str().unwrap().contains("hi"));

        let failed = roundtrip(
            &server,
            json!({"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"echo","arguments":{"text":"x","fail":true}}}),
        )
        .await;
        assert_eq!(failed["result"]["isError"], true);
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let server = server();

        let resp = server.handle_message("{not json").await.unwrap();
        let resp: Value = serde_json::from_str(&resp).unwrap();
        assert_eq!(resp["error"]["code"], PARSE_ERROR);
        assert!(resp["id"].is_null());

        let resp = roundtrip(&server, json!({"jsonrpc":"2.0","id":5,"method":"resources/list"})).await;
        assert_eq!(resp["error"]["code"], METHOD_NOT_FOUND);

        let resp = roundtrip(
            &server,
            json!({"jsonrpc":"2.0","id":6,"method":"tools/call","params":{"name":"nope"}}),
        )
        .await;
        assert_eq!(resp["error"]["code"], INVALID_PARAMS);
        assert!(resp["error"]["message"].as_str().unwrap().contains("nope"));

        let resp = roundtrip(
            &server,
            json!({"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"echo","arguments":{}}}),
        )
        .await;
        assert_eq!(resp["error"]["code"], INVALID_PARAMS);

        let resp = roundtrip(&server, json!({"jsonrpc":"2.0","id":8})).await;
        assert_eq!(resp["error"]["code"], INVALID_REQUEST);
        assert_eq!(resp["id"], 8);
    }

    #[tokio::test]
    async fn test_run_loop_writes_one_line_per_request() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
            "\n"
        );
        let shutdown = Shutdown::new();
        let mut output: Vec<u8> = Vec::new();

        server()
            .run(input.as_bytes(), &mut output, shutdown.subscribe())
            .await
            .unwrap();

        let text = String::from_utf8(output).unwrap();
        let mut responses: Vec<Value> = text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(responses.len(), 2);
        responses.sort_by_key(|r| r["id"].as_u64());
        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[0]["result"], json!({}));
        assert_eq!(responses[1]["id"], 2);
    }

    #[tokio::test]
    async fn test_slow_call_does_not_block_others() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let server = McpServer::new(vec![Arc::new(EchoTool), Arc::new(GateTool { gate: gate.clone() })]);
        let shutdown = Shutdown::new();

        let (mut client, server_io) = tokio::io::duplex(4096);
        let (server_read, server_write) = tokio::io::split(server_io);
        let serving = tokio::spawn(async move {
            server
                .run(BufReader::new(server_read), server_write, shutdown.subscribe())
                .await
        });

        let requests = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"gate","arguments":{}}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"echo","arguments":{"text":"hi"}}}"#,
            "\n"
        );
        client.write_all(requests.as_bytes()).await.unwrap();

        let (client_read, mut client_write) = tokio::io::split(client);
        let mut responses = BufReader::new(client_read).lines();

        // The echo answer arrives while the gate call is still pending
        let first: Value = serde_json::from_str(&responses.next_line().await.unwrap().unwrap()).unwrap();
        assert_eq!(first["id"], 2);

        gate.notify_one();
        let second: Value = serde_json::from_str(&responses.next_line().await.unwrap().unwrap()).unwrap();
        assert_eq!(second["id"], 1);
        assert!(second["result"]["content"][0]["text"].as_str().unwrap().contains("released"));

        client_write.shutdown().await.unwrap();
        serving.await.unwrap().unwrap();
    }
}
