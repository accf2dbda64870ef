//! Shared utilities for integration tests.

#![allow(dead_code)]

use alloy::primitives::{keccak256, U256};
use axum::{extract::State, routing::post, Json, Router};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

use celo_mcp::config::McpConfig;
use celo_mcp::session::{ManualClock, SessionManager};
use celo_mcp::tools::{ToolContext, AAVE_PREFIX, TRANSACTION_PREFIX};

/// Anvil's first account.
pub const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const TEST_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
pub const RECIPIENT: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

/// Latest block of the mock chain; it holds the one canned transfer.
pub const LATEST_BLOCK: u64 = 16;
/// Unix timestamp of [`LATEST_BLOCK`].
pub const BLOCK_TIMESTAMP: u64 = 1_700_000_000;

/// Hash of the canned 1 CELO transfer from [`TEST_ADDRESS`] to [`RECIPIENT`].
pub fn canned_tx_hash() -> String {
    format!("0x{}", "ab".repeat(32))
}

/// Canned chain state served by [`start_mock_rpc`].
#[derive(Clone)]
pub struct MockChain {
    pub native_balance: U256,
    pub token_balance: U256,
    /// Receipt status for any transaction without a planned outcome.
    pub receipt_status: bool,
    calls: Arc<Mutex<Vec<String>>>,
    plan: Arc<Mutex<VecDeque<bool>>>,
    statuses: Arc<Mutex<HashMap<String, bool>>>,
}

impl MockChain {
    pub fn new(native_balance: U256, token_balance: U256) -> Self {
        Self {
            native_balance,
            token_balance,
            receipt_status: true,
            calls: Arc::new(Mutex::new(Vec::new())),
            plan: Arc::new(Mutex::new(VecDeque::new())),
            statuses: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Receipt outcomes for the next broadcasts, in order. Broadcasts past
    /// the end of the plan fall back to `receipt_status`.
    pub fn with_receipt_plan(self, plan: &[bool]) -> Self {
        self.plan.lock().unwrap().extend(plan.iter().copied());
        self
    }

    fn record_broadcast(&self, hash: &str) {
        if let Some(status) = self.plan.lock().unwrap().pop_front() {
            self.statuses.lock().unwrap().insert(hash.to_string(), status);
        }
    }

    fn status_of(&self, hash: &str) -> bool {
        self.statuses
            .lock()
            .unwrap()
            .get(hash)
            .copied()
            .unwrap_or(self.receipt_status)
    }

    /// JSON-RPC methods received so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls().iter().filter(|m| *m == method).count()
    }
}

fn quantity(value: impl std::fmt::LowerHex) -> String {
    format!("0x{:x}", value)
}

fn word(value: U256) -> String {
    alloy::hex::encode_prefixed(value.to_be_bytes::<32>())
}

fn receipt(hash: &str, status: bool) -> Value {
    json!({
        "transactionHash": hash,
        "transactionIndex": "0x0",
        "blockHash": format!("0x{}", "11".repeat(32)),
        "blockNumber": "0x10",
        "from": TEST_ADDRESS,
        "to": RECIPIENT,
        "cumulativeGasUsed": "0x5208",
        "gasUsed": "0x5208",
        "effectiveGasPrice": "0x3b9aca00",
        "contractAddress": null,
        "logs": [],
        "logsBloom": format!("0x{}", "0".repeat(512)),
        "status": if status { "0x1" } else { "0x0" },
        "type": "0x0"
    })
}

fn canned_tx() -> Value {
    json!({
        "hash": canned_tx_hash(),
        "nonce": "0x7",
        "blockHash": block_hash(LATEST_BLOCK),
        "blockNumber": quantity(LATEST_BLOCK),
        "transactionIndex": "0x0",
        "from": TEST_ADDRESS,
        "to": RECIPIENT,
        "value": quantity(U256::from(10u64).pow(U256::from(18u64))),
        "gasPrice": "0x3b9aca00",
        "gas": "0x5208",
        "input": "0x",
        "v": quantity(44787u64 * 2 + 35),
        "r": format!("0x{}", "12".repeat(32)),
        "s": format!("0x{}", "34".repeat(32)),
        "type": "0x0",
        "chainId": quantity(44787u64)
    })
}

fn block_hash(number: u64) -> String {
    format!("0x{:064x}", 0xb10c_0000u64 + number)
}

fn block(number: u64, full: bool) -> Value {
    let transactions = if number == LATEST_BLOCK {
        if full {
            json!([canned_tx()])
        } else {
            json!([canned_tx_hash()])
        }
    } else {
        json!([])
    };
    let zero = format!("0x{}", "0".repeat(64));

    json!({
        "hash": block_hash(number),
        "parentHash": if number == 0 { zero.clone() } else { block_hash(number - 1) },
        "sha3Uncles": zero,
        "miner": RECIPIENT,
        "stateRoot": zero,
        "transactionsRoot": zero,
        "receiptsRoot": zero,
        "logsBloom": format!("0x{}", "0".repeat(512)),
        "difficulty": "0x0",
        "number": quantity(number),
        "gasLimit": quantity(30_000_000u64),
        "gasUsed": if number == LATEST_BLOCK { "0x5208" } else { "0x0" },
        "timestamp": quantity(BLOCK_TIMESTAMP - (LATEST_BLOCK - number) * 5),
        "extraData": "0x",
        "mixHash": zero,
        "nonce": "0x0000000000000000",
        "uncles": [],
        "transactions": transactions
    })
}

async fn handle_rpc(State(chain): State<MockChain>, Json(req): Json<Value>) -> Json<Value> {
    let method = req["method"].as_str().unwrap_or_default().to_string();
    chain.calls.lock().unwrap().push(method.clone());

    let result = match method.as_str() {
        "eth_chainId" => json!(quantity(44787u64)),
        "eth_blockNumber" => json!(quantity(LATEST_BLOCK)),
        "eth_gasPrice" => json!(quantity(1_000_000_000u64)),
        "eth_getTransactionCount" => json!("0x0"),
        "eth_getBalance" => json!(quantity(chain.native_balance)),
        "eth_call" => json!(word(chain.token_balance)),
        "eth_sendRawTransaction" => {
            let raw = req["params"][0].as_str().unwrap_or_default();
            let bytes = alloy::hex::decode(raw).unwrap_or_default();
            let hash = keccak256(bytes).to_string();
            chain.record_broadcast(&hash);
            json!(hash)
        }
        "eth_getTransactionReceipt" => {
            let hash = req["params"][0].as_str().unwrap_or_default();
            receipt(hash, chain.status_of(hash))
        }
        "eth_getBlockByNumber" => {
            let tag = req["params"][0].as_str().unwrap_or("latest");
            let full = req["params"][1].as_bool().unwrap_or(false);
            let number = match tag {
                "latest" | "pending" | "safe" | "finalized" => Some(LATEST_BLOCK),
                "earliest" => Some(0),
                hex => u64::from_str_radix(hex.trim_start_matches("0x"), 16).ok(),
            };
            match number {
                Some(n) if n <= LATEST_BLOCK => block(n, full),
                _ => Value::Null,
            }
        }
        "eth_getTransactionByHash" => {
            let hash = req["params"][0].as_str().unwrap_or_default();
            if hash.eq_ignore_ascii_case(&canned_tx_hash()) {
                canned_tx()
            } else {
                Value::Null
            }
        }
        other => {
            return Json(json!({
                "jsonrpc": "2.0",
                "id": req["id"],
                "error": { "code": -32601, "message": format!("unsupported: {}", other) }
            }))
        }
    };

    Json(json!({ "jsonrpc": "2.0", "id": req["id"], "result": result }))
}

/// Serve a fake JSON-RPC node on an ephemeral port. Returns its URL.
pub async fn start_mock_rpc(chain: MockChain) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().route("/", post(handle_rpc)).with_state(chain);

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    format!("http://{}", addr)
}

/// Config whose networks (both Celo networks) point at `rpc_url`.
pub fn config_for(rpc_url: &str) -> McpConfig {
    let mut config = McpConfig::default();
    config.networks.mainnet.public_rpc_url = rpc_url.to_string();
    config.networks.alfajores.public_rpc_url = rpc_url.to_string();
    config.blockchain.rpc_timeout_secs = 5;
    config.blockchain.receipt_timeout_secs = 10;
    config
}

/// Tool context whose session managers share a manual clock.
pub fn manual_context(config: McpConfig) -> (Arc<ToolContext>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(Duration::from_secs(1_700_000_000)));
    let ttl = Duration::from_secs(config.sessions.ttl_secs);
    let tx = Arc::new(SessionManager::with_clock(TRANSACTION_PREFIX, ttl, clock.clone()));
    let aave = Arc::new(SessionManager::with_clock(AAVE_PREFIX, ttl, clock.clone()));
    (Arc::new(ToolContext::with_managers(config, tx, aave)), clock)
}

/// Build a `tools/call` request line.
pub fn tool_call(id: u64, name: &str, arguments: Value) -> String {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": { "name": name, "arguments": arguments }
    })
    .to_string()
}

/// Decode the tool payload out of a `tools/call` response line.
pub fn tool_payload(response: &str) -> (Value, bool) {
    let resp: Value = serde_json::from_str(response).unwrap();
    let result = &resp["result"];
    let text = result["content"][0]["text"].as_str().unwrap();
    (serde_json::from_str(text).unwrap(), result["isError"].as_bool().unwrap())
}
