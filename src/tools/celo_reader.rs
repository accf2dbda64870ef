//! Read-only chain queries: balances, tokens, blocks and transactions.
//! These never touch sessions.

use alloy::consensus::Transaction as _;
use alloy::eips::BlockNumberOrTag;
use alloy::primitives::{Address, TxHash};
use alloy::rpc::types::Transaction;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use super::response::{explorer_url, failure, success};
use super::{parse_address, ToolContext};
use crate::blockchain::contracts::{erc20_balance, known_tokens, StableToken};
use crate::blockchain::units::format_amount;
use crate::blockchain::{BlockchainClient, BlockchainError};
use crate::config::NetworkConfig;
use crate::mcp::{parse_args, McpTool, ToolResult};

const CELO_DECIMALS: u8 = 18;

const MAX_BLOCKS_TO_SCAN: u64 = 1000;
const MAX_TRANSACTIONS: usize = 50;

fn default_network() -> String {
    "mainnet".to_string()
}

fn network_property() -> Value {
    json!({ "type": "string", "enum": ["mainnet", "alfajores"], "default": "mainnet" })
}

/// Resolve a network and an address argument, or the failure payload to return.
fn resolve_target<'a>(
    ctx: &'a ToolContext,
    network: &str,
    address: &str,
) -> Result<(&'a NetworkConfig, Address), Value> {
    let network = ctx.network(network)?;
    let address = parse_address(address, "address")?;
    Ok((network, address))
}

/// Native CELO balance of any address.
pub struct GetCeloBalanceTool {
    ctx: Arc<ToolContext>,
}

impl GetCeloBalanceTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[derive(Deserialize)]
struct BalanceArgs {
    address: String,
    #[serde(default = "default_network")]
    network: String,
}

#[async_trait]
impl McpTool for GetCeloBalanceTool {
    fn name(&self) -> &str {
        "get_celo_balance"
    }

    fn description(&self) -> &str {
        "Get the native CELO balance of an address"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "address": { "type": "string" },
                "network": network_property()
            },
            "required": ["address"]
        })
    }

    async fn call(&self, args: Value) -> ToolResult<Value> {
        let args: BalanceArgs = parse_args(args)?;
        let network = match self.ctx.network(&args.network) {
            Ok(n) => n,
            Err(payload) => return Ok(payload),
        };
        let address = match parse_address(&args.address, "address") {
            Ok(a) => a,
            Err(payload) => return Ok(payload),
        };

        let balance = match self.ctx.client(network, false) {
            Ok(client) => client.get_balance(address).await,
            Err(e) => Err(e),
        };

        Ok(match balance {
            Ok(wei) => success(json!({
                "address": address.to_checksum(None),
                "network": args.network,
                "balance": format_amount(wei, CELO_DECIMALS),
                "balance_wei": wei.to_string(),
                "symbol": "CELO"
            })),
            Err(e) => failure(format!("Error fetching balance: {}", e)),
        })
    }
}

/// Latest block number of a network.
pub struct GetBlockNumberTool {
    ctx: Arc<ToolContext>,
}

impl GetBlockNumberTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[derive(Deserialize)]
struct BlockArgs {
    #[serde(default = "default_network")]
    network: String,
}

#[async_trait]
impl McpTool for GetBlockNumberTool {
    fn name(&self) -> &str {
        "get_celo_block_number"
    }

    fn description(&self) -> &str {
        "Get the latest block number"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "network": network_property()
            }
        })
    }

    async fn call(&self, args: Value) -> ToolResult<Value> {
        let args: BlockArgs = parse_args(args)?;
        let network = match self.ctx.network(&args.network) {
            Ok(n) => n,
            Err(payload) => return Ok(payload),
        };

        let block = match self.ctx.client(network, false) {
            Ok(client) => client.get_block_number().await,
            Err(e) => Err(e),
        };

        Ok(match block {
            Ok(number) => success(json!({ "network": args.network, "block_number": number })),
            Err(e) => failure(format!("Error fetching block number: {}", e)),
        })
    }
}

/// CELO plus the cUSD and cEUR stablecoin balances of an address.
pub struct GetCeloBalancesTool {
    ctx: Arc<ToolContext>,
}

impl GetCeloBalancesTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl McpTool for GetCeloBalancesTool {
    fn name(&self) -> &str {
        "get_celo_balances"
    }

    fn description(&self) -> &str {
        "Get CELO, cUSD and cEUR balances of an address"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "address": { "type": "string" },
                "network": network_property()
            },
            "required": ["address"]
        })
    }

    async fn call(&self, args: Value) -> ToolResult<Value> {
        let args: BalanceArgs = parse_args(args)?;
        let (network, address) = match resolve_target(&self.ctx, &args.network, &args.address) {
            Ok(target) => target,
            Err(payload) => return Ok(payload),
        };
        let client = match self.ctx.client(network, false) {
            Ok(client) => client,
            Err(e) => return Ok(failure(format!("Error checking balances: {}", e))),
        };

        // Each balance is reported on its own; one failing read does not hide the others
        let mut fields = Map::new();
        match client.get_balance(address).await {
            Ok(wei) => fields.insert("CELO".into(), json!(format_amount(wei, CELO_DECIMALS))),
            Err(e) => fields.insert("CELO_error".into(), json!(e.to_string())),
        };
        for token in [StableToken::CUsd, StableToken::CEur] {
            let symbol = token.symbol();
            let Some(token_address) = token.address(network.chain_id) else {
                fields.insert(format!("{}_error", symbol), json!("Not deployed on this network"));
                continue;
            };
            match erc20_balance(&client, token_address, address).await {
                Ok(units) => fields.insert(symbol.into(), json!(format_amount(units, CELO_DECIMALS))),
                Err(e) => fields.insert(format!("{}_error", symbol), json!(e.to_string())),
            };
        }

        let checksummed = address.to_checksum(None);
        fields.insert("address".into(), json!(checksummed));
        fields.insert("network".into(), json!(args.network));
        fields.insert(
            "block_explorer_url".into(),
            json!(explorer_url(&network.explorer_address_url, &checksummed)),
        );
        Ok(success(Value::Object(fields)))
    }
}

/// Balances of every known ERC-20 token on a network.
pub struct GetTokenListTool {
    ctx: Arc<ToolContext>,
}

impl GetTokenListTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl McpTool for GetTokenListTool {
    fn name(&self) -> &str {
        "get_celo_token_list"
    }

    fn description(&self) -> &str {
        "List the known Celo tokens held by an address, with balances"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "address": { "type": "string" },
                "network": network_property()
            },
            "required": ["address"]
        })
    }

    async fn call(&self, args: Value) -> ToolResult<Value> {
        let args: BalanceArgs = parse_args(args)?;
        let (network, address) = match resolve_target(&self.ctx, &args.network, &args.address) {
            Ok(target) => target,
            Err(payload) => return Ok(payload),
        };
        let client = match self.ctx.client(network, false) {
            Ok(client) => client,
            Err(e) => return Ok(failure(format!("Error getting token list: {}", e))),
        };

        let mut tokens = Vec::new();
        for token in known_tokens(network.chain_id) {
            let mut entry = json!({
                "name": token.name,
                "symbol": token.symbol,
                "address": token.address.to_checksum(None),
                "decimals": token.decimals
            });
            match erc20_balance(&client, token.address, address).await {
                Ok(units) => {
                    entry["balance"] = json!(format_amount(units, token.decimals));
                    entry["balance_raw"] = json!(units.to_string());
                }
                Err(e) => entry["error"] = json!(e.to_string()),
            }
            tokens.push(entry);
        }

        let checksummed = address.to_checksum(None);
        Ok(success(json!({
            "address": checksummed,
            "network": args.network,
            "token_count": tokens.len(),
            "tokens": tokens,
            "block_explorer_url": explorer_url(&network.explorer_address_url, &checksummed)
        })))
    }
}

/// Recent transactions touching an address, found by scanning blocks.
pub struct GetTransactionsTool {
    ctx: Arc<ToolContext>,
}

impl GetTransactionsTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

fn default_blocks_to_scan() -> u64 {
    100
}

fn default_max_count() -> usize {
    10
}

#[derive(Deserialize)]
struct TransactionsArgs {
    address: String,
    #[serde(default = "default_blocks_to_scan")]
    blocks_to_scan: u64,
    #[serde(default = "default_max_count")]
    max_count: usize,
    #[serde(default = "default_network")]
    network: String,
}

/// Receipt outcome of a scanned transaction: status label and gas used.
async fn receipt_summary(client: &BlockchainClient, hash: TxHash) -> (&'static str, Option<u64>) {
    match client.get_transaction_receipt(hash).await {
        Ok(Some(receipt)) => {
            let status = if receipt.status() { "Success" } else { "Failed" };
            (status, Some(receipt.gas_used))
        }
        _ => ("Unknown", None),
    }
}

#[async_trait]
impl McpTool for GetTransactionsTool {
    fn name(&self) -> &str {
        "get_celo_transactions"
    }

    fn description(&self) -> &str {
        "Get recent transactions sent from or to an address by scanning the latest blocks"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "address": { "type": "string" },
                "blocks_to_scan": { "type": "integer", "minimum": 1, "maximum": MAX_BLOCKS_TO_SCAN, "default": 100 },
                "max_count": { "type": "integer", "minimum": 1, "maximum": MAX_TRANSACTIONS, "default": 10 },
                "network": network_property()
            },
            "required": ["address"]
        })
    }

    async fn call(&self, args: Value) -> ToolResult<Value> {
        let args: TransactionsArgs = parse_args(args)?;
        let (network, address) = match resolve_target(&self.ctx, &args.network, &args.address) {
            Ok(target) => target,
            Err(payload) => return Ok(payload),
        };
        if !(1..=MAX_BLOCKS_TO_SCAN).contains(&args.blocks_to_scan) {
            return Ok(failure(format!("blocks_to_scan must be between 1 and {}", MAX_BLOCKS_TO_SCAN)));
        }
        if !(1..=MAX_TRANSACTIONS).contains(&args.max_count) {
            return Ok(failure(format!("max_count must be between 1 and {}", MAX_TRANSACTIONS)));
        }

        let scanned = async {
            let client = self.ctx.client(network, false)?;
            let latest = client.get_block_number().await?;
            Ok::<_, BlockchainError>((client, latest))
        }
        .await;
        let (client, latest) = match scanned {
            Ok(pair) => pair,
            Err(e) => return Ok(failure(format!("Error scanning blocks: {}", e))),
        };

        let scan_blocks = args.blocks_to_scan.min(latest);
        let mut transactions = Vec::new();

        'blocks: for number in (latest - scan_blocks + 1..=latest).rev() {
            let block = match client.get_block(BlockNumberOrTag::Number(number), true).await {
                Ok(Some(block)) => block,
                Ok(None) => continue,
                Err(e) => {
                    tracing::debug!(block = number, error = %e, "Skipping unreadable block");
                    continue;
                }
            };

            let timestamp = block.header.inner.timestamp;
            for tx in block.transactions.as_transactions().unwrap_or(&[]) {
                let from = tx.inner.signer();
                if from != address && tx.to() != Some(address) {
                    continue;
                }

                let hash = *tx.inner.tx_hash();
                let (status, gas_used) = receipt_summary(&client, hash).await;
                transactions.push(json!({
                    "hash": hash.to_string(),
                    "block_number": tx.block_number.unwrap_or(number),
                    "from": from.to_checksum(None),
                    "to": tx.to().map(|to| to.to_checksum(None)),
                    "value": format_amount(tx.value(), CELO_DECIMALS),
                    "timestamp": timestamp,
                    "gas_used": gas_used,
                    "status": status,
                    "tx_explorer_url": explorer_url(&network.explorer_tx_url, hash)
                }));

                if transactions.len() >= args.max_count {
                    break 'blocks;
                }
            }
        }

        let checksummed = address.to_checksum(None);
        Ok(success(json!({
            "address": checksummed,
            "network": args.network,
            "latest_block": latest,
            "blocks_scanned": scan_blocks,
            "transactions_found": transactions.len(),
            "transactions": transactions,
            "block_explorer_url": explorer_url(&network.explorer_address_url, &checksummed)
        })))
    }
}

/// Header summary and transaction hashes of one block.
pub struct GetBlockInfoTool {
    ctx: Arc<ToolContext>,
}

impl GetBlockInfoTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[derive(Deserialize)]
struct BlockInfoArgs {
    #[serde(default)]
    block_number: Option<u64>,
    #[serde(default = "default_network")]
    network: String,
}

#[async_trait]
impl McpTool for GetBlockInfoTool {
    fn name(&self) -> &str {
        "get_celo_block_info"
    }

    fn description(&self) -> &str {
        "Get information about a block (default: latest)"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "block_number": { "type": "integer", "description": "Block to query, latest if omitted" },
                "network": network_property()
            }
        })
    }

    async fn call(&self, args: Value) -> ToolResult<Value> {
        let args: BlockInfoArgs = parse_args(args)?;
        let network = match self.ctx.network(&args.network) {
            Ok(n) => n,
            Err(payload) => return Ok(payload),
        };
        let tag = args
            .block_number
            .map(BlockNumberOrTag::Number)
            .unwrap_or(BlockNumberOrTag::Latest);

        let block = match self.ctx.client(network, false) {
            Ok(client) => client.get_block(tag, false).await,
            Err(e) => Err(e),
        };

        Ok(match block {
            Ok(Some(block)) => {
                let header = &block.header;
                let hashes: Vec<String> = block.transactions.hashes().map(|h| h.to_string()).collect();
                success(json!({
                    "network": args.network,
                    "number": header.inner.number,
                    "hash": header.hash.to_string(),
                    "parent_hash": header.inner.parent_hash.to_string(),
                    "timestamp": header.inner.timestamp,
                    "miner": header.inner.beneficiary.to_checksum(None),
                    "gas_used": header.inner.gas_used,
                    "gas_limit": header.inner.gas_limit,
                    "transaction_count": hashes.len(),
                    "transactions": hashes
                }))
            }
            Ok(None) => failure(format!(
                "Block not found: {}",
                args.block_number.map_or_else(|| "latest".to_string(), |n| n.to_string())
            )),
            Err(e) => failure(format!("Error fetching block info: {}", e)),
        })
    }
}

/// Details of one transaction by hash.
pub struct GetTransactionTool {
    ctx: Arc<ToolContext>,
}

impl GetTransactionTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[derive(Deserialize)]
struct TransactionArgs {
    tx_hash: String,
    #[serde(default = "default_network")]
    network: String,
}

/// Parse a `0x`-prefixed 32-byte transaction hash.
fn parse_tx_hash(raw: &str) -> Option<TxHash> {
    let raw = raw.trim();
    if !raw.starts_with("0x") || raw.len() != 66 {
        return None;
    }
    raw.parse().ok()
}

fn transaction_fields(tx: &Transaction) -> Value {
    let value = tx.value();
    json!({
        "hash": tx.inner.tx_hash().to_string(),
        "from": tx.inner.signer().to_checksum(None),
        "to": tx.to().map(|to| to.to_checksum(None)),
        "value": value.to_string(),
        "value_celo": format_amount(value, CELO_DECIMALS),
        "gas": tx.gas_limit(),
        "gas_price": tx.gas_price().or(tx.effective_gas_price).map(|p| p.to_string()),
        "nonce": tx.nonce(),
        "block_number": tx.block_number,
        "block_hash": tx.block_hash.map(|h| h.to_string()),
        "transaction_index": tx.transaction_index
    })
}

#[async_trait]
impl McpTool for GetTransactionTool {
    fn name(&self) -> &str {
        "get_celo_transaction"
    }

    fn description(&self) -> &str {
        "Get details of a transaction by hash"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "tx_hash": { "type": "string", "description": "0x-prefixed transaction hash" },
                "network": network_property()
            },
            "required": ["tx_hash"]
        })
    }

    async fn call(&self, args: Value) -> ToolResult<Value> {
        let args: TransactionArgs = parse_args(args)?;
        let network = match self.ctx.network(&args.network) {
            Ok(n) => n,
            Err(payload) => return Ok(payload),
        };
        let Some(hash) = parse_tx_hash(&args.tx_hash) else {
            return Ok(failure(format!("Invalid transaction hash format: {}", args.tx_hash)));
        };

        let tx = match self.ctx.client(network, false) {
            Ok(client) => client.get_transaction(hash).await,
            Err(e) => Err(e),
        };

        Ok(match tx {
            Ok(Some(tx)) => {
                let mut fields = transaction_fields(&tx);
                fields["network"] = json!(args.network);
                fields["explorer_url"] = json!(explorer_url(&network.explorer_tx_url, hash));
                success(fields)
            }
            Ok(None) => failure(format!("Transaction not found: {}", args.tx_hash)),
            Err(e) => failure(format!("Error fetching transaction: {}", e)),
        })
    }
}
