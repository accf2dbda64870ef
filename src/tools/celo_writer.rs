//! Celo write tools: native transfers, stablecoin transfers, message signing.

use alloy::primitives::{eip191_hash_message, Address, Bytes, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::response::{explorer_url, failure, failure_cleared, session_failure, success};
use super::{parse_address, session_wallet, ToolContext};
use crate::blockchain::contracts::{erc20_balance, StableToken, IERC20};
use crate::blockchain::units::{format_amount, parse_amount};
use crate::blockchain::{BlockchainError, TxBuilder};
use crate::config::NetworkConfig;
use crate::mcp::{parse_args, McpTool, ToolResult};
use crate::session::ArmedSession;

const NATIVE_TRANSFER_GAS: u64 = 21_000;
const TOKEN_TRANSFER_GAS: u64 = 100_000;
const DECIMALS: u8 = 18;

fn default_network() -> String {
    "mainnet".to_string()
}

fn default_token() -> String {
    "cUSD".to_string()
}

/// Validated transfer inputs, resolved before the session is touched.
struct Transfer<'a> {
    network_name: String,
    network: &'a NetworkConfig,
    to: Address,
    amount: f64,
    value: U256,
    use_alchemy: bool,
}

fn network_schema() -> Value {
    json!({
        "type": "string",
        "enum": ["mainnet", "alfajores"],
        "default": "mainnet"
    })
}

/// Sends native CELO.
pub struct SendCeloTool {
    ctx: Arc<ToolContext>,
}

impl SendCeloTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }

    async fn transfer(&self, armed: &ArmedSession, t: &Transfer<'_>) -> Result<Value, Value> {
        let wallet = session_wallet(armed, t.network.chain_id)?;
        let fail = |e: BlockchainError| failure_cleared(format!("Error sending CELO: {}", e));

        let client = self.ctx.client(t.network, t.use_alchemy).map_err(fail)?;
        let balance = client.get_balance(wallet.address()).await.map_err(fail)?;
        if t.value > balance {
            return Err(failure_cleared(format!(
                "Insufficient balance: {} CELO available, trying to send {} CELO",
                format_amount(balance, DECIMALS),
                t.amount
            )));
        }

        let builder = TxBuilder::new(&client, &wallet);
        let tx = builder
            .build(t.to, t.value, Bytes::new(), NATIVE_TRANSFER_GAS)
            .await
            .map_err(fail)?;
        let hash = builder.send(tx).await.map_err(fail)?;

        tracing::info!(session_id = %armed.session_id(), tx_hash = %hash, network = %t.network_name, "CELO transfer sent");

        Ok(success(json!({
            "transaction_hash": hash.to_string(),
            "from": wallet.address().to_checksum(None),
            "to": t.to.to_checksum(None),
            "amount": t.amount,
            "network": t.network_name,
            "explorer_url": explorer_url(&t.network.explorer_tx_url, hash),
            "session_cleared": true,
            "message": "Transaction sent successfully. Session has been cleared for security."
        })))
    }
}

#[derive(Deserialize)]
struct SendCeloArgs {
    session_id: String,
    to_address: String,
    amount: f64,
    #[serde(default = "default_network")]
    network: String,
    #[serde(default)]
    use_alchemy: bool,
}

/// Resolve network, recipient and amount, or the failure payload to return.
fn prepare_transfer<'a>(
    ctx: &'a ToolContext,
    network: &str,
    to_address: &str,
    amount: f64,
    decimals: u8,
    use_alchemy: bool,
) -> Result<Transfer<'a>, Value> {
    let resolved = ctx.network(network)?;
    let to = parse_address(to_address, "recipient address")?;
    let value = parse_amount(amount, decimals).map_err(|e| failure(e.to_string()))?;
    if value.is_zero() {
        return Err(failure("Amount must be greater than zero"));
    }

    Ok(Transfer {
        network_name: network.to_string(),
        network: resolved,
        to,
        amount,
        value,
        use_alchemy,
    })
}

#[async_trait]
impl McpTool for SendCeloTool {
    fn name(&self) -> &str {
        "send_celo"
    }

    fn description(&self) -> &str {
        "Send native CELO from the session's address. Clears the session."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "session_id": { "type": "string" },
                "to_address": { "type": "string", "description": "Recipient address" },
                "amount": { "type": "number", "description": "Amount of CELO" },
                "network": network_schema(),
                "use_alchemy": { "type": "boolean", "default": false }
            },
            "required": ["session_id", "to_address", "amount"]
        })
    }

    async fn call(&self, args: Value) -> ToolResult<Value> {
        let args: SendCeloArgs = parse_args(args)?;
        let transfer = match prepare_transfer(
            &self.ctx,
            &args.network,
            &args.to_address,
            args.amount,
            DECIMALS,
            args.use_alchemy,
        ) {
            Ok(t) => t,
            Err(payload) => return Ok(payload),
        };

        let ns = self.ctx.transactions();
        let armed = match ns.manager.checkout(&args.session_id) {
            Ok(armed) => armed,
            Err(e) => return Ok(session_failure(e, ns.add_key_tool)),
        };

        let outcome = self.transfer(&armed, &transfer).await;
        drop(armed);
        Ok(outcome.unwrap_or_else(|payload| payload))
    }
}

/// Sends cUSD or cEUR.
pub struct SendCeloTokenTool {
    ctx: Arc<ToolContext>,
}

impl SendCeloTokenTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }

    async fn transfer(
        &self,
        armed: &ArmedSession,
        t: &Transfer<'_>,
        token: StableToken,
        token_address: Address,
    ) -> Result<Value, Value> {
        let wallet = session_wallet(armed, t.network.chain_id)?;
        let fail = |e: BlockchainError| {
            failure_cleared(format!("Error sending {}: {}", token.symbol(), e))
        };

        let client = self.ctx.client(t.network, t.use_alchemy).map_err(fail)?;
        let balance = erc20_balance(&client, token_address, wallet.address())
            .await
            .map_err(fail)?;
        if t.value > balance {
            return Err(failure_cleared(format!(
                "Insufficient balance: {} {} available, trying to send {} {}",
                format_amount(balance, DECIMALS),
                token.symbol(),
                t.amount,
                token.symbol()
            )));
        }

        let data = IERC20::transferCall {
            to: t.to,
            amount: t.value,
        }
        .abi_encode();

        let builder = TxBuilder::new(&client, &wallet);
        let tx = builder
            .build(token_address, U256::ZERO, Bytes::from(data), TOKEN_TRANSFER_GAS)
            .await
            .map_err(fail)?;
        let hash = builder.send(tx).await.map_err(fail)?;

        tracing::info!(
            session_id = %armed.session_id(),
            tx_hash = %hash,
            token = token.symbol(),
            network = %t.network_name,
            "Token transfer sent"
        );

        Ok(success(json!({
            "transaction_hash": hash.to_string(),
            "from": wallet.address().to_checksum(None),
            "to": t.to.to_checksum(None),
            "amount": t.amount,
            "token": token.symbol(),
            "network": t.network_name,
            "explorer_url": explorer_url(&t.network.explorer_tx_url, hash),
            "session_cleared": true,
            "message": "Transaction sent successfully. Session has been cleared for security."
        })))
    }
}

#[derive(Deserialize)]
struct SendTokenArgs {
    session_id: String,
    to_address: String,
    amount: f64,
    #[serde(default = "default_token")]
    token_type: String,
    #[serde(default = "default_network")]
    network: String,
    #[serde(default)]
    use_alchemy: bool,
}

#[async_trait]
impl McpTool for SendCeloTokenTool {
    fn name(&self) -> &str {
        "send_celo_token"
    }

    fn description(&self) -> &str {
        "Send cUSD or cEUR from the session's address. Clears the session."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "session_id": { "type": "string" },
                "to_address": { "type": "string", "description": "Recipient address" },
                "amount": { "type": "number", "description": "Amount of tokens" },
                "token_type": { "type": "string", "enum": ["cUSD", "cEUR"], "default": "cUSD" },
                "network": network_schema(),
                "use_alchemy": { "type": "boolean", "default": false }
            },
            "required": ["session_id", "to_address", "amount"]
        })
    }

    async fn call(&self, args: Value) -> ToolResult<Value> {
        let args: SendTokenArgs = parse_args(args)?;

        let Some(token) = StableToken::from_symbol(&args.token_type) else {
            return Ok(failure(format!(
                "Unsupported token type: {}. Choose 'cUSD' or 'cEUR'",
                args.token_type
            )));
        };
        let transfer = match prepare_transfer(
            &self.ctx,
            &args.network,
            &args.to_address,
            args.amount,
            DECIMALS,
            args.use_alchemy,
        ) {
            Ok(t) => t,
            Err(payload) => return Ok(payload),
        };
        let Some(token_address) = token.address(transfer.network.chain_id) else {
            return Ok(failure(format!(
                "{} is not available on {}",
                token.symbol(),
                transfer.network_name
            )));
        };

        let ns = self.ctx.transactions();
        let armed = match ns.manager.checkout(&args.session_id) {
            Ok(armed) => armed,
            Err(e) => return Ok(session_failure(e, ns.add_key_tool)),
        };

        let outcome = self.transfer(&armed, &transfer, token, token_address).await;
        drop(armed);
        Ok(outcome.unwrap_or_else(|payload| payload))
    }
}

/// Signs an EIP-191 personal message.
pub struct SignMessageTool {
    ctx: Arc<ToolContext>,
}

impl SignMessageTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }

    async fn sign(&self, armed: &ArmedSession, message: &str) -> Result<Value, Value> {
        let chain_id = self.ctx.config().networks.mainnet.chain_id;
        let wallet = session_wallet(armed, chain_id)?;

        let signature = wallet
            .sign_message(message.as_bytes())
            .await
            .map_err(|e| failure_cleared(format!("Error signing message: {}", e)))?;
        let v: u8 = if signature.v() { 28 } else { 27 };

        tracing::info!(session_id = %armed.session_id(), "Message signed");

        Ok(success(json!({
            "address": wallet.address().to_checksum(None),
            "message": message,
            "message_hash": eip191_hash_message(message.as_bytes()).to_string(),
            "signature": alloy::hex::encode_prefixed(signature.as_bytes()),
            "r": signature.r().to_string(),
            "s": signature.s().to_string(),
            "v": v,
            "session_cleared": true
        })))
    }
}

#[derive(Deserialize)]
struct SignArgs {
    session_id: String,
    message: String,
}

#[async_trait]
impl McpTool for SignMessageTool {
    fn name(&self) -> &str {
        "sign_message"
    }

    fn description(&self) -> &str {
        "Sign a message with the session's key (EIP-191). Clears the session."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "session_id": { "type": "string" },
                "message": { "type": "string", "description": "Message to sign" }
            },
            "required": ["session_id", "message"]
        })
    }

    async fn call(&self, args: Value) -> ToolResult<Value> {
        let args: SignArgs = parse_args(args)?;

        let ns = self.ctx.transactions();
        let armed = match ns.manager.checkout(&args.session_id) {
            Ok(armed) => armed,
            Err(e) => return Ok(session_failure(e, ns.add_key_tool)),
        };

        let outcome = self.sign(&armed, &args.message).await;
        drop(armed);
        Ok(outcome.unwrap_or_else(|payload| payload))
    }
}
