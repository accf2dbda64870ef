//! Aave V3 tools on Celo mainnet, driven by the `aave` session namespace.
//!
//! Approvals are awaited to a receipt before the pool call that spends them.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;

use super::response::{explorer_url, failure, failure_cleared, failure_with, session_failure, success};
use super::{session_wallet, ToolContext};
use crate::blockchain::contracts::{erc20_balance, IAavePool, IERC20, VARIABLE_RATE_MODE};
use crate::blockchain::units::{format_amount, parse_amount};
use crate::blockchain::{BlockchainClient, BlockchainError, SubmittedTx, TxBuilder, Wallet};
use crate::mcp::{parse_args, McpTool, ToolResult};

const APPROVE_GAS: u64 = 200_000;
const SUPPLY_GAS: u64 = 300_000;
const WITHDRAW_GAS: u64 = 300_000;
const BORROW_GAS: u64 = 400_000;
const REPAY_GAS: u64 = 300_000;
const COLLATERAL_GAS: u64 = 200_000;

const CELO_DECIMALS: u8 = 18;
const USDC_DECIMALS: u8 = 6;

/// Everything an Aave operation needs once the key is checked out.
struct AaveEnv {
    client: BlockchainClient,
    wallet: Wallet,
    pool: Address,
    celo: Address,
    usdc: Address,
    explorer: String,
}

impl AaveEnv {
    fn open(ctx: &ToolContext, wallet: Wallet) -> Result<Self, Value> {
        let aave = &ctx.config().aave;
        let parse = |raw: &str| -> Result<Address, Value> {
            raw.parse()
                .map_err(|_| failure_cleared(format!("Invalid Aave contract address: {}", raw)))
        };

        let client = ctx
            .client(&ctx.config().networks.mainnet, false)
            .map_err(|e| failure_cleared(e.to_string()))?;

        Ok(Self {
            client,
            wallet,
            pool: parse(&aave.lending_pool)?,
            celo: parse(&aave.celo_token)?,
            usdc: parse(&aave.usdc_token)?,
            explorer: aave.explorer_tx_url.clone(),
        })
    }

    fn me(&self) -> Address {
        self.wallet.address()
    }

    async fn submit(&self, to: Address, data: Vec<u8>, gas_limit: u64) -> Result<SubmittedTx, BlockchainError> {
        TxBuilder::new(&self.client, &self.wallet)
            .submit(to, U256::ZERO, Bytes::from(data), gas_limit)
            .await
    }

    /// Approve the pool to pull `amount` of `token`. A reverted approval
    /// becomes the tool's failure payload.
    async fn approve(&self, token: Address, amount: U256, context: &str) -> Result<(), Value> {
        let data = IERC20::approveCall {
            spender: self.pool,
            amount,
        }
        .abi_encode();

        let tx = self
            .submit(token, data, APPROVE_GAS)
            .await
            .map_err(|e| failure_cleared(format!("{}: {}", context, e)))?;

        if !tx.status.is_success() {
            return Err(failure_with("Approval transaction failed", self.tx_fields(&tx)));
        }
        tracing::debug!(tx_hash = %tx.hash, token = %token, "Approval confirmed");
        Ok(())
    }

    fn tx_fields(&self, tx: &SubmittedTx) -> Value {
        json!({
            "transaction_hash": tx.hash.to_string(),
            "explorer_url": explorer_url(&self.explorer, tx.hash),
            "session_cleared": true
        })
    }

    /// Turn a mined transaction into the tool payload.
    fn report(&self, tx: &SubmittedTx, message: String, failed: &str, extra: Value) -> Result<Value, Value> {
        let mut fields = self.tx_fields(tx);
        if let (Value::Object(base), Value::Object(extra)) = (&mut fields, extra) {
            base.extend(extra);
        }

        if tx.status.is_success() {
            fields["message"] = Value::String(message);
            Ok(success(fields))
        } else {
            Err(failure_with(failed, fields))
        }
    }
}

/// Check the key out of an Aave session, run `op`, and clear the session.
async fn run_armed<F, Fut>(ctx: &ToolContext, session_id: &str, op: F) -> Value
where
    F: FnOnce(AaveEnv) -> Fut,
    Fut: Future<Output = Result<Value, Value>>,
{
    let ns = ctx.aave();
    let armed = match ns.manager.checkout(session_id) {
        Ok(armed) => armed,
        Err(e) => return session_failure(e, ns.add_key_tool),
    };

    let chain_id = ctx.config().networks.mainnet.chain_id;
    let outcome = match session_wallet(&armed, chain_id).and_then(|w| AaveEnv::open(ctx, w)) {
        Ok(env) => op(env).await,
        Err(payload) => Err(payload),
    };

    drop(armed);
    outcome.unwrap_or_else(|payload| payload)
}

fn session_schema(extra: Value) -> Value {
    let mut properties = json!({ "session_id": { "type": "string" } });
    if let (Value::Object(base), Value::Object(extra)) = (&mut properties, extra) {
        base.extend(extra);
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": ["session_id"]
    })
}

/// Parse a positive amount, or the failure payload to return.
fn positive_amount(amount: f64, decimals: u8) -> Result<U256, Value> {
    let value = parse_amount(amount, decimals).map_err(|e| failure(e.to_string()))?;
    if value.is_zero() {
        return Err(failure("Amount must be greater than zero"));
    }
    Ok(value)
}

#[derive(Deserialize)]
struct AmountArgs {
    session_id: String,
    #[serde(default)]
    amount: f64,
}

/// Supplies CELO to the pool.
pub struct SupplyCeloTool {
    ctx: Arc<ToolContext>,
}

impl SupplyCeloTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl McpTool for SupplyCeloTool {
    fn name(&self) -> &str {
        "supply_celo"
    }

    fn description(&self) -> &str {
        "Supply CELO to Aave on Celo mainnet. Clears the session."
    }

    fn input_schema(&self) -> Value {
        let mut schema = session_schema(json!({
            "amount": { "type": "number", "description": "Amount of CELO to supply" }
        }));
        schema["required"] = json!(["session_id", "amount"]);
        schema
    }

    async fn call(&self, args: Value) -> ToolResult<Value> {
        let args: AmountArgs = parse_args(args)?;
        let value = match positive_amount(args.amount, CELO_DECIMALS) {
            Ok(v) => v,
            Err(payload) => return Ok(payload),
        };
        let amount = args.amount;

        Ok(run_armed(&self.ctx, &args.session_id, |env| async move {
            let fail = |e: BlockchainError| failure_cleared(format!("Error supplying CELO to Aave: {}", e));

            let token_balance = erc20_balance(&env.client, env.celo, env.me()).await.map_err(fail)?;
            if token_balance < value {
                let native = env.client.get_balance(env.me()).await.map_err(fail)?;
                return Err(failure_with(
                    format!(
                        "Not enough CELO. You have {} CELO available to supply, need {} CELO.",
                        format_amount(token_balance, CELO_DECIMALS),
                        amount
                    ),
                    json!({
                        "native_balance": format!("{} CELO", format_amount(native, CELO_DECIMALS)),
                        "session_cleared": true
                    }),
                ));
            }

            env.approve(env.celo, value, "Error supplying CELO to Aave").await?;

            let data = IAavePool::supplyCall {
                asset: env.celo,
                amount: value,
                onBehalfOf: env.me(),
                referralCode: 0,
            }
            .abi_encode();
            let tx = env.submit(env.pool, data, SUPPLY_GAS).await.map_err(fail)?;

            env.report(
                &tx,
                format!("Successfully supplied {} CELO to Aave on Celo mainnet.", amount),
                "Supply transaction failed",
                json!({ "amount": amount }),
            )
        })
        .await)
    }
}

/// Withdraws supplied CELO; an amount of 0 withdraws everything.
pub struct WithdrawCeloTool {
    ctx: Arc<ToolContext>,
}

impl WithdrawCeloTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl McpTool for WithdrawCeloTool {
    fn name(&self) -> &str {
        "withdraw_celo"
    }

    fn description(&self) -> &str {
        "Withdraw CELO from Aave on Celo mainnet (amount 0 withdraws all). Clears the session."
    }

    fn input_schema(&self) -> Value {
        session_schema(json!({
            "amount": { "type": "number", "description": "Amount of CELO, 0 for all", "default": 0 }
        }))
    }

    async fn call(&self, args: Value) -> ToolResult<Value> {
        let args: AmountArgs = parse_args(args)?;
        // Only an explicit 0 means "all"; dust that rounds to zero is rejected
        let all = args.amount == 0.0;
        let value = if all {
            U256::MAX
        } else {
            match positive_amount(args.amount, CELO_DECIMALS) {
                Ok(v) => v,
                Err(payload) => return Ok(payload),
            }
        };
        let amount = args.amount;

        Ok(run_armed(&self.ctx, &args.session_id, |env| async move {
            let data = IAavePool::withdrawCall {
                asset: env.celo,
                amount: value,
                to: env.me(),
            }
            .abi_encode();
            let tx = env
                .submit(env.pool, data, WITHDRAW_GAS)
                .await
                .map_err(|e| failure_cleared(format!("Error withdrawing CELO from Aave: {}", e)))?;

            let (message, shown) = if all {
                ("Successfully withdrew all CELO from Aave on Celo mainnet.".to_string(), json!("all"))
            } else {
                (format!("Successfully withdrew {} CELO from Aave on Celo mainnet.", amount), json!(amount))
            };
            env.report(&tx, message, "Withdrawal transaction failed", json!({ "amount": shown }))
        })
        .await)
    }
}

/// Borrows USDC at the variable rate.
pub struct BorrowUsdcTool {
    ctx: Arc<ToolContext>,
}

impl BorrowUsdcTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl McpTool for BorrowUsdcTool {
    fn name(&self) -> &str {
        "borrow_usdc"
    }

    fn description(&self) -> &str {
        "Borrow USDC from Aave on Celo mainnet at the variable rate. Clears the session."
    }

    fn input_schema(&self) -> Value {
        let mut schema = session_schema(json!({
            "amount": { "type": "number", "description": "Amount of USDC to borrow" }
        }));
        schema["required"] = json!(["session_id", "amount"]);
        schema
    }

    async fn call(&self, args: Value) -> ToolResult<Value> {
        let args: AmountArgs = parse_args(args)?;
        let value = match positive_amount(args.amount, USDC_DECIMALS) {
            Ok(v) => v,
            Err(payload) => return Ok(payload),
        };
        let amount = args.amount;

        Ok(run_armed(&self.ctx, &args.session_id, |env| async move {
            let data = IAavePool::borrowCall {
                asset: env.usdc,
                amount: value,
                interestRateMode: U256::from(VARIABLE_RATE_MODE),
                referralCode: 0,
                onBehalfOf: env.me(),
            }
            .abi_encode();
            let tx = env
                .submit(env.pool, data, BORROW_GAS)
                .await
                .map_err(|e| failure_cleared(format!("Error borrowing USDC from Aave: {}", e)))?;

            env.report(
                &tx,
                format!("Successfully borrowed {} USDC from Aave on Celo mainnet.", amount),
                "Borrow transaction failed",
                json!({ "amount": amount }),
            )
        })
        .await)
    }
}

/// Repays USDC debt; an amount of 0 repays as much as the balance allows.
pub struct RepayUsdcTool {
    ctx: Arc<ToolContext>,
}

impl RepayUsdcTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl McpTool for RepayUsdcTool {
    fn name(&self) -> &str {
        "repay_usdc"
    }

    fn description(&self) -> &str {
        "Repay USDC debt on Aave on Celo mainnet (amount 0 repays all). Clears the session."
    }

    fn input_schema(&self) -> Value {
        session_schema(json!({
            "amount": { "type": "number", "description": "Amount of USDC, 0 for all", "default": 0 }
        }))
    }

    async fn call(&self, args: Value) -> ToolResult<Value> {
        let args: AmountArgs = parse_args(args)?;
        let requested = if args.amount == 0.0 {
            None
        } else {
            match positive_amount(args.amount, USDC_DECIMALS) {
                Ok(v) => Some(v),
                Err(payload) => return Ok(payload),
            }
        };
        let amount = args.amount;

        Ok(run_armed(&self.ctx, &args.session_id, |env| async move {
            let context = "Error repaying USDC to Aave";
            let fail = |e: BlockchainError| failure_cleared(format!("{}: {}", context, e));

            let balance = erc20_balance(&env.client, env.usdc, env.me()).await.map_err(fail)?;
            let (approve_amount, repay_amount) = match requested {
                None if balance.is_zero() => {
                    return Err(failure_cleared("No USDC balance to repay with"));
                }
                None => (balance, U256::MAX),
                Some(value) if balance < value => {
                    return Err(failure_cleared(format!(
                        "Not enough USDC balance. Have {} USDC, need {} USDC",
                        format_amount(balance, USDC_DECIMALS),
                        amount
                    )));
                }
                Some(value) => (value, value),
            };

            env.approve(env.usdc, approve_amount, context).await?;

            let data = IAavePool::repayCall {
                asset: env.usdc,
                amount: repay_amount,
                interestRateMode: U256::from(VARIABLE_RATE_MODE),
                onBehalfOf: env.me(),
            }
            .abi_encode();
            let tx = env.submit(env.pool, data, REPAY_GAS).await.map_err(fail)?;

            let (message, shown) = if requested.is_none() {
                ("Successfully repaid USDC debt on Aave.".to_string(), json!("all"))
            } else {
                (format!("Successfully repaid {} USDC on Aave.", amount), json!(amount))
            };
            env.report(&tx, message, "Repay transaction failed", json!({ "amount": shown }))
        })
        .await)
    }
}

/// Toggles CELO as collateral.
pub struct SetCeloCollateralTool {
    ctx: Arc<ToolContext>,
}

impl SetCeloCollateralTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
struct CollateralArgs {
    session_id: String,
    #[serde(default = "default_true")]
    use_as_collateral: bool,
}

#[async_trait]
impl McpTool for SetCeloCollateralTool {
    fn name(&self) -> &str {
        "set_celo_collateral"
    }

    fn description(&self) -> &str {
        "Enable or disable supplied CELO as collateral on Aave. Clears the session."
    }

    fn input_schema(&self) -> Value {
        session_schema(json!({
            "use_as_collateral": { "type": "boolean", "default": true }
        }))
    }

    async fn call(&self, args: Value) -> ToolResult<Value> {
        let args: CollateralArgs = parse_args(args)?;
        let enable = args.use_as_collateral;

        Ok(run_armed(&self.ctx, &args.session_id, |env| async move {
            let data = IAavePool::setUserUseReserveAsCollateralCall {
                asset: env.celo,
                useAsCollateral: enable,
            }
            .abi_encode();
            let tx = env
                .submit(env.pool, data, COLLATERAL_GAS)
                .await
                .map_err(|e| failure_cleared(format!("Error updating CELO collateral: {}", e)))?;

            let message = if enable {
                "CELO is now used as collateral on Aave."
            } else {
                "CELO is no longer used as collateral on Aave."
            };
            env.report(
                &tx,
                message.to_string(),
                "Collateral transaction failed",
                json!({ "use_as_collateral": enable }),
            )
        })
        .await)
    }
}
