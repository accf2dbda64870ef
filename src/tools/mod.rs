//! MCP tools: session management, Celo readers and writers, Aave.
//!
//! # Session discipline
//! Writer tools validate their inputs, then check the secret out of the
//! session. Checkout removes the session, so it is single use whatever the
//! outcome; the [`ArmedSession`] guard wipes the secret when dropped.

pub mod aave_tools;
pub mod celo_reader;
pub mod celo_writer;
pub mod response;
pub mod session_tools;

pub use aave_tools::*;
pub use celo_reader::*;
pub use celo_writer::*;
pub use session_tools::*;

use alloy::primitives::Address;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::blockchain::{BlockchainClient, BlockchainError, Wallet};
use crate::config::{McpConfig, NetworkConfig};
use crate::mcp::McpTool;
use crate::session::{ArmedSession, SessionManager};

/// Id prefix of the generic transaction namespace.
pub const TRANSACTION_PREFIX: &str = "session";

/// Id prefix of the Aave namespace.
pub const AAVE_PREFIX: &str = "aave";

/// One session manager and the names of the tools that drive it.
#[derive(Clone)]
pub struct SessionNamespace {
    pub manager: Arc<SessionManager>,
    pub create_tool: &'static str,
    pub add_key_tool: &'static str,
    pub clear_tool: &'static str,
}

/// Shared state handed to every tool.
pub struct ToolContext {
    config: McpConfig,
    transactions: SessionNamespace,
    aave: SessionNamespace,
}

impl ToolContext {
    /// Build both session namespaces with the configured TTL.
    pub fn new(config: McpConfig) -> Self {
        let ttl = Duration::from_secs(config.sessions.ttl_secs);
        let transactions = Arc::new(SessionManager::new(TRANSACTION_PREFIX, ttl));
        let aave = Arc::new(SessionManager::new(AAVE_PREFIX, ttl));
        Self::with_managers(config, transactions, aave)
    }

    /// Use pre-built managers (e.g. with a manual clock).
    pub fn with_managers(
        config: McpConfig,
        transactions: Arc<SessionManager>,
        aave: Arc<SessionManager>,
    ) -> Self {
        Self {
            config,
            transactions: SessionNamespace {
                manager: transactions,
                create_tool: "create_transaction_session",
                add_key_tool: "add_private_key",
                clear_tool: "clear_session",
            },
            aave: SessionNamespace {
                manager: aave,
                create_tool: "create_aave_session",
                add_key_tool: "add_aave_private_key",
                clear_tool: "clear_aave_session",
            },
        }
    }

    pub fn config(&self) -> &McpConfig {
        &self.config
    }

    pub fn transactions(&self) -> &SessionNamespace {
        &self.transactions
    }

    pub fn aave(&self) -> &SessionNamespace {
        &self.aave
    }

    /// Both session managers, for the sweeper and the admin API.
    pub fn managers(&self) -> Vec<Arc<SessionManager>> {
        vec![self.transactions.manager.clone(), self.aave.manager.clone()]
    }

    /// Resolve a network name to its settings.
    pub fn network(&self, name: &str) -> Result<&NetworkConfig, Value> {
        match name {
            "mainnet" => Ok(&self.config.networks.mainnet),
            "alfajores" => Ok(&self.config.networks.alfajores),
            other => Err(response::failure(format!(
                "Unknown network: {}. Choose 'mainnet' or 'alfajores'",
                other
            ))),
        }
    }

    /// RPC client for a resolved network.
    pub fn client(&self, network: &NetworkConfig, use_alchemy: bool) -> Result<BlockchainClient, BlockchainError> {
        BlockchainClient::new(network, &self.config.blockchain, use_alchemy)
    }
}

/// Register every tool, in the order `tools/list` reports them.
pub fn build_tools(ctx: Arc<ToolContext>) -> Vec<Arc<dyn McpTool>> {
    let tx = ctx.transactions().clone();
    let aave = ctx.aave().clone();

    vec![
        Arc::new(CreateSessionTool::new(tx.clone())),
        Arc::new(AddPrivateKeyTool::new(tx.clone())),
        Arc::new(ClearSessionTool::new(tx)),
        Arc::new(SendCeloTool::new(ctx.clone())),
        Arc::new(SendCeloTokenTool::new(ctx.clone())),
        Arc::new(SignMessageTool::new(ctx.clone())),
        Arc::new(GetCeloBalanceTool::new(ctx.clone())),
        Arc::new(GetBlockNumberTool::new(ctx.clone())),
        Arc::new(GetCeloBalancesTool::new(ctx.clone())),
        Arc::new(GetTokenListTool::new(ctx.clone())),
        Arc::new(GetTransactionsTool::new(ctx.clone())),
        Arc::new(GetBlockInfoTool::new(ctx.clone())),
        Arc::new(GetTransactionTool::new(ctx.clone())),
        Arc::new(CreateSessionTool::new(aave.clone())),
        Arc::new(AddPrivateKeyTool::new(aave.clone())),
        Arc::new(ClearSessionTool::new(aave)),
        Arc::new(SupplyCeloTool::new(ctx.clone())),
        Arc::new(WithdrawCeloTool::new(ctx.clone())),
        Arc::new(BorrowUsdcTool::new(ctx.clone())),
        Arc::new(RepayUsdcTool::new(ctx.clone())),
        Arc::new(SetCeloCollateralTool::new(ctx)),
    ]
}

/// Load the checked-out key and make sure it belongs to the session address.
pub(crate) fn session_wallet(armed: &ArmedSession, chain_id: u64) -> Result<Wallet, Value> {
    let wallet = Wallet::from_secret(armed.secret(), chain_id)
        .map_err(|e| response::failure_cleared(e.to_string()))?;

    let expected: Address = armed
        .public_address()
        .parse()
        .map_err(|_| response::failure_cleared("Session address is malformed"))?;

    if wallet.address() != expected {
        tracing::warn!(session_id = %armed.session_id(), "Key does not match session address");
        return Err(response::failure_cleared(
            "Private key does not match session address",
        ));
    }
    Ok(wallet)
}

/// Parse a user-supplied address, reporting `label` on failure.
pub(crate) fn parse_address(raw: &str, label: &str) -> Result<Address, Value> {
    raw.trim()
        .parse()
        .map_err(|_| response::failure(format!("Invalid {} format: {}", label, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_names_are_unique() {
        let ctx = Arc::new(ToolContext::new(McpConfig::default()));
        let tools = build_tools(ctx);
        let mut names: Vec<&str> = tools.iter().map(|t| t.name()).collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
        assert_eq!(total, 21);
    }

    #[test]
    fn test_namespaces_are_isolated() {
        let ctx = ToolContext::new(McpConfig::default());
        let id = ctx
            .transactions()
            .manager
            .create_session("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

        assert!(ctx.transactions().manager.get_session(id.as_str()).is_some());
        assert!(ctx.aave().manager.get_session(id.as_str()).is_none());
        assert_eq!(ctx.aave().manager.prefix(), AAVE_PREFIX);
        assert_eq!(ctx.managers().len(), 2);
    }

    #[test]
    fn test_network_lookup() {
        let ctx = ToolContext::new(McpConfig::default());
        assert_eq!(ctx.network("mainnet").unwrap().chain_id, 42220);
        assert_eq!(ctx.network("alfajores").unwrap().chain_id, 44787);

        let err = ctx.network("goerli").unwrap_err();
        assert!(err["error"].as_str().unwrap().contains("Unknown network: goerli"));
    }

    #[test]
    fn test_parse_address() {
        assert!(parse_address(" 0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266 ", "address").is_ok());
        let err = parse_address("0x123", "recipient address").unwrap_err();
        assert_eq!(err["error"], "Invalid recipient address format: 0x123");
    }
}
