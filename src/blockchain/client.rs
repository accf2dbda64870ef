//! Blockchain RPC client with timeout and failover.
//!
//! # Responsibilities
//! - Connect to the JSON-RPC endpoints of one Celo network
//! - Query chain state (blocks, balances, nonces, transactions, receipts)
//! - Execute read-only contract calls and broadcast signed transactions
//! - Handle timeouts and network errors by falling over to the next endpoint

use alloy::eips::BlockNumberOrTag;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::{Block, Transaction, TransactionReceipt, TransactionRequest};
use alloy::transports::TransportResult;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::blockchain::types::{BlockchainConfig, BlockchainError, BlockchainResult, NetworkConfig};
use crate::observability::metrics;

type DynProvider = Arc<dyn Provider + Send + Sync>;

/// RPC client for one network, with failover support.
#[derive(Clone)]
pub struct BlockchainClient {
    /// List of providers (primary + failovers).
    providers: Vec<DynProvider>,
    /// Endpoint the primary provider talks to.
    rpc_url: String,
    /// Chain ID the network is expected to report.
    chain_id: u64,
    /// Shared transaction settings.
    settings: BlockchainConfig,
    /// Request timeout duration.
    timeout_duration: Duration,
}

impl BlockchainClient {
    /// Create a client for `network`.
    ///
    /// # Arguments
    /// * `network` - Endpoints and chain ID of the target network
    /// * `settings` - Timeouts and gas policy
    /// * `use_alchemy` - Prefer the Alchemy endpoint as primary when configured
    pub fn new(
        network: &NetworkConfig,
        settings: &BlockchainConfig,
        use_alchemy: bool,
    ) -> BlockchainResult<Self> {
        let rpc_url = match (&network.alchemy_rpc_url, use_alchemy) {
            (Some(alchemy), true) => alchemy.clone(),
            _ => network.public_rpc_url.clone(),
        };

        let primary_url: url::Url = rpc_url
            .parse()
            .map_err(|e| BlockchainError::Rpc(format!("Invalid RPC URL '{}': {}", rpc_url, e)))?;
        let mut providers = vec![Arc::new(ProviderBuilder::new().connect_http(primary_url)) as DynProvider];

        // The public endpoint backs up Alchemy, then any configured failovers
        let mut fallbacks: Vec<&String> = Vec::new();
        if rpc_url != network.public_rpc_url {
            fallbacks.push(&network.public_rpc_url);
        }
        fallbacks.extend(network.failover_urls.iter());

        for url_str in fallbacks {
            match url_str.parse::<url::Url>() {
                Ok(url) => providers.push(Arc::new(ProviderBuilder::new().connect_http(url)) as DynProvider),
                Err(_) => tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL"),
            }
        }

        Ok(Self {
            providers,
            rpc_url,
            chain_id: network.chain_id,
            settings: settings.clone(),
            timeout_duration: Duration::from_secs(settings.rpc_timeout_secs),
        })
    }

    /// Run `op` against each provider in turn until one answers in time.
    async fn with_failover<T, F, Fut>(&self, method: &'static str, op: F) -> BlockchainResult<T>
    where
        F: Fn(DynProvider) -> Fut,
        Fut: Future<Output = TransportResult<T>>,
    {
        let mut last_error = String::from("no providers configured");

        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, op(provider.clone())).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => {
                    tracing::warn!(provider_idx = i, method, error = %e, "RPC error, trying next provider");
                    last_error = e.to_string();
                }
                Err(_) => {
                    tracing::warn!(provider_idx = i, method, "RPC timeout, trying next provider");
                    last_error = format!("timeout after {}s", self.timeout_duration.as_secs());
                }
            }
        }

        metrics::record_rpc_failure(method);
        Err(BlockchainError::Rpc(format!(
            "All RPC providers failed for {}: {}",
            method, last_error
        )))
    }

    /// Get the latest block number.
    pub async fn get_block_number(&self) -> BlockchainResult<u64> {
        self.with_failover("eth_blockNumber", |p| async move { p.get_block_number().await })
            .await
    }

    /// Get the native balance of an address, in wei.
    pub async fn get_balance(&self, address: Address) -> BlockchainResult<U256> {
        self.with_failover("eth_getBalance", move |p| async move { p.get_balance(address).await })
            .await
    }

    /// Get the transaction count (nonce) for an address.
    pub async fn get_transaction_count(&self, address: Address) -> BlockchainResult<u64> {
        self.with_failover("eth_getTransactionCount", move |p| async move {
            p.get_transaction_count(address).await
        })
        .await
    }

    /// Get a transaction receipt by hash.
    pub async fn get_transaction_receipt(
        &self,
        tx_hash: TxHash,
    ) -> BlockchainResult<Option<TransactionReceipt>> {
        self.with_failover("eth_getTransactionReceipt", move |p| async move {
            p.get_transaction_receipt(tx_hash).await
        })
        .await
    }

    /// Get a block by number, or the latest block for `BlockNumberOrTag::Latest`.
    ///
    /// With `full` set the block carries whole transactions instead of hashes.
    pub async fn get_block(&self, number: BlockNumberOrTag, full: bool) -> BlockchainResult<Option<Block>> {
        self.with_failover("eth_getBlockByNumber", move |p| async move {
            let request = p.get_block_by_number(number);
            if full {
                request.full().await
            } else {
                request.await
            }
        })
        .await
    }

    /// Get a transaction by hash.
    pub async fn get_transaction(&self, tx_hash: TxHash) -> BlockchainResult<Option<Transaction>> {
        self.with_failover("eth_getTransactionByHash", move |p| async move {
            p.get_transaction_by_hash(tx_hash).await
        })
        .await
    }

    /// Get current gas price in wei.
    pub async fn get_gas_price(&self) -> BlockchainResult<u128> {
        self.with_failover("eth_gasPrice", |p| async move { p.get_gas_price().await })
            .await
    }

    /// Execute a read-only call.
    pub async fn call(&self, tx: TransactionRequest) -> BlockchainResult<Bytes> {
        self.with_failover("eth_call", move |p| {
            let tx = tx.clone();
            async move { p.call(tx).await }
        })
        .await
    }

    /// Broadcast a signed, EIP-2718 encoded transaction.
    pub async fn send_raw_transaction(&self, raw: Bytes) -> BlockchainResult<TxHash> {
        self.with_failover("eth_sendRawTransaction", move |p| {
            let raw = raw.clone();
            async move {
                p.send_raw_transaction(&raw)
                    .await
                    .map(|pending| *pending.tx_hash())
            }
        })
        .await
    }

    /// Endpoint of the primary provider.
    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Expected chain ID.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Get the transaction settings.
    pub fn settings(&self) -> &BlockchainConfig {
        &self.settings
    }

    /// Get the number of confirmation blocks required.
    pub fn confirmation_blocks(&self) -> u32 {
        self.settings.confirmation_blocks
    }
}

impl std::fmt::Debug for BlockchainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockchainClient")
            .field("rpc_url", &self.rpc_url)
            .field("chain_id", &self.chain_id)
            .field("providers", &self.providers.len())
            .field("timeout_secs", &self.settings.rpc_timeout_secs)
            .finish()
    }
}
