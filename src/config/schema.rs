//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::session::DEFAULT_TTL_SECS;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct McpConfig {
    /// Transaction session settings.
    pub sessions: SessionConfig,

    /// Celo networks reachable by the tools.
    pub networks: NetworksConfig,

    /// Shared RPC and transaction settings.
    pub blockchain: BlockchainConfig,

    /// Aave deployment on Celo mainnet.
    pub aave: AaveConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,
}

/// Session lifetime and housekeeping.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Lifetime of every session from creation, in seconds.
    pub ttl_secs: u64,

    /// How often expired sessions are swept, in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_TTL_SECS,
            sweep_interval_secs: 60,
        }
    }
}

/// Per-network endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
    /// Public JSON-RPC endpoint.
    pub public_rpc_url: String,

    /// Alchemy JSON-RPC endpoint, used when a tool asks for it.
    #[serde(default)]
    pub alchemy_rpc_url: Option<String>,

    /// Failover JSON-RPC endpoint URLs.
    #[serde(default)]
    pub failover_urls: Vec<String>,

    /// Expected chain ID.
    pub chain_id: u64,

    /// Block explorer transaction URL prefix.
    pub explorer_tx_url: String,

    /// Block explorer address URL prefix.
    pub explorer_address_url: String,
}

/// The two Celo networks the tools know about.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworksConfig {
    pub mainnet: NetworkConfig,
    pub alfajores: NetworkConfig,
}

impl Default for NetworksConfig {
    fn default() -> Self {
        Self {
            mainnet: NetworkConfig {
                public_rpc_url: "https://forno.celo.org".to_string(),
                alchemy_rpc_url: None,
                failover_urls: Vec::new(),
                chain_id: 42220,
                explorer_tx_url: "https://explorer.celo.org/mainnet/tx/".to_string(),
                explorer_address_url: "https://explorer.celo.org/mainnet/address/".to_string(),
            },
            alfajores: NetworkConfig {
                public_rpc_url: "https://alfajores-forno.celo-testnet.org".to_string(),
                alchemy_rpc_url: None,
                failover_urls: Vec::new(),
                chain_id: 44787,
                explorer_tx_url: "https://explorer.celo.org/alfajores/tx/".to_string(),
                explorer_address_url: "https://explorer.celo.org/alfajores/address/".to_string(),
            },
        }
    }
}

/// RPC and transaction settings shared by all networks.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BlockchainConfig {
    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Number of block confirmations required before a receipt counts.
    pub confirmation_blocks: u32,

    /// Maximum time to wait for a receipt, in seconds.
    pub receipt_timeout_secs: u64,

    /// Gas price multiplier (1.0 = node estimate, 1.2 = 20% buffer).
    pub gas_price_multiplier: f64,

    /// Maximum gas price in gwei (protection against spikes).
    pub max_gas_price_gwei: u64,
}

impl Default for BlockchainConfig {
    fn default() -> Self {
        Self {
            rpc_timeout_secs: 10,
            confirmation_blocks: 1,
            receipt_timeout_secs: 120,
            gas_price_multiplier: 1.0,
            max_gas_price_gwei: 500,
        }
    }
}

/// Aave contract addresses.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AaveConfig {
    pub lending_pool: String,
    pub celo_token: String,
    pub usdc_token: String,

    /// Explorer URL prefix for Aave transactions.
    pub explorer_tx_url: String,
}

impl Default for AaveConfig {
    fn default() -> Self {
        Self {
            lending_pool: "0x3E59A31363E2ad014dcbc521c4a0d5757d9f3402".to_string(),
            celo_token: "0x471EcE3750Da237f93B8E339c536989b8978a438".to_string(),
            usdc_token: "0xcebA9300f2b948710d2653dD7B07f33A8B32118C".to_string(),
            explorer_tx_url: "https://celoscan.io/tx/".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
