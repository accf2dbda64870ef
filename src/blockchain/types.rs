//! Chain-specific types and error definitions.

use alloy::primitives::TxHash;
use thiserror::Error;

pub use crate::config::schema::{BlockchainConfig, NetworkConfig};

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Transaction was not confirmed within expected time.
    #[error("Transaction not confirmed after {0} seconds")]
    ConfirmationTimeout(u64),

    /// Invalid private key format or derivation error.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Signing or encoding the transaction failed.
    #[error("Transaction build error: {0}")]
    Build(String),

    /// Gas price exceeded maximum allowed.
    #[error("Gas price {current_gwei} gwei exceeds maximum {max_gwei} gwei")]
    GasPriceTooHigh { current_gwei: u64, max_gwei: u64 },

    /// Contract call returned data that could not be decoded.
    #[error("Contract error: {0}")]
    Contract(String),

    /// Amount could not be converted to base units.
    #[error("Invalid amount: {0}")]
    Amount(String),
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// Transaction confirmation status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationStatus {
    /// Transaction is mined with the required block depth and succeeded.
    Confirmed { block_number: u64 },
    /// Transaction was mined but reverted.
    Failed(String),
}

impl ConfirmationStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, ConfirmationStatus::Confirmed { .. })
    }
}

/// A broadcast transaction and its final status.
#[derive(Debug, Clone)]
pub struct SubmittedTx {
    pub hash: TxHash,
    pub status: ConfirmationStatus,
}
