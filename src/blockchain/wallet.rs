//! Wallet construction from session secrets, and signing.
//!
//! # Security
//! - Keys come only from an armed session, never from disk or environment
//! - Keys are never logged or serialized
//! - The wallet lives no longer than the tool call that built it

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::{Signature, Signer};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::session::Secret;

/// Wallet for transaction signing with nonce management.
#[derive(Clone)]
pub struct Wallet {
    /// The underlying signer (private key).
    signer: PrivateKeySigner,
    /// Next nonce for sequential transactions.
    nonce: Arc<AtomicU64>,
    /// Chain ID for EIP-155 replay protection.
    chain_id: u64,
}

impl Wallet {
    /// Create a wallet from a session secret.
    ///
    /// # Arguments
    /// * `secret` - Hex private key (with or without 0x prefix)
    /// * `chain_id` - Chain ID for transaction signing
    pub fn from_secret(secret: &Secret, chain_id: u64) -> BlockchainResult<Self> {
        let raw = secret.expose();
        let key_hex = raw.strip_prefix("0x").unwrap_or(raw);

        // The parse error is not forwarded: it may echo key material
        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|_| BlockchainError::Wallet("Invalid private key format".to_string()))?;
        let signer = signer.with_chain_id(Some(chain_id));

        tracing::debug!(address = %signer.address(), chain_id, "Wallet loaded from session");

        Ok(Self {
            signer,
            nonce: Arc::new(AtomicU64::new(0)),
            chain_id,
        })
    }

    /// Get the wallet's address.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Get the chain ID this wallet is configured for.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Network wallet used to sign transaction requests.
    pub fn network_wallet(&self) -> EthereumWallet {
        EthereumWallet::from(self.signer.clone())
    }

    /// Get and increment the nonce atomically.
    pub fn get_and_increment_nonce(&self) -> u64 {
        self.nonce.fetch_add(1, Ordering::SeqCst)
    }

    /// Set the nonce to a specific value (e.g., after querying from chain).
    pub fn set_nonce(&self, nonce: u64) {
        self.nonce.store(nonce, Ordering::SeqCst);
    }

    /// Get current nonce without incrementing.
    pub fn current_nonce(&self) -> u64 {
        self.nonce.load(Ordering::SeqCst)
    }

    /// Sign arbitrary message bytes (EIP-191 personal message).
    pub async fn sign_message(&self, message: &[u8]) -> BlockchainResult<Signature> {
        self.signer
            .sign_message(message)
            .await
            .map_err(|e| BlockchainError::Wallet(format!("Message signing failed: {}", e)))
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address())
            .field("chain_id", &self.chain_id)
            .finish_non_exhaustive()
    }
}
