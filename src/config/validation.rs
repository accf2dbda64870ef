//! Configuration validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: McpConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use alloy::primitives::Address;
use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{McpConfig, NetworkConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check value ranges, URLs and addresses.
pub fn validate_config(config: &McpConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.sessions.ttl_secs == 0 {
        errors.push(ValidationError::new("sessions.ttl_secs", "must be greater than 0"));
    }
    if config.sessions.sweep_interval_secs == 0 {
        errors.push(ValidationError::new("sessions.sweep_interval_secs", "must be greater than 0"));
    }

    validate_network("networks.mainnet", &config.networks.mainnet, &mut errors);
    validate_network("networks.alfajores", &config.networks.alfajores, &mut errors);

    if config.blockchain.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("blockchain.rpc_timeout_secs", "must be greater than 0"));
    }
    if config.blockchain.receipt_timeout_secs == 0 {
        errors.push(ValidationError::new("blockchain.receipt_timeout_secs", "must be greater than 0"));
    }
    let multiplier = config.blockchain.gas_price_multiplier;
    if multiplier.is_nan() || multiplier < 1.0 {
        errors.push(ValidationError::new("blockchain.gas_price_multiplier", "must be at least 1.0"));
    }

    for (field, value) in [
        ("aave.lending_pool", &config.aave.lending_pool),
        ("aave.celo_token", &config.aave.celo_token),
        ("aave.usdc_token", &config.aave.usdc_token),
    ] {
        if value.parse::<Address>().is_err() {
            errors.push(ValidationError::new(field, format!("invalid address '{}'", value)));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new("observability.metrics_address", "invalid socket address"));
    }

    if config.admin.enabled {
        if config.admin.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::new("admin.bind_address", "invalid socket address"));
        }
        if config.admin.api_key.is_empty() {
            errors.push(ValidationError::new("admin.api_key", "must not be empty"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_network(prefix: &str, network: &NetworkConfig, errors: &mut Vec<ValidationError>) {
    if network.public_rpc_url.parse::<url::Url>().is_err() {
        errors.push(ValidationError::new(format!("{}.public_rpc_url", prefix), "invalid URL"));
    }
    if let Some(alchemy) = &network.alchemy_rpc_url {
        if alchemy.parse::<url::Url>().is_err() {
            errors.push(ValidationError::new(format!("{}.alchemy_rpc_url", prefix), "invalid URL"));
        }
    }
    if network.chain_id == 0 {
        errors.push(ValidationError::new(format!("{}.chain_id", prefix), "must be greater than 0"));
    }
}
