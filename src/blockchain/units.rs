//! Decimal amount conversion.

use alloy::primitives::utils::{format_units, parse_units};
use alloy::primitives::U256;

use crate::blockchain::types::{BlockchainError, BlockchainResult};

/// Convert a human amount into base units with `decimals` places.
pub fn parse_amount(amount: f64, decimals: u8) -> BlockchainResult<U256> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(BlockchainError::Amount(format!(
            "{} is not a non-negative number",
            amount
        )));
    }

    parse_units(&amount.to_string(), decimals)
        .map(|units| units.get_absolute())
        .map_err(|e| BlockchainError::Amount(e.to_string()))
}

/// Render base units as a decimal string without trailing zeros.
pub fn format_amount(value: U256, decimals: u8) -> String {
    match format_units(value, decimals) {
        Ok(s) if s.contains('.') => s.trim_end_matches('0').trim_end_matches('.').to_string(),
        Ok(s) => s,
        Err(_) => value.to_string(),
    }
}
