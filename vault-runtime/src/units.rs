//! Token amount conversions.

use alloy::primitives::U256;
use alloy::primitives::utils::{ParseUnits, format_units, parse_units};

use crate::error::DeployError;

pub const WBTC_DECIMALS: u8 = 8;
/// Vault shares and native ether.
pub const SHARE_DECIMALS: u8 = 18;

/// `"0.01"` with 8 decimals is `1_000_000`.
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256, DeployError> {
    let units = parse_units(amount, decimals)
        .map_err(|e| DeployError::ConfigError(format!("Invalid amount '{amount}': {e}")))?;
    match units {
        ParseUnits::U256(value) => Ok(value),
        ParseUnits::I256(value) if !value.is_negative() => Ok(value.into_raw()),
        ParseUnits::I256(_) => Err(DeployError::ConfigError(format!(
            "Invalid amount '{amount}': must not be negative"
        ))),
    }
}

pub fn format_amount(value: U256, decimals: u8) -> String {
    format_units(value, decimals).unwrap_or_else(|_| value.to_string())
}
