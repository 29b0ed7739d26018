//! Argument, address and amount helpers shared by the command handlers.

use std::str::FromStr;

use ethers::types::{Address, U256};
use ethers::utils::{format_units, parse_units, to_checksum, ParseUnits};
use serde::de::DeserializeOwned;
use serde_json::{from_value, Value};

use crate::blockchain::models::ChainError;

/// Decimals used by the native currency and by every token this service deploys.
pub const TOKEN_DECIMALS: u32 = 18;

/// Helper function to extract a required argument from a JSON object
pub fn get_required_arg<T: DeserializeOwned>(args: &Value, key: &str) -> Result<T, String> {
    from_value(args.get(key).cloned().unwrap_or(Value::Null))
        .map_err(|_| format!("Missing or invalid required argument: '{}'", key))
}

/// Like [`get_required_arg`] but absent or null keys yield `None`.
pub fn get_optional_arg<T: DeserializeOwned>(args: &Value, key: &str) -> Result<Option<T>, String> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => from_value(v.clone())
            .map(Some)
            .map_err(|_| format!("Invalid argument: '{}'", key)),
    }
}

/// Required argument read as text. Numbers are accepted and rendered as
/// written, since models often send amounts unquoted.
pub fn get_text_arg(args: &Value, key: &str) -> Result<String, String> {
    match args.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(format!("Missing or invalid required argument: '{}'", key)),
    }
}

/// Parses a 0x-prefixed, 40-hex-digit address. Mixed-case input must carry a
/// valid EIP-55 checksum; all-lower or all-upper input is accepted as is.
pub fn parse_address(input: &str) -> Result<Address, ChainError> {
    let trimmed = input.trim();
    let invalid = || ChainError::InvalidAddress(trimmed.to_string());

    let hex_part = trimmed.strip_prefix("0x").ok_or_else(invalid)?;
    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let address = Address::from_str(trimmed).map_err(|_| invalid())?;

    let has_lower = hex_part.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = hex_part.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper && to_checksum(&address, None) != trimmed {
        return Err(ChainError::InvalidAddress(format!("{} (bad checksum)", trimmed)));
    }

    Ok(address)
}

/// Parses a decimal amount into base units. Zero, negative and malformed
/// amounts are rejected.
pub fn parse_amount(amount: &str, decimals: u32) -> Result<U256, String> {
    let trimmed = amount.trim();
    if trimmed.is_empty() || trimmed.starts_with('-') {
        return Err(format!("Invalid amount: {}", amount));
    }
    match parse_units(trimmed, decimals) {
        Ok(ParseUnits::U256(value)) if !value.is_zero() => Ok(value),
        Ok(_) => Err(format!("Invalid amount: {}", amount)),
        Err(_) => Err(format!("Invalid amount: {}", amount)),
    }
}

/// Formats base units as a decimal string with trailing zeros trimmed.
pub fn format_amount(value: U256, decimals: u32) -> String {
    match format_units(value, decimals) {
        Ok(s) => trim_decimal(&s),
        Err(_) => value.to_string(),
    }
}

/// Formats a wei gas price in gwei.
pub fn format_gwei(value: U256) -> String {
    format_amount(value, 9)
}

fn trim_decimal(s: &str) -> String {
    if !s.contains('.') {
        return s.to_string();
    }
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// EIP-55 rendering of an address.
pub fn checksum(address: &Address) -> String {
    to_checksum(address, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const LOWER: &str = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";
    const CHECKSUMMED: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

    #[test]
    fn accepts_lowercase_and_checksummed_addresses() {
        assert!(parse_address(LOWER).is_ok());
        assert!(parse_address(CHECKSUMMED).is_ok());
        assert_eq!(
            parse_address(LOWER).unwrap(),
            parse_address(CHECKSUMMED).unwrap()
        );
    }

    #[test]
    fn rejects_bad_checksum_and_malformed_addresses() {
        let bad_checksum = "0x5AAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
        assert!(parse_address(bad_checksum).is_err());
        assert!(parse_address("0x1234").is_err());
        assert!(parse_address("5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").is_err());
        assert!(parse_address("0xzzaeb6053f3e94c9b9a09f33669435e7ef1beaed").is_err());
    }

    #[test]
    fn amounts_must_be_positive() {
        assert_eq!(
            parse_amount("1", TOKEN_DECIMALS).unwrap(),
            U256::exp10(18)
        );
        assert_eq!(
            parse_amount("0.5", TOKEN_DECIMALS).unwrap(),
            U256::exp10(17) * 5
        );
        assert!(parse_amount("0", TOKEN_DECIMALS).is_err());
        assert!(parse_amount("-1", TOKEN_DECIMALS).is_err());
        assert!(parse_amount("abc", TOKEN_DECIMALS).is_err());
        assert!(parse_amount("", TOKEN_DECIMALS).is_err());
    }

    #[test]
    fn formats_without_trailing_zeros() {
        assert_eq!(format_amount(U256::exp10(18), TOKEN_DECIMALS), "1");
        assert_eq!(format_amount(U256::exp10(17) * 25, TOKEN_DECIMALS), "2.5");
        assert_eq!(format_amount(U256::zero(), TOKEN_DECIMALS), "0");
        assert_eq!(format_gwei(U256::from(52_000_000_000u64)), "52");
    }

    #[test]
    fn required_args_report_the_missing_key() {
        let args = json!({"to": "0xabc"});
        assert_eq!(get_required_arg::<String>(&args, "to").unwrap(), "0xabc");
        let err = get_required_arg::<String>(&args, "amount").unwrap_err();
        assert!(err.contains("'amount'"));
        assert_eq!(get_optional_arg::<u64>(&args, "count").unwrap(), None);
    }

    #[test]
    fn text_args_accept_numbers() {
        let args = json!({"amount": 1.5, "supply": "1000", "blank": "  "});
        assert_eq!(get_text_arg(&args, "amount").unwrap(), "1.5");
        assert_eq!(get_text_arg(&args, "supply").unwrap(), "1000");
        assert!(get_text_arg(&args, "blank").is_err());
        assert!(get_text_arg(&args, "missing").is_err());
    }
}
