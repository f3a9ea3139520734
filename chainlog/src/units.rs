//! Conversion between decimal ether strings and base units (wei).

use alloy::primitives::U256;
use alloy::primitives::utils::{format_ether, parse_ether};

use crate::error::{Error, Result};

/// Number of decimals in one ether.
pub const ETHER_DECIMALS: usize = 18;

/// Base units per ether (10^18).
pub const WEI_PER_ETHER: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// Gas limit hint sent with every value transfer (`0x5208`).
pub const TRANSFER_GAS_LIMIT: u64 = 21_000;

/// Parse a decimal ether amount such as `"1.5"` into wei.
///
/// # Errors
///
/// Returns [`Error::Conversion`] for empty, negative, non-numeric input or
/// input with more than 18 fractional digits.
pub fn parse_amount(amount: &str) -> Result<U256> {
    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(Error::conversion("amount is empty"));
    }
    if trimmed.starts_with('-') {
        return Err(Error::conversion(format!("amount is negative: {trimmed}")));
    }
    if let Some((_, frac)) = trimmed.split_once('.')
        && frac.len() > ETHER_DECIMALS
    {
        return Err(Error::conversion(format!(
            "amount has more than {ETHER_DECIMALS} decimals: {trimmed}"
        )));
    }
    parse_ether(trimmed).map_err(|e| Error::conversion(format!("invalid amount {trimmed:?}: {e}")))
}

/// Format wei as a trimmed decimal ether string (`"1.5"`, `"2"`).
#[must_use]
pub fn format_amount(wei: U256) -> String {
    let formatted = format_ether(wei);
    match formatted.split_once('.') {
        Some((whole, frac)) => {
            let frac = frac.trim_end_matches('0');
            if frac.is_empty() {
                whole.to_string()
            } else {
                format!("{whole}.{frac}")
            }
        }
        None => formatted,
    }
}

/// Wei as a floating point ether value, for display.
#[must_use]
pub fn amount_to_f64(wei: U256) -> f64 {
    format_amount(wei).parse().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fractional_amount() {
        let wei = parse_amount("1.5").unwrap();
        assert_eq!(wei, U256::from(1_500_000_000_000_000_000u128));
    }

    #[test]
    fn test_parse_whole_amount() {
        assert_eq!(parse_amount("2").unwrap(), U256::from(2) * WEI_PER_ETHER);
        assert_eq!(parse_amount(" 0.5 ").unwrap(), WEI_PER_ETHER / U256::from(2));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "   ", "abc", "-1", "1.0000000000000000001"] {
            let err = parse_amount(bad).unwrap_err();
            assert!(matches!(err, Error::Conversion(_)), "{bad:?} -> {err}");
        }
    }

    #[test]
    fn test_format_trims_zeros() {
        assert_eq!(format_amount(U256::from(2_000_000_000_000_000_000u128)), "2");
        assert_eq!(format_amount(U256::from(500_000_000_000_000_000u128)), "0.5");
        assert_eq!(format_amount(U256::ZERO), "0");
    }

    #[test]
    fn test_submitted_amount_displays_back() {
        let wei = parse_amount("1.5").unwrap();
        assert!((amount_to_f64(wei) - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_gas_limit_hex() {
        assert_eq!(format!("{TRANSFER_GAS_LIMIT:#x}"), "0x5208");
    }
}
