//! Amount and address handling.
//!
//! Amounts move between human decimal strings and integer base units using
//! the token's declared decimals. All arithmetic is on integers; rounding for
//! display is half-up on base units.

use alloy::primitives::utils::{format_units as alloy_format_units, parse_units};
use alloy::primitives::{Address, U256};
use std::str::FromStr;

use crate::error::{MinterError, MinterResult};

/// A syntactically valid, strictly positive decimal amount.
///
/// Leading zeros of the integer part and trailing zeros of the fraction are
/// dropped, so `"007.50"` and `"7.5"` compare equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecimalAmount {
    integer: String,
    fraction: String,
}

impl DecimalAmount {
    pub fn parse(input: &str) -> MinterResult<Self> {
        let s = input.trim();
        if s.is_empty() {
            return Err(MinterError::InvalidInput("amount is required".to_string()));
        }
        if s.starts_with('-') {
            return Err(MinterError::InvalidInput("amount must be positive".to_string()));
        }

        let (int_part, frac_part) = s.split_once('.').unwrap_or((s, ""));
        let is_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if (int_part.is_empty() && frac_part.is_empty()) || !is_digits(int_part) || !is_digits(frac_part) {
            return Err(MinterError::InvalidInput(format!("'{}' is not a decimal number", s)));
        }

        let integer = int_part.trim_start_matches('0');
        let fraction = frac_part.trim_end_matches('0');
        if integer.is_empty() && fraction.is_empty() {
            return Err(MinterError::InvalidInput("amount must be positive".to_string()));
        }

        Ok(Self {
            integer: integer.to_string(),
            fraction: fraction.to_string(),
        })
    }

    /// Number of significant fractional digits.
    pub fn scale(&self) -> usize {
        self.fraction.len()
    }

    /// Convert to base units for a token with `decimals` decimals.
    pub fn to_base_units(&self, decimals: u8) -> MinterResult<U256> {
        if self.scale() > decimals as usize {
            return Err(MinterError::InvalidInput(format!(
                "amount has more than {} decimal places",
                decimals
            )));
        }
        parse_units(&self.to_string(), decimals)
            .map(|units| units.get_absolute())
            .map_err(|e| MinterError::InvalidInput(format!("amount out of range: {}", e)))
    }
}

impl std::fmt::Display for DecimalAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let integer = if self.integer.is_empty() { "0" } else { &self.integer };
        if self.fraction.is_empty() {
            write!(f, "{}", integer)
        } else {
            write!(f, "{}.{}", integer, self.fraction)
        }
    }
}

/// Full-precision rendering of a base-unit value.
pub fn format_units(value: U256, decimals: u8) -> MinterResult<String> {
    if decimals == 0 {
        return Ok(value.to_string());
    }
    alloy_format_units(value, decimals).map_err(|e| MinterError::Decode(e.to_string()))
}

/// Render a base-unit value rounded half-up to `places` fractional digits.
pub fn display_units(value: U256, decimals: u8, places: u8) -> MinterResult<String> {
    if places >= decimals {
        return format_units(value, decimals);
    }
    let scale = U256::from(10u64).pow(U256::from(decimals - places));
    let rounded = value.saturating_add(scale / U256::from(2u64)) / scale;
    format_units(rounded, places)
}

/// Validate a recipient address.
///
/// Requires `0x` and 40 hex digits. All-lowercase and all-uppercase forms are
/// accepted as is; mixed case must carry a valid EIP-55 checksum.
pub fn parse_recipient(input: &str) -> MinterResult<Address> {
    let s = input.trim();
    let invalid = || MinterError::InvalidInput(format!("'{}' is not a valid address", s));

    let hex = s.strip_prefix("0x").ok_or_else(invalid)?;
    if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let has_lower = hex.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = hex.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        Address::parse_checksummed(s, None)
            .map_err(|_| MinterError::InvalidInput(format!("'{}' has an invalid checksum", s)))
    } else {
        Address::from_str(s).map_err(|_| invalid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ether(n: u64) -> U256 {
        U256::from(n) * U256::from(10u64).pow(U256::from(18u64))
    }

    #[test]
    fn test_parse_accepts_decimals() {
        assert_eq!(DecimalAmount::parse("100").unwrap().to_string(), "100");
        assert_eq!(DecimalAmount::parse(" 007.50 ").unwrap().to_string(), "7.5");
        assert_eq!(DecimalAmount::parse(".25").unwrap().to_string(), "0.25");
        assert_eq!(DecimalAmount::parse("3.").unwrap().to_string(), "3");
    }

    #[test]
    fn test_parse_rejects_non_positive() {
        for input in ["0", "0.000", "-1", "-0.5", "", "   "] {
            let err = DecimalAmount::parse(input).unwrap_err();
            assert!(matches!(err, MinterError::InvalidInput(_)), "{input:?} accepted");
        }
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for input in ["abc", "1e18", "1.2.3", "+5", "1,5", ".", "0x10"] {
            assert!(DecimalAmount::parse(input).is_err(), "{input:?} accepted");
        }
    }

    #[test]
    fn test_to_base_units() {
        let amount = DecimalAmount::parse("1.5").unwrap();
        assert_eq!(amount.to_base_units(18).unwrap(), ether(3) / U256::from(2u64));
        assert_eq!(amount.to_base_units(1).unwrap(), U256::from(15u64));

        let whole = DecimalAmount::parse("42").unwrap();
        assert_eq!(whole.to_base_units(0).unwrap(), U256::from(42u64));
    }

    #[test]
    fn test_too_many_fraction_digits() {
        let amount = DecimalAmount::parse("0.001").unwrap();
        assert!(amount.to_base_units(2).is_err());
        assert_eq!(amount.to_base_units(3).unwrap(), U256::from(1u64));
    }

    #[test]
    fn test_display_rounds_half_up() {
        let value = U256::from(1_234_550_000_000_000_000u64);
        assert_eq!(display_units(value, 18, 4).unwrap(), "1.2346");
        let value = U256::from(1_234_549_999_999_999_999u64);
        assert_eq!(display_units(value, 18, 4).unwrap(), "1.2345");
        assert_eq!(display_units(ether(7), 18, 4).unwrap(), "7.0000");
    }

    #[test]
    fn test_display_whole_units() {
        assert_eq!(display_units(U256::from(2_600_000_000_000_000_000u64), 18, 0).unwrap(), "3");
        assert_eq!(display_units(U256::from(5u64), 0, 4).unwrap(), "5");
    }

    #[test]
    fn test_roundtrip_within_display_unit() {
        let unit = U256::from(10u64).pow(U256::from(14u64));
        for input in ["1", "0.00005", "123.456789", "99999.99995", "0.0001", "1000000.123456789012345678"] {
            let base = DecimalAmount::parse(input).unwrap().to_base_units(18).unwrap();
            let shown = display_units(base, 18, 4).unwrap();
            let back = DecimalAmount::parse(&shown)
                .map(|a| a.to_base_units(18).unwrap())
                .unwrap_or(U256::ZERO);
            let diff = if back > base { back - base } else { base - back };
            assert!(diff <= unit, "{input} displayed as {shown}");
        }
    }

    #[test]
    fn test_parse_recipient() {
        let checksummed = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
        let addr = parse_recipient(checksummed).unwrap();
        assert_eq!(addr.to_string(), checksummed);

        assert!(parse_recipient(&checksummed.to_lowercase()).is_ok());
        assert!(parse_recipient("0xF39FD6E51AAD88F6F4CE6AB8827279CFFFB92266").is_ok());
    }

    #[test]
    fn test_parse_recipient_rejects() {
        // bad checksum: first letter case flipped
        assert!(parse_recipient("0xF39Fd6e51aad88F6F4ce6aB8827279cffFb92266").is_err());
        assert!(parse_recipient("f39fd6e51aad88f6f4ce6ab8827279cfffb92266").is_err());
        assert!(parse_recipient("0x742d35Cc6634C0532925a3b8D0C9").is_err());
        assert!(parse_recipient("0xzz9fd6e51aad88f6f4ce6ab8827279cfffb92266").is_err());
        assert!(parse_recipient("").is_err());
    }
}
