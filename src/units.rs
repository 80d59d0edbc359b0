//! Ether-denominated amounts (18 decimals)

use alloy_primitives::U256;
use eyre::{eyre, Result};

const DECIMALS: usize = 18;

fn one_ether() -> U256 {
    U256::from(10u64).pow(U256::from(DECIMALS))
}

/// Parse a decimal string such as `"0.003"` into wei
pub fn parse_ether(value: &str) -> Result<U256> {
    alloy_primitives::utils::parse_ether(value.trim())
        .map_err(|e| eyre!("invalid ether amount {:?}: {}", value, e))
}

/// Convert a float to wei through its shortest decimal form.
///
/// Digits past the 18th decimal are dropped rather than rejected.
pub fn ether_from_f64(value: f64) -> Result<U256> {
    if !value.is_finite() || value < 0.0 {
        return Err(eyre!("cannot convert {} to an ether amount", value));
    }

    let repr = value.to_string();
    let repr = match repr.split_once('.') {
        Some((whole, frac)) if frac.len() > DECIMALS => format!("{}.{}", whole, &frac[..DECIMALS]),
        _ => repr,
    };
    parse_ether(&repr)
}

/// Render wei as ether, trimming trailing zeros but keeping one decimal
/// (`1.0`, `0.5`, `1345000.25`).
pub fn format_ether(value: U256) -> String {
    let (whole, frac) = value.div_rem(one_ether());
    let frac = format!("{:0>width$}", frac.to_string(), width = DECIMALS);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        format!("{}.0", whole)
    } else {
        format!("{}.{}", whole, frac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_ether() {
        assert_eq!(format_ether(U256::ZERO), "0.0");
        assert_eq!(format_ether(one_ether()), "1.0");
        assert_eq!(format_ether(U256::from(1_345_000_000_000_000_000u128)), "1.345");
        assert_eq!(format_ether(U256::from(1u64)), "0.000000000000000001");
        assert_eq!(
            format_ether(U256::from(1_500_000u64) * one_ether()),
            "1500000.0"
        );
    }

    #[test]
    fn test_parse_ether() {
        assert_eq!(parse_ether("1").unwrap(), one_ether());
        assert_eq!(parse_ether("0.003").unwrap(), U256::from(3_000_000_000_000_000u64));
        assert_eq!(parse_ether(" 25 ").unwrap(), U256::from(25u64) * one_ether());
        assert!(parse_ether("abc").is_err());
    }

    #[test]
    fn test_ether_from_f64() {
        assert_eq!(ether_from_f64(30.0).unwrap(), U256::from(30u64) * one_ether());
        assert_eq!(
            ether_from_f64(1_500_000.0).unwrap(),
            U256::from(1_500_000u64) * one_ether()
        );
        assert_eq!(ether_from_f64(0.5).unwrap(), one_ether() / U256::from(2u64));
        assert!(ether_from_f64(-1.0).is_err());
        assert!(ether_from_f64(f64::INFINITY).is_err());
    }

    #[test]
    fn test_ether_from_f64_truncates_excess_precision() {
        let tiny = ether_from_f64(1e-19).unwrap();
        assert_eq!(tiny, U256::ZERO);
    }
}
