//! Fee Oracle
//!
//! Asks the node for EIP-1559 fees, then for a legacy gas price, and
//! finally falls back to the configured max fee.

use alloy_provider::Provider;
use alloy_transport::TransportResult;
use tracing::{debug, warn};

const GWEI: u128 = 1_000_000_000;

/// Tip used whenever the node does not suggest one
const FALLBACK_PRIORITY_FEE: u128 = GWEI;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeSource {
    Eip1559,
    GasPrice,
    Fallback,
}

impl std::fmt::Display for FeeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeeSource::Eip1559 => write!(f, "eth_feeHistory"),
            FeeSource::GasPrice => write!(f, "eth_gasPrice"),
            FeeSource::Fallback => write!(f, "Fallback"),
        }
    }
}

/// Fees for a single EIP-1559 transaction, in wei
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeQuote {
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
    pub source: FeeSource,
}

impl FeeQuote {
    pub fn max_fee_gwei(&self) -> f64 {
        self.max_fee_per_gas as f64 / GWEI as f64
    }

    /// Upper bound of what `gas_used` costs, in ether
    pub fn max_cost_eth(&self, gas_used: u64) -> f64 {
        (gas_used as f64) * (self.max_fee_per_gas as f64) * 1e-18
    }
}

pub struct FeeOracle {
    fallback_max_fee_gwei: u64,
}

impl FeeOracle {
    pub fn new(fallback_max_fee_gwei: u64) -> Self {
        Self { fallback_max_fee_gwei }
    }

    /// Current fees from the node, or the fallback
    pub async fn estimate<P: Provider>(&self, provider: &P) -> FeeQuote {
        match provider.estimate_eip1559_fees().await {
            Ok(estimate) => {
                let quote = FeeQuote {
                    max_fee_per_gas: estimate.max_fee_per_gas,
                    max_priority_fee_per_gas: estimate.max_priority_fee_per_gas,
                    source: FeeSource::Eip1559,
                };
                debug!("⛽ Fees from {}: {:.2} gwei", quote.source, quote.max_fee_gwei());
                return quote;
            }
            Err(e) => warn!("EIP-1559 fee estimate failed: {}", e),
        }

        self.from_gas_price(provider.get_gas_price().await)
    }

    fn from_gas_price(&self, gas_price: TransportResult<u128>) -> FeeQuote {
        match gas_price {
            Ok(price) => FeeQuote {
                max_fee_per_gas: price,
                max_priority_fee_per_gas: price.min(FALLBACK_PRIORITY_FEE),
                source: FeeSource::GasPrice,
            },
            Err(e) => {
                warn!(
                    "eth_gasPrice failed ({}), using fallback {} gwei",
                    e, self.fallback_max_fee_gwei
                );
                self.fallback()
            }
        }
    }

    pub fn fallback(&self) -> FeeQuote {
        let max_fee = self.fallback_max_fee_gwei as u128 * GWEI;
        FeeQuote {
            max_fee_per_gas: max_fee,
            max_priority_fee_per_gas: max_fee.min(FALLBACK_PRIORITY_FEE),
            source: FeeSource::Fallback,
        }
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_transport::TransportErrorKind;

    #[test]
    fn test_fallback_quote() {
        let quote = FeeOracle::new(50).fallback();
        assert_eq!(quote.max_fee_per_gas, 50 * GWEI);
        assert_eq!(quote.max_priority_fee_per_gas, GWEI);
        assert_eq!(quote.source, FeeSource::Fallback);
    }

    #[test]
    fn test_priority_fee_never_exceeds_max_fee() {
        let oracle = FeeOracle::new(50);
        let quote = oracle.from_gas_price(Ok(GWEI / 2));
        assert_eq!(quote.source, FeeSource::GasPrice);
        assert_eq!(quote.max_priority_fee_per_gas, GWEI / 2);

        let quote = FeeOracle::new(0).fallback();
        assert_eq!(quote.max_priority_fee_per_gas, 0);
    }

    #[test]
    fn test_gas_price_error_falls_back() {
        let oracle = FeeOracle::new(7);
        let quote = oracle.from_gas_price(Err(TransportErrorKind::custom_str("node offline")));
        assert_eq!(quote.source, FeeSource::Fallback);
        assert_eq!(quote.max_fee_per_gas, 7 * GWEI);
    }

    #[test]
    fn test_unreachable_node_uses_fallback() {
        let provider = alloy_provider::ProviderBuilder::new()
            .connect_http("http://127.0.0.1:1".parse().unwrap());
        let oracle = FeeOracle::new(3);

        let quote = tokio_test::block_on(oracle.estimate(&provider));
        assert_eq!(quote, oracle.fallback());
    }

    #[test]
    fn test_max_cost() {
        let quote = FeeOracle::new(20).fallback();
        // 16M gas at 20 gwei = 0.32 ETH
        assert!((quote.max_cost_eth(16_000_000) - 0.32).abs() < 1e-9);
    }
}
