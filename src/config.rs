//! Configuration for the smart pool scripts
//!
//! Everything is read from the environment (and a `.env` file when present),
//! or from a TOML file passed with `--config`. The signer key is never
//! written back out.

use alloy_primitives::{address, Address};
use alloy_signer_local::PrivateKeySigner;
use eyre::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

// ============================================
// PROTOCOL ADDRESSES
// ============================================

/// BActions: stateless helper the proxy delegate-calls into
pub const BACTIONS: Address = address!("2fcc6f96418764439f8dc26af559ed5cddaeefac");

/// Configurable Rights Pool factory
pub const CRP_FACTORY: Address = address!("ed52d8e202401645edad1c0aa21e872498ce47d0");

/// Core BPool factory
pub const BFACTORY: Address = address!("9424b1412450d0f8fc2255faf6046b98213b76bd");

/// DSProxy registry (one proxy per user)
pub const DS_PROXY_REGISTRY: Address = address!("4678f0a6958e4D2Bc4F1BAF7Bc52E8F3564f3fE4");

/// Balancer exchange proxy (smart order router entrypoint)
pub const EXCHANGE_PROXY: Address = address!("3E66B66Fd1d0b02fDa6C811Da9E0547970DB2f21");

/// Fixed addresses of the external protocol contracts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolAddresses {
    pub bactions: Address,
    pub crp_factory: Address,
    pub bfactory: Address,
    pub proxy_registry: Address,
    pub exchange_proxy: Address,
}

impl Default for ProtocolAddresses {
    fn default() -> Self {
        Self {
            bactions: BACTIONS,
            crp_factory: CRP_FACTORY,
            bfactory: BFACTORY,
            proxy_registry: DS_PROXY_REGISTRY,
            exchange_proxy: EXCHANGE_PROXY,
        }
    }
}

impl ProtocolAddresses {
    /// Defaults, overridden by any `*_ADDRESS` variables that are set
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            bactions: env_address("BACTIONS_ADDRESS", defaults.bactions)?,
            crp_factory: env_address("CRP_FACTORY_ADDRESS", defaults.crp_factory)?,
            bfactory: env_address("BFACTORY_ADDRESS", defaults.bfactory)?,
            proxy_registry: env_address("PROXY_REGISTRY_ADDRESS", defaults.proxy_registry)?,
            exchange_proxy: env_address("EXCHANGE_PROXY_ADDRESS", defaults.exchange_proxy)?,
        })
    }

    /// Label/address pairs, in the order deploy-check reports them
    pub fn labelled(&self) -> [(&'static str, Address); 5] {
        [
            ("BActions", self.bactions),
            ("CRP Factory", self.crp_factory),
            ("BFactory", self.bfactory),
            ("DSProxyRegistry", self.proxy_registry),
            ("ExchangeProxy", self.exchange_proxy),
        ]
    }
}

fn env_address(key: &str, default: Address) -> Result<Address> {
    match env::var(key) {
        Ok(value) => Address::from_str(value.trim())
            .map_err(|e| eyre::eyre!("{} is not a valid address ({}): {}", key, value, e)),
        Err(_) => Ok(default),
    }
}

// ============================================
// MAIN CONFIGURATION
// ============================================

/// Main configuration struct
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // ========== Network Settings ==========
    /// JSON-RPC endpoint (a local fork node in practice)
    pub rpc_url: String,

    /// Expected chain id (31337 = Hardhat / Anvil)
    pub chain_id: u64,

    /// Signing key for every transaction (KEEP SECRET!)
    #[serde(skip_serializing)]
    pub private_key: Option<String>,

    // ========== Transaction Settings ==========
    /// Gas limit for every call routed through the proxy
    pub gas_limit: u64,

    /// Max fee used when the node cannot estimate EIP-1559 fees
    pub max_fee_gwei: u64,

    // ========== Protocol ==========
    /// Position of the pool-creation log in the create receipt, used when
    /// the BFactory event cannot be found by signature
    pub pool_log_index: usize,

    // ========== Files ==========
    /// Hardhat `artifacts/` directory holding MockERC20 and BActions builds
    pub artifacts_dir: PathBuf,

    /// Where collected CSV reports are written
    pub output_dir: PathBuf,

    // ========== Data Collection ==========
    /// Number of swaps in the collection loop
    pub swap_iterations: u32,

    /// Base token amount swapped in per iteration (ether units)
    pub swap_amount: String,

    /// Base token (USDC) weight percentage
    pub base_weight: u32,

    /// Quote token (XSGD) weight percentage
    pub quote_weight: u32,

    /// Quote tokens per base token at pool creation
    pub quote_price: f64,

    /// External contracts (`[addresses]` table in TOML)
    pub addresses: ProtocolAddresses,
}

impl Config {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        Ok(Self {
            // Network
            rpc_url: env::var("RPC_URL").unwrap_or(defaults.rpc_url),
            chain_id: env_parse("CHAIN_ID", defaults.chain_id),
            private_key: env::var("PRIVATE_KEY").ok().filter(|k| !k.trim().is_empty()),

            // Transactions
            gas_limit: env_parse("GAS_LIMIT", defaults.gas_limit),
            max_fee_gwei: env_parse("MAX_FEE_GWEI", defaults.max_fee_gwei),

            // Protocol
            pool_log_index: env_parse("POOL_LOG_INDEX", defaults.pool_log_index),

            // Files
            artifacts_dir: env::var("ARTIFACTS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.artifacts_dir),
            output_dir: env::var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),

            // Data collection
            swap_iterations: env_parse("SWAP_ITERATIONS", defaults.swap_iterations),
            swap_amount: env::var("SWAP_AMOUNT").unwrap_or(defaults.swap_amount),
            base_weight: env_parse("BASE_WEIGHT", defaults.base_weight),
            quote_weight: env_parse("QUOTE_WEIGHT", defaults.quote_weight),
            quote_price: env_parse("QUOTE_PRICE", defaults.quote_price),

            addresses: ProtocolAddresses::from_env()?,
        })
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        dotenvy::dotenv().ok();

        let content = fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        // The key never lives in the file
        config.private_key = env::var("PRIVATE_KEY").ok().filter(|k| !k.trim().is_empty());
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Parse the configured signing key
    pub fn signer(&self) -> Result<PrivateKeySigner> {
        let key = self
            .private_key
            .as_deref()
            .ok_or_else(|| eyre::eyre!("PRIVATE_KEY is not set"))?;
        PrivateKeySigner::from_str(key.trim().trim_start_matches("0x"))
            .map_err(|e| eyre::eyre!("PRIVATE_KEY is not a valid secp256k1 key: {}", e))
    }

    /// Validate configuration before sending anything
    pub fn validate(&self) -> Result<()> {
        if self.rpc_url.trim().is_empty() {
            return Err(eyre::eyre!("RPC_URL must not be empty"));
        }
        self.signer()?;

        if self.gas_limit == 0 {
            return Err(eyre::eyre!("GAS_LIMIT must be greater than zero"));
        }
        if self.base_weight == 0 || self.quote_weight == 0 {
            return Err(eyre::eyre!(
                "Token weights must be non-zero (base {}, quote {})",
                self.base_weight,
                self.quote_weight
            ));
        }
        if !self.quote_price.is_finite() || self.quote_price <= 0.0 {
            return Err(eyre::eyre!(
                "QUOTE_PRICE must be a positive number (currently {})",
                self.quote_price
            ));
        }
        crate::units::parse_ether(&self.swap_amount)
            .map_err(|e| eyre::eyre!("SWAP_AMOUNT is invalid: {}", e))?;

        Ok(())
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        let signer = match self.signer() {
            Ok(signer) => format!("{:?}", signer.address()),
            Err(_) => "✗ Not Set".to_string(),
        };

        println!("╔════════════════════════════════════════════════════════════╗");
        println!("║              SMART POOL LAB - CONFIGURATION                ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ RPC:               {:^40} ║", truncate(&self.rpc_url, 40));
        println!("║ Chain ID:          {:^40} ║", self.chain_id);
        println!("║ Signer:            {:^40} ║", truncate(&signer, 40));
        println!("║ Gas Limit:         {:^40} ║", self.gas_limit);
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ PROTOCOL                                                   ║");
        for (label, address) in self.addresses.labelled() {
            println!("║ • {:<16} {:^40} ║", label, truncate(&format!("{:?}", address), 40));
        }
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ DATA COLLECTION                                            ║");
        println!("║ • Weights:         {:^40} ║",
            format!("{} / {}", self.base_weight, self.quote_weight)
        );
        println!("║ • Quote Price:     {:^40} ║", self.quote_price);
        println!("║ • Swaps:           {:^40} ║",
            format!("{} x {}", self.swap_iterations, self.swap_amount)
        );
        println!("║ • Output Dir:      {:^40} ║",
            truncate(&self.output_dir.display().to_string(), 40)
        );
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            chain_id: 31337,
            private_key: None,
            gas_limit: 16_000_000,
            max_fee_gwei: 50,
            pool_log_index: 14,
            artifacts_dir: PathBuf::from("./artifacts"),
            output_dir: PathBuf::from("."),
            swap_iterations: 100,
            swap_amount: "10000".to_string(),
            base_weight: 60,
            quote_weight: 40,
            quote_price: 1.345,
            addresses: ProtocolAddresses::default(),
        }
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        value.to_string()
    } else {
        let head: String = value.chars().take(max - 3).collect();
        format!("{}...", head)
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    // Hardhat account #0, never holds real funds
    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn valid_config() -> Config {
        Config {
            private_key: Some(TEST_KEY.to_string()),
            ..Config::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.gas_limit, 16_000_000);
        assert_eq!(config.swap_iterations, 100);
        assert_eq!(config.pool_log_index, 14);
        assert_eq!(config.addresses.bactions, BACTIONS);
        assert_eq!(config.addresses.proxy_registry, DS_PROXY_REGISTRY);
    }

    #[test]
    fn test_validate_requires_key() {
        let config = Config::default();
        assert!(config.validate().is_err());
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_signer_address() {
        let signer = valid_config().signer().unwrap();
        let expected = Address::from_str("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266").unwrap();
        assert_eq!(signer.address(), expected);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = valid_config();
        config.quote_weight = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.quote_price = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.swap_amount = "ten".to_string();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.gas_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_iterations_is_valid() {
        let mut config = valid_config();
        config.swap_iterations = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_round_trip_drops_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("smartpool.toml");

        let mut config = valid_config();
        config.base_weight = 80;
        config.quote_weight = 20;
        config.save_to_file(&path).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(!written.contains("ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"));

        let loaded: Config = toml::from_str(&written).unwrap();
        assert_eq!(loaded.base_weight, 80);
        assert_eq!(loaded.quote_weight, 20);
        assert_eq!(loaded.addresses, config.addresses);
        assert!(loaded.private_key.is_none());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str("swap_iterations = 5\n").unwrap();
        assert_eq!(config.swap_iterations, 5);
        assert_eq!(config.chain_id, 31337);
        assert_eq!(config.addresses.bfactory, BFACTORY);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 40), "short");
        assert_eq!(truncate("abcdefghij", 6), "abc...");
    }
}
