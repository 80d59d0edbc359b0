//! Scripted flows
//!
//! - `setup`: full proxy flow (create, uncap, whitelist, join)
//! - `create`: pool creation only, with the cap frozen
//! - `collect`: weighted USDC/XSGD pool hammered with swaps, sampled to CSV
//!
//! Each flow is a straight line of awaited calls; the first failure aborts.

use alloy_primitives::{Address, Bytes, U256};
use chrono::Utc;
use console::style;
use eyre::{eyre, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

use crate::artifacts::Artifact;
use crate::chain::ChainClient;
use crate::config::Config;
use crate::contracts::IBPool;
use crate::pool::{demo_pool_params, encode_create_args, CrpParams, PoolParams, Rights, SmartPool, SmartPoolManager};
use crate::proxy::DsProxy;
use crate::report::{sample_pool, Report};
use crate::tokens::{MockToken, MOCK_ERC20};
use crate::units::{ether_from_f64, format_ether, parse_ether};

/// Artifact name of the pool-action helper
pub const BACTIONS: &str = "BActions";

/// Liquidity each side of the collection pool starts from, before weighting
const BASE_LIQUIDITY: f64 = 1_000_000.0;

fn step(title: &str) {
    println!();
    println!("{}", style(format!("═══ {} ═══", title)).blue().bold());
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DemoOptions {
    /// Deploy a fresh BActions from artifacts instead of using the fixed one
    pub deploy_actions: bool,
}

/// Tokens and pool manager shared by `setup` and `create`
struct DemoContext {
    manager: SmartPoolManager,
    token0: MockToken,
    token1: MockToken,
}

async fn prepare_demo(client: &mut ChainClient, config: &Config, opts: DemoOptions) -> Result<DemoContext> {
    step("STEP 1: PROXY & ACTIONS");
    let actions = if opts.deploy_actions {
        let artifact = Artifact::load(&config.artifacts_dir, BACTIONS)?;
        let address = client.deploy(artifact.deploy_code(&[])).await?;
        info!("✓ Deployed BActions at {:?}", address);
        address
    } else {
        config.addresses.bactions
    };

    let proxy = DsProxy::resolve(client, config.addresses.proxy_registry, config.gas_limit).await?;
    let owner = proxy.owner(client).await?;
    if owner != client.address() {
        warn!("Proxy {:?} is owned by {:?}, not the signer", proxy.address, owner);
    }

    step("STEP 2: MOCK TOKENS");
    let artifact = Artifact::load(&config.artifacts_dir, MOCK_ERC20)?;
    let token0 = MockToken::deploy(client, &artifact, "Token0", "TK0").await?;
    let token1 = MockToken::deploy(client, &artifact, "Token1", "TK1").await?;

    let user = client.address();
    let minted = parse_ether("1000")?;
    for token in [&token0, &token1] {
        token.mint(client, user, minted).await?;
        // The proxy pulls the initial balances from the user
        token.approve(client, proxy.address, U256::MAX).await?;
    }
    info!("✓ Minted {} of each token, proxy approved", format_ether(minted));

    Ok(DemoContext {
        manager: SmartPoolManager::new(proxy, actions, config),
        token0,
        token1,
    })
}

/// Create a pool through the proxy, lift its cap, whitelist the proxy as LP
/// and join it.
pub async fn run_setup(client: &mut ChainClient, config: &Config, opts: DemoOptions) -> Result<SmartPool> {
    let ctx = prepare_demo(client, config, opts).await?;
    let manager = &ctx.manager;

    step("STEP 3: CREATE SMART POOL");
    let params = demo_pool_params(ctx.token0.address, ctx.token1.address)?;
    let crp = CrpParams::with_supply(parse_ether("100")?);
    let pool = manager.create(client, &params, &crp, &Rights::all()).await?;

    step("STEP 4: CAP & WHITELIST");
    manager.set_cap(client, &pool, U256::MAX).await?;
    manager
        .whitelist_liquidity_provider(client, &pool, manager.proxy.address)
        .await?;

    step("STEP 5: JOIN");
    let user = client.address();
    let before = balances(client, &pool, &ctx, user).await?;
    manager
        .join(client, &pool, parse_ether("90")?, vec![parse_ether("1")?, parse_ether("1")?])
        .await?;
    let after = balances(client, &pool, &ctx, user).await?;

    for (label, (b, a)) in ["crp", "t0", "t1"].iter().zip(before.iter().zip(after.iter())) {
        info!("{} {} → {}", label, b, a);
    }

    Ok(pool)
}

async fn balances(client: &ChainClient, pool: &SmartPool, ctx: &DemoContext, owner: Address) -> Result<[U256; 3]> {
    Ok([
        SmartPoolManager::share_balance(client, pool, owner).await?,
        ctx.token0.balance_of(client, owner).await?,
        ctx.token1.balance_of(client, owner).await?,
    ])
}

/// Create a pool whose cap can never change; success means nothing reverted.
pub async fn run_create(client: &mut ChainClient, config: &Config, opts: DemoOptions) -> Result<SmartPool> {
    let ctx = prepare_demo(client, config, opts).await?;

    step("STEP 3: CREATE SMART POOL");
    let params = demo_pool_params(ctx.token0.address, ctx.token1.address)?;
    let crp = CrpParams::with_supply(parse_ether("100")?);
    let rights = Rights {
        can_change_cap: false,
        ..Rights::all()
    };
    let pool = ctx.manager.create(client, &params, &crp, &rights).await?;

    let recorded = SmartPoolManager::core_pool(client, pool.crp).await?;
    if recorded != pool.bpool {
        return Err(eyre!(
            "CRP {:?} reports BPool {:?}, creation log said {:?}",
            pool.crp,
            recorded,
            pool.bpool
        ));
    }
    Ok(pool)
}

/// Initial (base, quote) balances for the collection pool.
///
/// The heavier side is scaled up by the weight ratio so both sides start
/// at the quoted price; the quote side is denominated via `quote_price`.
pub fn initial_amounts(base_weight: u32, quote_weight: u32, quote_price: f64) -> (f64, f64) {
    let (wb, wq) = (base_weight as f64, quote_weight as f64);

    let base = if wb > wq { BASE_LIQUIDITY * wb / wq } else { BASE_LIQUIDITY };
    let quote = if wq > wb {
        BASE_LIQUIDITY * quote_price * wq / wb
    } else {
        BASE_LIQUIDITY * quote_price
    };
    (base, quote)
}

/// Create a weighted USDC/XSGD pool, swap into it repeatedly and write the
/// reserve / spot-price trail to CSV.
pub async fn run_collect(client: &mut ChainClient, config: &Config) -> Result<PathBuf> {
    let started = Instant::now();
    let user = client.address();

    step("STEP 1: TOKENS");
    let artifact = Artifact::load(&config.artifacts_dir, MOCK_ERC20)?;
    let usdc = MockToken::deploy(client, &artifact, "USD Coin", "USDC").await?;
    let xsgd = MockToken::deploy(client, &artifact, "Singapore Dollars", "XSGD").await?;

    let (base_amount, quote_amount) =
        initial_amounts(config.base_weight, config.quote_weight, config.quote_price);
    let base_amount = ether_from_f64(base_amount)?;
    let quote_amount = ether_from_f64(quote_amount)?;

    step("STEP 2: CREATE WEIGHTED POOL");
    let proxy = DsProxy::resolve(client, config.addresses.proxy_registry, config.gas_limit).await?;
    let manager = SmartPoolManager::new(proxy, config.addresses.bactions, config);

    for (token, amount) in [(&usdc, base_amount), (&xsgd, quote_amount)] {
        token.approve(client, proxy.address, U256::MAX).await?;
        token.mint(client, user, amount).await?;
    }

    // Denormalized weights: half the percentage, in ether units
    let params = PoolParams {
        symbol: "SPT".to_string(),
        name: "Smart Pool".to_string(),
        tokens: vec![usdc.address, xsgd.address],
        balances: vec![base_amount, quote_amount],
        weights: vec![
            ether_from_f64(config.base_weight as f64 / 2.0)?,
            ether_from_f64(config.quote_weight as f64 / 2.0)?,
        ],
        swap_fee: parse_ether("0.003")?,
    };
    let crp = CrpParams::with_supply((base_amount + quote_amount) / U256::from(2u64));
    let pool = manager.create(client, &params, &crp, &Rights::all()).await?;

    step("STEP 3: SWAP & SAMPLE");
    let mut report = Report::new(&usdc.symbol, config.base_weight, &xsgd.symbol, config.quote_weight);
    report.push(sample_pool(client, usdc.address, xsgd.address, pool.bpool).await?);

    let swap_amount = parse_ether(&config.swap_amount)?;
    usdc.approve(client, pool.bpool, U256::MAX).await?;

    let bar = ProgressBar::new(config.swap_iterations as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{bar:40.cyan/blue}] {pos}/{len} swaps {msg}")?
            .progress_chars("=>-"),
    );

    for _ in 0..config.swap_iterations {
        usdc.mint(client, user, swap_amount).await?;
        client
            .send(
                pool.bpool,
                IBPool::swapExactAmountInCall {
                    tokenIn: usdc.address,
                    tokenAmountIn: swap_amount,
                    tokenOut: xsgd.address,
                    minAmountOut: U256::ZERO,
                    maxPrice: U256::MAX,
                },
                None,
            )
            .await?;

        let sample = sample_pool(client, usdc.address, xsgd.address, pool.bpool).await?;
        bar.set_message(format!("{}/{} = {}", usdc.symbol, xsgd.symbol, format_ether(sample.base_quote)));
        report.push(sample);
        bar.inc(1);
    }
    bar.finish_and_clear();

    let path = report.write_to(&config.output_dir)?;
    info!(
        "Collection finished at {} in {:?}",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
        started.elapsed()
    );
    Ok(path)
}

/// ABI-encoded create arguments with placeholder addresses, for inspection
pub fn encode_demo_args() -> Result<Bytes> {
    // Symbol and name slots hold "Smart Pool" / "SPT" in this order
    let params = PoolParams {
        symbol: "Smart Pool".to_string(),
        name: "SPT".to_string(),
        tokens: vec![Address::ZERO, Address::ZERO],
        balances: vec![U256::from(1u64), U256::from(1u64)],
        weights: vec![parse_ether("25")?, parse_ether("25")?],
        swap_fee: parse_ether("0.1")?,
    };
    let crp = CrpParams {
        initial_supply: parse_ether("100")?,
        min_weight_change_block_period: U256::from(10u64),
        add_token_time_lock_in_blocks: U256::from(10u64),
    };
    Ok(encode_create_args(Address::ZERO, Address::ZERO, &params, &crp, &Rights::all()))
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::IBActions;
    use alloy_sol_types::SolCall;

    #[test]
    fn test_initial_amounts_base_heavy() {
        let (base, quote) = initial_amounts(60, 40, 1.345);
        assert!((base - 1_500_000.0).abs() < 1e-6);
        assert!((quote - 1_345_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_initial_amounts_quote_heavy() {
        let (base, quote) = initial_amounts(20, 80, 1.345);
        assert!((base - 1_000_000.0).abs() < 1e-6);
        assert!((quote - 5_380_000.0).abs() < 1e-3);
    }

    #[test]
    fn test_initial_amounts_equal_weights() {
        let (base, quote) = initial_amounts(50, 50, 2.0);
        assert_eq!(base, 1_000_000.0);
        assert_eq!(quote, 2_000_000.0);
    }

    #[test]
    fn test_encode_demo_args_decodes() {
        let args = encode_demo_args().unwrap();

        let mut calldata = IBActions::createSmartPoolCall::SELECTOR.to_vec();
        calldata.extend_from_slice(&args);
        let decoded = IBActions::createSmartPoolCall::abi_decode(&calldata).unwrap();

        assert_eq!(decoded.factory, Address::ZERO);
        assert_eq!(decoded.poolParams.poolTokenSymbol, "Smart Pool");
        assert_eq!(decoded.poolParams.poolTokenName, "SPT");
        assert_eq!(decoded.poolParams.tokenBalances, vec![U256::from(1u64); 2]);
        assert_eq!(decoded.poolParams.swapFee, parse_ether("0.1").unwrap());
        assert_eq!(decoded.crpParams.minimumWeightChangeBlockPeriod, U256::from(10u64));
        assert!(decoded.rights.canWhitelistLPs);
    }

    /// Runs the pool-creation flow against a node forked from a network
    /// where the Balancer CRP stack lives at the default addresses.
    ///
    /// `RPC_URL=... PRIVATE_KEY=... ARTIFACTS_DIR=... cargo test -- --ignored`
    #[tokio::test]
    #[ignore]
    async fn test_create_smart_pool_on_fork() {
        let config = Config::from_env().unwrap();
        config.validate().unwrap();

        let mut client = ChainClient::connect(&config).await.unwrap();
        let pool = run_create(&mut client, &config, DemoOptions { deploy_actions: true })
            .await
            .unwrap();
        assert_ne!(pool.crp, Address::ZERO);
        assert_ne!(pool.bpool, Address::ZERO);
    }
}
