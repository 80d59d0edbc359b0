//! Smart Pool Operations
//!
//! Parameter records and calldata for the BActions entrypoints, plus the
//! proxy-routed create / cap / whitelist / join sequence.
//!
//! Pool creation emits a `LOG_NEW_POOL(caller, pool)` from the BFactory
//! where `caller` is the new CRP and `pool` its core BPool. That log is
//! found by signature; a fixed receipt index is the fallback.

use alloy_primitives::{Address, Bytes, Log, U256};
use alloy_rpc_types::TransactionReceipt;
use alloy_sol_types::{SolCall, SolEvent};
use eyre::{eyre, Result};
use tracing::{debug, info, warn};

use crate::chain::ChainClient;
use crate::config::Config;
use crate::contracts::{IBActions, IBFactory, IConfigurableRightsPool};
use crate::proxy::DsProxy;
use crate::units::parse_ether;

// ============================================
// PARAMETERS
// ============================================

/// Pool token metadata and initial composition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolParams {
    pub symbol: String,
    pub name: String,
    pub tokens: Vec<Address>,
    pub balances: Vec<U256>,
    pub weights: Vec<U256>,
    pub swap_fee: U256,
}

impl PoolParams {
    /// Tokens, balances and weights must line up one-to-one
    pub fn validate(&self) -> Result<()> {
        if self.tokens.is_empty() {
            return Err(eyre!("pool {} has no constituent tokens", self.symbol));
        }
        if self.balances.len() != self.tokens.len() || self.weights.len() != self.tokens.len() {
            return Err(eyre!(
                "pool {} has {} tokens but {} balances and {} weights",
                self.symbol,
                self.tokens.len(),
                self.balances.len(),
                self.weights.len()
            ));
        }
        Ok(())
    }
}

impl From<&PoolParams> for IBActions::PoolParams {
    fn from(params: &PoolParams) -> Self {
        Self {
            poolTokenSymbol: params.symbol.clone(),
            poolTokenName: params.name.clone(),
            constituentTokens: params.tokens.clone(),
            tokenBalances: params.balances.clone(),
            tokenWeights: params.weights.clone(),
            swapFee: params.swap_fee,
        }
    }
}

/// CRP supply and timing parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrpParams {
    pub initial_supply: U256,
    pub min_weight_change_block_period: U256,
    pub add_token_time_lock_in_blocks: U256,
}

impl CrpParams {
    /// The block periods every script uses (90000 / 500)
    pub fn with_supply(initial_supply: U256) -> Self {
        Self {
            initial_supply,
            min_weight_change_block_period: U256::from(90_000u64),
            add_token_time_lock_in_blocks: U256::from(500u64),
        }
    }
}

impl From<&CrpParams> for IBActions::CrpParams {
    fn from(params: &CrpParams) -> Self {
        Self {
            initialSupply: params.initial_supply,
            minimumWeightChangeBlockPeriod: params.min_weight_change_block_period,
            addTokenTimeLockInBlocks: params.add_token_time_lock_in_blocks,
        }
    }
}

/// Controller rights granted to the pool's owner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rights {
    pub can_pause_swapping: bool,
    pub can_change_swap_fee: bool,
    pub can_change_weights: bool,
    pub can_add_remove_tokens: bool,
    pub can_whitelist_lps: bool,
    pub can_change_cap: bool,
}

impl Rights {
    pub fn all() -> Self {
        Self {
            can_pause_swapping: true,
            can_change_swap_fee: true,
            can_change_weights: true,
            can_add_remove_tokens: true,
            can_whitelist_lps: true,
            can_change_cap: true,
        }
    }
}

impl From<&Rights> for IBActions::Rights {
    fn from(rights: &Rights) -> Self {
        Self {
            canPauseSwapping: rights.can_pause_swapping,
            canChangeSwapFee: rights.can_change_swap_fee,
            canChangeWeights: rights.can_change_weights,
            canAddRemoveTokens: rights.can_add_remove_tokens,
            canWhitelistLPs: rights.can_whitelist_lps,
            canChangeCap: rights.can_change_cap,
        }
    }
}

/// Addresses created by a successful `createSmartPool`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmartPool {
    /// Configurable Rights Pool (also the pool share token)
    pub crp: Address,
    /// Core pool holding the reserves
    pub bpool: Address,
}

// ============================================
// CALLDATA
// ============================================

fn create_call(
    factory: Address,
    bfactory: Address,
    params: &PoolParams,
    crp: &CrpParams,
    rights: &Rights,
) -> IBActions::createSmartPoolCall {
    IBActions::createSmartPoolCall {
        factory,
        bFactory: bfactory,
        poolParams: params.into(),
        crpParams: crp.into(),
        rights: rights.into(),
    }
}

/// BActions calldata creating a smart pool
pub fn encode_create_smart_pool(
    factory: Address,
    bfactory: Address,
    params: &PoolParams,
    crp: &CrpParams,
    rights: &Rights,
) -> Result<Bytes> {
    params.validate()?;
    Ok(create_call(factory, bfactory, params, crp, rights).abi_encode().into())
}

/// The create arguments alone, ABI-encoded as a parameter list (no selector)
pub fn encode_create_args(
    factory: Address,
    bfactory: Address,
    params: &PoolParams,
    crp: &CrpParams,
    rights: &Rights,
) -> Bytes {
    let mut out = Vec::new();
    create_call(factory, bfactory, params, crp, rights).abi_encode_raw(&mut out);
    out.into()
}

pub fn encode_set_cap(crp: Address, new_cap: U256) -> Bytes {
    IBActions::setCapCall { crp, newCap: new_cap }.abi_encode().into()
}

pub fn encode_whitelist(crp: Address, provider: Address) -> Bytes {
    IBActions::whitelistLiquidityProviderCall { crp, provider }
        .abi_encode()
        .into()
}

pub fn encode_join(crp: Address, pool_amount_out: U256, max_amounts_in: Vec<U256>) -> Bytes {
    IBActions::joinSmartPoolCall {
        pool: crp,
        poolAmountOut: pool_amount_out,
        maxAmountsIn: max_amounts_in,
    }
    .abi_encode()
    .into()
}

// ============================================
// RECEIPT PARSING
// ============================================

/// Recover the CRP and BPool created in a `createSmartPool` receipt
pub fn extract_smart_pool(logs: &[Log], bfactory: Address, fallback_index: usize) -> Result<SmartPool> {
    let by_signature = logs.iter().find(|log| {
        log.address == bfactory
            && log.topics().first() == Some(&IBFactory::LOG_NEW_POOL::SIGNATURE_HASH)
    });

    let log = match by_signature {
        Some(log) => log,
        None => {
            warn!(
                "No LOG_NEW_POOL from {:?} in receipt, reading log #{}",
                bfactory, fallback_index
            );
            logs.get(fallback_index).ok_or_else(|| {
                eyre!(
                    "receipt has {} logs, pool creation log #{} is missing",
                    logs.len(),
                    fallback_index
                )
            })?
        }
    };

    match log.topics() {
        [_, caller, pool, ..] => Ok(SmartPool {
            crp: Address::from_word(*caller),
            bpool: Address::from_word(*pool),
        }),
        topics => Err(eyre!(
            "pool creation log has {} topics, expected at least 3",
            topics.len()
        )),
    }
}

fn receipt_logs(receipt: &TransactionReceipt) -> Vec<Log> {
    receipt.inner.logs().iter().map(|log| log.inner.clone()).collect()
}

// ============================================
// MANAGER
// ============================================

/// Runs BActions entrypoints through the user's proxy
pub struct SmartPoolManager {
    pub proxy: DsProxy,
    pub actions: Address,
    crp_factory: Address,
    bfactory: Address,
    log_index: usize,
}

impl SmartPoolManager {
    pub fn new(proxy: DsProxy, actions: Address, config: &Config) -> Self {
        Self {
            proxy,
            actions,
            crp_factory: config.addresses.crp_factory,
            bfactory: config.addresses.bfactory,
            log_index: config.pool_log_index,
        }
    }

    /// Create a smart pool; the proxy pulls the initial balances from the user
    pub async fn create(
        &self,
        client: &mut ChainClient,
        params: &PoolParams,
        crp: &CrpParams,
        rights: &Rights,
    ) -> Result<SmartPool> {
        let data = encode_create_smart_pool(self.crp_factory, self.bfactory, params, crp, rights)?;
        info!("Creating smart pool {} ({})...", params.symbol, params.name);

        let receipt = self.proxy.execute(client, self.actions, data).await?;
        let logs = receipt_logs(&receipt);
        debug!("createSmartPool emitted {} logs", logs.len());

        let pool = extract_smart_pool(&logs, self.bfactory, self.log_index)?;
        info!("✓ CRP {:?}, BPool {:?}", pool.crp, pool.bpool);
        Ok(pool)
    }

    pub async fn set_cap(&self, client: &mut ChainClient, pool: &SmartPool, cap: U256) -> Result<()> {
        self.proxy
            .execute(client, self.actions, encode_set_cap(pool.crp, cap))
            .await?;
        info!("✓ Cap set to {}", if cap == U256::MAX { "unlimited".to_string() } else { cap.to_string() });
        Ok(())
    }

    pub async fn whitelist_liquidity_provider(
        &self,
        client: &mut ChainClient,
        pool: &SmartPool,
        provider: Address,
    ) -> Result<()> {
        self.proxy
            .execute(client, self.actions, encode_whitelist(pool.crp, provider))
            .await?;
        info!("✓ Whitelisted LP {:?}", provider);
        Ok(())
    }

    /// Mint `pool_amount_out` pool shares, paying at most `max_amounts_in`
    pub async fn join(
        &self,
        client: &mut ChainClient,
        pool: &SmartPool,
        pool_amount_out: U256,
        max_amounts_in: Vec<U256>,
    ) -> Result<()> {
        self.proxy
            .execute(client, self.actions, encode_join(pool.crp, pool_amount_out, max_amounts_in))
            .await?;
        info!("✓ Joined {:?}", pool.crp);
        Ok(())
    }

    /// Pool share balance of `owner`
    pub async fn share_balance(client: &ChainClient, pool: &SmartPool, owner: Address) -> Result<U256> {
        client
            .call(pool.crp, IConfigurableRightsPool::balanceOfCall { account: owner })
            .await
    }

    /// BPool address as recorded by the CRP itself
    pub async fn core_pool(client: &ChainClient, crp: Address) -> Result<Address> {
        client.call(crp, IConfigurableRightsPool::bPoolCall {}).await
    }
}

/// The pool `setup` and `create` use: two tokens, 1:1 balances, 25/25 weights, 10% fee
pub fn demo_pool_params(token0: Address, token1: Address) -> Result<PoolParams> {
    Ok(PoolParams {
        symbol: "SPT".to_string(),
        name: "Smart Pool".to_string(),
        tokens: vec![token0, token1],
        balances: vec![parse_ether("1")?, parse_ether("1")?],
        weights: vec![parse_ether("25")?, parse_ether("25")?],
        swap_fee: parse_ether("0.1")?,
    })
}

// ============================================
// TESTS
// ============================================
