//! Chain client - signing, submission and reads
//!
//! Every write is a locally signed EIP-1559 transaction submitted raw and
//! awaited until mined. Calls are strictly sequential, so the nonce is
//! tracked locally after being seeded once from the node.
//!
//! ⚠️  A reverted receipt is returned as an error; the scripts do not retry.

use alloy_consensus::{SignableTransaction, Transaction, TxEip1559, TxEnvelope};
use alloy_eips::eip2718::Encodable2718;
use alloy_network::{Ethereum, ReceiptResponse};
use alloy_primitives::{Address, Bytes, TxHash, TxKind, U256};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_types::{TransactionReceipt, TransactionRequest};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::SolCall;
use eyre::{eyre, Result};
use std::time::Duration;
use tokio::time::{interval, timeout};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::gas::FeeOracle;

/// Headroom added on top of `eth_estimateGas`, in percent
const GAS_ESTIMATE_HEADROOM_PCT: u64 = 20;

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(250);
const RECEIPT_TIMEOUT: Duration = Duration::from_secs(120);

pub struct ChainClient {
    provider: DynProvider<Ethereum>,
    signer: PrivateKeySigner,
    chain_id: u64,
    nonce: u64,
    fees: FeeOracle,
}

impl ChainClient {
    /// Connect to the configured node and load the signer
    pub async fn connect(config: &Config) -> Result<Self> {
        let url = config
            .rpc_url
            .parse()
            .map_err(|e| eyre!("Invalid RPC_URL '{}': {}", config.rpc_url, e))?;
        let provider = ProviderBuilder::new().connect_http(url).erased();

        let signer = config.signer()?;
        let address = signer.address();

        let chain_id = provider.get_chain_id().await?;
        if chain_id != config.chain_id {
            warn!(
                "Node reports chain id {} but CHAIN_ID is {}; signing for {}",
                chain_id, config.chain_id, chain_id
            );
        }

        let nonce = provider.get_transaction_count(address).pending().await?;
        info!("✓ Signer {:?} on chain {} (nonce {})", address, chain_id, nonce);

        Ok(Self {
            provider,
            signer,
            chain_id,
            nonce,
            fees: FeeOracle::new(config.max_fee_gwei),
        })
    }

    /// Address every transaction is sent from
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Read-only `eth_call`
    pub async fn call<C: SolCall>(&self, to: Address, call: C) -> Result<C::Return> {
        let tx = TransactionRequest::default()
            .from(self.address())
            .to(to)
            .input(call.abi_encode().into());
        let result = self.provider.call(tx).await?;
        C::abi_decode_returns(&result)
            .map_err(|e| eyre!("Failed to decode {} from {:?}: {}", C::SIGNATURE, to, e))
    }

    /// Send a contract call and wait for it to be mined.
    ///
    /// Without a `gas_limit` the node's estimate (plus headroom) is used.
    pub async fn send<C: SolCall>(
        &mut self,
        to: Address,
        call: C,
        gas_limit: Option<u64>,
    ) -> Result<TransactionReceipt> {
        debug!("→ {} on {:?}", C::SIGNATURE, to);
        self.submit(TxKind::Call(to), call.abi_encode().into(), gas_limit).await
    }

    /// Deploy creation code, returning the new contract address
    pub async fn deploy(&mut self, code: Bytes) -> Result<Address> {
        let receipt = self.submit(TxKind::Create, code, None).await?;
        receipt
            .contract_address
            .ok_or_else(|| eyre!("Deployment {} produced no contract address", receipt.transaction_hash))
    }

    async fn submit(
        &mut self,
        to: TxKind,
        input: Bytes,
        gas_limit: Option<u64>,
    ) -> Result<TransactionReceipt> {
        let gas_limit = match gas_limit {
            Some(limit) => limit,
            None => self.estimate_gas(to, &input).await?,
        };
        let fees = self.fees.estimate(&self.provider).await;

        let tx = TxEip1559 {
            chain_id: self.chain_id,
            nonce: self.nonce,
            gas_limit,
            max_fee_per_gas: fees.max_fee_per_gas,
            max_priority_fee_per_gas: fees.max_priority_fee_per_gas,
            to,
            value: U256::ZERO,
            access_list: Default::default(),
            input,
        };
        let raw = self.sign_transaction(tx).await?;

        let pending = self.provider.send_raw_transaction(&raw).await?;
        let tx_hash = *pending.tx_hash();
        // The node accepted it, so the nonce is consumed either way
        self.nonce += 1;

        let receipt = self.wait_for_receipt(tx_hash).await?;
        if !receipt.status() {
            return Err(eyre!(
                "transaction {} reverted (gas used {} of {})",
                tx_hash,
                receipt.gas_used,
                gas_limit
            ));
        }

        debug!(
            "✓ {} mined in block {:?}, gas used {} (≤ {:.5} ETH)",
            tx_hash,
            receipt.block_number,
            receipt.gas_used,
            fees.max_cost_eth(receipt.gas_used)
        );
        Ok(receipt)
    }

    /// Poll `eth_getTransactionReceipt` until the transaction is mined
    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TransactionReceipt> {
        let poll = async {
            let mut ticker = interval(RECEIPT_POLL_INTERVAL);
            loop {
                ticker.tick().await;
                match self.provider.get_transaction_receipt(tx_hash).await? {
                    Some(receipt) => return Ok::<_, eyre::Report>(receipt),
                    None => debug!("{} pending", tx_hash),
                }
            }
        };

        timeout(RECEIPT_TIMEOUT, poll)
            .await
            .map_err(|_| eyre!("transaction {} not mined after {:?}", tx_hash, RECEIPT_TIMEOUT))?
    }

    async fn estimate_gas(&self, to: TxKind, input: &Bytes) -> Result<u64> {
        let mut request = TransactionRequest::default()
            .from(self.address())
            .input(input.clone().into());
        request.to = Some(to);

        let estimate = self
            .provider
            .estimate_gas(request)
            .await
            .map_err(|e| eyre!("Gas estimation failed (call would revert?): {}", e))?;
        Ok(estimate + estimate * GAS_ESTIMATE_HEADROOM_PCT / 100)
    }

    /// Sign an EIP-1559 transaction and return its EIP-2718 encoding
    async fn sign_transaction(&self, tx: TxEip1559) -> Result<Bytes> {
        let sig_hash = tx.signature_hash();

        let signature = self
            .signer
            .sign_hash(&sig_hash)
            .await
            .map_err(|e| eyre!("Failed to sign transaction: {}", e))?;

        let signed = TxEnvelope::from(tx.into_signed(signature));

        debug!(
            "Signed EIP-1559 transaction: to={:?}, nonce={}, gas_limit={}",
            signed.kind(),
            signed.nonce(),
            signed.gas_limit()
        );

        Ok(signed.encoded_2718().into())
    }
}
