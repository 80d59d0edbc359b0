//! DSProxy resolution and execution
//!
//! Smart pool actions run as `proxy.execute(bactions, calldata)`, so the
//! pool ends up controlled by the user's proxy rather than the EOA.

use alloy_primitives::{Address, Bytes};
use alloy_rpc_types::TransactionReceipt;
use eyre::{eyre, Result};
use tracing::info;

use crate::chain::ChainClient;
use crate::contracts::{IDSProxy, IDSProxyRegistry};

/// Return the caller's proxy, building one through the registry if needed
pub async fn resolve_proxy(client: &mut ChainClient, registry: Address) -> Result<Address> {
    let owner = client.address();

    let existing = client
        .call(registry, IDSProxyRegistry::proxiesCall { owner })
        .await?;
    if existing != Address::ZERO {
        info!("✓ Using existing proxy {:?}", existing);
        return Ok(existing);
    }

    info!("No proxy for {:?}, building one...", owner);
    client
        .send(registry, IDSProxyRegistry::buildCall {}, None)
        .await?;

    let built = client
        .call(registry, IDSProxyRegistry::proxiesCall { owner })
        .await?;
    if built == Address::ZERO {
        return Err(eyre!("Registry {:?} did not record a proxy for {:?}", registry, owner));
    }

    info!("✓ Built proxy {:?}", built);
    Ok(built)
}

/// A user's DSProxy, forwarding every call with a fixed gas limit
#[derive(Debug, Clone, Copy)]
pub struct DsProxy {
    pub address: Address,
    gas_limit: u64,
}

impl DsProxy {
    pub fn new(address: Address, gas_limit: u64) -> Self {
        Self { address, gas_limit }
    }

    /// Resolve (or build) the signer's proxy
    pub async fn resolve(client: &mut ChainClient, registry: Address, gas_limit: u64) -> Result<Self> {
        let address = resolve_proxy(client, registry).await?;
        Ok(Self::new(address, gas_limit))
    }

    /// Delegate-call `data` into `target` through the proxy
    pub async fn execute(
        &self,
        client: &mut ChainClient,
        target: Address,
        data: Bytes,
    ) -> Result<TransactionReceipt> {
        client
            .send(
                self.address,
                IDSProxy::executeCall { target, data },
                Some(self.gas_limit),
            )
            .await
            .map_err(|e| e.wrap_err(format!("proxy {:?} execute on {:?} failed", self.address, target)))
    }

    pub async fn owner(&self, client: &ChainClient) -> Result<Address> {
        client.call(self.address, IDSProxy::ownerCall {}).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::testing::*;
    use alloy_primitives::{address, B256, U256};
    use alloy_transport::mock::Asserter;

    const REGISTRY: Address = address!("4444444444444444444444444444444444444444");
    const PROXY: Address = address!("5555555555555555555555555555555555555555");

    #[tokio::test]
    async fn test_existing_proxy_is_reused() {
        let asserter = Asserter::new();
        let mut client = mocked_client(&asserter);
        asserter.push_success(&address_word(PROXY));

        let proxy = resolve_proxy(&mut client, REGISTRY).await.unwrap();
        assert_eq!(proxy, PROXY);
    }

    #[tokio::test]
    async fn test_missing_proxy_is_built() {
        let asserter = Asserter::new();
        let mut client = mocked_client(&asserter);

        asserter.push_success(&address_word(Address::ZERO));
        queue_estimate(&asserter, 1_000_000);
        queue_send(&asserter, B256::repeat_byte(0x01), true);
        asserter.push_success(&address_word(PROXY));

        let proxy = resolve_proxy(&mut client, REGISTRY).await.unwrap();
        assert_eq!(proxy, PROXY);
    }

    #[tokio::test]
    async fn test_build_without_recorded_proxy_fails() {
        let asserter = Asserter::new();
        let mut client = mocked_client(&asserter);

        asserter.push_success(&address_word(Address::ZERO));
        queue_estimate(&asserter, 1_000_000);
        queue_send(&asserter, B256::repeat_byte(0x02), true);
        asserter.push_success(&address_word(Address::ZERO));

        let err = resolve_proxy(&mut client, REGISTRY).await.unwrap_err();
        assert!(err.to_string().contains("did not record a proxy"));
    }

    #[tokio::test]
    async fn test_reverted_build_propagates() {
        let asserter = Asserter::new();
        let mut client = mocked_client(&asserter);
        let tx_hash = B256::repeat_byte(0x03);

        asserter.push_success(&address_word(Address::ZERO));
        queue_estimate(&asserter, 1_000_000);
        queue_send(&asserter, tx_hash, false);

        let err = resolve_proxy(&mut client, REGISTRY).await.unwrap_err();
        assert!(err.to_string().contains(&format!("transaction {} reverted", tx_hash)));
    }

    #[tokio::test]
    async fn test_execute_revert_names_proxy_and_target() {
        let asserter = Asserter::new();
        let mut client = mocked_client(&asserter);
        let target = Address::repeat_byte(0x66);
        queue_send(&asserter, B256::repeat_byte(0x04), false);

        let proxy = DsProxy::new(PROXY, 16_000_000);
        let err = proxy
            .execute(&mut client, target, Bytes::from(U256::ZERO.to_be_bytes::<32>().to_vec()))
            .await
            .unwrap_err();

        assert!(err.to_string().contains(&format!("{:?}", target)));
        assert!(err.chain().any(|cause| cause.to_string().contains("reverted")));
    }
}
