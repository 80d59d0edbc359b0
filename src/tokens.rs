//! Mock ERC20 tokens with an open mint

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolValue;
use eyre::Result;
use tracing::info;

use crate::artifacts::Artifact;
use crate::chain::ChainClient;
use crate::contracts::IMockERC20;

/// Artifact name of the test token contract
pub const MOCK_ERC20: &str = "MockERC20";

#[derive(Debug, Clone)]
pub struct MockToken {
    pub address: Address,
    pub symbol: String,
}

impl MockToken {
    /// Deploy `MockERC20(name, symbol)`
    pub async fn deploy(
        client: &mut ChainClient,
        artifact: &Artifact,
        name: &str,
        symbol: &str,
    ) -> Result<Self> {
        let args = (name.to_string(), symbol.to_string()).abi_encode_params();
        let address = client.deploy(artifact.deploy_code(&args)).await?;
        info!("✓ Deployed {} ({}) at {:?}", name, symbol, address);

        Ok(Self {
            address,
            symbol: symbol.to_string(),
        })
    }

    pub async fn mint(&self, client: &mut ChainClient, to: Address, amount: U256) -> Result<()> {
        client
            .send(self.address, IMockERC20::mintCall { to, amount }, None)
            .await?;
        Ok(())
    }

    pub async fn approve(&self, client: &mut ChainClient, spender: Address, amount: U256) -> Result<()> {
        client
            .send(self.address, IMockERC20::approveCall { spender, amount }, None)
            .await?;
        Ok(())
    }

    pub async fn balance_of(&self, client: &ChainClient, owner: Address) -> Result<U256> {
        client
            .call(self.address, IMockERC20::balanceOfCall { account: owner })
            .await
    }
}
