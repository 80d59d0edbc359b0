//! Solidity interfaces of the external contracts
//!
//! Only the functions and events the scripts touch are declared.

use alloy_sol_types::sol;

// ============================================
// PROXY
// ============================================

sol! {
    /// One DSProxy per user, created on demand
    interface IDSProxyRegistry {
        function proxies(address owner) external view returns (address);
        function build() external returns (address proxy);
    }

    /// Delegate-call forwarder owned by the user
    interface IDSProxy {
        function execute(address target, bytes memory data)
            external payable returns (bytes memory response);
        function owner() external view returns (address);
    }
}

// ============================================
// SMART POOL ACTIONS
// ============================================

sol! {
    /// BActions: executed in the proxy's context via delegate-call
    interface IBActions {
        struct PoolParams {
            string poolTokenSymbol;
            string poolTokenName;
            address[] constituentTokens;
            uint256[] tokenBalances;
            uint256[] tokenWeights;
            uint256 swapFee;
        }

        struct CrpParams {
            uint256 initialSupply;
            uint256 minimumWeightChangeBlockPeriod;
            uint256 addTokenTimeLockInBlocks;
        }

        struct Rights {
            bool canPauseSwapping;
            bool canChangeSwapFee;
            bool canChangeWeights;
            bool canAddRemoveTokens;
            bool canWhitelistLPs;
            bool canChangeCap;
        }

        function createSmartPool(
            address factory,
            address bFactory,
            PoolParams calldata poolParams,
            CrpParams calldata crpParams,
            Rights calldata rights
        ) external returns (address crp);

        function setCap(address crp, uint256 newCap) external;

        function whitelistLiquidityProvider(address crp, address provider) external;

        function joinSmartPool(
            address pool,
            uint256 poolAmountOut,
            uint256[] calldata maxAmountsIn
        ) external;
    }
}

// ============================================
// POOLS
// ============================================

sol! {
    interface IBFactory {
        /// `caller` is the CRP that requested the core pool
        event LOG_NEW_POOL(address indexed caller, address indexed pool);
    }

    interface IBPool {
        function getSpotPrice(address tokenIn, address tokenOut)
            external view returns (uint256 spotPrice);
        function swapExactAmountIn(
            address tokenIn,
            uint256 tokenAmountIn,
            address tokenOut,
            uint256 minAmountOut,
            uint256 maxPrice
        ) external returns (uint256 tokenAmountOut, uint256 spotPriceAfter);
    }

    interface IConfigurableRightsPool {
        function bPool() external view returns (address);
        function balanceOf(address account) external view returns (uint256);
    }
}

// ============================================
// TOKENS
// ============================================

sol! {
    /// Test token with an open mint
    interface IMockERC20 {
        function mint(address to, uint256 amount) external;
        function approve(address spender, uint256 amount) external returns (bool);
        function balanceOf(address account) external view returns (uint256);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_sol_types::{SolCall, SolEvent};

    #[test]
    fn test_selectors_match_deployed_abi() {
        assert_eq!(IDSProxy::executeCall::SIGNATURE, "execute(address,bytes)");
        assert_eq!(IDSProxyRegistry::buildCall::SIGNATURE, "build()");
        assert_eq!(
            IBActions::createSmartPoolCall::SIGNATURE,
            "createSmartPool(address,address,(string,string,address[],uint256[],uint256[],uint256),(uint256,uint256,uint256),(bool,bool,bool,bool,bool,bool))"
        );
        assert_eq!(
            IBPool::swapExactAmountInCall::SIGNATURE,
            "swapExactAmountIn(address,uint256,address,uint256,uint256)"
        );
        // ERC20 transfer-family selectors are well known
        assert_eq!(IMockERC20::approveCall::SELECTOR, [0x09, 0x5e, 0xa7, 0xb3]);
        assert_eq!(IMockERC20::balanceOfCall::SELECTOR, [0x70, 0xa0, 0x82, 0x31]);
    }

    #[test]
    fn test_new_pool_event_signature() {
        assert_eq!(IBFactory::LOG_NEW_POOL::SIGNATURE, "LOG_NEW_POOL(address,address)");
    }
}
