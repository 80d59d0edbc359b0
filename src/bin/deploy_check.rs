//! Deployment Check Utility
//!
//! Run with: cargo run --bin deploy-check
//!
//! Verifies the node, signer, protocol contracts and build artifacts the
//! scripts depend on before anything is sent.

use alloy_primitives::{Address, U256};
use alloy_provider::{Provider, ProviderBuilder};
use smartpool::artifacts::Artifact;
use smartpool::config::Config;
use smartpool::tokens::MOCK_ERC20;
use smartpool::units::format_ether;
use smartpool::workflows::BACTIONS;

#[tokio::main]
async fn main() {
    println!();
    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║          SMART POOL LAB DEPLOYMENT CHECK                   ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    println!();

    let mut issues: Vec<String> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            println!("   ❌ Configuration could not be loaded: {}", e);
            return;
        }
    };

    // ==========================================
    // CHECK 1: RPC URL
    // ==========================================
    println!("📡 CHECKING RPC CONNECTION...");

    let rpc_ok = match check_rpc(&config.rpc_url).await {
        Ok((block, chain_id)) => {
            println!("   ✅ RPC connected, current block: {}", block);
            if chain_id != config.chain_id {
                warnings.push(format!("Node chain id {} != CHAIN_ID {}", chain_id, config.chain_id));
                println!("   ⚠️  Chain id {} (CHAIN_ID is {})", chain_id, config.chain_id);
            } else {
                println!("   ✅ Chain id {}", chain_id);
            }
            true
        }
        Err(e) => {
            issues.push(format!("RPC connection failed: {}", e));
            println!("   ❌ RPC connection failed: {}", e);
            false
        }
    };
    println!();

    // ==========================================
    // CHECK 2: Signer
    // ==========================================
    println!("🔐 CHECKING SIGNER...");

    match config.signer() {
        Ok(signer) => {
            println!("   ✅ PRIVATE_KEY: {:?}", signer.address());
            if rpc_ok {
                match check_balance(&config.rpc_url, signer.address()).await {
                    Ok(balance) if balance.is_zero() => {
                        issues.push("Signer has no ETH for gas".to_string());
                        println!("   ❌ Balance: 0 ETH");
                    }
                    Ok(balance) => println!("   ✅ Balance: {} ETH", format_ether(balance)),
                    Err(e) => {
                        warnings.push(format!("Could not read signer balance: {}", e));
                        println!("   ⚠️  Balance unknown: {}", e);
                    }
                }
            }
        }
        Err(e) => {
            issues.push(e.to_string());
            println!("   ❌ {}", e);
        }
    }
    println!();

    // ==========================================
    // CHECK 3: Protocol Contracts
    // ==========================================
    println!("📜 CHECKING PROTOCOL CONTRACTS...");

    for (label, address) in config.addresses.labelled() {
        if !rpc_ok {
            println!("   ⚠️  {}: {:?} (cannot verify without RPC)", label, address);
            continue;
        }
        match check_contract(&config.rpc_url, address).await {
            Ok(true) => println!("   ✅ {}: {:?} (code exists)", label, address),
            Ok(false) => {
                issues.push(format!("{} has no code at {:?}", label, address));
                println!("   ❌ {}: {:?} (NO CODE - wrong network or not forked?)", label, address);
            }
            Err(e) => {
                warnings.push(format!("Could not verify {}: {}", label, e));
                println!("   ⚠️  {}: {:?} (verification failed)", label, address);
            }
        }
    }
    println!();

    // ==========================================
    // CHECK 4: Artifacts
    // ==========================================
    println!("📦 CHECKING ARTIFACTS in {}...", config.artifacts_dir.display());

    match Artifact::load(&config.artifacts_dir, MOCK_ERC20) {
        Ok(artifact) => println!("   ✅ {}: {} bytes of creation code", MOCK_ERC20, artifact.bytecode.len()),
        Err(e) => {
            issues.push(format!("{} artifact: {}", MOCK_ERC20, e));
            println!("   ❌ {}: {}", MOCK_ERC20, e);
            println!("   💡 Compile the contracts first (npx hardhat compile)");
        }
    }
    match Artifact::load(&config.artifacts_dir, BACTIONS) {
        Ok(_) => println!("   ✅ {}: available for fresh deployment", BACTIONS),
        Err(_) => {
            warnings.push(format!("{} artifact missing", BACTIONS));
            println!("   ⚠️  {}: missing (use --use-deployed-actions)", BACTIONS);
        }
    }
    println!();

    // ==========================================
    // CHECK 5: Collection Settings
    // ==========================================
    println!("📊 CHECKING COLLECTION SETTINGS...");

    println!("   Weights: {} / {}", config.base_weight, config.quote_weight);
    println!("   Swaps: {} x {}", config.swap_iterations, config.swap_amount);
    if let Err(e) = config.validate() {
        issues.push(e.to_string());
        println!("   ❌ {}", e);
    }
    if config.swap_iterations > 1000 {
        warnings.push("SWAP_ITERATIONS is very high".to_string());
        println!("     ⚠️  Every swap is a separate mined transaction");
    }
    println!();

    // ==========================================
    // SUMMARY
    // ==========================================
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();

    if issues.is_empty() && warnings.is_empty() {
        println!("✅ ALL CHECKS PASSED!");
    } else if issues.is_empty() {
        println!("⚠️  READY WITH WARNINGS ({} warnings)", warnings.len());
        println!();
        for w in &warnings {
            println!("   • {}", w);
        }
    } else {
        println!("❌ NOT READY ({} issues, {} warnings)", issues.len(), warnings.len());
        println!();
        println!("   MUST FIX:");
        for i in &issues {
            println!("   • {}", i);
        }
        if !warnings.is_empty() {
            println!();
            println!("   WARNINGS:");
            for w in &warnings {
                println!("   • {}", w);
            }
        }
    }

    println!();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
}

async fn check_rpc(url: &str) -> Result<(u64, u64), String> {
    let provider = ProviderBuilder::new()
        .connect_http(url.parse().map_err(|e| format!("Invalid URL: {}", e))?);

    let block = provider.get_block_number().await
        .map_err(|e| format!("Connection failed: {}", e))?;
    let chain_id = provider.get_chain_id().await
        .map_err(|e| format!("eth_chainId failed: {}", e))?;
    Ok((block, chain_id))
}

async fn check_contract(url: &str, address: Address) -> Result<bool, String> {
    let provider = ProviderBuilder::new()
        .connect_http(url.parse().map_err(|e| format!("Invalid URL: {}", e))?);

    let code = provider.get_code_at(address).await
        .map_err(|e| format!("Failed to get code: {}", e))?;

    Ok(!code.is_empty())
}

async fn check_balance(url: &str, address: Address) -> Result<U256, String> {
    let provider = ProviderBuilder::new()
        .connect_http(url.parse().map_err(|e| format!("Invalid URL: {}", e))?);

    provider.get_balance(address).await
        .map_err(|e| format!("Failed to get balance: {}", e))
}
