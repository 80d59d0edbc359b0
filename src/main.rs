//! Smart Pool Lab - CLI
//!
//! Run with: cargo run -- <command>
//!
//! Commands:
//! - setup:   create a smart pool through the proxy, uncap, whitelist, join
//! - create:  create a smart pool with a frozen cap (smoke test)
//! - collect: swap into a weighted pool and write the price trail to CSV
//! - encode:  print the ABI-encoded create arguments
//! - init-config: write the current configuration as TOML

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use console::style;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use smartpool::chain::ChainClient;
use smartpool::config::Config;
use smartpool::workflows::{self, DemoOptions};

#[derive(Parser)]
#[command(name = "smartpool", version, about = "Balancer smart pool scripts")]
struct Cli {
    /// Read configuration from a TOML file instead of the environment
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a pool via the proxy, lift its cap, whitelist the proxy and join
    Setup {
        /// Use the configured BActions instead of deploying one
        #[arg(long)]
        use_deployed_actions: bool,
    },
    /// Create a pool whose cap cannot change and verify nothing reverts
    Create {
        /// Use the configured BActions instead of deploying one
        #[arg(long)]
        use_deployed_actions: bool,
    },
    /// Swap into a weighted USDC/XSGD pool and record reserves and prices
    Collect {
        #[arg(long)]
        iterations: Option<u32>,
        #[arg(long)]
        base_weight: Option<u32>,
        #[arg(long)]
        quote_weight: Option<u32>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Print the ABI-encoded createSmartPool arguments
    Encode,
    /// Write the effective configuration to a TOML file (without the key)
    InitConfig {
        #[arg(default_value = "smartpool.toml")]
        path: PathBuf,
    },
}

fn print_banner() {
    println!();
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!(
        "{}",
        style(" 🏊 SMART POOL LAB - Balancer CRP via DSProxy").cyan().bold()
    );
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!();
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("smartpool=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };

    // Commands that never touch the chain
    match &cli.command {
        Command::Encode => {
            let args = workflows::encode_demo_args()?;
            println!("0x{}", hex::encode(&args));
            return Ok(());
        }
        Command::InitConfig { path } => {
            config.save_to_file(path)?;
            println!("{} Wrote {}", style("✓").green(), path.display());
            return Ok(());
        }
        Command::Collect { iterations, base_weight, quote_weight, output_dir } => {
            if let Some(n) = iterations {
                config.swap_iterations = *n;
            }
            if let Some(w) = base_weight {
                config.base_weight = *w;
            }
            if let Some(w) = quote_weight {
                config.quote_weight = *w;
            }
            if let Some(dir) = output_dir {
                config.output_dir = dir.clone();
            }
        }
        _ => {}
    }

    print_banner();

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        error!("Please check your .env file");
        return Err(e);
    }

    config.print_summary();

    let mut client = ChainClient::connect(&config).await?;

    match cli.command {
        Command::Setup { use_deployed_actions } => {
            let opts = DemoOptions {
                deploy_actions: !use_deployed_actions,
            };
            let pool = workflows::run_setup(&mut client, &config, opts).await?;
            println!();
            println!("{} Smart pool ready", style("✓").green().bold());
            println!("   CRP:   {:?}", pool.crp);
            println!("   BPool: {:?}", pool.bpool);
        }
        Command::Create { use_deployed_actions } => {
            let opts = DemoOptions {
                deploy_actions: !use_deployed_actions,
            };
            let pool = workflows::run_create(&mut client, &config, opts).await?;
            println!();
            println!("{} Created without revert", style("✓").green().bold());
            println!("   CRP:   {:?}", pool.crp);
            println!("   BPool: {:?}", pool.bpool);
        }
        Command::Collect { .. } => {
            let path = workflows::run_collect(&mut client, &config).await?;
            println!();
            println!("{} Report written to {}", style("✓").green().bold(), path.display());
        }
        // Returned before connecting
        Command::Encode | Command::InitConfig { .. } => {}
    }

    info!("Done");
    Ok(())
}
