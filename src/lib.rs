//! Smart Pool Lab
//!
//! Drives a deployed Balancer Configurable Rights Pool stack through a
//! per-user DSProxy: deploys mock tokens, creates smart pools, adjusts
//! their cap and LP whitelist, joins liquidity and records how reserves
//! and spot prices move under repeated swaps.

pub mod artifacts;
pub mod chain;
pub mod config;
pub mod contracts;
pub mod gas;
pub mod pool;
pub mod proxy;
pub mod report;
pub mod tokens;
pub mod units;
pub mod workflows;
