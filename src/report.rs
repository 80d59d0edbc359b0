//! Reserve / spot-price report
//!
//! One row per sample, written as CSV after a short weight preamble:
//!
//! ```text
//! USDC Weight,60
//! XSGD Weight,40
//!
//! USDC Reserve,XSGD Reserve,USDC_XSGD,XSGD_USDC
//! 1500000.0,1345000.0,0.5977...,1.673...
//! ```

use alloy_primitives::{Address, U256};
use eyre::{eyre, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::chain::ChainClient;
use crate::contracts::{IBPool, IMockERC20};
use crate::units::format_ether;

/// Pool state after one step of the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSample {
    pub base_reserve: U256,
    pub quote_reserve: U256,
    /// `getSpotPrice(quote, base)`
    pub base_quote: U256,
    /// `getSpotPrice(base, quote)`
    pub quote_base: U256,
}

/// Read both reserves held by `bpool` and the spot price in each direction
pub async fn sample_pool(
    client: &ChainClient,
    base: Address,
    quote: Address,
    bpool: Address,
) -> Result<PoolSample> {
    let base_reserve = client
        .call(base, IMockERC20::balanceOfCall { account: bpool })
        .await?;
    let quote_reserve = client
        .call(quote, IMockERC20::balanceOfCall { account: bpool })
        .await?;
    let quote_base = client
        .call(bpool, IBPool::getSpotPriceCall { tokenIn: base, tokenOut: quote })
        .await?;
    let base_quote = client
        .call(bpool, IBPool::getSpotPriceCall { tokenIn: quote, tokenOut: base })
        .await?;

    Ok(PoolSample {
        base_reserve,
        quote_reserve,
        base_quote,
        quote_base,
    })
}

/// Samples collected for one weight configuration
#[derive(Debug, Clone)]
pub struct Report {
    base_symbol: String,
    base_weight: u32,
    quote_symbol: String,
    quote_weight: u32,
    samples: Vec<PoolSample>,
}

impl Report {
    pub fn new(base_symbol: &str, base_weight: u32, quote_symbol: &str, quote_weight: u32) -> Self {
        Self {
            base_symbol: base_symbol.to_string(),
            base_weight,
            quote_symbol: quote_symbol.to_string(),
            quote_weight,
            samples: Vec::new(),
        }
    }

    pub fn push(&mut self, sample: PoolSample) {
        self.samples.push(sample);
    }

    /// e.g. `USDC_60_XSGD_40.csv`
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}_{}.csv",
            self.base_symbol, self.base_weight, self.quote_symbol, self.quote_weight
        )
    }

    pub fn to_csv(&self) -> Result<String> {
        let mut buf = Vec::new();
        writeln!(buf, "{} Weight,{}", self.base_symbol, self.base_weight)?;
        writeln!(buf, "{} Weight,{}", self.quote_symbol, self.quote_weight)?;
        writeln!(buf)?;

        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(buf);

        writer.write_record([
            format!("{} Reserve", self.base_symbol),
            format!("{} Reserve", self.quote_symbol),
            format!("{}_{}", self.base_symbol, self.quote_symbol),
            format!("{}_{}", self.quote_symbol, self.base_symbol),
        ])?;
        for sample in &self.samples {
            writer.write_record([
                format_ether(sample.base_reserve),
                format_ether(sample.quote_reserve),
                format_ether(sample.base_quote),
                format_ether(sample.quote_base),
            ])?;
        }

        let buf = writer
            .into_inner()
            .map_err(|e| eyre!("failed to flush report: {}", e.error()))?;
        Ok(String::from_utf8(buf)?)
    }

    /// Write the report into `dir`, returning the file path
    pub fn write_to<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let path = dir.join(self.file_name());
        fs::write(&path, self.to_csv()?)?;
        info!("✓ Wrote {} samples to {}", self.samples.len(), path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::parse_ether;

    fn sample(base: &str, quote: &str, base_quote: &str, quote_base: &str) -> PoolSample {
        PoolSample {
            base_reserve: parse_ether(base).unwrap(),
            quote_reserve: parse_ether(quote).unwrap(),
            base_quote: parse_ether(base_quote).unwrap(),
            quote_base: parse_ether(quote_base).unwrap(),
        }
    }

    #[test]
    fn test_file_name() {
        let report = Report::new("USDC", 60, "XSGD", 40);
        assert_eq!(report.file_name(), "USDC_60_XSGD_40.csv");
    }

    #[test]
    fn test_csv_layout() {
        let mut report = Report::new("USDC", 60, "XSGD", 40);
        report.push(sample("1500000", "1345000", "0.6", "1.67"));
        report.push(sample("1510000", "1336025.5", "0.605", "1.655"));

        let expected = "\
USDC Weight,60
XSGD Weight,40

USDC Reserve,XSGD Reserve,USDC_XSGD,XSGD_USDC
1500000.0,1345000.0,0.6,1.67
1510000.0,1336025.5,0.605,1.655
";
        assert_eq!(report.to_csv().unwrap(), expected);
    }

    #[test]
    fn test_empty_report_has_header_only() {
        let report = Report::new("USDC", 50, "XSGD", 50);
        let csv = report.to_csv().unwrap();
        assert!(csv.ends_with("USDC Reserve,XSGD Reserve,USDC_XSGD,XSGD_USDC\n"));
        assert_eq!(csv.lines().count(), 4);
    }

    #[tokio::test]
    async fn test_sample_pool_maps_spot_price_directions() {
        use crate::chain::testing::mocked_client;
        use alloy_primitives::Bytes;
        use alloy_transport::mock::Asserter;

        let word = |v: &str| Bytes::from(parse_ether(v).unwrap().to_be_bytes::<32>().to_vec());
        let asserter = Asserter::new();
        let client = mocked_client(&asserter);

        // balanceOf(base), balanceOf(quote), getSpotPrice(base, quote), getSpotPrice(quote, base)
        asserter.push_success(&word("1500000"));
        asserter.push_success(&word("1345000"));
        asserter.push_success(&word("1.67"));
        asserter.push_success(&word("0.6"));

        let sample = sample_pool(
            &client,
            Address::repeat_byte(0x01),
            Address::repeat_byte(0x02),
            Address::repeat_byte(0x03),
        )
        .await
        .unwrap();

        assert_eq!(sample, self::sample("1500000", "1345000", "0.6", "1.67"));
    }

    #[test]
    fn test_write_to_creates_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("reports");

        let mut report = Report::new("USDC", 80, "XSGD", 20);
        report.push(sample("1", "2", "3", "4"));
        let path = report.write_to(&out).unwrap();

        assert_eq!(path, out.join("USDC_80_XSGD_20.csv"));
        let written = fs::read_to_string(path).unwrap();
        assert!(written.ends_with("1.0,2.0,3.0,4.0\n"));
    }
}
