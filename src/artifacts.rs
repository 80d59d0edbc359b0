//! Compiled contract artifacts
//!
//! The mock tokens and a fresh BActions are deployed from Hardhat build
//! output (`artifacts/contracts/<File>.sol/<Name>.json`).

use alloy_primitives::Bytes;
use eyre::{eyre, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Deployable contract build
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub contract_name: String,
    #[serde(default)]
    pub source_name: Option<String>,
    pub bytecode: Bytes,
}

impl Artifact {
    /// Load `<name>` from `dir`, either as a flat `<name>.json` or from the
    /// nested Hardhat layout.
    pub fn load<P: AsRef<Path>>(dir: P, name: &str) -> Result<Self> {
        let path = find_artifact(dir.as_ref(), name)?;
        debug!("Loading artifact {} from {}", name, path.display());
        Self::from_file(&path)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| eyre!("failed to read artifact {}: {}", path.display(), e))?;
        let artifact: Self = serde_json::from_str(&content)
            .map_err(|e| eyre!("malformed artifact {}: {}", path.display(), e))?;

        if artifact.bytecode.is_empty() {
            return Err(eyre!(
                "artifact {} has no bytecode (interface or abstract contract?)",
                artifact.contract_name
            ));
        }
        Ok(artifact)
    }

    /// Creation code followed by ABI-encoded constructor arguments
    pub fn deploy_code(&self, constructor_args: &[u8]) -> Bytes {
        let mut code = Vec::with_capacity(self.bytecode.len() + constructor_args.len());
        code.extend_from_slice(&self.bytecode);
        code.extend_from_slice(constructor_args);
        code.into()
    }
}

fn find_artifact(dir: &Path, name: &str) -> Result<PathBuf> {
    let file_name = format!("{}.json", name);

    let flat = dir.join(&file_name);
    if flat.is_file() {
        return Ok(flat);
    }

    // build-info holds compiler I/O, not contract artifacts
    WalkDir::new(dir)
        .into_iter()
        .filter_entry(|entry| entry.file_name() != "build-info")
        .filter_map(|entry| entry.ok())
        .find(|entry| {
            entry.file_type().is_file()
                && entry.file_name().to_string_lossy() == file_name
                && entry
                    .path()
                    .parent()
                    .and_then(|p| p.extension())
                    .map_or(false, |ext| ext == "sol")
        })
        .map(|entry| entry.into_path())
        .ok_or_else(|| eyre!("no artifact named {} under {}", name, dir.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOCK_ARTIFACT: &str = r#"{
        "_format": "hh-sol-artifact-1",
        "contractName": "MockERC20",
        "sourceName": "contracts/MockERC20.sol",
        "abi": [],
        "bytecode": "0x6080604052",
        "deployedBytecode": "0x6080"
    }"#;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_load_hardhat_layout() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir.path().join("contracts/MockERC20.sol/MockERC20.dbg.json"),
            r#"{"_format": "hh-sol-dbg-1", "buildInfo": "../../build-info/x.json"}"#,
        );
        write(
            &dir.path().join("contracts/MockERC20.sol/MockERC20.json"),
            MOCK_ARTIFACT,
        );

        let artifact = Artifact::load(dir.path(), "MockERC20").unwrap();
        assert_eq!(artifact.contract_name, "MockERC20");
        assert_eq!(artifact.source_name.as_deref(), Some("contracts/MockERC20.sol"));
        assert_eq!(artifact.bytecode.as_ref(), &[0x60, 0x80, 0x60, 0x40, 0x52]);
    }

    #[test]
    fn test_load_flat_file() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("MockERC20.json"), MOCK_ARTIFACT);
        assert!(Artifact::load(dir.path(), "MockERC20").is_ok());
    }

    #[test]
    fn test_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let err = Artifact::load(dir.path(), "BActions").unwrap_err();
        assert!(err.to_string().contains("no artifact named BActions"));
    }

    #[test]
    fn test_interface_artifact_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir.path().join("contracts/IERC20.sol/IERC20.json"),
            r#"{"contractName": "IERC20", "abi": [], "bytecode": "0x"}"#,
        );
        assert!(Artifact::load(dir.path(), "IERC20").is_err());
    }

    #[test]
    fn test_deploy_code_appends_args() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("MockERC20.json"), MOCK_ARTIFACT);
        let artifact = Artifact::load(dir.path(), "MockERC20").unwrap();

        let code = artifact.deploy_code(&[0xaa, 0xbb]);
        assert_eq!(code.as_ref(), &[0x60, 0x80, 0x60, 0x40, 0x52, 0xaa, 0xbb]);
    }
}
