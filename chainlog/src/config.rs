//! Configuration for a chainlog session.
//!
//! Settings come from an optional JSON file, then environment variables
//! override individual fields.

use std::path::{Path, PathBuf};

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::storage::default_state_path;
use crate::units::TRANSFER_GAS_LIMIT;

/// Environment variable for the RPC endpoint.
pub const ENV_RPC_URL: &str = "CHAINLOG_RPC_URL";
/// Environment variable for the contract address.
pub const ENV_CONTRACT: &str = "CHAINLOG_CONTRACT";
/// Environment variable for the chain ID.
pub const ENV_CHAIN_ID: &str = "CHAINLOG_CHAIN_ID";
/// Environment variable for a BIP39 mnemonic.
pub const ENV_MNEMONIC: &str = "CHAINLOG_MNEMONIC";
/// Environment variable for a raw private key.
pub const ENV_PRIVATE_KEY: &str = "CHAINLOG_PRIVATE_KEY";
/// Environment variable for the local state file.
pub const ENV_STATE: &str = "CHAINLOG_STATE";

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainlogConfig {
    /// Wallet JSON-RPC endpoint. No endpoint means no wallet provider.
    pub rpc_url: Option<String>,
    /// Transfer log contract address.
    pub contract_address: Option<Address>,
    /// Pinned chain ID.
    pub chain_id: Option<u64>,
    /// Mnemonic for a local signer.
    #[serde(skip_serializing)]
    pub mnemonic: Option<String>,
    /// Private key for a local signer.
    #[serde(skip_serializing)]
    pub private_key: Option<String>,
    /// HD derivation index.
    pub account_index: u32,
    /// Local state file.
    pub state_path: PathBuf,
    /// Gas limit hint for value transfers.
    pub gas_limit: u64,
    /// Reject a submission while another is awaiting confirmation.
    pub single_flight: bool,
}

impl Default for ChainlogConfig {
    fn default() -> Self {
        Self {
            rpc_url: None,
            contract_address: None,
            chain_id: None,
            mnemonic: None,
            private_key: None,
            account_index: 0,
            state_path: default_state_path(),
            gas_limit: TRANSFER_GAS_LIMIT,
            single_flight: false,
        }
    }
}

impl ChainlogConfig {
    /// Defaults overridden by environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when a variable holds a malformed value.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when a variable holds a malformed value.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_RPC_URL) {
            self.rpc_url = Some(url);
        }
        if let Some(addr) = get(ENV_CONTRACT) {
            self.contract_address = Some(
                addr.trim()
                    .parse()
                    .map_err(|e| Error::config(format!("{ENV_CONTRACT}: {e}")))?,
            );
        }
        if let Some(id) = get(ENV_CHAIN_ID) {
            self.chain_id = Some(
                id.trim()
                    .parse()
                    .map_err(|e| Error::config(format!("{ENV_CHAIN_ID}: {e}")))?,
            );
        }
        if let Some(mnemonic) = get(ENV_MNEMONIC) {
            self.mnemonic = Some(mnemonic);
        }
        if let Some(key) = get(ENV_PRIVATE_KEY) {
            self.private_key = Some(key);
        }
        if let Some(path) = get(ENV_STATE) {
            self.state_path = PathBuf::from(path);
        }
        Ok(())
    }

    /// Check that a wallet-backed session can be built from this config.
    ///
    /// A config without `rpc_url` is valid: it describes a session with no
    /// wallet provider.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.rpc_url.is_some() && self.contract_address.is_none() {
            return Err(Error::config("contract_address is required with rpc_url"));
        }
        if self.mnemonic.is_some() && self.private_key.is_some() {
            return Err(Error::config("set either mnemonic or private_key, not both"));
        }
        if self.gas_limit == 0 {
            return Err(Error::config("gas_limit must be positive"));
        }
        Ok(())
    }
}

/// Load configuration from a JSON file, then apply environment overrides.
///
/// A missing file yields the defaults.
///
/// # Errors
///
/// Returns [`Error::Config`] if the file cannot be read or parsed.
pub async fn load_config(path: Option<&Path>) -> Result<ChainlogConfig> {
    let mut config = match path {
        Some(path) if path.exists() => {
            let content = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| Error::config(format!("failed to read {}: {e}", path.display())))?;
            debug!(path = %path.display(), "loaded config file");
            serde_json::from_str(&content)
                .map_err(|e| Error::config(format!("failed to parse {}: {e}", path.display())))?
        }
        _ => ChainlogConfig::default(),
    };
    config.apply_env(|key| std::env::var(key).ok())?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::TempDir;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ChainlogConfig::default();
        assert_eq!(config.gas_limit, 21_000);
        assert!(!config.single_flight);
        assert!(config.rpc_url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_RPC_URL, "http://127.0.0.1:8545"),
            (ENV_CONTRACT, "0x5FbDB2315678afecb367f032d93F642f64180aa3"),
            (ENV_CHAIN_ID, "31337"),
            (ENV_STATE, "/tmp/chainlog.json"),
        ]);
        let mut config = ChainlogConfig::default();
        config
            .apply_env(|k| vars.get(k).map(ToString::to_string))
            .unwrap();

        assert_eq!(config.rpc_url.as_deref(), Some("http://127.0.0.1:8545"));
        assert_eq!(config.chain_id, Some(31337));
        assert!(config.contract_address.is_some());
        assert_eq!(config.state_path, PathBuf::from("/tmp/chainlog.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_malformed_env() {
        let mut config = ChainlogConfig::default();
        let err = config
            .apply_env(|k| (k == ENV_CHAIN_ID).then(|| "mainnet".to_string()))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_validate_requires_contract() {
        let config = ChainlogConfig {
            rpc_url: Some("http://localhost:8545".into()),
            ..ChainlogConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chainlog.json");
        std::fs::write(
            &path,
            r#"{"contract_address": "0x5FbDB2315678afecb367f032d93F642f64180aa3", "single_flight": true}"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).await.unwrap();
        assert!(config.single_flight);
        assert!(config.contract_address.is_some());
        assert_eq!(config.gas_limit, 21_000);
    }
}
