//! EVM wallet backed by an alloy provider.
//!
//! [`EvmWallet`] talks to a JSON-RPC endpoint. Without key material it
//! relies on the endpoint's own account management (`eth_accounts`,
//! `eth_requestAccounts`, `eth_sendTransaction`), which is how injected
//! browser wallets and development nodes behave. With a mnemonic or private
//! key it signs locally and the signer address is the only account.

use std::borrow::Cow;

use alloy::network::Ethereum;
use alloy::primitives::{Address, TxHash};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::Signer;
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::TransportError;
use async_trait::async_trait;
use tracing::{debug, info};

use super::{ValueTransfer, WalletProvider};
use crate::contract::AlloyRecordContract;
use crate::error::{Error, Result};

/// Where the wallet's account comes from.
#[derive(Clone, Default, PartialEq, Eq)]
enum AccountSource {
    /// Accounts are held by the endpoint (an injected wallet or a dev node).
    #[default]
    Endpoint,
    /// HD account derived from a BIP39 phrase.
    Mnemonic(String),
    /// Hex secret key, `0x` prefix optional.
    SecretKey(String),
}

impl std::fmt::Debug for AccountSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material stays out of logs.
        f.write_str(match self {
            Self::Endpoint => "Endpoint",
            Self::Mnemonic(_) => "Mnemonic(..)",
            Self::SecretKey(_) => "SecretKey(..)",
        })
    }
}

/// Configures an [`EvmWallet`].
///
/// Without key material the wallet uses endpoint-managed accounts. Setting a
/// mnemonic or private key switches it to a local signer; the last one set
/// wins.
///
/// ```rust,ignore
/// let wallet = EvmWallet::builder()
///     .rpc_url("http://127.0.0.1:8545")
///     .build()
///     .await?;
///
/// let wallet = EvmWallet::builder()
///     .rpc_url("https://sepolia.example/rpc")
///     .mnemonic("abandon abandon ...")
///     .index(2)
///     .build()
///     .await?;
/// ```
#[derive(Debug, Default)]
pub struct EvmWalletBuilder {
    source: AccountSource,
    passphrase: Option<String>,
    index: u32,
    rpc_url: Option<String>,
    chain_id: Option<u64>,
}

impl EvmWalletBuilder {
    /// Sign with an account derived from this phrase.
    #[must_use]
    pub fn mnemonic(mut self, phrase: impl Into<String>) -> Self {
        self.source = AccountSource::Mnemonic(phrase.into());
        self
    }

    /// Extra passphrase for mnemonic derivation.
    #[must_use]
    pub fn passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(passphrase.into());
        self
    }

    /// Which derived account the mnemonic yields.
    #[must_use]
    pub const fn index(mut self, index: u32) -> Self {
        self.index = index;
        self
    }

    /// Sign with this secret key.
    #[must_use]
    pub fn private_key(mut self, key: impl Into<String>) -> Self {
        self.source = AccountSource::SecretKey(key.into());
        self
    }

    /// Endpoint that serves reads and, without a local signer, accounts.
    #[must_use]
    pub fn rpc_url(mut self, url: impl Into<String>) -> Self {
        self.rpc_url = Some(url.into());
        self
    }

    /// Skip the `eth_chainId` lookup.
    #[must_use]
    pub const fn chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    /// Connect to the endpoint.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] when `rpc_url` is missing or the key material is
    /// invalid, [`Error::Rpc`] when the endpoint cannot be reached.
    pub async fn build(self) -> Result<EvmWallet> {
        let Some(rpc_url) = self.rpc_url.as_deref() else {
            return Err(Error::config("rpc_url is required"));
        };
        let connect_err = |e: TransportError| Error::rpc(format!("cannot reach {rpc_url}: {e}"));

        let signer = self.local_signer()?;
        let provider: DynProvider<Ethereum> = match signer.clone() {
            Some(signer) => ProviderBuilder::new()
                .wallet(signer)
                .connect(rpc_url)
                .await
                .map_err(connect_err)?
                .erased(),
            None => ProviderBuilder::new()
                .connect(rpc_url)
                .await
                .map_err(connect_err)?
                .erased(),
        };

        let chain_id = match self.chain_id {
            Some(id) => id,
            None => provider
                .get_chain_id()
                .await
                .map_err(|e| Error::from_transport("eth_chainId failed", &e))?,
        };

        info!(
            source = ?self.source,
            chain_id,
            "wallet ready",
        );

        Ok(EvmWallet {
            signer_address: signer.map(|s| s.address()),
            provider,
            chain_id,
        })
    }

    fn local_signer(&self) -> Result<Option<PrivateKeySigner>> {
        let mut signer = match &self.source {
            AccountSource::Endpoint => return Ok(None),
            AccountSource::Mnemonic(phrase) => {
                derive_signer(phrase, self.passphrase.as_deref(), self.index)?
            }
            AccountSource::SecretKey(key) => parse_secret_key(key)?,
        };
        signer.set_chain_id(self.chain_id);
        Ok(Some(signer))
    }
}

fn derive_signer(phrase: &str, passphrase: Option<&str>, index: u32) -> Result<PrivateKeySigner> {
    let seed = kobe::Wallet::from_mnemonic(phrase, passphrase)
        .map_err(|e| Error::config(format!("mnemonic rejected: {e}")))?;
    let account = kobe_eth::Deriver::new(&seed)
        .derive(index)
        .map_err(|e| Error::config(format!("cannot derive account {index}: {e}")))?;
    parse_secret_key(&account.private_key_hex)
}

fn parse_secret_key(key: &str) -> Result<PrivateKeySigner> {
    let hex = key.trim();
    hex.strip_prefix("0x")
        .unwrap_or(hex)
        .parse::<PrivateKeySigner>()
        .map_err(|e| Error::config(format!("private key rejected: {e}")))
}

/// An EVM wallet provider.
#[derive(Clone)]
pub struct EvmWallet {
    /// Address of the local signer, when one is configured.
    signer_address: Option<Address>,
    /// Type-erased provider for RPC calls.
    provider: DynProvider<Ethereum>,
    /// The chain ID this wallet is connected to.
    chain_id: u64,
}

impl std::fmt::Debug for EvmWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmWallet")
            .field("signer_address", &self.signer_address)
            .field("chain_id", &self.chain_id)
            .finish_non_exhaustive()
    }
}

impl EvmWallet {
    /// Create a builder for constructing an [`EvmWallet`].
    #[must_use]
    pub fn builder() -> EvmWalletBuilder {
        EvmWalletBuilder::default()
    }

    /// Contract client for `address`, signing through this wallet.
    #[must_use]
    pub fn record_contract(&self, address: Address) -> AlloyRecordContract {
        AlloyRecordContract::new(address, self.provider.clone())
    }
}

#[async_trait]
impl WalletProvider for EvmWallet {
    async fn list_connected_accounts(&self) -> Result<Vec<Address>> {
        if let Some(address) = self.signer_address {
            return Ok(vec![address]);
        }
        self.provider
            .get_accounts()
            .await
            .map_err(|e| Error::from_transport("eth_accounts failed", &e))
    }

    async fn request_connection(&self) -> Result<Address> {
        if let Some(address) = self.signer_address {
            return Ok(address);
        }
        let accounts: Vec<Address> = self
            .provider
            .raw_request(Cow::Borrowed("eth_requestAccounts"), ())
            .await
            .map_err(|e| Error::from_transport("eth_requestAccounts failed", &e))?;
        debug!(count = accounts.len(), "wallet returned accounts");
        accounts
            .first()
            .copied()
            .ok_or_else(|| Error::rpc("wallet authorized no accounts"))
    }

    async fn send_value_transfer(&self, transfer: ValueTransfer) -> Result<TxHash> {
        let pending = self
            .provider
            .send_transaction(transfer.to_request())
            .await
            .map_err(|e| Error::from_transport("value transfer failed", &e))?;
        let hash = *pending.tx_hash();
        info!(tx = %hash, to = %transfer.to, value = %transfer.value, "value transfer sent");
        Ok(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_requires_rpc_url() {
        let err = EvmWallet::builder().build().await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_private_key_with_and_without_prefix() {
        let key = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
        let a = parse_secret_key(key).unwrap();
        let b = parse_secret_key(&format!(" 0x{key}\n")).unwrap();
        assert_eq!(a.address(), b.address());
    }

    #[test]
    fn test_invalid_private_key() {
        let err = parse_secret_key("not-a-key").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
