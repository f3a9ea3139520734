//! Wallet provider adapter.
//!
//! The [`WalletProvider`] trait narrows an injected wallet down to the three
//! calls the transfer workflow needs: listing already-authorized accounts,
//! asking the user to connect, and sending a raw value transfer.
//!
//! # Architecture
//!
//! ```text
//! EvmWallet (alloy provider, optional local signer)
//!   ├── builder()                  → EvmWalletBuilder → build()
//!   ├── list_connected_accounts()  → eth_accounts
//!   ├── request_connection()       → eth_requestAccounts
//!   ├── send_value_transfer()      → eth_sendTransaction / signed raw tx
//!   └── record_contract()          → AlloyRecordContract on the same provider
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use chainlog::wallet::{EvmWallet, WalletProvider};
//!
//! let wallet = EvmWallet::builder()
//!     .rpc_url("http://127.0.0.1:8545")
//!     .build()
//!     .await?;
//!
//! let accounts = wallet.list_connected_accounts().await?;
//! ```

mod evm;

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;

use crate::error::Result;
use crate::units::TRANSFER_GAS_LIMIT;

pub use evm::{EvmWallet, EvmWalletBuilder};

/// A raw native-value transfer, as handed to the wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueTransfer {
    /// Sending account. The wallet fills it in when absent.
    pub from: Option<Address>,
    /// Receiving address.
    pub to: Address,
    /// Gas limit hint.
    pub gas: u64,
    /// Value in wei.
    pub value: U256,
}

impl ValueTransfer {
    /// Create a transfer with the default gas limit hint.
    #[must_use]
    pub const fn new(from: Option<Address>, to: Address, value: U256) -> Self {
        Self {
            from,
            to,
            gas: TRANSFER_GAS_LIMIT,
            value,
        }
    }

    /// Override the gas limit hint.
    #[must_use]
    pub const fn with_gas(mut self, gas: u64) -> Self {
        self.gas = gas;
        self
    }

    /// Build the `{from, to, gas, value}` request sent to the provider.
    #[must_use]
    pub fn to_request(&self) -> TransactionRequest {
        let mut tx = TransactionRequest::default()
            .with_to(self.to)
            .with_gas_limit(self.gas)
            .with_value(self.value);
        if let Some(from) = self.from {
            tx = tx.with_from(from);
        }
        tx
    }
}

/// The narrow interface over a host wallet.
///
/// All calls may prompt the user through the wallet's own UI and suspend
/// until the user responds. Nothing is queued internally.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Accounts the wallet has already authorized for this application.
    async fn list_connected_accounts(&self) -> Result<Vec<Address>>;

    /// Ask the user to connect an account.
    ///
    /// Fails with [`Error::UserRejected`](crate::Error::UserRejected) when the
    /// user declines.
    async fn request_connection(&self) -> Result<Address>;

    /// Send native value. Returns once the wallet has accepted the transaction.
    async fn send_value_transfer(&self, transfer: ValueTransfer) -> Result<TxHash>;
}
