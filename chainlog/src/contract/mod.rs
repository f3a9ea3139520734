//! Client for the transfer log contract.
//!
//! The contract is an external collaborator with a fixed interface: read all
//! records, read the record count, and append a record. [`RecordContract`]
//! is the seam the workflow depends on; [`AlloyRecordContract`] is the
//! on-chain implementation.

mod abi;
mod client;

use std::fmt;
use std::future::Future;

use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;

use crate::error::Result;

pub use client::AlloyRecordContract;

/// A record as stored on chain, before any display conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Account that appended the record.
    pub sender: Address,
    /// Receiver of the associated transfer.
    pub receiver: Address,
    /// Amount in wei.
    pub amount: U256,
    /// Free-form message.
    pub message: String,
    /// Block timestamp in seconds since the Unix epoch.
    pub timestamp: u64,
    /// Keyword attached by the sender.
    pub keyword: String,
}

/// Arguments to `addToBlockchain`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    /// Receiver of the associated transfer.
    pub receiver: Address,
    /// Amount in wei.
    pub amount: U256,
    /// Free-form message.
    pub message: String,
    /// Keyword.
    pub keyword: String,
}

/// Outcome of a mined transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt {
    /// Hash of the mined transaction.
    pub transaction_hash: TxHash,
    /// Block the transaction was included in.
    pub block_number: Option<u64>,
    /// Whether execution succeeded.
    pub success: bool,
}

/// Handle to a submitted transaction.
pub struct PendingTx {
    hash: TxHash,
    confirmation: BoxFuture<'static, Result<Receipt>>,
}

impl PendingTx {
    /// Wrap a hash and the future that resolves once it is mined.
    pub fn new<F>(hash: TxHash, confirmation: F) -> Self
    where
        F: Future<Output = Result<Receipt>> + Send + 'static,
    {
        Self {
            hash,
            confirmation: confirmation.boxed(),
        }
    }

    /// Transaction hash.
    #[must_use]
    pub const fn hash(&self) -> TxHash {
        self.hash
    }

    /// Suspend until the transaction is mined.
    ///
    /// No timeout is applied; a transaction that never confirms suspends the
    /// caller indefinitely.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Rpc`](crate::Error::Rpc) if the receipt cannot be fetched.
    pub async fn await_confirmation(self) -> Result<Receipt> {
        self.confirmation.await
    }
}

impl fmt::Debug for PendingTx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingTx")
            .field("hash", &self.hash)
            .finish_non_exhaustive()
    }
}

/// The three operations of the transfer log contract.
#[async_trait]
pub trait RecordContract: Send + Sync {
    /// Every record, in contract order.
    async fn get_all_records(&self) -> Result<Vec<RawRecord>>;

    /// The contract's authoritative record count.
    async fn get_record_count(&self) -> Result<u64>;

    /// Append a record. `from` selects the signing account when the provider
    /// manages several.
    async fn append_record(&self, from: Option<Address>, record: NewRecord) -> Result<PendingTx>;
}
