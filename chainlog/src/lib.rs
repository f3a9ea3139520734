#![cfg_attr(docsrs, feature(doc_cfg))]
//! Chainlog keeps the wallet session and the on-chain transfer log of an EVM
//! application in one place.
//!
//! A host mounts a [`TransactionContext`] over a wallet provider and the
//! transfer log contract, then reads state from it and triggers actions:
//!
//! - **Wallet** ([`wallet`]) - account discovery, connection and value transfers
//! - **Contract** ([`contract`]) - read all records, read the count, append a record
//! - **Context** ([`context`]) - session state and the submission workflow
//! - **Storage** ([`storage`]) - the locally persisted record count
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use chainlog::prelude::*;
//!
//! let config = load_config(None).await?;
//! let ctx = TransactionContext::from_config(&config, Arc::new(LogAdvisory)).await?;
//!
//! ctx.handle_change(FormField::AddressTo, "0x...");
//! ctx.handle_change(FormField::Amount, "0.01");
//! ctx.send_transaction().await?;
//! ```

pub mod config;
pub mod context;
pub mod contract;
pub mod error;
pub mod record;
pub mod session;
pub mod storage;
pub mod units;
pub mod wallet;

#[cfg(test)]
pub(crate) mod testing;

pub use context::{Backend, TransactionContext};
pub use error::{Error, Result};
pub use record::TransactionRecord;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{ChainlogConfig, load_config};
    pub use crate::context::{
        Advisory, Backend, ContextOptions, LogAdvisory, TransactionContext,
        TransactionContextBuilder,
    };
    pub use crate::contract::{
        AlloyRecordContract, NewRecord, PendingTx, RawRecord, Receipt, RecordContract,
    };
    pub use crate::error::{DisplayError, Error, Result, StorageError};
    pub use crate::record::TransactionRecord;
    pub use crate::session::{ConnectionState, FormData, FormField, Snapshot, SubmitState};
    pub use crate::storage::{CountStore, FileStore, MemoryStore};
    pub use crate::units::{format_amount, parse_amount};
    pub use crate::wallet::{EvmWallet, EvmWalletBuilder, ValueTransfer, WalletProvider};
}
