//! On-chain [`RecordContract`] implementation.

use alloy::network::{Ethereum, ReceiptResponse};
use alloy::primitives::Address;
use alloy::providers::DynProvider;
use async_trait::async_trait;
use tracing::{debug, info};

use super::abi::Transactions;
use super::{NewRecord, PendingTx, RawRecord, Receipt, RecordContract};
use crate::error::{Error, Result};

/// Transfer log contract reached through an alloy provider.
#[derive(Clone)]
pub struct AlloyRecordContract {
    address: Address,
    provider: DynProvider<Ethereum>,
}

impl std::fmt::Debug for AlloyRecordContract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlloyRecordContract")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl AlloyRecordContract {
    /// Bind the contract at `address`.
    #[must_use]
    pub const fn new(address: Address, provider: DynProvider<Ethereum>) -> Self {
        Self { address, provider }
    }

    /// Deployed contract address.
    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    fn instance(&self) -> Transactions::TransactionsInstance<DynProvider<Ethereum>> {
        Transactions::new(self.address, self.provider.clone())
    }
}

#[async_trait]
impl RecordContract for AlloyRecordContract {
    async fn get_all_records(&self) -> Result<Vec<RawRecord>> {
        let raw = self
            .instance()
            .getAllTransactions()
            .call()
            .await
            .map_err(|e| Error::from_contract("getAllTransactions failed", &e))?;
        debug!(count = raw.len(), "fetched records");
        Ok(raw.into_iter().map(RawRecord::from).collect())
    }

    async fn get_record_count(&self) -> Result<u64> {
        let count = self
            .instance()
            .getTransactionCount()
            .call()
            .await
            .map_err(|e| Error::from_contract("getTransactionCount failed", &e))?;
        u64::try_from(count).map_err(|_| Error::conversion(format!("record count {count} overflows u64")))
    }

    async fn append_record(&self, from: Option<Address>, record: NewRecord) -> Result<PendingTx> {
        let instance = self.instance();
        let mut call = instance.addToBlockchain(
            record.receiver,
            record.amount,
            record.message,
            record.keyword,
        );
        if let Some(from) = from {
            call = call.from(from);
        }

        let pending = call
            .send()
            .await
            .map_err(|e| Error::from_contract("addToBlockchain failed", &e))?;
        let hash = *pending.tx_hash();
        info!(tx = %hash, "record submitted");

        Ok(PendingTx::new(hash, async move {
            let receipt = pending
                .get_receipt()
                .await
                .map_err(|e| Error::rpc(format!("receipt for {hash} failed: {e}")))?;
            Ok(Receipt {
                transaction_hash: receipt.transaction_hash,
                block_number: receipt.block_number,
                success: receipt.status(),
            })
        }))
    }
}
