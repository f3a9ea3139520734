//! In-process wallet and contract doubles for unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::context::Advisory;
use crate::storage::CountStore;
use crate::contract::{NewRecord, PendingTx, RawRecord, Receipt, RecordContract};
use crate::error::{Error, Result, StorageError, StorageResult};
use crate::units::WEI_PER_ETHER;
use crate::wallet::{ValueTransfer, WalletProvider};

pub(crate) fn receiver() -> Address {
    Address::repeat_byte(0xbe)
}

/// A record worth `ether` whole ether.
pub(crate) fn raw_record(ether: u64) -> RawRecord {
    RawRecord {
        sender: Address::repeat_byte(0x11),
        receiver: receiver(),
        amount: U256::from(ether) * WEI_PER_ETHER,
        message: format!("record {ether}"),
        timestamp: 1_700_000_000 + ether,
        keyword: "test".into(),
    }
}

#[derive(Default)]
pub(crate) struct MockWallet {
    accounts: Mutex<Vec<Address>>,
    connect: Mutex<Option<Result<Address>>>,
    transfer_error: Mutex<Option<Error>>,
    transfers: Mutex<Vec<ValueTransfer>>,
}

impl MockWallet {
    pub(crate) fn set_accounts(&self, accounts: Vec<Address>) {
        *self.accounts.lock().unwrap() = accounts;
    }

    pub(crate) fn set_connect(&self, result: Result<Address>) {
        *self.connect.lock().unwrap() = Some(result);
    }

    pub(crate) fn fail_transfers(&self, err: Error) {
        *self.transfer_error.lock().unwrap() = Some(err);
    }

    pub(crate) fn transfers(&self) -> Vec<ValueTransfer> {
        self.transfers.lock().unwrap().clone()
    }
}

#[async_trait]
impl WalletProvider for MockWallet {
    async fn list_connected_accounts(&self) -> Result<Vec<Address>> {
        Ok(self.accounts.lock().unwrap().clone())
    }

    async fn request_connection(&self) -> Result<Address> {
        self.connect
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Err(Error::rpc("no connection scripted")))
    }

    async fn send_value_transfer(&self, transfer: ValueTransfer) -> Result<TxHash> {
        if let Some(err) = self.transfer_error.lock().unwrap().take() {
            return Err(err);
        }
        let mut transfers = self.transfers.lock().unwrap();
        transfers.push(transfer);
        Ok(TxHash::with_last_byte(u8::try_from(transfers.len()).unwrap_or(u8::MAX)))
    }
}

#[derive(Default)]
pub(crate) struct MockContract {
    records: Mutex<Vec<RawRecord>>,
    count: Mutex<Option<std::result::Result<u64, String>>>,
    appended: Mutex<Vec<NewRecord>>,
    gate: Mutex<Option<oneshot::Receiver<()>>>,
    append_error: Mutex<Option<Error>>,
    confirm_error: Mutex<Option<Error>>,
    fetch_calls: AtomicUsize,
}

impl MockContract {
    pub(crate) fn set_records(&self, records: Vec<RawRecord>) {
        *self.records.lock().unwrap() = records;
    }

    pub(crate) fn set_count(&self, count: std::result::Result<u64, String>) {
        *self.count.lock().unwrap() = Some(count);
    }

    /// The next appended record stays unconfirmed until the sender fires.
    pub(crate) fn set_gate(&self, gate: oneshot::Receiver<()>) {
        *self.gate.lock().unwrap() = Some(gate);
    }

    /// The next `append_record` call fails before anything is recorded.
    pub(crate) fn fail_append(&self, err: Error) {
        *self.append_error.lock().unwrap() = Some(err);
    }

    /// The next appended record is recorded but its confirmation fails.
    pub(crate) fn fail_confirmation(&self, err: Error) {
        *self.confirm_error.lock().unwrap() = Some(err);
    }

    pub(crate) fn appended(&self) -> Vec<NewRecord> {
        self.appended.lock().unwrap().clone()
    }

    pub(crate) fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordContract for MockContract {
    async fn get_all_records(&self) -> Result<Vec<RawRecord>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.lock().unwrap().clone())
    }

    async fn get_record_count(&self) -> Result<u64> {
        match self.count.lock().unwrap().clone() {
            Some(Ok(count)) => Ok(count),
            Some(Err(msg)) => Err(Error::rpc(msg)),
            None => Ok(self.records.lock().unwrap().len() as u64),
        }
    }

    async fn append_record(&self, from: Option<Address>, record: NewRecord) -> Result<PendingTx> {
        if let Some(err) = self.append_error.lock().unwrap().take() {
            return Err(err);
        }
        let gate = self.gate.lock().unwrap().take();
        let confirm_error = self.confirm_error.lock().unwrap().take();
        let index = {
            let mut records = self.records.lock().unwrap();
            records.push(RawRecord {
                sender: from.unwrap_or_default(),
                receiver: record.receiver,
                amount: record.amount,
                message: record.message.clone(),
                timestamp: 1_800_000_000,
                keyword: record.keyword.clone(),
            });
            records.len()
        };
        self.appended.lock().unwrap().push(record);

        let hash = TxHash::with_last_byte(u8::try_from(index).unwrap_or(u8::MAX));
        Ok(PendingTx::new(hash, async move {
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            if let Some(err) = confirm_error {
                return Err(err);
            }
            Ok(Receipt {
                transaction_hash: hash,
                block_number: Some(index as u64),
                success: true,
            })
        }))
    }
}

#[derive(Default)]
pub(crate) struct RecordingAdvisory {
    messages: Mutex<Vec<String>>,
}

impl RecordingAdvisory {
    pub(crate) fn count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

impl Advisory for RecordingAdvisory {
    fn advise(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

/// Count store whose writes always fail.
#[derive(Default)]
pub(crate) struct ReadOnlyStore;

#[async_trait]
impl CountStore for ReadOnlyStore {
    async fn get(&self, _key: &str) -> StorageResult<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str) -> StorageResult<()> {
        Err(StorageError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only",
        )))
    }
}
