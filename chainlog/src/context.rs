//! The UI-facing transaction context.
//!
//! [`TransactionContext`] owns the session: the active account, the transfer
//! form, the loading flag and the record list. It drives the wallet and
//! contract through [`Backend`] and publishes every change as a whole
//! [`Snapshot`] on a `watch` channel.
//!
//! # Lifecycle
//!
//! ```text
//! mount()  → startup: list accounts → (record refresh) ; record count → local store
//! connect_wallet()     → request connection → Connected
//! send_transaction()   → transfer → append record → await receipt → count → refresh()
//! unmount()            → state cleared, subscribers see the reset
//! ```
//!
//! Every action logs its own failure and returns it as a typed
//! [`Result`]. Nothing panics into the host.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use alloy::primitives::Address;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::config::ChainlogConfig;
use crate::contract::{NewRecord, Receipt, RecordContract};
use crate::error::{DisplayError, Error, Result};
use crate::record::{TransactionRecord, map_records};
use crate::session::{ConnectionState, FormData, FormField, Snapshot, SubmitState};
use crate::storage::{CountStore, FileStore, MemoryStore};
use crate::units::{TRANSFER_GAS_LIMIT, parse_amount};
use crate::wallet::{EvmWallet, ValueTransfer, WalletProvider};

/// The wallet and contract a session talks to.
#[derive(Clone)]
pub struct Backend {
    /// Wallet provider adapter.
    pub wallet: Arc<dyn WalletProvider>,
    /// Contract client.
    pub contract: Arc<dyn RecordContract>,
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend").finish_non_exhaustive()
    }
}

impl Backend {
    /// Pair a wallet with a contract client.
    pub fn new(
        wallet: impl WalletProvider + 'static,
        contract: impl RecordContract + 'static,
    ) -> Self {
        Self {
            wallet: Arc::new(wallet),
            contract: Arc::new(contract),
        }
    }

    /// Build the on-chain backend described by `config`.
    ///
    /// Returns `Ok(None)` when no RPC endpoint is configured, which the
    /// context treats as an absent wallet provider.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an invalid config and [`Error::Rpc`] when
    /// the endpoint cannot be reached.
    pub async fn from_config(config: &ChainlogConfig) -> Result<Option<Self>> {
        config.validate()?;
        let Some(rpc_url) = config.rpc_url.as_deref() else {
            return Ok(None);
        };
        let contract_address = config
            .contract_address
            .ok_or_else(|| Error::config("contract_address is required with rpc_url"))?;

        let mut builder = EvmWallet::builder()
            .rpc_url(rpc_url)
            .index(config.account_index);
        if let Some(mnemonic) = &config.mnemonic {
            builder = builder.mnemonic(mnemonic.clone());
        }
        if let Some(key) = &config.private_key {
            builder = builder.private_key(key.clone());
        }
        if let Some(chain_id) = config.chain_id {
            builder = builder.chain_id(chain_id);
        }

        let wallet = builder.build().await?;
        let contract = wallet.record_contract(contract_address);
        Ok(Some(Self::new(wallet, contract)))
    }
}

/// Hook for the blocking advisory shown when no wallet is present.
pub trait Advisory: Send + Sync {
    /// Present `message` to the user.
    fn advise(&self, message: &str);
}

/// Advisory that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAdvisory;

impl Advisory for LogAdvisory {
    fn advise(&self, message: &str) {
        warn!(advisory = true, "{message}");
    }
}

/// Behavioral switches for a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextOptions {
    /// Gas limit hint for value transfers.
    pub gas_limit: u64,
    /// Reject a submission while another is awaiting confirmation.
    pub single_flight: bool,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            gas_limit: TRANSFER_GAS_LIMIT,
            single_flight: false,
        }
    }
}

impl From<&ChainlogConfig> for ContextOptions {
    fn from(config: &ChainlogConfig) -> Self {
        Self {
            gas_limit: config.gas_limit,
            single_flight: config.single_flight,
        }
    }
}

/// Builder for [`TransactionContext`].
#[derive(Default)]
pub struct TransactionContextBuilder {
    backend: Option<Backend>,
    store: Option<Arc<dyn CountStore>>,
    advisory: Option<Arc<dyn Advisory>>,
    options: ContextOptions,
}

impl std::fmt::Debug for TransactionContextBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionContextBuilder")
            .field("has_backend", &self.backend.is_some())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl TransactionContextBuilder {
    /// Set the wallet backend. Leave unset for "no wallet installed".
    #[must_use]
    pub fn backend(mut self, backend: Option<Backend>) -> Self {
        self.backend = backend;
        self
    }

    /// Set the local count store (default: in-memory).
    #[must_use]
    pub fn store(mut self, store: Arc<dyn CountStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the advisory hook (default: [`LogAdvisory`]).
    #[must_use]
    pub fn advisory(mut self, advisory: Arc<dyn Advisory>) -> Self {
        self.advisory = Some(advisory);
        self
    }

    /// Set behavioral options.
    #[must_use]
    pub const fn options(mut self, options: ContextOptions) -> Self {
        self.options = options;
        self
    }

    /// Build the context without running the startup sequence.
    #[must_use]
    pub fn build(self) -> TransactionContext {
        let (state, _) = watch::channel(Snapshot::default());
        TransactionContext {
            inner: Arc::new(Inner {
                backend: self.backend,
                store: self.store.unwrap_or_else(|| Arc::new(MemoryStore::new())),
                advisory: self.advisory.unwrap_or_else(|| Arc::new(LogAdvisory)),
                options: self.options,
                state,
                in_flight: AtomicBool::new(false),
            }),
        }
    }

    /// Build the context, restore the stored count and run the startup
    /// sequence once.
    pub async fn mount(self) -> TransactionContext {
        let ctx = self.build();
        ctx.restore_count().await;
        // Failures are already logged by each step.
        let _ = ctx.refresh().await;
        ctx
    }
}

struct Inner {
    backend: Option<Backend>,
    store: Arc<dyn CountStore>,
    advisory: Arc<dyn Advisory>,
    options: ContextOptions,
    state: watch::Sender<Snapshot>,
    in_flight: AtomicBool,
}

/// Handle to a mounted session. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct TransactionContext {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for TransactionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionContext")
            .field("has_backend", &self.inner.backend.is_some())
            .field("options", &self.inner.options)
            .field("state", &*self.inner.state.borrow())
            .finish()
    }
}

/// Clears the single-flight marker on every exit path.
struct FlightGuard<'a>(Option<&'a AtomicBool>);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if let Some(flag) = self.0 {
            flag.store(false, Ordering::Release);
        }
    }
}

impl TransactionContext {
    /// Create a builder.
    #[must_use]
    pub fn builder() -> TransactionContextBuilder {
        TransactionContextBuilder::default()
    }

    /// Mount a session from configuration: on-chain backend, file store at
    /// `state_path`, and the configured options.
    ///
    /// # Errors
    ///
    /// Returns the error from [`Backend::from_config`].
    pub async fn from_config(
        config: &ChainlogConfig,
        advisory: Arc<dyn Advisory>,
    ) -> Result<Self> {
        let backend = Backend::from_config(config).await?;
        Ok(Self::builder()
            .backend(backend)
            .store(Arc::new(FileStore::new(&config.state_path)))
            .advisory(advisory)
            .options(ContextOptions::from(config))
            .mount()
            .await)
    }

    // ------------------------------------------------------------------
    // Read surface
    // ------------------------------------------------------------------

    /// Active account.
    #[must_use]
    pub fn current_account(&self) -> Option<Address> {
        self.inner.state.borrow().current_account
    }

    /// Current form contents.
    #[must_use]
    pub fn form_data(&self) -> FormData {
        self.inner.state.borrow().form_data.clone()
    }

    /// True while a submission awaits confirmation.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().is_loading
    }

    /// Records from the last refresh, in contract order.
    #[must_use]
    pub fn transactions(&self) -> Vec<TransactionRecord> {
        self.inner.state.borrow().transactions.clone()
    }

    /// Locally mirrored record count.
    #[must_use]
    pub fn transaction_count(&self) -> Option<u64> {
        self.inner.state.borrow().transaction_count
    }

    /// Connection state.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.inner.state.borrow().connection
    }

    /// Whether a wallet provider is present.
    #[must_use]
    pub fn has_provider(&self) -> bool {
        self.inner.backend.is_some()
    }

    /// Copy of the full state.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.inner.state.borrow().clone()
    }

    /// Receive every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.inner.state.subscribe()
    }

    // ------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------

    /// Update one form field.
    pub fn handle_change(&self, field: FormField, value: impl Into<String>) {
        let value = value.into();
        self.inner
            .state
            .send_modify(|s| s.form_data.set(field, value));
    }

    /// Update a form field addressed by its binding name (`addressTo`,
    /// `amount`, `keyword`, `message`).
    ///
    /// # Errors
    ///
    /// [`Error::Conversion`] for an unknown name; the form is left as is.
    pub fn handle_named_change(&self, name: &str, value: impl Into<String>) -> Result<()> {
        let field = name.parse::<FormField>()?;
        self.handle_change(field, value);
        Ok(())
    }

    /// Re-run the startup sequence: account discovery (with record refresh)
    /// and the count check.
    ///
    /// # Errors
    ///
    /// Returns the first failure of the two steps.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<()> {
        self.backend()?;
        let (accounts, count) = futures::join!(
            self.check_if_wallet_is_connected(),
            self.check_if_transactions_exist()
        );
        accounts?;
        count?;
        Ok(())
    }

    /// Look for an already-authorized account. When one exists it becomes
    /// the active account and the record list is refreshed.
    ///
    /// # Errors
    ///
    /// [`Error::ProviderUnavailable`] without a wallet, or the wallet's error.
    #[instrument(skip(self))]
    pub async fn check_if_wallet_is_connected(&self) -> Result<Option<Address>> {
        let backend = self.backend()?;
        self.inner
            .state
            .send_modify(|s| s.connection = ConnectionState::Checking);

        let accounts = match backend.wallet.list_connected_accounts().await {
            Ok(accounts) => accounts,
            Err(e) => {
                self.inner
                    .state
                    .send_modify(|s| s.connection = ConnectionState::Disconnected);
                return Err(log_failure("check_if_wallet_is_connected", e));
            }
        };

        let Some(account) = accounts.first().copied() else {
            info!("no account found");
            self.inner
                .state
                .send_modify(|s| s.connection = ConnectionState::Disconnected);
            return Ok(None);
        };

        info!(account = %account, "found authorized account");
        self.inner.state.send_modify(|s| {
            s.current_account = Some(account);
            s.connection = ConnectionState::Connected;
        });
        // Logged inside; discovery itself succeeded.
        let _ = self.refresh_records().await;
        Ok(Some(account))
    }

    /// Read the contract's record count and persist it locally. A failed
    /// read persists `0`.
    ///
    /// # Errors
    ///
    /// [`Error::ProviderUnavailable`] without a wallet, the contract error
    /// (after `0` was persisted), or a storage error.
    #[instrument(skip(self))]
    pub async fn check_if_transactions_exist(&self) -> Result<u64> {
        let backend = self.backend()?;
        match backend.contract.get_record_count().await {
            Ok(count) => {
                self.store_count(count).await?;
                Ok(count)
            }
            Err(e) => {
                let err = log_failure("check_if_transactions_exist", e);
                self.store_count(0).await?;
                Err(err)
            }
        }
    }

    /// Replace the record list with the contract's records.
    ///
    /// # Errors
    ///
    /// [`Error::ProviderUnavailable`] without a wallet, or the contract error.
    #[instrument(skip(self))]
    pub async fn refresh_records(&self) -> Result<Vec<TransactionRecord>> {
        let backend = self.backend()?;
        let raw = backend
            .contract
            .get_all_records()
            .await
            .map_err(|e| log_failure("refresh_records", e))?;
        let records = map_records(&raw);
        debug!(count = records.len(), "replacing record list");
        self.inner
            .state
            .send_modify(|s| s.transactions = records.clone());
        Ok(records)
    }

    /// Ask the wallet to connect an account.
    ///
    /// # Errors
    ///
    /// [`Error::ProviderUnavailable`] without a wallet,
    /// [`Error::UserRejected`] when declined, or [`Error::Rpc`].
    #[instrument(skip(self))]
    pub async fn connect_wallet(&self) -> Result<Address> {
        let backend = self.backend()?;
        self.inner.state.send_modify(|s| s.connecting = true);
        let result = backend.wallet.request_connection().await;
        self.inner.state.send_modify(|s| s.connecting = false);

        let account = result.map_err(|e| log_failure("connect_wallet", e))?;
        info!(account = %account, "wallet connected");
        self.inner.state.send_modify(|s| {
            s.current_account = Some(account);
            s.connection = ConnectionState::Connected;
        });
        Ok(account)
    }

    /// Submit the form: send the value transfer, append the record, wait
    /// for it to be mined, then refresh the count and the session.
    ///
    /// # Errors
    ///
    /// [`Error::ProviderUnavailable`] without a wallet,
    /// [`Error::SubmissionInFlight`] under single-flight, [`Error::Conversion`]
    /// for a malformed amount or address, or the wallet/contract error.
    #[instrument(skip(self))]
    pub async fn send_transaction(&self) -> Result<Receipt> {
        let backend = self.backend()?;

        let _guard = if self.inner.options.single_flight {
            if self.inner.in_flight.swap(true, Ordering::AcqRel) {
                return Err(log_failure("send_transaction", Error::SubmissionInFlight));
            }
            FlightGuard(Some(&self.inner.in_flight))
        } else {
            FlightGuard(None)
        };

        self.inner
            .state
            .send_modify(|s| s.submit = SubmitState::Submitting);
        let result = self.submit(&backend).await;
        if result.is_err() {
            self.inner.state.send_modify(|s| {
                s.is_loading = false;
                s.submit = SubmitState::Idle;
            });
        }
        result.map_err(|e| log_failure("send_transaction", e))
    }

    async fn submit(&self, backend: &Backend) -> Result<Receipt> {
        let (form, account) = {
            let state = self.inner.state.borrow();
            (state.form_data.clone(), state.current_account)
        };

        let value = parse_amount(&form.amount)?;
        let to: Address = form
            .address_to
            .trim()
            .parse()
            .map_err(|e| Error::conversion(format!("invalid receiver {:?}: {e}", form.address_to)))?;

        let transfer = ValueTransfer::new(account, to, value).with_gas(self.inner.options.gas_limit);
        debug!(?transfer, "sending value transfer");
        backend.wallet.send_value_transfer(transfer).await?;

        let pending = backend
            .contract
            .append_record(
                account,
                NewRecord {
                    receiver: to,
                    amount: value,
                    message: form.message,
                    keyword: form.keyword,
                },
            )
            .await?;
        let hash = pending.hash();

        self.inner.state.send_modify(|s| {
            s.is_loading = true;
            s.submit = SubmitState::AwaitingConfirmation;
        });
        info!(tx = %hash, "loading");
        let receipt = pending.await_confirmation().await?;
        info!(tx = %hash, block = ?receipt.block_number, "success");
        if !receipt.success {
            warn!(tx = %hash, "record transaction reverted");
        }
        self.inner.state.send_modify(|s| {
            s.is_loading = false;
            s.submit = SubmitState::Idle;
        });

        // The record is mined; local bookkeeping failures no longer fail the submission.
        match backend.contract.get_record_count().await {
            Ok(count) => {
                debug!(count, "record count after submission");
                let _ = self.store_count(count).await;
            }
            Err(e) => {
                log_failure("send_transaction count", e);
            }
        }

        let _ = self.refresh().await;
        Ok(receipt)
    }

    /// Tear the session down. Subscribers observe a reset snapshot.
    pub fn unmount(self) {
        self.inner.state.send_replace(Snapshot::default());
        debug!("transaction context unmounted");
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn backend(&self) -> Result<Backend> {
        self.inner.backend.clone().ok_or_else(|| {
            let err = Error::ProviderUnavailable;
            self.inner.advisory.advise(&DisplayError(&err).to_string());
            err
        })
    }

    async fn restore_count(&self) {
        match self.inner.store.load_count().await {
            Ok(count) => self.inner.state.send_modify(|s| s.transaction_count = count),
            Err(e) => warn!(error = %e, "failed to read stored count"),
        }
    }

    async fn store_count(&self, count: u64) -> Result<()> {
        self.inner.state.send_modify(|s| s.transaction_count = Some(count));
        self.inner.store.save_count(count).await.map_err(|e| {
            let err = Error::from(e);
            warn!(error = %err, "failed to persist count");
            err
        })
    }
}

fn log_failure(action: &str, err: Error) -> Error {
    if err.is_user_rejection() {
        info!(action, error = %err, "request declined");
    } else {
        warn!(action, error = %err, "action failed");
    }
    err
}
