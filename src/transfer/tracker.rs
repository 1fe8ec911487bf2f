//! Transfer Tracker
//!
//! Lifecycle orchestrator for the UI layer. Holds the list of active
//! transfers, a busy flag and the last error, and refreshes the list from the
//! store after every mutation.
//!
//! # Guarantees
//!
//! - The active list is only ever replaced whole (`watch::Sender::send_replace`)
//!   with exactly what the store returned.
//! - A failed store call leaves the list at its last good value and is
//!   returned to the caller unchanged.
//! - `is_loading` is driven by a drop guard, so it is released on success,
//!   error and cancellation alike.
//! - Mutations (create / settle / sync / prune) run one at a time.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info};

use super::error::TransferError;
use super::store::TransferStore;
use super::types::{NewTransfer, Transfer, TransferId, TransferType};

pub type ActiveTransfers = Arc<Vec<Transfer>>;

struct LoadingGuard<'a>(&'a AtomicUsize);

impl<'a> LoadingGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct TransferTracker {
    store: Arc<dyn TransferStore>,
    active: watch::Sender<ActiveTransfers>,
    loading: AtomicUsize,
    last_error: Mutex<Option<TransferError>>,
    /// Serializes mutations; never guards data
    mutation_gate: tokio::sync::Mutex<()>,
}

impl TransferTracker {
    pub fn new(store: Arc<dyn TransferStore>) -> Self {
        let (active, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            store,
            active,
            loading: AtomicUsize::new(0),
            last_error: Mutex::new(None),
            mutation_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Receiver that observes every replacement of the active list
    pub fn subscribe(&self) -> watch::Receiver<ActiveTransfers> {
        self.active.subscribe()
    }

    pub fn active_transfers(&self) -> ActiveTransfers {
        self.active.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst) > 0
    }

    pub fn last_error(&self) -> Option<TransferError> {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_error(&self, err: Option<TransferError>) {
        *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) = err;
    }

    fn record(&self, err: TransferError) -> TransferError {
        self.set_error(Some(err.clone()));
        err
    }

    /// Replace the held list with the store's current active set
    pub async fn load_active_transfers(&self) -> Result<(), TransferError> {
        let _loading = LoadingGuard::enter(&self.loading);

        match self.store.list_active().await {
            Ok(transfers) => {
                debug!(count = transfers.len(), "Loaded active transfers");
                self.active.send_replace(Arc::new(transfers));
                self.set_error(None);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, code = e.code(), "Failed to load active transfers");
                Err(self.record(e))
            }
        }
    }

    /// Reload after a successful mutation. A reload failure is recorded in
    /// `last_error` but does not undo the mutation.
    async fn refresh(&self) {
        let _ = self.load_active_transfers().await;
    }

    pub async fn create_transfer(
        &self,
        transfer_type: TransferType,
        amount_sats: u64,
        channel_id: Option<String>,
        funding_tx_id: Option<String>,
        lsp_order_id: Option<String>,
    ) -> Result<TransferId, TransferError> {
        let mut req = NewTransfer::new(transfer_type, amount_sats);
        req.channel_id = channel_id;
        req.funding_tx_id = funding_tx_id;
        req.lsp_order_id = lsp_order_id;
        self.create_transfer_request(req).await
    }

    pub async fn create_transfer_request(&self, req: NewTransfer) -> Result<TransferId, TransferError> {
        let _gate = self.mutation_gate.lock().await;
        let _loading = LoadingGuard::enter(&self.loading);

        let id = self.store.create(req).await.map_err(|e| self.record(e))?;
        info!(transfer_id = %id, "Transfer created");
        self.refresh().await;
        Ok(id)
    }

    pub async fn mark_settled(&self, id: &TransferId) -> Result<(), TransferError> {
        let _gate = self.mutation_gate.lock().await;
        let _loading = LoadingGuard::enter(&self.loading);

        self.store.mark_settled(id).await.map_err(|e| self.record(e))?;
        self.refresh().await;
        Ok(())
    }

    /// Ask the store to settle whatever the node now shows as done
    pub async fn sync_transfer_states(&self) -> Result<usize, TransferError> {
        let _gate = self.mutation_gate.lock().await;
        let _loading = LoadingGuard::enter(&self.loading);

        let settled = self.store.resync().await.map_err(|e| {
            error!(error = %e, "Failed to sync transfer states");
            self.record(e)
        })?;
        self.refresh().await;
        Ok(settled)
    }

    pub async fn prune_settled(&self, retention: Duration) -> Result<usize, TransferError> {
        let _gate = self.mutation_gate.lock().await;
        let _loading = LoadingGuard::enter(&self.loading);

        let removed = self
            .store
            .prune_settled(retention)
            .await
            .map_err(|e| self.record(e))?;
        self.refresh().await;
        Ok(removed)
    }

    pub fn transfers_of_type(&self, transfer_type: TransferType) -> Vec<Transfer> {
        self.filtered(|t| t.transfer_type == transfer_type)
    }

    pub fn transfers_to_spending(&self) -> Vec<Transfer> {
        self.filtered(|t| t.transfer_type.is_to_spending())
    }

    pub fn transfers_to_savings(&self) -> Vec<Transfer> {
        self.filtered(|t| t.transfer_type.is_to_savings())
    }

    fn filtered(&self, pred: impl Fn(&Transfer) -> bool) -> Vec<Transfer> {
        self.active
            .borrow()
            .iter()
            .filter(|t| pred(t))
            .cloned()
            .collect()
    }
}
