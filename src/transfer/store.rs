//! Transfer Store
//!
//! Persistence boundary for transfer records. The store owns the
//! monotonic-set rule for `channel_id`/`funding_tx_id` and is expected to
//! exclude settled records from `list_active`.

use std::time::Duration;

use async_trait::async_trait;

use super::error::TransferError;
use super::types::{NewTransfer, Transfer, TransferId};

#[async_trait]
pub trait TransferStore: Send + Sync {
    /// All unsettled transfers, in creation order
    async fn list_active(&self) -> Result<Vec<Transfer>, TransferError>;

    /// Persist a new unsettled transfer and return its id
    async fn create(&self, req: NewTransfer) -> Result<TransferId, TransferError>;

    /// Terminal transition; the record must drop out of `list_active`
    async fn mark_settled(&self, id: &TransferId) -> Result<(), TransferError>;

    /// Re-evaluate active transfers against node state and persist any
    /// settlement. Returns the number of transfers settled.
    async fn resync(&self) -> Result<usize, TransferError>;

    /// Drop settled records older than `retention`. Returns the number removed.
    async fn prune_settled(&self, _retention: Duration) -> Result<usize, TransferError> {
        Ok(0)
    }
}


#[cfg(test)]
pub use mock::MockStore;
