//! In-memory transfer repository
//!
//! Holds every transfer record (settled or not) in creation order. All
//! writes go through here, so this is where the record invariants are
//! enforced:
//! - `settled_at` is set exactly when `is_settled` is
//! - `channel_id` / `funding_tx_id` are set at most once

use tokio::sync::RwLock;
use tracing::info;

use super::error::TransferError;
use super::types::{Transfer, TransferId};

#[derive(Clone, Copy)]
enum AssignedField {
    Channel,
    FundingTx,
}

impl AssignedField {
    fn name(&self) -> &'static str {
        match self {
            AssignedField::Channel => "channel_id",
            AssignedField::FundingTx => "funding_tx_id",
        }
    }

    fn slot<'a>(&self, transfer: &'a mut Transfer) -> &'a mut Option<String> {
        match self {
            AssignedField::Channel => &mut transfer.channel_id,
            AssignedField::FundingTx => &mut transfer.funding_tx_id,
        }
    }

    /// Ok(true) if the field is empty, Ok(false) if it already holds `value`
    fn check(&self, id: &TransferId, current: Option<&str>, value: &str) -> Result<bool, TransferError> {
        match current {
            None => Ok(true),
            Some(existing) if existing == value => Ok(false),
            Some(_) => Err(TransferError::ImmutableField {
                id: id.to_string(),
                field: self.name(),
            }),
        }
    }
}

/// `settled_at` is `Some` exactly when `is_settled`
fn normalized(mut transfer: Transfer) -> Transfer {
    if !transfer.is_settled {
        transfer.settled_at = None;
    } else if transfer.settled_at.is_none() {
        transfer.settled_at = Some(transfer.created_at);
    }
    transfer
}

/// Fold an incoming copy into the stored record. Settled records are left
/// untouched and assigned ids are carried forward. Returns true if the
/// stored record was replaced.
fn merge_into(existing: &mut Transfer, incoming: Transfer) -> Result<bool, TransferError> {
    if existing.is_settled {
        return Ok(false);
    }

    let mut incoming = normalized(incoming);
    for field in [AssignedField::Channel, AssignedField::FundingTx] {
        let current = field.slot(existing).clone();
        let proposed = field.slot(&mut incoming).clone();
        match (current, proposed) {
            (Some(current), None) => *field.slot(&mut incoming) = Some(current),
            (current, Some(value)) => {
                field.check(&existing.id, current.as_deref(), &value)?;
            }
            (None, None) => {}
        }
    }

    *existing = incoming;
    Ok(true)
}

#[derive(Default)]
pub struct MemoryTransferRepo {
    transfers: RwLock<Vec<Transfer>>,
}

impl MemoryTransferRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from existing records, normalizing `settled_at` against `is_settled`
    pub fn with_transfers(transfers: Vec<Transfer>) -> Self {
        let transfers = transfers.into_iter().map(normalized).collect();
        Self {
            transfers: RwLock::new(transfers),
        }
    }

    pub async fn insert(&self, transfer: Transfer) -> Result<(), TransferError> {
        let mut transfers = self.transfers.write().await;
        if transfers.iter().any(|t| t.id == transfer.id) {
            return Err(TransferError::StoreFailure(format!(
                "duplicate transfer id {}",
                transfer.id
            )));
        }
        info!(transfer_id = %transfer.id, transfer_type = %transfer.transfer_type, "Inserted transfer");
        transfers.push(transfer);
        Ok(())
    }

    pub async fn get(&self, id: &TransferId) -> Option<Transfer> {
        self.transfers
            .read()
            .await
            .iter()
            .find(|t| &t.id == id)
            .cloned()
    }

    pub async fn all(&self) -> Vec<Transfer> {
        self.transfers.read().await.clone()
    }

    pub async fn list_active(&self) -> Vec<Transfer> {
        self.transfers
            .read()
            .await
            .iter()
            .filter(|t| !t.is_settled)
            .cloned()
            .collect()
    }

    /// Insert new records and merge known ones by id; returns how many
    /// records were written.
    ///
    /// A settled record never goes back to active and an assigned
    /// `channel_id` / `funding_tx_id` is never cleared or changed. If any
    /// record in the batch conflicts, nothing is written.
    pub async fn upsert_list(&self, incoming: Vec<Transfer>) -> Result<usize, TransferError> {
        let mut transfers = self.transfers.write().await;
        let mut staged = transfers.clone();
        let mut written = 0;

        for transfer in incoming {
            match staged.iter_mut().find(|t| t.id == transfer.id) {
                Some(existing) => {
                    if merge_into(existing, transfer)? {
                        written += 1;
                    }
                }
                None => {
                    staged.push(normalized(transfer));
                    written += 1;
                }
            }
        }

        *transfers = staged;
        if written > 0 {
            info!(count = written, "Upserted transfers");
        }
        Ok(written)
    }

    /// Set `channel_id` once. Returns true if the record changed.
    pub async fn assign_channel(&self, id: &TransferId, channel_id: &str) -> Result<bool, TransferError> {
        self.assign(id, AssignedField::Channel, channel_id).await
    }

    /// Set `funding_tx_id` once. Returns true if the record changed.
    pub async fn assign_funding_tx(&self, id: &TransferId, funding_tx_id: &str) -> Result<bool, TransferError> {
        self.assign(id, AssignedField::FundingTx, funding_tx_id).await
    }

    async fn assign(&self, id: &TransferId, field: AssignedField, value: &str) -> Result<bool, TransferError> {
        let mut transfers = self.transfers.write().await;
        let transfer = transfers
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| TransferError::TransferNotFound(id.to_string()))?;

        if transfer.is_settled {
            return Err(TransferError::AlreadySettled(id.to_string()));
        }

        let slot = field.slot(transfer);
        if !field.check(id, slot.as_deref(), value)? {
            return Ok(false);
        }
        *slot = Some(value.to_string());
        info!(transfer_id = %id, field = field.name(), value = %value, "Assigned transfer field");
        Ok(true)
    }

    /// Settle a record. Returns false if it was already settled.
    pub async fn mark_settled(&self, id: &TransferId, settled_at: i64) -> Result<bool, TransferError> {
        let mut transfers = self.transfers.write().await;
        let transfer = transfers
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| TransferError::TransferNotFound(id.to_string()))?;

        if transfer.is_settled {
            return Ok(false);
        }
        transfer.is_settled = true;
        transfer.settled_at = Some(settled_at);
        info!(transfer_id = %id, "Marked transfer as settled");
        Ok(true)
    }

    /// Remove settled records with `settled_at` before `expiration_ms`
    pub async fn delete_old_settled(&self, expiration_ms: i64) -> usize {
        let mut transfers = self.transfers.write().await;
        let before = transfers.len();
        transfers.retain(|t| !(t.is_settled && t.settled_at.unwrap_or(0) < expiration_ms));
        let removed = before - transfers.len();
        if removed > 0 {
            info!(count = removed, "Deleted old settled transfers");
        }
        removed
    }
}
