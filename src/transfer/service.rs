//! Transfer Service
//!
//! [`TransferStore`] implementation over the in-memory repository. Besides
//! plain persistence it knows how to re-evaluate active transfers against the
//! node: a to-spending transfer settles once its channel is usable, a
//! to-savings transfer settles once the node stops reporting a Lightning
//! balance for the closed channel.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::error::TransferError;
use super::repo::MemoryTransferRepo;
use super::store::TransferStore;
use super::types::{NewTransfer, Transfer, TransferId};
use crate::node::{BalanceDetails, ChannelDetails, ChannelSource, NodeBalanceSource, OrderResolver, find_channel};

pub struct TransferService {
    repo: Arc<MemoryTransferRepo>,
    channels: Arc<dyn ChannelSource>,
    balances: Arc<dyn NodeBalanceSource>,
    orders: Arc<dyn OrderResolver>,
}

impl TransferService {
    pub fn new(
        repo: Arc<MemoryTransferRepo>,
        channels: Arc<dyn ChannelSource>,
        balances: Arc<dyn NodeBalanceSource>,
        orders: Arc<dyn OrderResolver>,
    ) -> Self {
        Self {
            repo,
            channels,
            balances,
            orders,
        }
    }

    pub fn repo(&self) -> &Arc<MemoryTransferRepo> {
        &self.repo
    }

    pub async fn get(&self, id: &TransferId) -> Option<Transfer> {
        self.repo.get(id).await
    }

    pub async fn assign_channel(&self, id: &TransferId, channel_id: &str) -> Result<bool, TransferError> {
        self.repo.assign_channel(id, channel_id).await
    }

    pub async fn assign_funding_tx(&self, id: &TransferId, funding_tx_id: &str) -> Result<bool, TransferError> {
        self.repo.assign_funding_tx(id, funding_tx_id).await
    }

    /// Channel a transfer refers to
    ///
    /// An assigned `channel_id` wins. Otherwise, for LSP orders, the order's
    /// funding txid is matched against the channels' funding outpoints and
    /// the result is persisted to the transfer.
    pub async fn resolve_channel_id(
        &self,
        transfer: &Transfer,
        channels: &[ChannelDetails],
    ) -> Result<Option<String>, TransferError> {
        if let Some(channel_id) = &transfer.channel_id {
            return Ok(Some(channel_id.clone()));
        }
        let Some(order_id) = transfer.lsp_order_id.as_deref() else {
            return Ok(None);
        };

        let Some(funding_txid) = self.orders.funding_tx_for_order(order_id).await? else {
            debug!(order_id = %order_id, "Order has no funding tx yet");
            return Ok(None);
        };

        let Some(channel) = channels
            .iter()
            .find(|c| c.funding_txid.as_deref() == Some(funding_txid.as_str()))
        else {
            debug!(
                order_id = %order_id,
                funding_txid = %funding_txid,
                "Order has funding tx but no matching channel"
            );
            return Ok(None);
        };

        self.repo.assign_channel(&transfer.id, &channel.channel_id).await?;
        Ok(Some(channel.channel_id.clone()))
    }

    async fn settle_now(&self, id: &TransferId) -> Result<bool, TransferError> {
        self.repo.mark_settled(id, Utc::now().timestamp_millis()).await
    }

    async fn sync_to_spending(
        &self,
        transfer: &Transfer,
        channels: &[ChannelDetails],
    ) -> Result<bool, TransferError> {
        let Some(channel_id) = self.resolve_channel_id(transfer, channels).await? else {
            debug!(
                transfer_id = %transfer.id,
                order_id = transfer.lsp_order_id.as_deref().unwrap_or("none"),
                "Could not resolve channel for transfer"
            );
            return Ok(false);
        };

        match find_channel(channels, &channel_id) {
            Some(channel) if channel.is_usable => {
                let settled = self.settle_now(&transfer.id).await?;
                debug!(transfer_id = %transfer.id, channel_id = %channel_id, "Channel usable, settled transfer");
                Ok(settled)
            }
            _ => {
                debug!(transfer_id = %transfer.id, channel_id = %channel_id, "Channel not yet usable");
                Ok(false)
            }
        }
    }

    async fn sync_to_savings(
        &self,
        transfer: &Transfer,
        channels: &[ChannelDetails],
        balances: &BalanceDetails,
    ) -> Result<bool, TransferError> {
        let Some(channel_id) = self.resolve_channel_id(transfer, channels).await? else {
            return Ok(false);
        };
        if balances.has_channel_balance(&channel_id) {
            return Ok(false);
        }
        let settled = self.settle_now(&transfer.id).await?;
        debug!(transfer_id = %transfer.id, channel_id = %channel_id, "Channel balance swept, settled transfer");
        Ok(settled)
    }
}

#[async_trait]
impl TransferStore for TransferService {
    async fn list_active(&self) -> Result<Vec<Transfer>, TransferError> {
        Ok(self.repo.list_active().await)
    }

    async fn create(&self, req: NewTransfer) -> Result<TransferId, TransferError> {
        if req.amount_sats == 0 {
            return Err(TransferError::InvalidAmount);
        }

        let id = TransferId::new();
        let transfer_type = req.transfer_type;
        let channel_id = req.channel_id.clone();
        let transfer = Transfer::from_request(id.clone(), req, Utc::now().timestamp_millis());
        self.repo.insert(transfer).await?;

        info!(
            transfer_id = %id,
            transfer_type = %transfer_type,
            channel_id = channel_id.as_deref().unwrap_or("none"),
            "Created transfer"
        );
        Ok(id)
    }

    async fn mark_settled(&self, id: &TransferId) -> Result<(), TransferError> {
        self.settle_now(id).await?;
        info!(transfer_id = %id, "Settled transfer");
        Ok(())
    }

    async fn resync(&self) -> Result<usize, TransferError> {
        let active = self.repo.list_active().await;
        if active.is_empty() {
            return Ok(0);
        }

        let channels = match self.channels.current_channels().await {
            Ok(channels) => channels,
            Err(e) => {
                error!(error = %e, "Failed to get channels for transfer sync");
                return Ok(0);
            }
        };
        // Without balances a swept close cannot be told apart from an unknown one
        let balances = self.balances.current_balances().await.ok();

        debug!(count = active.len(), "Syncing active transfers");

        let mut settled = 0;
        for transfer in &active {
            let result = if transfer.transfer_type.is_to_spending() {
                self.sync_to_spending(transfer, &channels).await
            } else if let Some(balances) = balances.as_ref() {
                self.sync_to_savings(transfer, &channels, balances).await
            } else {
                Ok(false)
            };
            match result {
                Ok(true) => settled += 1,
                Ok(false) => {}
                Err(e) => {
                    // logged per transfer; the remaining transfers still sync
                    warn!(transfer_id = %transfer.id, error = %e, code = e.code(), "Failed to sync transfer");
                }
            }
        }

        if settled > 0 {
            info!(count = settled, "Settled transfers during sync");
        }
        Ok(settled)
    }

    async fn prune_settled(&self, retention: Duration) -> Result<usize, TransferError> {
        let retention_ms = i64::try_from(retention.as_millis()).unwrap_or(i64::MAX);
        let expiration = Utc::now().timestamp_millis().saturating_sub(retention_ms);
        Ok(self.repo.delete_old_settled(expiration).await)
    }
}
