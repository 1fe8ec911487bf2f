//! Balance Manager
//!
//! Reads one snapshot from each collaborator and hands it to the pure
//! engine. The node balance snapshot is read first; if it is missing the
//! whole derivation fails with `BalanceUnavailable` before anything else is
//! queried.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use super::engine::derive_balance_state;
use super::error::BalanceError;
use super::state::BalanceState;
use crate::node::{ActivityIndex, ChannelSource, NodeBalanceSource};
use crate::transfer::{Transfer, TransferStore};

pub struct BalanceManager {
    balances: Arc<dyn NodeBalanceSource>,
    channels: Arc<dyn ChannelSource>,
    activity: Arc<dyn ActivityIndex>,
    store: Arc<dyn TransferStore>,
}

impl BalanceManager {
    pub fn new(
        balances: Arc<dyn NodeBalanceSource>,
        channels: Arc<dyn ChannelSource>,
        activity: Arc<dyn ActivityIndex>,
        store: Arc<dyn TransferStore>,
    ) -> Self {
        Self {
            balances,
            channels,
            activity,
            store,
        }
    }

    pub async fn derive_balance_state(&self) -> Result<BalanceState, BalanceError> {
        let balances = match self.balances.current_balances().await {
            Ok(b) => b,
            Err(e) => {
                debug!(error = %e, "Balance details unavailable");
                return Err(BalanceError::BalanceUnavailable);
            }
        };

        let channels = self.channels.current_channels().await.unwrap_or_else(|e| {
            warn!(error = %e, "Channel list unavailable, reconciling without channels");
            Vec::new()
        });

        let active_transfers = self.store.list_active().await?;
        let landed = self.landed_closes(&active_transfers).await;

        derive_balance_state(Some(&balances), &channels, &active_transfers, &landed)
    }

    /// Channel ids of to-savings transfers whose close is already on-chain
    async fn landed_closes(&self, transfers: &[Transfer]) -> HashSet<String> {
        let channel_ids: Vec<&str> = transfers
            .iter()
            .filter(|t| t.transfer_type.is_to_savings())
            .filter_map(|t| t.channel_id.as_deref())
            .collect();

        let lookups = channel_ids.iter().map(|channel_id| async move {
            match self.activity.has_onchain_activity_for_channel(channel_id).await {
                Ok(found) => found.then(|| channel_id.to_string()),
                Err(e) => {
                    warn!(channel_id = %channel_id, error = %e, "On-chain activity lookup failed");
                    None
                }
            }
        });

        join_all(lookups).await.into_iter().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{BalanceDetails, ChannelDetails, LightningBalance, NodeSnapshot, SnapshotNode};
    use crate::transfer::{MemoryTransferRepo, NewTransfer, TransferService, TransferType};

    fn manager(node: Arc<SnapshotNode>, service: Arc<TransferService>) -> BalanceManager {
        BalanceManager::new(node.clone(), node.clone(), node, service)
    }

    fn service(node: &Arc<SnapshotNode>) -> Arc<TransferService> {
        Arc::new(TransferService::new(
            Arc::new(MemoryTransferRepo::new()),
            node.clone(),
            node.clone(),
            node.clone(),
        ))
    }

    #[tokio::test]
    async fn test_unavailable_when_node_not_ready() {
        let node = Arc::new(SnapshotNode::not_ready());
        let svc = service(&node);
        let result = manager(node, svc).derive_balance_state().await;
        assert_eq!(result, Err(BalanceError::BalanceUnavailable));
    }

    #[tokio::test]
    async fn test_missing_channel_list_degrades() {
        let node = Arc::new(SnapshotNode::new(NodeSnapshot {
            balances: Some(BalanceDetails {
                total_onchain_balance_sats: 1_000,
                total_lightning_balance_sats: 2_000,
                lightning_balances: vec![],
            }),
            ..Default::default()
        }));
        let svc = service(&node);
        let state = manager(node, svc).derive_balance_state().await.unwrap();
        assert_eq!(state.total_onchain_sats, 1_000);
        assert_eq!(state.total_lightning_sats, 2_000);
        assert_eq!(state.max_send_lightning_sats, 0);
    }

    #[tokio::test]
    async fn test_close_activity_is_queried() {
        let node = Arc::new(SnapshotNode::new(NodeSnapshot {
            balances: Some(BalanceDetails {
                total_onchain_balance_sats: 0,
                total_lightning_balance_sats: 50_000,
                lightning_balances: vec![LightningBalance {
                    channel_id: "c2".into(),
                    amount_sats: 15_000,
                }],
            }),
            channels: Some(vec![ChannelDetails {
                channel_id: "c1".into(),
                is_channel_ready: true,
                is_usable: true,
                next_outbound_htlc_limit_msat: 35_000_000,
                funding_txid: None,
            }]),
            ..Default::default()
        }));
        let svc = service(&node);
        svc.create(NewTransfer::new(TransferType::CoopClose, 15_000).with_channel_id("c2"))
            .await
            .unwrap();
        let mgr = manager(node.clone(), svc);

        let before = mgr.derive_balance_state().await.unwrap();
        assert_eq!(before.balance_in_transfer_to_savings, 15_000);
        assert_eq!(before.total_lightning_sats, 35_000);
        assert_eq!(before.max_send_lightning_sats, 35_000);

        node.add_onchain_activity("c2").await;
        let after = mgr.derive_balance_state().await.unwrap();
        assert_eq!(after.balance_in_transfer_to_savings, 0);
        assert_eq!(after.total_lightning_sats, 35_000);
    }
}
