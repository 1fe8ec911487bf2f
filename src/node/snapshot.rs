//! In-memory node
//!
//! Serves a fixed [`NodeSnapshot`] through every collaborator trait. Used by
//! the binary (loaded from a JSON fixture) and by tests, which mutate it to
//! walk channels through their lifecycle.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use super::{
    ActivityIndex, BalanceDetails, ChannelDetails, ChannelSource, LightningBalance, NodeBalanceSource,
    NodeError, OrderResolver,
};
use crate::transfer::types::Transfer;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    /// `None` while the node is not started
    #[serde(default)]
    pub balances: Option<BalanceDetails>,
    /// `None` while the node is not started
    #[serde(default)]
    pub channels: Option<Vec<ChannelDetails>>,
    /// Channel ids whose close transaction is already visible on-chain
    #[serde(default)]
    pub onchain_activity: BTreeSet<String>,
    /// LSP order id -> funding txid
    #[serde(default)]
    pub orders: BTreeMap<String, String>,
    /// Transfers to seed a store with
    #[serde(default)]
    pub transfers: Vec<Transfer>,
}

pub struct SnapshotNode {
    state: RwLock<NodeSnapshot>,
}

impl SnapshotNode {
    pub fn new(snapshot: NodeSnapshot) -> Self {
        Self {
            state: RwLock::new(snapshot),
        }
    }

    /// A node that has not started: every query fails with `NodeNotReady`
    pub fn not_ready() -> Self {
        Self::new(NodeSnapshot::default())
    }

    pub fn from_json_str(json: &str) -> Result<Self, SnapshotError> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub async fn snapshot(&self) -> NodeSnapshot {
        self.state.read().await.clone()
    }

    pub async fn set_balances(&self, balances: Option<BalanceDetails>) {
        self.state.write().await.balances = balances;
    }

    /// Replace or insert the per-channel Lightning balance entry
    pub async fn set_channel_balance(&self, channel_id: &str, amount_sats: u64) {
        let mut state = self.state.write().await;
        let balances = state.balances.get_or_insert_with(BalanceDetails::default);
        balances.lightning_balances.retain(|b| b.channel_id != channel_id);
        balances.lightning_balances.push(LightningBalance {
            channel_id: channel_id.to_string(),
            amount_sats,
        });
    }

    /// Drop the per-channel entry, as the node does once a close is swept
    pub async fn remove_channel_balance(&self, channel_id: &str) {
        let mut state = self.state.write().await;
        if let Some(balances) = state.balances.as_mut() {
            balances.lightning_balances.retain(|b| b.channel_id != channel_id);
        }
    }

    pub async fn set_channels(&self, channels: Option<Vec<ChannelDetails>>) {
        self.state.write().await.channels = channels;
    }

    pub async fn upsert_channel(&self, channel: ChannelDetails) {
        let mut state = self.state.write().await;
        let channels = state.channels.get_or_insert_with(Vec::new);
        match channels.iter_mut().find(|c| c.channel_id == channel.channel_id) {
            Some(existing) => *existing = channel,
            None => channels.push(channel),
        }
    }

    /// Flip readiness and usability together; returns false if the channel is unknown
    pub async fn set_channel_usable(&self, channel_id: &str, usable: bool) -> bool {
        let mut state = self.state.write().await;
        let Some(channel) = state
            .channels
            .as_mut()
            .and_then(|cs| cs.iter_mut().find(|c| c.channel_id == channel_id))
        else {
            return false;
        };
        channel.is_usable = usable;
        channel.is_channel_ready = usable;
        true
    }

    pub async fn add_onchain_activity(&self, channel_id: &str) {
        self.state
            .write()
            .await
            .onchain_activity
            .insert(channel_id.to_string());
    }

    pub async fn set_order_funding_tx(&self, order_id: &str, funding_txid: &str) {
        self.state
            .write()
            .await
            .orders
            .insert(order_id.to_string(), funding_txid.to_string());
    }

    pub async fn seed_transfers(&self) -> Vec<Transfer> {
        self.state.read().await.transfers.clone()
    }
}

#[async_trait]
impl NodeBalanceSource for SnapshotNode {
    async fn current_balances(&self) -> Result<BalanceDetails, NodeError> {
        self.state
            .read()
            .await
            .balances
            .clone()
            .ok_or(NodeError::NodeNotReady)
    }
}

#[async_trait]
impl ChannelSource for SnapshotNode {
    async fn current_channels(&self) -> Result<Vec<ChannelDetails>, NodeError> {
        self.state
            .read()
            .await
            .channels
            .clone()
            .ok_or(NodeError::NodeNotReady)
    }
}

#[async_trait]
impl ActivityIndex for SnapshotNode {
    async fn has_onchain_activity_for_channel(&self, channel_id: &str) -> Result<bool, NodeError> {
        Ok(self.state.read().await.onchain_activity.contains(channel_id))
    }
}

#[async_trait]
impl OrderResolver for SnapshotNode {
    async fn funding_tx_for_order(&self, order_id: &str) -> Result<Option<String>, NodeError> {
        Ok(self.state.read().await.orders.get(order_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"{
        "balances": {
            "total_onchain_balance_sats": 100000,
            "total_lightning_balance_sats": 50000,
            "lightning_balances": [{ "channel_id": "c1", "amount_sats": 20000 }]
        },
        "channels": [{
            "channel_id": "c1",
            "is_channel_ready": false,
            "is_usable": false,
            "next_outbound_htlc_limit_msat": 0,
            "funding_txid": "f1"
        }],
        "onchain_activity": ["c9"],
        "orders": { "o1": "f1" }
    }"#;

    #[tokio::test]
    async fn test_not_ready_node() {
        let node = SnapshotNode::not_ready();
        assert_eq!(node.current_balances().await, Err(NodeError::NodeNotReady));
        assert_eq!(node.current_channels().await, Err(NodeError::NodeNotReady));
    }

    #[tokio::test]
    async fn test_load_from_json() {
        let node = SnapshotNode::from_json_str(SNAPSHOT).unwrap();

        let balances = node.current_balances().await.unwrap();
        assert_eq!(balances.total_onchain_balance_sats, 100_000);
        assert_eq!(balances.channel_balance_sats("c1"), 20_000);

        let channels = node.current_channels().await.unwrap();
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].funding_txid.as_deref(), Some("f1"));

        assert!(node.has_onchain_activity_for_channel("c9").await.unwrap());
        assert!(!node.has_onchain_activity_for_channel("c1").await.unwrap());
        assert_eq!(
            node.funding_tx_for_order("o1").await.unwrap().as_deref(),
            Some("f1")
        );
        assert!(node.seed_transfers().await.is_empty());
    }

    #[tokio::test]
    async fn test_mutators() {
        let node = SnapshotNode::from_json_str(SNAPSHOT).unwrap();

        assert!(node.set_channel_usable("c1", true).await);
        assert!(!node.set_channel_usable("nope", true).await);
        let channels = node.current_channels().await.unwrap();
        assert!(channels[0].is_usable && channels[0].is_channel_ready);

        node.set_channel_balance("c1", 25_000).await;
        node.set_channel_balance("c2", 1).await;
        let balances = node.current_balances().await.unwrap();
        assert_eq!(balances.channel_balance_sats("c1"), 25_000);
        assert_eq!(balances.lightning_balances.len(), 2);

        node.remove_channel_balance("c1").await;
        assert!(!node.current_balances().await.unwrap().has_channel_balance("c1"));

        node.add_onchain_activity("c1").await;
        assert!(node.has_onchain_activity_for_channel("c1").await.unwrap());
    }
}
