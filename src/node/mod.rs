//! Node Collaborators
//!
//! Read-only views onto the Lightning node, the on-chain activity index and
//! the LSP order book. Everything here is owned by external libraries; this
//! module only fixes the shape of what the reconciliation core consumes.
//!
//! All trait methods are suspension points. Implementations must not hold a
//! lock across an `.await`.

pub mod snapshot;

pub use snapshot::{NodeSnapshot, SnapshotNode};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NodeError {
    #[error("Node is not started or has not produced a snapshot yet")]
    NodeNotReady,
}

/// Lightning balance the node attributes to a single channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightningBalance {
    pub channel_id: String,
    pub amount_sats: u64,
}

/// Node-level balance snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceDetails {
    pub total_onchain_balance_sats: u64,
    pub total_lightning_balance_sats: u64,
    #[serde(default)]
    pub lightning_balances: Vec<LightningBalance>,
}

impl BalanceDetails {
    /// First per-channel entry for `channel_id`, 0 when the node reports none
    pub fn channel_balance_sats(&self, channel_id: &str) -> u64 {
        self.lightning_balances
            .iter()
            .find(|b| b.channel_id == channel_id)
            .map_or(0, |b| b.amount_sats)
    }

    pub fn has_channel_balance(&self, channel_id: &str) -> bool {
        self.lightning_balances
            .iter()
            .any(|b| b.channel_id == channel_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelDetails {
    pub channel_id: String,
    pub is_channel_ready: bool,
    pub is_usable: bool,
    pub next_outbound_htlc_limit_msat: u64,
    /// Funding outpoint txid, used to match LSP orders to channels
    #[serde(default)]
    pub funding_txid: Option<String>,
}

#[async_trait]
pub trait NodeBalanceSource: Send + Sync {
    /// Fails with `NodeNotReady` until the node has produced a snapshot
    async fn current_balances(&self) -> Result<BalanceDetails, NodeError>;
}

#[async_trait]
pub trait ChannelSource: Send + Sync {
    async fn current_channels(&self) -> Result<Vec<ChannelDetails>, NodeError>;
}

#[async_trait]
pub trait ActivityIndex: Send + Sync {
    /// Whether a close transaction for `channel_id` already shows up on-chain
    async fn has_onchain_activity_for_channel(&self, channel_id: &str) -> Result<bool, NodeError>;
}

#[async_trait]
pub trait OrderResolver: Send + Sync {
    /// Funding txid of the channel an LSP order opened, once known
    async fn funding_tx_for_order(&self, order_id: &str) -> Result<Option<String>, NodeError>;
}

/// Channel lookup by id
pub fn find_channel<'a>(channels: &'a [ChannelDetails], channel_id: &str) -> Option<&'a ChannelDetails> {
    channels.iter().find(|c| c.channel_id == channel_id)
}
