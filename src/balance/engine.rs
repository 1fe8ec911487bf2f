//! Balance Reconciliation Engine
//!
//! Turns the node's raw balances plus the active transfers into a
//! [`BalanceState`] in which no satoshi is counted twice and funds that are
//! moving between savings and spending are shown as in-flight.
//!
//! ```text
//! order payments  ─┐
//!                  ├─▶ to_spending
//! pending channels ┤
//!                  └──────────────┐
//!                                 ├─▶ lightning = node.lightning - pending - closing
//! closing channels ─▶ to_savings ─┘
//! ```
//!
//! The engine does no I/O. Callers pass one snapshot of balances, channels,
//! transfers and on-chain activity; keeping those mutually consistent is the
//! caller's job (see [`BalanceManager`](super::manager::BalanceManager)).

use std::collections::{BTreeSet, HashSet};

use tracing::{debug, warn};

use super::error::BalanceError;
use super::state::BalanceState;
use crate::node::{BalanceDetails, ChannelDetails, find_channel};
use crate::transfer::Transfer;

/// Answers whether a channel's close already shows up as on-chain activity
pub trait OnchainActivity {
    fn has_onchain_activity(&self, channel_id: &str) -> bool;
}

impl OnchainActivity for HashSet<String> {
    fn has_onchain_activity(&self, channel_id: &str) -> bool {
        self.contains(channel_id)
    }
}

impl OnchainActivity for BTreeSet<String> {
    fn has_onchain_activity(&self, channel_id: &str) -> bool {
        self.contains(channel_id)
    }
}

/// No on-chain activity recorded for any channel
#[derive(Debug, Clone, Copy, Default)]
pub struct NoActivity;

impl OnchainActivity for NoActivity {
    fn has_onchain_activity(&self, _channel_id: &str) -> bool {
        false
    }
}

/// Lightning amounts tied to channels that are closing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CloseTransferAmounts {
    /// Removed from the Lightning total regardless of on-chain activity
    pub lightning_to_subtract: u64,
    /// Shown as "transferring to savings" until the close lands on-chain
    pub pending_close_amount: u64,
}

fn unsettled(transfers: &[Transfer]) -> impl Iterator<Item = &Transfer> {
    transfers.iter().filter(|t| !t.is_settled)
}

/// Sats paid towards LSP orders whose channel is not assigned yet
///
/// Stops counting a transfer as soon as it gets a `channel_id`; from then on
/// the channel balance is the source of truth.
pub fn order_payments_sats(active_transfers: &[Transfer]) -> u64 {
    unsettled(active_transfers)
        .filter(|t| t.is_awaiting_channel())
        .fold(0u64, |acc, t| {
            debug!(
                transfer_id = %t.id,
                order_id = t.lsp_order_id.as_deref().unwrap_or_default(),
                amount = t.amount_sats,
                "Order payment transfer"
            );
            acc.saturating_add(t.amount_sats)
        })
}

/// Lightning balance of to-spending channels that exist but are not usable yet
pub fn pending_channels_sats(
    active_transfers: &[Transfer],
    channels: &[ChannelDetails],
    balances: &BalanceDetails,
) -> u64 {
    let mut amount = 0u64;

    for transfer in unsettled(active_transfers).filter(|t| t.transfer_type.is_to_spending()) {
        let Some(channel_id) = transfer.channel_id.as_deref() else {
            continue;
        };
        let Some(channel) = find_channel(channels, channel_id) else {
            // channel list still catching up
            warn!(
                transfer_id = %transfer.id,
                channel_id = %channel_id,
                "Transfer channel not found in channel list"
            );
            continue;
        };

        if channel.is_usable {
            continue;
        }

        let channel_balance = balances.channel_balance_sats(channel_id);
        debug!(
            transfer_id = %transfer.id,
            channel_id = %channel_id,
            is_ready = channel.is_channel_ready,
            balance = channel_balance,
            "Pending channel transfer"
        );
        amount = amount.saturating_add(channel_balance);
    }

    amount
}

/// Per-channel Lightning balances of to-savings transfers
pub fn close_transfer_amounts(
    active_transfers: &[Transfer],
    balances: &BalanceDetails,
    activity: &impl OnchainActivity,
) -> CloseTransferAmounts {
    let mut amounts = CloseTransferAmounts::default();

    for transfer in unsettled(active_transfers).filter(|t| t.transfer_type.is_to_savings()) {
        let Some(channel_id) = transfer.channel_id.as_deref() else {
            continue;
        };

        let channel_balance = balances.channel_balance_sats(channel_id);
        amounts.lightning_to_subtract = amounts.lightning_to_subtract.saturating_add(channel_balance);

        let landed = activity.has_onchain_activity(channel_id);
        if !landed {
            amounts.pending_close_amount = amounts.pending_close_amount.saturating_add(channel_balance);
        }

        debug!(
            transfer_id = %transfer.id,
            channel_id = %channel_id,
            balance = channel_balance,
            landed_onchain = landed,
            "Close transfer"
        );
    }

    amounts
}

/// Outbound capacity of usable channels, msat truncated to sat
pub fn max_send_lightning_sats(channels: &[ChannelDetails]) -> u64 {
    channels
        .iter()
        .filter(|c| c.is_usable)
        .fold(0u64, |acc, c| acc.saturating_add(c.next_outbound_htlc_limit_msat))
        / 1000
}

/// Derive the balance view from one consistent snapshot
///
/// # Errors
/// `BalanceUnavailable` when `balances` is `None`. Every other gap
/// (unmatched channel, missing per-channel entry, no activity record)
/// degrades to zero.
pub fn derive_balance_state(
    balances: Option<&BalanceDetails>,
    channels: &[ChannelDetails],
    active_transfers: &[Transfer],
    activity: &impl OnchainActivity,
) -> Result<BalanceState, BalanceError> {
    let balances = balances.ok_or(BalanceError::BalanceUnavailable)?;

    let order_payments = order_payments_sats(active_transfers);
    let pending_channels = pending_channels_sats(active_transfers, channels, balances);
    let closing = close_transfer_amounts(active_transfers, balances, activity);

    let to_spending = order_payments.saturating_add(pending_channels);
    let to_savings = closing.pending_close_amount;

    let total_onchain_sats = balances.total_onchain_balance_sats;
    let total_lightning_sats = balances
        .total_lightning_balance_sats
        .saturating_sub(pending_channels)
        .saturating_sub(closing.lightning_to_subtract);

    let state = BalanceState {
        total_onchain_sats,
        total_lightning_sats,
        max_send_lightning_sats: max_send_lightning_sats(channels),
        balance_in_transfer_to_savings: to_savings,
        balance_in_transfer_to_spending: to_spending,
    };

    debug!(
        active_transfers = active_transfers.len(),
        node_onchain = balances.total_onchain_balance_sats,
        node_lightning = balances.total_lightning_balance_sats,
        onchain = state.total_onchain_sats,
        lightning = state.total_lightning_sats,
        to_savings = to_savings,
        to_spending = to_spending,
        "Derived balance state"
    );

    Ok(state)
}
