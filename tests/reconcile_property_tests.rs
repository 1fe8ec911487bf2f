//! Property-based tests for balance reconciliation
//!
//! Generates random node snapshots (channels, per-channel balances, on-chain
//! activity) and random transfer sets, then checks the invariants the balance
//! view must keep for every input: no double counting, no underflow, and
//! determinism.

use std::collections::BTreeSet;

use proptest::prelude::*;
use wallet_balance::balance::{
    BalanceState, close_transfer_amounts, derive_balance_state, order_payments_sats,
    pending_channels_sats,
};
use wallet_balance::node::{BalanceDetails, ChannelDetails, LightningBalance};
use wallet_balance::transfer::{NewTransfer, Transfer, TransferId, TransferType};

const CHANNEL_POOL: usize = 4;

fn channel_id(i: usize) -> String {
    format!("c{}", i)
}

// PROPERTY TEST STRATEGIES

fn transfer_type_strategy() -> impl Strategy<Value = TransferType> {
    (0usize..TransferType::ALL.len()).prop_map(|i| TransferType::ALL[i])
}

fn amount_strategy() -> impl Strategy<Value = u64> {
    1u64..=100_000_000u64
}

/// One transfer, optionally bound to a channel from the pool and/or an LSP order
fn transfer_strategy() -> impl Strategy<Value = (TransferType, u64, Option<usize>, bool, bool)> {
    (
        transfer_type_strategy(),
        amount_strategy(),
        prop::option::of(0usize..CHANNEL_POOL),
        prop::bool::ANY,
        prop::bool::weighted(0.2),
    )
}

fn transfers_strategy() -> impl Strategy<Value = Vec<Transfer>> {
    prop::collection::vec(transfer_strategy(), 0..8).prop_map(|entries| {
        entries
            .into_iter()
            .enumerate()
            .map(|(i, (transfer_type, amount, channel, has_order, settled))| {
                let mut req = NewTransfer::new(transfer_type, amount);
                if let Some(c) = channel {
                    req = req.with_channel_id(channel_id(c));
                }
                if has_order {
                    req = req.with_lsp_order_id(format!("o{}", i));
                }
                let mut t = Transfer::from_request(TransferId::from(format!("t{}", i).as_str()), req, 0);
                if settled {
                    t.is_settled = true;
                    t.settled_at = Some(1);
                }
                t
            })
            .collect()
    })
}

/// Channel list: each pool slot is absent, pending or usable
fn channels_strategy() -> impl Strategy<Value = Vec<ChannelDetails>> {
    prop::collection::vec((0u8..3, 0u64..10_000_000_000), CHANNEL_POOL).prop_map(|slots| {
        slots
            .into_iter()
            .enumerate()
            .filter(|(_, (kind, _))| *kind != 0)
            .map(|(i, (kind, outbound_msat))| ChannelDetails {
                channel_id: channel_id(i),
                is_channel_ready: kind == 2,
                is_usable: kind == 2,
                next_outbound_htlc_limit_msat: outbound_msat,
                funding_txid: Some(format!("f{}", i)),
            })
            .collect()
    })
}

fn balances_strategy() -> impl Strategy<Value = BalanceDetails> {
    (
        0u64..=2_100_000_000_000_000,
        0u64..=500_000_000,
        prop::collection::vec(prop::option::of(0u64..=100_000_000), CHANNEL_POOL),
    )
        .prop_map(|(onchain, lightning, per_channel)| BalanceDetails {
            total_onchain_balance_sats: onchain,
            total_lightning_balance_sats: lightning,
            lightning_balances: per_channel
                .into_iter()
                .enumerate()
                .filter_map(|(i, sats)| {
                    sats.map(|amount_sats| LightningBalance {
                        channel_id: channel_id(i),
                        amount_sats,
                    })
                })
                .collect(),
        })
}

fn activity_strategy() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::vec(prop::bool::ANY, CHANNEL_POOL).prop_map(|flags| {
        flags
            .into_iter()
            .enumerate()
            .filter(|(_, landed)| *landed)
            .map(|(i, _)| channel_id(i))
            .collect()
    })
}

fn derive(
    balances: &BalanceDetails,
    channels: &[ChannelDetails],
    transfers: &[Transfer],
    activity: &BTreeSet<String>,
) -> BalanceState {
    derive_balance_state(Some(balances), channels, transfers, activity)
        .expect("balances present")
}

// PROPERTY TESTS
proptest! {
    /// Every transfer type moves funds in exactly one direction
    #[test]
    fn prop_direction_partition(transfer_type in transfer_type_strategy()) {
        prop_assert!(transfer_type.is_to_spending() != transfer_type.is_to_savings());
    }

    /// On-chain total is passed through and Lightning never exceeds the node's figure
    #[test]
    fn prop_totals_bounded(
        balances in balances_strategy(),
        channels in channels_strategy(),
        transfers in transfers_strategy(),
        activity in activity_strategy(),
    ) {
        let state = derive(&balances, &channels, &transfers, &activity);
        prop_assert_eq!(state.total_onchain_sats, balances.total_onchain_balance_sats);
        prop_assert!(state.total_lightning_sats <= balances.total_lightning_balance_sats);
    }

    /// Subtractions that exceed the node's Lightning total floor at zero
    #[test]
    fn prop_lightning_floors_at_zero(
        balances in balances_strategy(),
        channels in channels_strategy(),
        transfers in transfers_strategy(),
        activity in activity_strategy(),
    ) {
        let pending = pending_channels_sats(&transfers, &channels, &balances);
        let closing = close_transfer_amounts(&transfers, &balances, &activity);
        let removed = pending as u128 + closing.lightning_to_subtract as u128;

        let state = derive(&balances, &channels, &transfers, &activity);
        let expected = (balances.total_lightning_balance_sats as u128).saturating_sub(removed);
        prop_assert_eq!(state.total_lightning_sats as u128, expected);
    }

    /// Same inputs, same output
    #[test]
    fn prop_deterministic(
        balances in balances_strategy(),
        channels in channels_strategy(),
        transfers in transfers_strategy(),
        activity in activity_strategy(),
    ) {
        let first = derive(&balances, &channels, &transfers, &activity);
        let second = derive(&balances, &channels, &transfers, &activity);
        prop_assert_eq!(first, second);
    }

    /// Settled records never influence the view
    #[test]
    fn prop_settled_transfers_ignored(
        balances in balances_strategy(),
        channels in channels_strategy(),
        transfers in transfers_strategy(),
        activity in activity_strategy(),
    ) {
        let unsettled: Vec<Transfer> = transfers.iter().filter(|t| !t.is_settled).cloned().collect();
        prop_assert_eq!(
            derive(&balances, &channels, &transfers, &activity),
            derive(&balances, &channels, &unsettled, &activity)
        );
    }

    /// Order payments only count transfers that have no channel yet
    #[test]
    fn prop_assigned_orders_not_counted(transfers in transfers_strategy()) {
        let expected: u64 = transfers
            .iter()
            .filter(|t| !t.is_settled && t.transfer_type.is_to_spending())
            .filter(|t| t.lsp_order_id.is_some() && t.channel_id.is_none())
            .map(|t| t.amount_sats)
            .sum();
        prop_assert_eq!(order_payments_sats(&transfers), expected);
    }

    /// Usable channels are never part of the in-flight to-spending amount
    #[test]
    fn prop_usable_channels_not_pending(
        balances in balances_strategy(),
        channels in channels_strategy(),
        transfers in transfers_strategy(),
        activity in activity_strategy(),
    ) {
        let usable: Vec<ChannelDetails> = channels
            .into_iter()
            .map(|c| ChannelDetails { is_usable: true, is_channel_ready: true, ..c })
            .collect();

        prop_assert_eq!(pending_channels_sats(&transfers, &usable, &balances), 0);
        let state = derive(&balances, &usable, &transfers, &activity);
        prop_assert_eq!(state.balance_in_transfer_to_spending, order_payments_sats(&transfers));
    }

    /// Once every close is visible on-chain nothing is shown as moving to savings
    #[test]
    fn prop_landed_closes_not_pending(
        balances in balances_strategy(),
        channels in channels_strategy(),
        transfers in transfers_strategy(),
        activity in activity_strategy(),
    ) {
        let closing = close_transfer_amounts(&transfers, &balances, &activity);
        prop_assert!(closing.pending_close_amount <= closing.lightning_to_subtract);

        let everything: BTreeSet<String> = (0..CHANNEL_POOL).map(channel_id).collect();
        let state = derive(&balances, &channels, &transfers, &everything);
        prop_assert_eq!(state.balance_in_transfer_to_savings, 0);
    }
}
