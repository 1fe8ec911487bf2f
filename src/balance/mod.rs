//! Balance Reconciliation
//!
//! Derives the consolidated savings/spending balance view from node
//! balances, the channel list and the active transfers.
//!
//! # Invariants
//!
//! 1. **No double count**: an LSP order payment stops counting the moment its
//!    transfer has a channel, and a usable channel is never added to the
//!    pending bucket.
//! 2. **Floor at zero**: all arithmetic is unsigned and saturating.
//! 3. **Unknown is not zero**: a missing node snapshot is an error
//!    (`BalanceUnavailable`), never an all-zero state.

pub mod engine;
pub mod error;
pub mod manager;
pub mod state;

pub use engine::{
    CloseTransferAmounts, NoActivity, OnchainActivity, close_transfer_amounts, derive_balance_state,
    max_send_lightning_sats, order_payments_sats, pending_channels_sats,
};
pub use error::BalanceError;
pub use manager::BalanceManager;
pub use state::BalanceState;
