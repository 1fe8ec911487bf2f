//! Wallet Balance - transfer-aware balance reconciliation
//!
//! Folds raw node balances and the in-flight savings/spending transfers into
//! one balance view that never counts a satoshi twice.
//!
//! # Modules
//!
//! - [`transfer`] - Transfer records, lifecycle tracker, store and sync worker
//! - [`balance`] - Reconciliation engine and `BalanceState`
//! - [`node`] - Collaborator traits for the Lightning node, activity index and LSP orders
//! - [`config`] - YAML application configuration
//! - [`logging`] - tracing subscriber setup

pub mod balance;
pub mod config;
pub mod logging;
pub mod node;
pub mod transfer;

// Convenient re-exports at crate root
pub use balance::{BalanceError, BalanceManager, BalanceState, derive_balance_state};
pub use node::{
    ActivityIndex, BalanceDetails, ChannelDetails, ChannelSource, LightningBalance, NodeBalanceSource,
    NodeError, OrderResolver,
};
pub use transfer::{
    NewTransfer, Transfer, TransferError, TransferId, TransferStore, TransferTracker, TransferType,
};
