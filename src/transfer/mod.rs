//! Savings <-> Spending Transfers
//!
//! Tracks funds that are moving between the on-chain (savings) and Lightning
//! (spending) halves of the wallet until they settle.
//!
//! # Architecture
//!
//! ```text
//! TransferTracker ──▶ TransferStore (trait) ──▶ TransferService ──▶ MemoryTransferRepo
//!       ▲                                             │
//!   SyncWorker                             ChannelSource / NodeBalanceSource / OrderResolver
//! ```
//!
//! # Lifecycle
//!
//! ```text
//! CREATED → ASSIGNED (channel / funding tx known) → SETTLED
//! ```
//!
//! # Invariants
//!
//! 1. **Settled is terminal**: a settled transfer never reappears in the active set
//! 2. **Monotonic assignment**: `channel_id` / `funding_tx_id` are set once, never cleared
//! 3. **Whole-list refresh**: the tracker replaces its list wholesale after each mutation

pub mod error;
pub mod repo;
pub mod service;
pub mod state;
pub mod store;
pub mod tracker;
pub mod types;
pub mod worker;

// Re-exports for convenience
pub use error::TransferError;
pub use repo::MemoryTransferRepo;
pub use service::TransferService;
pub use state::TransferState;
pub use store::TransferStore;
pub use tracker::{ActiveTransfers, TransferTracker};
pub use types::{NewTransfer, Transfer, TransferId, TransferType};
pub use worker::{SyncReport, SyncWorker, WorkerConfig};
