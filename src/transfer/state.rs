//! Transfer Lifecycle State
//!
//! The state is derived from the record's fields rather than stored:
//!
//! ```text
//! CREATED ──(channel / funding tx assigned)──▶ ASSIGNED ──▶ SETTLED
//!    └───────────────────────────────────────────────────────▲
//! ```
//!
//! SETTLED is terminal. Assignment is monotonic: once a `channel_id` or
//! `funding_tx_id` is set it is never cleared, so a record never moves back
//! from ASSIGNED to CREATED.

use std::fmt;

use super::types::Transfer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferState {
    /// Recorded as intent, nothing on-chain or in Lightning yet
    Created,
    /// Channel or funding transaction known, waiting for it to settle
    Assigned,
    /// Terminal
    Settled,
}

impl TransferState {
    pub fn of(transfer: &Transfer) -> Self {
        if transfer.is_settled {
            TransferState::Settled
        } else if transfer.channel_id.is_some() || transfer.funding_tx_id.is_some() {
            TransferState::Assigned
        } else {
            TransferState::Created
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferState::Settled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferState::Created => "CREATED",
            TransferState::Assigned => "ASSIGNED",
            TransferState::Settled => "SETTLED",
        }
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
