use thiserror::Error;

use crate::transfer::TransferError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BalanceError {
    /// Balances are unknown, which is not the same as zero
    #[error("Balance details unavailable: node has not produced a snapshot")]
    BalanceUnavailable,

    #[error("Failed to read active transfers: {0}")]
    Store(#[from] TransferError),
}

impl BalanceError {
    pub fn code(&self) -> &'static str {
        match self {
            BalanceError::BalanceUnavailable => "BALANCE_UNAVAILABLE",
            BalanceError::Store(e) => e.code(),
        }
    }
}
