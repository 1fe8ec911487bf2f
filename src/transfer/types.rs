//! Transfer Core Types
//!
//! Type definitions for transfers between the savings (on-chain) and
//! spending (Lightning) halves of the wallet.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::state::TransferState;

/// Transfer ID type - ULID-based unique identifier
///
/// Stored and compared as its canonical 26-char string so records loaded
/// from a snapshot keep whatever id they were created with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferId(String);

impl TransferId {
    /// Generate a new unique TransferId
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TransferId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TransferId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<&str> for TransferId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Transfer type (direction + origin)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferType {
    /// Savings -> Spending via an LSP order or channel purchase
    ToSpending,
    /// Spending -> Savings initiated by the user
    ToSavings,
    /// Channel opened manually by the user
    ManualSetup,
    /// Channel force-closed, funds claimable after a timelock
    ForceClose,
    /// Channel closed cooperatively
    CoopClose,
}

impl TransferType {
    pub const ALL: [TransferType; 5] = [
        TransferType::ToSpending,
        TransferType::ToSavings,
        TransferType::ManualSetup,
        TransferType::ForceClose,
        TransferType::CoopClose,
    ];

    /// Funds moving from savings into a Lightning channel
    #[inline]
    pub fn is_to_spending(&self) -> bool {
        matches!(self, TransferType::ToSpending | TransferType::ManualSetup)
    }

    /// Funds moving out of a Lightning channel back on-chain
    #[inline]
    pub fn is_to_savings(&self) -> bool {
        matches!(
            self,
            TransferType::ToSavings | TransferType::CoopClose | TransferType::ForceClose
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferType::ToSpending => "TO_SPENDING",
            TransferType::ToSavings => "TO_SAVINGS",
            TransferType::ManualSetup => "MANUAL_SETUP",
            TransferType::ForceClose => "FORCE_CLOSE",
            TransferType::CoopClose => "COOP_CLOSE",
        }
    }
}

impl fmt::Display for TransferType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Creation request handed to a [`TransferStore`](super::store::TransferStore)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransfer {
    pub transfer_type: TransferType,
    pub amount_sats: u64,
    pub channel_id: Option<String>,
    pub funding_tx_id: Option<String>,
    pub lsp_order_id: Option<String>,
    pub claimable_at_height: Option<u32>,
    pub tx_total_sats: Option<u64>,
    pub pre_transfer_onchain_sats: Option<u64>,
}

impl NewTransfer {
    pub fn new(transfer_type: TransferType, amount_sats: u64) -> Self {
        Self {
            transfer_type,
            amount_sats,
            channel_id: None,
            funding_tx_id: None,
            lsp_order_id: None,
            claimable_at_height: None,
            tx_total_sats: None,
            pre_transfer_onchain_sats: None,
        }
    }

    pub fn with_channel_id(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_id = Some(channel_id.into());
        self
    }

    pub fn with_funding_tx_id(mut self, funding_tx_id: impl Into<String>) -> Self {
        self.funding_tx_id = Some(funding_tx_id.into());
        self
    }

    pub fn with_lsp_order_id(mut self, lsp_order_id: impl Into<String>) -> Self {
        self.lsp_order_id = Some(lsp_order_id.into());
        self
    }

    pub fn with_claimable_at_height(mut self, height: u32) -> Self {
        self.claimable_at_height = Some(height);
        self
    }

    pub fn with_tx_total_sats(mut self, sats: u64) -> Self {
        self.tx_total_sats = Some(sats);
        self
    }

    pub fn with_pre_transfer_onchain_sats(mut self, sats: u64) -> Self {
        self.pre_transfer_onchain_sats = Some(sats);
        self
    }
}

/// One movement of funds between savings and spending awaiting settlement
///
/// `settled_at` is `Some` exactly when `is_settled` is true. Stores only
/// produce settled records through `mark_settled`, which sets both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: TransferId,
    #[serde(rename = "type")]
    pub transfer_type: TransferType,
    pub amount_sats: u64,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub funding_tx_id: Option<String>,
    #[serde(default)]
    pub lsp_order_id: Option<String>,
    #[serde(default)]
    pub is_settled: bool,
    /// Unix millis
    pub created_at: i64,
    #[serde(default)]
    pub settled_at: Option<i64>,
    #[serde(default)]
    pub claimable_at_height: Option<u32>,
    /// Amount + fee deducted on-chain by the funding transaction
    #[serde(default)]
    pub tx_total_sats: Option<u64>,
    /// On-chain balance right before the funding transaction was broadcast
    #[serde(default)]
    pub pre_transfer_onchain_sats: Option<u64>,
}

impl Transfer {
    /// Build an unsettled record from a creation request
    pub fn from_request(id: TransferId, req: NewTransfer, created_at: i64) -> Self {
        Self {
            id,
            transfer_type: req.transfer_type,
            amount_sats: req.amount_sats,
            channel_id: req.channel_id,
            funding_tx_id: req.funding_tx_id,
            lsp_order_id: req.lsp_order_id,
            is_settled: false,
            created_at,
            settled_at: None,
            claimable_at_height: req.claimable_at_height,
            tx_total_sats: req.tx_total_sats,
            pre_transfer_onchain_sats: req.pre_transfer_onchain_sats,
        }
    }

    pub fn state(&self) -> TransferState {
        TransferState::of(self)
    }

    /// Paid towards an LSP order but no channel assigned yet
    pub fn is_awaiting_channel(&self) -> bool {
        self.transfer_type.is_to_spending() && self.lsp_order_id.is_some() && self.channel_id.is_none()
    }
}

impl fmt::Display for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Transfer[{}] {} amount={} channel={} order={} state={}",
            self.id,
            self.transfer_type,
            self.amount_sats,
            self.channel_id.as_deref().unwrap_or("-"),
            self.lsp_order_id.as_deref().unwrap_or("-"),
            self.state()
        )
    }
}
