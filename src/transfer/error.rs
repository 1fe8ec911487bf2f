//! Transfer Error Types

use thiserror::Error;

/// Transfer error types
///
/// `Clone` so the tracker can hold on to the last failure while also
/// returning it to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("Transfer store failure: {0}")]
    StoreFailure(String),

    #[error("Transfer not found: {0}")]
    TransferNotFound(String),

    #[error("Transfer {id} already has a different {field}")]
    ImmutableField { id: String, field: &'static str },

    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Transfer already settled: {0}")]
    AlreadySettled(String),

    #[error("Node is not ready")]
    NodeNotReady,
}

impl TransferError {
    /// Stable error code for the UI layer
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::StoreFailure(_) => "STORE_FAILURE",
            TransferError::TransferNotFound(_) => "TRANSFER_NOT_FOUND",
            TransferError::ImmutableField { .. } => "IMMUTABLE_FIELD",
            TransferError::InvalidAmount => "INVALID_AMOUNT",
            TransferError::AlreadySettled(_) => "ALREADY_SETTLED",
            TransferError::NodeNotReady => "NODE_NOT_READY",
        }
    }
}

impl From<crate::node::NodeError> for TransferError {
    fn from(e: crate::node::NodeError) -> Self {
        match e {
            crate::node::NodeError::NodeNotReady => TransferError::NodeNotReady,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            TransferError::StoreFailure("disk".into()).code(),
            "STORE_FAILURE"
        );
        assert_eq!(
            TransferError::ImmutableField {
                id: "t1".into(),
                field: "channel_id"
            }
            .code(),
            "IMMUTABLE_FIELD"
        );
        assert_eq!(TransferError::NodeNotReady.code(), "NODE_NOT_READY");
    }

    #[test]
    fn test_from_node_error() {
        let err: TransferError = crate::node::NodeError::NodeNotReady.into();
        assert_eq!(err, TransferError::NodeNotReady);
    }

    #[test]
    fn test_display() {
        let err = TransferError::ImmutableField {
            id: "t1".into(),
            field: "channel_id",
        };
        assert_eq!(err.to_string(), "Transfer t1 already has a different channel_id");
        assert_eq!(
            TransferError::StoreFailure("disk full".into()).to_string(),
            "Transfer store failure: disk full"
        );
    }
}
