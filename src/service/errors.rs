use thiserror::Error;
use uuid::Uuid;

use crate::db::{StoreError, WithdrawalStatus};
use crate::payout::{GatewayError, PayoutReceipt};

#[derive(Debug, Error)]
pub enum WithdrawalError {
    #[error("{0}")]
    Validation(String),

    #[error("withdrawal not found: {0}")]
    NotFound(Uuid),

    #[error("not pending")]
    StateConflict { id: Uuid, status: WithdrawalStatus },

    #[error("payout_failed: {0}")]
    Gateway(#[from] GatewayError),

    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),

    /// The provider accepted the payout but the record could not be marked
    /// completed. Needs manual reconciliation.
    #[error("payout {} sent for withdrawal {id} but not recorded: {source}", .receipt.payout_batch_id)]
    PayoutUnrecorded {
        id: Uuid,
        receipt: PayoutReceipt,
        #[source]
        source: StoreError,
    },

    /// The payout task died after the claim. The record stays `processing`.
    #[error("payout task for withdrawal {id} aborted: {reason}")]
    Aborted { id: Uuid, reason: String },
}

impl WithdrawalError {
    pub fn validation(message: impl Into<String>) -> Self {
        WithdrawalError::Validation(message.into())
    }
}
