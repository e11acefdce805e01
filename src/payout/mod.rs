pub mod errors;
pub mod paypal;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;
use uuid::Uuid;

pub use errors::GatewayError;
pub use paypal::{PayPalClient, PayPalCredentials};

/// One payout line item, addressed by caller-chosen identifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct PayoutRequest {
    pub sender_batch_id: String,
    pub sender_item_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub receiver: String,
    pub note: String,
}

impl PayoutRequest {
    /// Identifiers depend only on the withdrawal id, so a repeated attempt
    /// for the same withdrawal is recognisable by the provider.
    pub fn for_withdrawal(
        withdrawal_id: Uuid,
        amount: Decimal,
        currency: impl Into<String>,
        receiver: impl Into<String>,
    ) -> Self {
        Self {
            sender_batch_id: format!("batch_{}", withdrawal_id),
            sender_item_id: format!("item_{}", withdrawal_id),
            amount,
            currency: currency.into(),
            receiver: receiver.into(),
            note: format!("Payout for withdrawal {}", withdrawal_id),
        }
    }

    pub fn idempotency_key(&self) -> String {
        match self.sender_batch_id.strip_prefix("batch_") {
            Some(id) => format!("withdrawal-{}", id),
            None => self.sender_batch_id.clone(),
        }
    }
}

/// What the provider returned for an accepted payout.
#[derive(Debug, Clone, PartialEq)]
pub struct PayoutReceipt {
    pub payout_batch_id: String,
    pub payout_item_id: Option<String>,
    /// Full provider response, passed through to the approving admin.
    pub raw: Value,
}

/// External payment provider.
///
/// One call is one network round trip (after credential exchange) and is
/// never retried internally.
#[async_trait]
pub trait PayoutGateway: Send + Sync {
    async fn create_payout(&self, request: &PayoutRequest) -> Result<PayoutReceipt, GatewayError>;
}
