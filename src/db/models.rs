use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::StoreError;

/// Lifecycle status of a withdrawal.
///
/// `Pending` is the only state a request is created in. `Processing` marks a
/// record that has been claimed for payout and whose provider call is in
/// flight (or whose outcome could not be written back). The remaining three
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Rejected,
}

impl WithdrawalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Processing => "processing",
            WithdrawalStatus::Completed => "completed",
            WithdrawalStatus::Failed => "failed",
            WithdrawalStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WithdrawalStatus::Completed | WithdrawalStatus::Failed | WithdrawalStatus::Rejected
        )
    }
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WithdrawalStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(WithdrawalStatus::Pending),
            "processing" => Ok(WithdrawalStatus::Processing),
            "completed" => Ok(WithdrawalStatus::Completed),
            "failed" => Ok(WithdrawalStatus::Failed),
            "rejected" => Ok(WithdrawalStatus::Rejected),
            other => Err(StoreError::Corrupt(format!("unknown status `{}`", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Withdrawal {
    pub id: Uuid,
    pub user_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub paypal_email: String,
    pub status: WithdrawalStatus,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub payout_batch_id: Option<String>,
    pub payout_item_id: Option<String>,
    pub notes: Option<String>,
}

impl Withdrawal {
    /// A fresh `pending` request with a newly generated id.
    pub fn new_pending(
        user_id: impl Into<String>,
        amount: Decimal,
        currency: impl Into<String>,
        paypal_email: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            amount,
            currency: currency.into(),
            paypal_email: paypal_email.into(),
            status: WithdrawalStatus::Pending,
            requested_at: Utc::now(),
            processed_at: None,
            payout_batch_id: None,
            payout_item_id: None,
            notes: None,
        }
    }

    /// Applies a transition to an in-memory copy of the record.
    pub fn apply(&mut self, transition: &Transition) {
        self.status = transition.status;
        if transition.processed_at.is_some() {
            self.processed_at = transition.processed_at;
        }
        if transition.payout_batch_id.is_some() {
            self.payout_batch_id = transition.payout_batch_id.clone();
        }
        if transition.payout_item_id.is_some() {
            self.payout_item_id = transition.payout_item_id.clone();
        }
        if transition.notes.is_some() {
            self.notes = transition.notes.clone();
        }
    }
}

/// Target status plus the columns written alongside it.
///
/// Only the constructors below build transitions, which keeps the payout
/// identifiers tied to `completed`.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub status: WithdrawalStatus,
    pub processed_at: Option<DateTime<Utc>>,
    pub payout_batch_id: Option<String>,
    pub payout_item_id: Option<String>,
    pub notes: Option<String>,
}

impl Transition {
    fn to(status: WithdrawalStatus) -> Self {
        Self {
            status,
            processed_at: None,
            payout_batch_id: None,
            payout_item_id: None,
            notes: None,
        }
    }

    pub fn claim() -> Self {
        Self::to(WithdrawalStatus::Processing)
    }

    pub fn completed(
        processed_at: DateTime<Utc>,
        payout_batch_id: impl Into<String>,
        payout_item_id: impl Into<String>,
    ) -> Self {
        Self {
            processed_at: Some(processed_at),
            payout_batch_id: Some(payout_batch_id.into()),
            payout_item_id: Some(payout_item_id.into()),
            ..Self::to(WithdrawalStatus::Completed)
        }
    }

    pub fn failed(notes: impl Into<String>) -> Self {
        Self {
            notes: Some(notes.into()),
            ..Self::to(WithdrawalStatus::Failed)
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            notes: Some(reason.into()),
            ..Self::to(WithdrawalStatus::Rejected)
        }
    }
}

/// Row shape of the `withdrawals` table.
#[derive(Debug, FromRow)]
pub(crate) struct WithdrawalRow {
    pub id: Uuid,
    pub user_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub paypal_email: String,
    pub status: String,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub payout_batch_id: Option<String>,
    pub payout_item_id: Option<String>,
    pub notes: Option<String>,
}

impl TryFrom<WithdrawalRow> for Withdrawal {
    type Error = StoreError;

    fn try_from(row: WithdrawalRow) -> Result<Self, Self::Error> {
        Ok(Withdrawal {
            id: row.id,
            user_id: row.user_id,
            amount: row.amount,
            currency: row.currency,
            paypal_email: row.paypal_email,
            status: row.status.parse()?,
            requested_at: row.requested_at,
            processed_at: row.processed_at,
            payout_batch_id: row.payout_batch_id,
            payout_item_id: row.payout_item_id,
            notes: row.notes,
        })
    }
}
