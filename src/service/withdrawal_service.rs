use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::errors::WithdrawalError;
use crate::config::WithdrawalsConfig;
use crate::db::{StoreError, Transition, Withdrawal, WithdrawalStatus, WithdrawalStore};
use crate::payout::{GatewayError, PayoutGateway, PayoutReceipt, PayoutRequest};

/// Tunables of the withdrawal lifecycle.
#[derive(Debug, Clone)]
pub struct WithdrawalPolicy {
    pub min_payout: Decimal,
    pub list_limit: i64,
    pub default_currency: String,
    pub payout_timeout: Duration,
    pub default_reject_reason: String,
}

impl Default for WithdrawalPolicy {
    fn default() -> Self {
        Self {
            min_payout: Decimal::ONE,
            list_limit: 200,
            default_currency: "USD".to_string(),
            payout_timeout: Duration::from_secs(30),
            default_reject_reason: "rejected by admin".to_string(),
        }
    }
}

impl From<&WithdrawalsConfig> for WithdrawalPolicy {
    fn from(config: &WithdrawalsConfig) -> Self {
        Self {
            min_payout: config.min_payout,
            list_limit: i64::from(config.list_limit.max(1)),
            default_currency: config.default_currency.clone(),
            payout_timeout: Duration::from_millis(config.payout_timeout_ms),
            default_reject_reason: config.default_reject_reason.clone(),
        }
    }
}

/// Result of a successful approval.
#[derive(Debug, Clone)]
pub struct ApprovalOutcome {
    pub withdrawal: Withdrawal,
    pub payout: Value,
}

/// Drives withdrawals from submission to a terminal status.
#[derive(Clone)]
pub struct WithdrawalService {
    store: Arc<dyn WithdrawalStore>,
    gateway: Arc<dyn PayoutGateway>,
    policy: WithdrawalPolicy,
}

impl WithdrawalService {
    pub fn new(
        store: Arc<dyn WithdrawalStore>,
        gateway: Arc<dyn PayoutGateway>,
        policy: WithdrawalPolicy,
    ) -> Self {
        Self {
            store,
            gateway,
            policy,
        }
    }

    pub fn policy(&self) -> &WithdrawalPolicy {
        &self.policy
    }

    pub async fn submit(
        &self,
        user_id: &str,
        amount: Decimal,
        currency: Option<&str>,
        paypal_email: &str,
    ) -> Result<Withdrawal, WithdrawalError> {
        if amount <= Decimal::ZERO {
            return Err(WithdrawalError::validation("amount must be > 0"));
        }
        if amount.normalize().scale() > 2 {
            return Err(WithdrawalError::validation(
                "amount must have at most 2 decimal places",
            ));
        }

        let paypal_email = paypal_email.trim();
        if paypal_email.is_empty() {
            return Err(WithdrawalError::validation("amount and paypal_email required"));
        }

        let currency = normalize_currency(currency.unwrap_or(&self.policy.default_currency))?;

        let withdrawal = Withdrawal::new_pending(user_id, amount, currency, paypal_email);
        self.store.create(&withdrawal).await?;

        info!(
            withdrawal_id = %withdrawal.id,
            user_id = %withdrawal.user_id,
            amount = %withdrawal.amount,
            currency = %withdrawal.currency,
            "withdrawal requested"
        );
        Ok(withdrawal)
    }

    pub async fn get(&self, id: Uuid) -> Result<Withdrawal, WithdrawalError> {
        self.store
            .get(id)
            .await?
            .ok_or(WithdrawalError::NotFound(id))
    }

    /// Newest first. `limit` is clamped to the configured maximum.
    pub async fn list(&self, limit: Option<i64>) -> Result<Vec<Withdrawal>, WithdrawalError> {
        let max = self.policy.list_limit.max(1);
        let limit = limit.unwrap_or(max).clamp(1, max);
        Ok(self.store.list(limit).await?)
    }

    /// Approves a pending withdrawal and pays it out.
    ///
    /// Every check that can refuse the request runs before the record is
    /// claimed. The claim is a compare-and-swap from `pending`, so of any
    /// number of concurrent approvals exactly one reaches the gateway.
    pub async fn approve(&self, id: Uuid) -> Result<ApprovalOutcome, WithdrawalError> {
        let withdrawal = self.get(id).await?;
        if withdrawal.status != WithdrawalStatus::Pending {
            return Err(WithdrawalError::StateConflict {
                id,
                status: withdrawal.status,
            });
        }
        if withdrawal.amount < self.policy.min_payout {
            return Err(WithdrawalError::validation("amount too small"));
        }

        let claimed = self
            .store
            .try_transition(id, WithdrawalStatus::Pending, &Transition::claim())
            .await?;
        if !claimed {
            let current = self.get(id).await?;
            warn!(
                withdrawal_id = %id,
                status = %current.status,
                "lost approval race, withdrawal already claimed"
            );
            return Err(WithdrawalError::StateConflict {
                id,
                status: current.status,
            });
        }
        info!(withdrawal_id = %id, amount = %withdrawal.amount, "withdrawal claimed for payout");

        // Detached so that a dropped caller cannot stop the outcome from
        // being recorded once the payout is under way.
        let service = self.clone();
        tokio::spawn(async move { service.execute_payout(withdrawal).await })
            .await
            .map_err(|e| {
                error!(withdrawal_id = %id, error = %e, "payout task aborted; record left processing");
                WithdrawalError::Aborted {
                    id,
                    reason: e.to_string(),
                }
            })?
    }

    pub async fn reject(&self, id: Uuid, reason: Option<String>) -> Result<Withdrawal, WithdrawalError> {
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| self.policy.default_reject_reason.clone());

        let applied = self
            .store
            .try_transition(id, WithdrawalStatus::Pending, &Transition::rejected(&reason))
            .await?;

        let current = self.get(id).await?;
        if !applied {
            return Err(WithdrawalError::StateConflict {
                id,
                status: current.status,
            });
        }

        info!(withdrawal_id = %id, reason = %reason, "withdrawal rejected");
        Ok(current)
    }

    async fn execute_payout(&self, mut withdrawal: Withdrawal) -> Result<ApprovalOutcome, WithdrawalError> {
        let request = PayoutRequest::for_withdrawal(
            withdrawal.id,
            withdrawal.amount,
            &withdrawal.currency,
            &withdrawal.paypal_email,
        );

        let result = match timeout(self.policy.payout_timeout, self.gateway.create_payout(&request)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout),
        };

        match result {
            Ok(receipt) => {
                let item_id = receipt
                    .payout_item_id
                    .clone()
                    .unwrap_or_else(|| request.sender_item_id.clone());
                let transition = Transition::completed(Utc::now(), &receipt.payout_batch_id, item_id);
                let receipt = self.record_success(&mut withdrawal, &transition, receipt).await?;
                Ok(ApprovalOutcome {
                    withdrawal,
                    payout: receipt.raw,
                })
            }
            Err(err) => {
                self.record_failure(&mut withdrawal, &err).await;
                Err(WithdrawalError::Gateway(err))
            }
        }
    }

    async fn record_success(
        &self,
        withdrawal: &mut Withdrawal,
        transition: &Transition,
        receipt: PayoutReceipt,
    ) -> Result<PayoutReceipt, WithdrawalError> {
        let id = withdrawal.id;
        let source = match self
            .store
            .try_transition(id, WithdrawalStatus::Processing, transition)
            .await
        {
            Ok(true) => {
                withdrawal.apply(transition);
                info!(
                    withdrawal_id = %id,
                    payout_batch_id = %receipt.payout_batch_id,
                    "withdrawal completed"
                );
                return Ok(receipt);
            }
            Ok(false) => StoreError::Corrupt(format!(
                "withdrawal {} left processing while its payout was in flight",
                id
            )),
            Err(e) => e,
        };

        error!(
            withdrawal_id = %id,
            payout_batch_id = %receipt.payout_batch_id,
            payout_item_id = ?transition.payout_item_id,
            error = %source,
            "payout sent but completion not recorded; manual reconciliation required"
        );
        Err(WithdrawalError::PayoutUnrecorded {
            id,
            receipt,
            source,
        })
    }

    async fn record_failure(&self, withdrawal: &mut Withdrawal, err: &GatewayError) {
        let notes = err.diagnostic().to_string();
        let transition = Transition::failed(notes);
        let id = withdrawal.id;

        warn!(withdrawal_id = %id, error = %err, "payout failed");

        match self
            .store
            .try_transition(id, WithdrawalStatus::Processing, &transition)
            .await
        {
            Ok(true) => withdrawal.apply(&transition),
            Ok(false) => error!(
                withdrawal_id = %id,
                "payout failed but withdrawal was no longer processing"
            ),
            Err(e) => error!(
                withdrawal_id = %id,
                error = %e,
                "payout failed and failure could not be recorded; record left processing"
            ),
        }
    }
}

fn normalize_currency(currency: &str) -> Result<String, WithdrawalError> {
    let currency = currency.trim();
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(WithdrawalError::validation(
            "currency must be a three-letter ISO code",
        ));
    }
    Ok(currency.to_ascii_uppercase())
}
