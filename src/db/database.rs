use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::models::{Transition, Withdrawal, WithdrawalRow, WithdrawalStatus};
use super::{StoreError, WithdrawalStore};

const SELECT_COLUMNS: &str = r#"
    SELECT id, user_id, amount, currency, paypal_email, status,
           requested_at, processed_at, payout_batch_id, payout_item_id, notes
    FROM withdrawals
"#;

/// Postgres-backed withdrawal store.
#[derive(Clone)]
pub struct PgWithdrawalStore {
    pool: PgPool,
}

impl PgWithdrawalStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl WithdrawalStore for PgWithdrawalStore {
    async fn create(&self, withdrawal: &Withdrawal) -> Result<Uuid, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO withdrawals (id, user_id, amount, currency, paypal_email, status, requested_at)
            VALUES ($1, $2, $3, $4, $5, 'pending', $6)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(withdrawal.id)
        .bind(&withdrawal.user_id)
        .bind(withdrawal.amount)
        .bind(&withdrawal.currency)
        .bind(&withdrawal.paypal_email)
        .bind(withdrawal.requested_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Duplicate(withdrawal.id));
        }

        Ok(withdrawal.id)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Withdrawal>, StoreError> {
        let row = sqlx::query_as::<_, WithdrawalRow>(&format!("{} WHERE id = $1", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Withdrawal::try_from).transpose()
    }

    async fn list(&self, limit: i64) -> Result<Vec<Withdrawal>, StoreError> {
        let rows = sqlx::query_as::<_, WithdrawalRow>(&format!(
            "{} ORDER BY requested_at DESC LIMIT $1",
            SELECT_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Withdrawal::try_from).collect()
    }

    async fn try_transition(
        &self,
        id: Uuid,
        expected: WithdrawalStatus,
        transition: &Transition,
    ) -> Result<bool, StoreError> {
        // A single conditional UPDATE: concurrent writers on the same row
        // re-check the status predicate after the first one commits.
        let result = sqlx::query(
            r#"
            UPDATE withdrawals
            SET status = $3,
                processed_at = COALESCE($4, processed_at),
                payout_batch_id = COALESCE($5, payout_batch_id),
                payout_item_id = COALESCE($6, payout_item_id),
                notes = COALESCE($7, notes)
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id)
        .bind(expected.as_str())
        .bind(transition.status.as_str())
        .bind(transition.processed_at)
        .bind(transition.payout_batch_id.as_deref())
        .bind(transition.payout_item_id.as_deref())
        .bind(transition.notes.as_deref())
        .execute(&self.pool)
        .await?;

        let applied = result.rows_affected() == 1;
        debug!(
            withdrawal_id = %id,
            from = %expected,
            to = %transition.status,
            applied,
            "conditional status update"
        );
        Ok(applied)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
