use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{Transition, Withdrawal, WithdrawalStatus};
use super::{StoreError, WithdrawalStore};

/// In-process store used for local runs and tests.
///
/// The write lock spans the status check and the update, which gives
/// `try_transition` the same compare-and-swap semantics as the Postgres
/// conditional update.
#[derive(Default)]
pub struct MemoryWithdrawalStore {
    records: RwLock<HashMap<Uuid, Withdrawal>>,
}

impl MemoryWithdrawalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl WithdrawalStore for MemoryWithdrawalStore {
    async fn create(&self, withdrawal: &Withdrawal) -> Result<Uuid, StoreError> {
        let mut records = self.records.write().await;
        if records.contains_key(&withdrawal.id) {
            return Err(StoreError::Duplicate(withdrawal.id));
        }

        let mut stored = withdrawal.clone();
        stored.status = WithdrawalStatus::Pending;
        records.insert(stored.id, stored);
        Ok(withdrawal.id)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Withdrawal>, StoreError> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn list(&self, limit: i64) -> Result<Vec<Withdrawal>, StoreError> {
        let records = self.records.read().await;
        let mut all: Vec<Withdrawal> = records.values().cloned().collect();
        all.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        all.truncate(limit.max(0) as usize);
        Ok(all)
    }

    async fn try_transition(
        &self,
        id: Uuid,
        expected: WithdrawalStatus,
        transition: &Transition,
    ) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        match records.get_mut(&id) {
            Some(record) if record.status == expected => {
                record.apply(transition);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
