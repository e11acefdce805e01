pub mod client;
pub mod database;
pub mod memory;
pub mod models;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

pub use client::DBClient;
pub use database::PgWithdrawalStore;
pub use memory::MemoryWithdrawalStore;
pub use models::{Transition, Withdrawal, WithdrawalStatus};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Withdrawal already exists: {0}")]
    Duplicate(Uuid),

    #[error("Corrupt withdrawal record: {0}")]
    Corrupt(String),
}

/// Durable record of withdrawal requests.
///
/// `try_transition` is the only mutation path for an existing record: it
/// writes the transition only when the stored status still equals
/// `expected`, as one atomic step, and reports whether it applied.
#[async_trait]
pub trait WithdrawalStore: Send + Sync {
    async fn create(&self, withdrawal: &Withdrawal) -> Result<Uuid, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Withdrawal>, StoreError>;

    /// Newest first, at most `limit` records.
    async fn list(&self, limit: i64) -> Result<Vec<Withdrawal>, StoreError>;

    async fn try_transition(
        &self,
        id: Uuid,
        expected: WithdrawalStatus,
        transition: &Transition,
    ) -> Result<bool, StoreError>;

    async fn close(&self) {}
}
