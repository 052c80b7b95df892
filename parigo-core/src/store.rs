//! Read-side abstraction over the durable store.
//!
//! The reconciler only ever needs "what was touched recently", so the
//! trait is four windowed queries. The Postgres implementation delegates
//! to the entity processors; tests swap in an in-memory store.

use async_trait::async_trait;
use kanau::processor::Processor;
use sqlx::PgPool;
use time::Duration;

use crate::entities::balances::{BalanceActivity, ListBalancesTouchedSince};
use crate::entities::deposits::{DepositActivity, ListDepositsTouchedSince};
use crate::entities::transactions::{ListTransactionsSince, TransactionActivity};
use crate::entities::withdrawals::{ListWithdrawalsTouchedSince, WithdrawalActivity};
use crate::framework::DatabaseProcessor;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Windowed activity reads the reconciler diffs against its cache.
///
/// `window` is how far back from now each query looks.
#[async_trait]
pub trait StateStore: Send + Sync + 'static {
    async fn balances_with_recent_activity(
        &self,
        window: Duration,
    ) -> Result<Vec<BalanceActivity>, StoreError>;

    async fn deposits_with_recent_activity(
        &self,
        window: Duration,
    ) -> Result<Vec<DepositActivity>, StoreError>;

    async fn withdrawals_with_recent_activity(
        &self,
        window: Duration,
    ) -> Result<Vec<WithdrawalActivity>, StoreError>;

    async fn transactions_with_recent_activity(
        &self,
        window: Duration,
    ) -> Result<Vec<TransactionActivity>, StoreError>;
}

/// Postgres-backed store.
pub struct PgStateStore {
    db: DatabaseProcessor,
}

impl PgStateStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            db: DatabaseProcessor { pool },
        }
    }

    fn cutoff(window: Duration) -> time::OffsetDateTime {
        time::OffsetDateTime::now_utc() - window
    }
}

#[async_trait]
impl StateStore for PgStateStore {
    async fn balances_with_recent_activity(
        &self,
        window: Duration,
    ) -> Result<Vec<BalanceActivity>, StoreError> {
        let cutoff = Self::cutoff(window);
        Ok(self.db.process(ListBalancesTouchedSince { cutoff }).await?)
    }

    async fn deposits_with_recent_activity(
        &self,
        window: Duration,
    ) -> Result<Vec<DepositActivity>, StoreError> {
        let cutoff = Self::cutoff(window);
        Ok(self.db.process(ListDepositsTouchedSince { cutoff }).await?)
    }

    async fn withdrawals_with_recent_activity(
        &self,
        window: Duration,
    ) -> Result<Vec<WithdrawalActivity>, StoreError> {
        let cutoff = Self::cutoff(window);
        Ok(self
            .db
            .process(ListWithdrawalsTouchedSince { cutoff })
            .await?)
    }

    async fn transactions_with_recent_activity(
        &self,
        window: Duration,
    ) -> Result<Vec<TransactionActivity>, StoreError> {
        let cutoff = Self::cutoff(window);
        Ok(self.db.process(ListTransactionsSince { cutoff }).await?)
    }
}
