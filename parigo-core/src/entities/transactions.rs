use compact_str::CompactString;
use itertools::Itertools;
use kanau::processor::Processor;
use rust_decimal::Decimal;

use crate::framework::DatabaseProcessor;

/// Minimal ledger-transaction projection for the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct TransactionActivity {
    pub txn_id: i64,
    pub user_id: CompactString,
    pub amount: Decimal,
    pub created_at: time::OffsetDateTime,
}

/// Per-user tail of the ledger inside the recency window: the highest
/// transaction id plus the ids themselves, so a drift check can count how
/// many are new relative to a cached tail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionTail {
    pub user_id: CompactString,
    pub latest_id: i64,
    pub txn_ids: Vec<i64>,
}

impl TransactionTail {
    /// How many of the windowed transactions are newer than `previous_latest`.
    pub fn new_since(&self, previous_latest: i64) -> u32 {
        self.txn_ids
            .iter()
            .filter(|id| **id > previous_latest)
            .count() as u32
    }
}

/// Group windowed transactions into per-user tails. Ordering across users
/// is unspecified.
pub fn tails(rows: Vec<TransactionActivity>) -> Vec<TransactionTail> {
    rows.into_iter()
        .map(|row| (row.user_id, row.txn_id))
        .into_group_map()
        .into_iter()
        .map(|(user_id, txn_ids)| TransactionTail {
            latest_id: txn_ids.iter().copied().max().unwrap_or(0),
            user_id,
            txn_ids,
        })
        .collect()
}

#[derive(Debug, Clone)]
/// List ledger transactions created at or after the cutoff timestamp.
pub struct ListTransactionsSince {
    pub cutoff: time::OffsetDateTime,
}

impl Processor<ListTransactionsSince> for DatabaseProcessor {
    type Output = Vec<TransactionActivity>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListTransactionsSince")]
    async fn process(
        &self,
        query: ListTransactionsSince,
    ) -> Result<Vec<TransactionActivity>, sqlx::Error> {
        sqlx::query_as::<_, TransactionActivity>(
            r#"
            SELECT txn_id, user_id, amount, created_at
            FROM transactions
            WHERE created_at >= $1
            "#,
        )
        .bind(query.cutoff)
        .fetch_all(&self.pool)
        .await
    }
}
