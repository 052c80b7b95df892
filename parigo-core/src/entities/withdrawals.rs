use compact_str::CompactString;
use kanau::processor::Processor;
use rust_decimal::Decimal;

use super::WithdrawalStatus;
use crate::framework::DatabaseProcessor;

/// Minimal withdrawal projection for the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct WithdrawalActivity {
    pub withdrawal_id: i64,
    pub user_id: CompactString,
    pub amount: Decimal,
    pub status: WithdrawalStatus,
    pub updated_at: time::OffsetDateTime,
}

#[derive(Debug, Clone)]
/// List withdrawals touched at or after the cutoff timestamp.
pub struct ListWithdrawalsTouchedSince {
    pub cutoff: time::OffsetDateTime,
}

impl Processor<ListWithdrawalsTouchedSince> for DatabaseProcessor {
    type Output = Vec<WithdrawalActivity>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListWithdrawalsTouchedSince")]
    async fn process(
        &self,
        query: ListWithdrawalsTouchedSince,
    ) -> Result<Vec<WithdrawalActivity>, sqlx::Error> {
        sqlx::query_as::<_, WithdrawalActivity>(
            r#"
            SELECT withdrawal_id, user_id, amount, status, updated_at
            FROM withdrawals
            WHERE updated_at >= $1
            "#,
        )
        .bind(query.cutoff)
        .fetch_all(&self.pool)
        .await
    }
}
