use compact_str::CompactString;
use kanau::processor::Processor;
use rust_decimal::Decimal;

use super::DepositStatus;
use crate::framework::DatabaseProcessor;

/// Minimal deposit projection for the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct DepositActivity {
    pub deposit_id: i64,
    pub user_id: CompactString,
    pub amount: Decimal,
    pub status: DepositStatus,
    pub updated_at: time::OffsetDateTime,
}

#[derive(Debug, Clone)]
/// List deposits touched at or after the cutoff timestamp.
pub struct ListDepositsTouchedSince {
    pub cutoff: time::OffsetDateTime,
}

impl Processor<ListDepositsTouchedSince> for DatabaseProcessor {
    type Output = Vec<DepositActivity>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListDepositsTouchedSince")]
    async fn process(
        &self,
        query: ListDepositsTouchedSince,
    ) -> Result<Vec<DepositActivity>, sqlx::Error> {
        sqlx::query_as::<_, DepositActivity>(
            r#"
            SELECT deposit_id, user_id, amount, status, updated_at
            FROM deposits
            WHERE updated_at >= $1
            "#,
        )
        .bind(query.cutoff)
        .fetch_all(&self.pool)
        .await
    }
}
