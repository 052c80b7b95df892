use compact_str::CompactString;
use kanau::processor::Processor;
use rust_decimal::Decimal;

use crate::framework::DatabaseProcessor;

/// Minimal balance projection for the reconciler and read API.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct BalanceActivity {
    pub user_id: CompactString,
    pub balance: Decimal,
    pub updated_at: time::OffsetDateTime,
}

#[derive(Debug, Clone)]
/// List balances touched at or after the cutoff timestamp.
///
/// The cutoff is the recency window boundary; balances untouched since
/// then are deliberately not scanned.
pub struct ListBalancesTouchedSince {
    pub cutoff: time::OffsetDateTime,
}

impl Processor<ListBalancesTouchedSince> for DatabaseProcessor {
    type Output = Vec<BalanceActivity>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListBalancesTouchedSince")]
    async fn process(
        &self,
        query: ListBalancesTouchedSince,
    ) -> Result<Vec<BalanceActivity>, sqlx::Error> {
        sqlx::query_as::<_, BalanceActivity>(
            r#"
            SELECT user_id, balance, updated_at
            FROM user_balances
            WHERE updated_at >= $1
            "#,
        )
        .bind(query.cutoff)
        .fetch_all(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
/// Look up one user's balance row.
pub struct GetUserBalance {
    pub user_id: CompactString,
}

impl Processor<GetUserBalance> for DatabaseProcessor {
    type Output = Option<BalanceActivity>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetUserBalance")]
    async fn process(
        &self,
        query: GetUserBalance,
    ) -> Result<Option<BalanceActivity>, sqlx::Error> {
        sqlx::query_as::<_, BalanceActivity>(
            r#"
            SELECT user_id, balance, updated_at
            FROM user_balances
            WHERE user_id = $1
            "#,
        )
        .bind(query.user_id.as_str())
        .fetch_optional(&self.pool)
        .await
    }
}
