use compact_str::{CompactString, format_compact};
use kanau::processor::Processor;
use parigo_sdk::objects::{BetColor, BetSelection};
use rust_decimal::Decimal;
use thiserror::Error;

use super::BetKind;
use crate::framework::DatabaseProcessor;

/// A bet as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct BetRecord {
    pub bet_id: i64,
    pub user_id: CompactString,
    pub round_id: i64,
    pub kind: BetKind,
    pub selection: CompactString,
    pub amount: Decimal,
    pub placed_at: time::OffsetDateTime,
}

/// Why a bet could not be placed.
#[derive(Debug, Error)]
pub enum PlaceBetError {
    /// Business rule: the balance does not cover the bet.
    #[error("insufficient balance")]
    InsufficientBalance { balance: Decimal, requested: Decimal },

    /// Business rule: zero or negative stake.
    #[error("bet amount must be positive")]
    NonPositiveAmount,

    /// No balance row exists for this user.
    #[error("unknown user: {0}")]
    UnknownUser(CompactString),

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result of a successfully placed bet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedBet {
    pub record: BetRecord,
    pub balance_after: Decimal,
}

/// Render a selection as its stored text form (`red`, `violet`, `7`, …).
pub fn selection_text(selection: &BetSelection) -> CompactString {
    match selection {
        BetSelection::Color {
            color: BetColor::Red,
        } => CompactString::const_new("red"),
        BetSelection::Color {
            color: BetColor::Green,
        } => CompactString::const_new("green"),
        BetSelection::Color {
            color: BetColor::Violet,
        } => CompactString::const_new("violet"),
        BetSelection::Number { number } => format_compact!("{number}"),
    }
}

#[derive(Debug, Clone)]
/// Place a bet in one transaction: lock the balance row, reject on
/// insufficient funds, debit, insert the bet and a ledger row.
///
/// The balance lock (`FOR UPDATE`) serializes concurrent bets from the
/// same user, so a balance can never be spent twice.
pub struct PlaceBetTxn {
    pub user_id: CompactString,
    pub round_id: i64,
    pub selection: BetSelection,
    pub amount: Decimal,
}

impl Processor<PlaceBetTxn> for DatabaseProcessor {
    type Output = PlacedBet;
    type Error = PlaceBetError;
    #[tracing::instrument(skip_all, err, name = "SQL:PlaceBetTxn")]
    async fn process(&self, txn: PlaceBetTxn) -> Result<PlacedBet, PlaceBetError> {
        if txn.amount <= Decimal::ZERO {
            return Err(PlaceBetError::NonPositiveAmount);
        }

        let mut tx = self.pool.begin().await?;

        let balance: Option<Decimal> = sqlx::query_scalar(
            r#"
            SELECT balance FROM user_balances
            WHERE user_id = $1
            FOR UPDATE
            "#,
        )
        .bind(txn.user_id.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(balance) = balance else {
            return Err(PlaceBetError::UnknownUser(txn.user_id));
        };
        if balance < txn.amount {
            return Err(PlaceBetError::InsufficientBalance {
                balance,
                requested: txn.amount,
            });
        }
        let balance_after = balance - txn.amount;

        sqlx::query(
            r#"
            UPDATE user_balances
            SET balance = $2, updated_at = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(txn.user_id.as_str())
        .bind(balance_after)
        .execute(&mut *tx)
        .await?;

        let kind = BetKind::from(&txn.selection);
        let selection = selection_text(&txn.selection);
        let (bet_id, placed_at): (i64, time::OffsetDateTime) = sqlx::query_as(
            r#"
            INSERT INTO bets (user_id, round_id, kind, selection, amount)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING bet_id, placed_at
            "#,
        )
        .bind(txn.user_id.as_str())
        .bind(txn.round_id)
        .bind(kind)
        .bind(selection.as_str())
        .bind(txn.amount)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO transactions (user_id, amount, reason)
            VALUES ($1, $2, 'bet')
            "#,
        )
        .bind(txn.user_id.as_str())
        .bind(-txn.amount)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(PlacedBet {
            record: BetRecord {
                bet_id,
                user_id: txn.user_id,
                round_id: txn.round_id,
                kind,
                selection,
                amount: txn.amount,
                placed_at,
            },
            balance_after,
        })
    }
}
