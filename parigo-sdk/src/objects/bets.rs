//! Bet placement request/response objects.

use compact_str::CompactString;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::BetSelection;

/// `POST /api/v1/bets` request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceBetRequest {
    pub user_id: CompactString,
    pub round_id: i64,
    #[serde(flatten)]
    pub selection: BetSelection,
    pub amount: Decimal,
}

/// Authoritative result of a placed bet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetResponse {
    pub bet_id: i64,
    pub user_id: CompactString,
    pub round_id: i64,
    #[serde(flatten)]
    pub selection: BetSelection,
    pub amount: Decimal,
    /// Balance after the bet amount was debited.
    pub balance_after: Decimal,
    #[serde(with = "time::serde::rfc3339")]
    pub placed_at: time::OffsetDateTime,
}

/// `GET /api/v1/users/{user_id}/balance` response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub user_id: CompactString,
    pub balance: Decimal,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: time::OffsetDateTime,
}
