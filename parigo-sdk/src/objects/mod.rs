//! Shared API objects.

pub mod bets;
pub mod monitor;
pub mod ws;

use serde::{Deserialize, Serialize};

pub use bets::{BalanceResponse, BetResponse, PlaceBetRequest};
pub use monitor::{ChangeSummaryView, MonitorStatsView};
pub use ws::{WsCloseCode, WsServerMessage};

/// Color options of a color bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetColor {
    Red,
    Green,
    Violet,
}

/// What a bet is placed on.
///
/// Serialized internally tagged on `"kind"` so the JSON carries
/// `{"kind":"color","color":"red"}` or `{"kind":"number","number":7}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BetSelection {
    Color { color: BetColor },
    Number { number: u8 },
}

/// Deposit lifecycle status.
///
/// This is the API/DTO version. For database operations, see the
/// `sqlx::Type` enum in `parigo-core`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepositStatus {
    Pending,
    Confirmed,
    Failed,
}

/// Withdrawal lifecycle status.
///
/// This is the API/DTO version. For database operations, see the
/// `sqlx::Type` enum in `parigo-core`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalStatus {
    Requested,
    Approved,
    Rejected,
    Paid,
}
