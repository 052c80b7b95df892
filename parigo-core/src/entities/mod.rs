pub mod balances;
pub mod bets;
pub mod deposits;
pub mod transactions;
pub mod withdrawals;

use parigo_sdk::objects::{
    BetSelection, DepositStatus as SdkDepositStatus, WithdrawalStatus as SdkWithdrawalStatus,
};

/// Deposit status for database operations.
///
/// This is the sqlx::Type version. For API/DTO use, see
/// `parigo_sdk::objects::DepositStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase", type_name = "deposit_status")]
pub enum DepositStatus {
    Pending,
    Confirmed,
    Failed,
}

impl From<DepositStatus> for SdkDepositStatus {
    fn from(value: DepositStatus) -> Self {
        match value {
            DepositStatus::Pending => SdkDepositStatus::Pending,
            DepositStatus::Confirmed => SdkDepositStatus::Confirmed,
            DepositStatus::Failed => SdkDepositStatus::Failed,
        }
    }
}

impl From<SdkDepositStatus> for DepositStatus {
    fn from(value: SdkDepositStatus) -> Self {
        match value {
            SdkDepositStatus::Pending => DepositStatus::Pending,
            SdkDepositStatus::Confirmed => DepositStatus::Confirmed,
            SdkDepositStatus::Failed => DepositStatus::Failed,
        }
    }
}

/// Withdrawal status for database operations.
///
/// This is the sqlx::Type version. For API/DTO use, see
/// `parigo_sdk::objects::WithdrawalStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase", type_name = "withdrawal_status")]
pub enum WithdrawalStatus {
    Requested,
    Approved,
    Rejected,
    Paid,
}

impl From<WithdrawalStatus> for SdkWithdrawalStatus {
    fn from(value: WithdrawalStatus) -> Self {
        match value {
            WithdrawalStatus::Requested => SdkWithdrawalStatus::Requested,
            WithdrawalStatus::Approved => SdkWithdrawalStatus::Approved,
            WithdrawalStatus::Rejected => SdkWithdrawalStatus::Rejected,
            WithdrawalStatus::Paid => SdkWithdrawalStatus::Paid,
        }
    }
}

impl From<SdkWithdrawalStatus> for WithdrawalStatus {
    fn from(value: SdkWithdrawalStatus) -> Self {
        match value {
            SdkWithdrawalStatus::Requested => WithdrawalStatus::Requested,
            SdkWithdrawalStatus::Approved => WithdrawalStatus::Approved,
            SdkWithdrawalStatus::Rejected => WithdrawalStatus::Rejected,
            SdkWithdrawalStatus::Paid => WithdrawalStatus::Paid,
        }
    }
}

/// Bet kind for database operations; matches the `kind` tag of
/// `parigo_sdk::objects::BetSelection`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase", type_name = "bet_kind")]
pub enum BetKind {
    Color,
    Number,
}

impl From<&BetSelection> for BetKind {
    fn from(value: &BetSelection) -> Self {
        match value {
            BetSelection::Color { .. } => BetKind::Color,
            BetSelection::Number { .. } => BetKind::Number,
        }
    }
}
