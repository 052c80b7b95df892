//! Event type definitions for the consistency stream.
//!
//! Every drift the reconciler detects becomes exactly one [`ChangeEvent`]
//! with an exhaustive, tagged payload — consumers can match on every kind.
//! Events are ephemeral: a dropped event is not retried, because the next
//! reconciler cycle re-reads current state and re-derives remaining drift.

use compact_str::{CompactString, format_compact};

use crate::entities::{DepositStatus, WithdrawalStatus};
use crate::processors::stats::StatsSnapshot;
use rust_decimal::Decimal;

/// The kinds of drift the reconciler reports. Also used as the namespace
/// of snapshot-cache keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Balance,
    Deposit,
    Withdrawal,
    TransactionBatch,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ChangeKind::Balance => "balance",
            ChangeKind::Deposit => "deposit",
            ChangeKind::Withdrawal => "withdrawal",
            ChangeKind::TransactionBatch => "transaction_batch",
        };
        f.write_str(name)
    }
}

/// One detected drift. `previous` fields are `None` when the entity was
/// observed for the first time.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Balance {
        user_id: CompactString,
        previous: Option<Decimal>,
        balance: Decimal,
    },
    Deposit {
        deposit_id: i64,
        user_id: CompactString,
        amount: Decimal,
        previous_status: Option<DepositStatus>,
        status: DepositStatus,
    },
    Withdrawal {
        withdrawal_id: i64,
        user_id: CompactString,
        amount: Decimal,
        previous_status: Option<WithdrawalStatus>,
        status: WithdrawalStatus,
    },
    TransactionBatch {
        user_id: CompactString,
        new_count: u32,
        latest_id: i64,
    },
}

impl Change {
    pub fn kind(&self) -> ChangeKind {
        match self {
            Change::Balance { .. } => ChangeKind::Balance,
            Change::Deposit { .. } => ChangeKind::Deposit,
            Change::Withdrawal { .. } => ChangeKind::Withdrawal,
            Change::TransactionBatch { .. } => ChangeKind::TransactionBatch,
        }
    }

    /// The user this change belongs to (used for per-session filtering).
    pub fn user_id(&self) -> &CompactString {
        match self {
            Change::Balance { user_id, .. }
            | Change::Deposit { user_id, .. }
            | Change::Withdrawal { user_id, .. }
            | Change::TransactionBatch { user_id, .. } => user_id,
        }
    }

    /// Subject identity for stats summaries, e.g. `user-42` or `deposit-7`.
    pub fn subject(&self) -> CompactString {
        match self {
            Change::Balance { user_id, .. } | Change::TransactionBatch { user_id, .. } => {
                user_id.clone()
            }
            Change::Deposit { deposit_id, .. } => format_compact!("deposit-{deposit_id}"),
            Change::Withdrawal { withdrawal_id, .. } => {
                format_compact!("withdrawal-{withdrawal_id}")
            }
        }
    }
}

/// A [`Change`] stamped with its sequence number and detection time.
///
/// Sequence numbers are strictly increasing and never reused within one
/// reconciler instance; consumers use them to notice gaps and duplicates.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub seq: u64,
    pub detected_at: time::OffsetDateTime,
    pub change: Change,
}

/// Aggregate monitor status, published once per cycle independent of
/// per-entity events so sessions can display liveness.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorStatusEvent {
    pub emitted_at: time::OffsetDateTime,
    pub stats: StatsSnapshot,
}

/// Everything the broadcaster fans out.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Change(ChangeEvent),
    MonitorStatus(MonitorStatusEvent),
}
