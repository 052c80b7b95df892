//! In-memory snapshot cache the reconciler diffs the store against.

use std::collections::HashMap;

use compact_str::CompactString;
use rust_decimal::Decimal;
use time::{Duration, OffsetDateTime};

use crate::entities::{DepositStatus, WithdrawalStatus};
use crate::events::types::ChangeKind;

/// Cache key: what kind of entity plus its natural identifier
/// (user id for balances and transaction tails, row id otherwise).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityId {
    pub kind: ChangeKind,
    pub key: CompactString,
}

impl EntityId {
    pub fn balance(user_id: impl Into<CompactString>) -> Self {
        Self {
            kind: ChangeKind::Balance,
            key: user_id.into(),
        }
    }

    pub fn deposit(deposit_id: i64) -> Self {
        Self {
            kind: ChangeKind::Deposit,
            key: compact_str::format_compact!("{deposit_id}"),
        }
    }

    pub fn withdrawal(withdrawal_id: i64) -> Self {
        Self {
            kind: ChangeKind::Withdrawal,
            key: compact_str::format_compact!("{withdrawal_id}"),
        }
    }

    pub fn transaction_tail(user_id: impl Into<CompactString>) -> Self {
        Self {
            kind: ChangeKind::TransactionBatch,
            key: user_id.into(),
        }
    }
}

/// The last value the reconciler saw for an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservedValue {
    Balance(Decimal),
    Deposit {
        amount: Decimal,
        status: DepositStatus,
    },
    Withdrawal {
        amount: Decimal,
        status: WithdrawalStatus,
    },
    TransactionTail {
        latest_id: i64,
    },
}

impl ObservedValue {
    pub fn as_balance(&self) -> Option<Decimal> {
        match self {
            Self::Balance(balance) => Some(*balance),
            _ => None,
        }
    }

    pub fn as_deposit_status(&self) -> Option<DepositStatus> {
        match self {
            Self::Deposit { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn as_withdrawal_status(&self) -> Option<WithdrawalStatus> {
        match self {
            Self::Withdrawal { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn as_tail_latest_id(&self) -> Option<i64> {
        match self {
            Self::TransactionTail { latest_id } => Some(*latest_id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct WatchedEntity {
    value: ObservedValue,
    observed_at: OffsetDateTime,
}

/// Result of feeding one fresh store value into the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// Entity was not in the cache; first observation.
    New,
    /// Cached value equals the fresh value.
    Unchanged,
    /// Cached value differs; carries what the cache held before.
    Drifted { previous: ObservedValue },
}

/// Snapshot cache with time-based eviction.
///
/// Every observation, changed or not, refreshes the entry's timestamp:
/// an entity still being reported by the store stays cached, so a
/// stable deposit is not evicted and re-announced as new.
#[derive(Debug)]
pub struct SnapshotCache {
    entries: HashMap<EntityId, WatchedEntity>,
    ttl: Duration,
}

impl SnapshotCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    /// Compare a fresh value against the cache and store it.
    pub fn observe(&mut self, id: EntityId, value: ObservedValue, now: OffsetDateTime) -> Observation {
        let observation = match self.entries.get(&id) {
            None => Observation::New,
            Some(entry) if entry.value == value => Observation::Unchanged,
            Some(entry) => Observation::Drifted {
                previous: entry.value.clone(),
            },
        };
        self.entries.insert(
            id,
            WatchedEntity {
                value,
                observed_at: now,
            },
        );
        observation
    }

    /// Drop entries not observed within the TTL.
    pub fn evict_stale(&mut self, now: OffsetDateTime) {
        let ttl = self.ttl;
        self.entries.retain(|_, entry| now - entry.observed_at < ttl);
    }

    pub fn get(&self, id: &EntityId) -> Option<&ObservedValue> {
        self.entries.get(id).map(|entry| &entry.value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
