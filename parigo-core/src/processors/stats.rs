//! Operational counters for the reconciliation monitor.

use std::collections::VecDeque;

use compact_str::CompactString;
use time::OffsetDateTime;

use crate::events::types::ChangeEvent;

/// How many of the most recent changes are retained for inspection.
pub const RECENT_CHANGES_CAPACITY: usize = 50;

/// One retained entry of the recent-change ring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSummary {
    pub seq: u64,
    pub kind: CompactString,
    pub subject: CompactString,
    pub detected_at: OffsetDateTime,
}

impl ChangeSummary {
    fn from_event(event: &ChangeEvent) -> Self {
        Self {
            seq: event.seq,
            kind: CompactString::from(event.change.kind().to_string()),
            subject: event.change.subject(),
            detected_at: event.detected_at,
        }
    }
}

/// Point-in-time copy of the monitor counters.
///
/// Handed out instead of references so callers can never observe a
/// half-updated cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub checks_performed: u64,
    pub drifts_detected: u64,
    pub broadcasts_sent: u64,
    pub last_check_at: Option<OffsetDateTime>,
    pub recent_changes: Vec<ChangeSummary>,
}

/// Mutable counter state owned by the reconciler.
#[derive(Debug, Default)]
pub struct MonitorStats {
    checks_performed: u64,
    drifts_detected: u64,
    broadcasts_sent: u64,
    last_check_at: Option<OffsetDateTime>,
    recent: VecDeque<ChangeSummary>,
}

impl MonitorStats {
    pub fn record_check(&mut self, at: OffsetDateTime) {
        self.checks_performed += 1;
        self.last_check_at = Some(at);
    }

    /// Record one detected drift; oldest retained entry falls off once
    /// the ring is full.
    pub fn record_change(&mut self, event: &ChangeEvent) {
        self.drifts_detected += 1;
        if self.recent.len() == RECENT_CHANGES_CAPACITY {
            self.recent.pop_front();
        }
        self.recent.push_back(ChangeSummary::from_event(event));
    }

    pub fn record_broadcast(&mut self) {
        self.broadcasts_sent += 1;
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            checks_performed: self.checks_performed,
            drifts_detected: self.drifts_detected,
            broadcasts_sent: self.broadcasts_sent,
            last_check_at: self.last_check_at,
            recent_changes: self.recent.iter().cloned().collect(),
        }
    }

    /// Zero every counter and clear the recent-change ring.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn event(seq: u64) -> ChangeEvent {
        ChangeEvent {
            seq,
            detected_at: OffsetDateTime::UNIX_EPOCH,
            change: crate::events::types::Change::Balance {
                user_id: "user-1".into(),
                previous: None,
                balance: Decimal::new(100, 0),
            },
        }
    }

    #[test]
    fn ring_evicts_oldest_beyond_capacity() {
        let mut stats = MonitorStats::default();
        for seq in 1..=(RECENT_CHANGES_CAPACITY as u64 + 7) {
            stats.record_change(&event(seq));
        }
        let snap = stats.snapshot();
        assert_eq!(snap.recent_changes.len(), RECENT_CHANGES_CAPACITY);
        assert_eq!(snap.recent_changes[0].seq, 8);
        assert_eq!(
            snap.recent_changes.last().map(|c| c.seq),
            Some(RECENT_CHANGES_CAPACITY as u64 + 7)
        );
        assert_eq!(snap.drifts_detected, RECENT_CHANGES_CAPACITY as u64 + 7);
    }

    #[test]
    fn snapshot_is_detached_from_later_mutation() {
        let mut stats = MonitorStats::default();
        stats.record_check(OffsetDateTime::UNIX_EPOCH);
        stats.record_change(&event(1));
        let snap = stats.snapshot();

        stats.record_change(&event(2));
        stats.record_broadcast();

        assert_eq!(snap.drifts_detected, 1);
        assert_eq!(snap.broadcasts_sent, 0);
        assert_eq!(snap.recent_changes.len(), 1);
    }

    #[test]
    fn reset_clears_counters_and_ring() {
        let mut stats = MonitorStats::default();
        stats.record_check(OffsetDateTime::UNIX_EPOCH);
        stats.record_change(&event(1));
        stats.record_broadcast();
        stats.reset();

        let snap = stats.snapshot();
        assert_eq!(snap.checks_performed, 0);
        assert_eq!(snap.drifts_detected, 0);
        assert_eq!(snap.broadcasts_sent, 0);
        assert_eq!(snap.last_check_at, None);
        assert!(snap.recent_changes.is_empty());
    }
}
