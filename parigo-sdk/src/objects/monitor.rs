//! Monitor stats objects for the admin API.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// `GET /api/v1/admin/monitor/stats` response body.
///
/// A point-in-time copy of the reconciler's counters, never a live view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorStatsView {
    pub checks_performed: u64,
    pub drifts_detected: u64,
    pub broadcasts_sent: u64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_check_at: Option<time::OffsetDateTime>,
    /// Most recent detected changes, newest last. Bounded server-side.
    pub recent_changes: Vec<ChangeSummaryView>,
}

/// One entry of the recent-change ring buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSummaryView {
    pub seq: u64,
    /// Change kind: `balance`, `deposit`, `withdrawal` or `transaction_batch`.
    pub kind: CompactString,
    /// Subject identity, e.g. `user-42` or `deposit-7`.
    pub subject: CompactString,
    #[serde(with = "time::serde::rfc3339")]
    pub detected_at: time::OffsetDateTime,
}
