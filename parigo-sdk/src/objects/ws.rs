//! WebSocket message types for the live consistency stream.
//!
//! `GET /api/v1/users/{user_id}/stream` upgrades to a WebSocket and pushes
//! [`WsServerMessage`] JSON frames.
//!
//! # Protocol
//!
//! 1. The server sends a [`WsServerMessage::BalanceUpdate`] with the current
//!    balance immediately after the upgrade. This snapshot frame carries
//!    `seq = 0`; reconciler-assigned sequence numbers start at 1.
//! 2. Subsequent frames are pushed whenever the reconciler detects drift for
//!    this user, plus one `staleness_monitor_status` frame per reconciler
//!    cycle so the client can display liveness even when nothing drifted.
//! 3. A session that cannot keep up has frames dropped for itself only; the
//!    next reconciler cycle re-derives current state, so clients recover by
//!    simply continuing to read.

use compact_str::CompactString;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{DepositStatus, WithdrawalStatus};

/// Server-to-client WebSocket message.
///
/// Serialized as an internally-tagged JSON object so the client can
/// dispatch on the `"type"` field:
///
/// ```json
/// {"type":"balance_update","seq":3,"user_id":"user-1","balance":"80.00",...}
/// {"type":"staleness_monitor_status","checks_performed":12,...}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsServerMessage {
    /// A user balance drifted (or the initial snapshot when `seq == 0`).
    BalanceUpdate {
        seq: u64,
        user_id: CompactString,
        balance: Decimal,
        /// `None` for the initial snapshot frame.
        previous_balance: Option<Decimal>,
        #[serde(with = "time::serde::rfc3339")]
        timestamp: time::OffsetDateTime,
    },

    /// A deposit appeared or changed status.
    DepositUpdate {
        seq: u64,
        deposit_id: i64,
        user_id: CompactString,
        amount: Decimal,
        status: DepositStatus,
        /// `None` when the deposit was observed for the first time.
        previous_status: Option<DepositStatus>,
        #[serde(with = "time::serde::rfc3339")]
        timestamp: time::OffsetDateTime,
    },

    /// A withdrawal appeared or changed status.
    WithdrawalUpdate {
        seq: u64,
        withdrawal_id: i64,
        user_id: CompactString,
        amount: Decimal,
        status: WithdrawalStatus,
        /// `None` when the withdrawal was observed for the first time.
        previous_status: Option<WithdrawalStatus>,
        #[serde(with = "time::serde::rfc3339")]
        timestamp: time::OffsetDateTime,
    },

    /// New ledger transactions appeared for a user.
    TransactionsUpdate {
        seq: u64,
        user_id: CompactString,
        new_count: u32,
        latest_id: i64,
        #[serde(with = "time::serde::rfc3339")]
        timestamp: time::OffsetDateTime,
    },

    /// Aggregate reconciler status, published once per cycle to every
    /// session regardless of whether drift occurred.
    StalenessMonitorStatus {
        checks_performed: u64,
        drifts_detected: u64,
        broadcasts_sent: u64,
        #[serde(with = "time::serde::rfc3339::option")]
        last_check_at: Option<time::OffsetDateTime>,
        #[serde(with = "time::serde::rfc3339")]
        timestamp: time::OffsetDateTime,
    },

    /// A server-side error during the handshake phase. The server may
    /// still send a close frame afterwards.
    Error { code: u16, reason: String },
}

/// Well-known WebSocket close codes used by the stream.
///
/// Codes in the 4000–4999 range are reserved for application use by
/// [RFC 6455 §7.4.2](https://www.rfc-editor.org/rfc/rfc6455#section-7.4.2).
pub struct WsCloseCode;

impl WsCloseCode {
    /// Normal closure.
    pub const NORMAL: u16 = 1000;

    /// An unexpected server-side error prevented the connection from
    /// continuing.
    pub const INTERNAL_ERROR: u16 = 1011;

    /// The requested user does not exist.
    pub const USER_NOT_FOUND: u16 = 4004;
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn balance_update_wire_shape() {
        let msg = WsServerMessage::BalanceUpdate {
            seq: 3,
            user_id: "user-1".into(),
            balance: Decimal::new(8000, 2),
            previous_balance: Some(Decimal::new(10000, 2)),
            timestamp: datetime!(2026-01-02 03:04:05 UTC),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "balance_update");
        assert_eq!(json["user_id"], "user-1");
        assert_eq!(json["balance"], "80.00");
        assert_eq!(json["previous_balance"], "100.00");
        assert_eq!(json["timestamp"], "2026-01-02T03:04:05Z");
    }

    #[test]
    fn envelope_tags_match_protocol_names() {
        let timestamp = datetime!(2026-01-02 03:04:05 UTC);
        let cases = [
            (
                serde_json::to_value(WsServerMessage::DepositUpdate {
                    seq: 1,
                    deposit_id: 9,
                    user_id: "u".into(),
                    amount: Decimal::ONE,
                    status: DepositStatus::Confirmed,
                    previous_status: None,
                    timestamp,
                })
                .unwrap(),
                "deposit_update",
            ),
            (
                serde_json::to_value(WsServerMessage::WithdrawalUpdate {
                    seq: 2,
                    withdrawal_id: 4,
                    user_id: "u".into(),
                    amount: Decimal::ONE,
                    status: WithdrawalStatus::Approved,
                    previous_status: Some(WithdrawalStatus::Requested),
                    timestamp,
                })
                .unwrap(),
                "withdrawal_update",
            ),
            (
                serde_json::to_value(WsServerMessage::TransactionsUpdate {
                    seq: 3,
                    user_id: "u".into(),
                    new_count: 2,
                    latest_id: 77,
                    timestamp,
                })
                .unwrap(),
                "transactions_update",
            ),
            (
                serde_json::to_value(WsServerMessage::StalenessMonitorStatus {
                    checks_performed: 5,
                    drifts_detected: 1,
                    broadcasts_sent: 1,
                    last_check_at: Some(timestamp),
                    timestamp,
                })
                .unwrap(),
                "staleness_monitor_status",
            ),
        ];
        for (json, expected) in cases {
            assert_eq!(json["type"], expected);
        }
    }

    #[test]
    fn first_observation_serializes_null_previous() {
        let msg = WsServerMessage::DepositUpdate {
            seq: 1,
            deposit_id: 10,
            user_id: "user-9".into(),
            amount: Decimal::new(2500, 2),
            status: DepositStatus::Pending,
            previous_status: None,
            timestamp: datetime!(2026-01-02 03:04:05 UTC),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert!(json["previous_status"].is_null());
    }
}
