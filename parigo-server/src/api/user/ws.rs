use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use compact_str::CompactString;
use kanau::processor::Processor;

use parigo_core::entities::balances::GetUserBalance;
use parigo_core::events::{Change, ChangeEvent, MonitorStatusEvent, StreamEvent};
use parigo_core::framework::DatabaseProcessor;
use parigo_sdk::objects::ws::{WsCloseCode, WsServerMessage};

use crate::state::AppState;

/// `GET /users/{user_id}/stream` — WebSocket consistency stream.
///
/// Upgrades the HTTP connection to a WebSocket. The first frame is a
/// `balance_update` snapshot with `seq == 0`; after that the session
/// receives this user's change events plus the per-cycle monitor status.
pub(super) async fn user_stream_ws(
    state: State<AppState>,
    Path(user_id): Path<CompactString>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let app_state = state.0.clone();
    ws.on_upgrade(move |socket| handle_user_stream(socket, app_state, user_id))
}

/// Background task that drives a single WebSocket session.
///
/// 1. Subscribes to the broadcast channel, then reads the current
///    balance, so an update racing the query is still buffered.
/// 2. Sends the balance snapshot as the first frame (`seq == 0`).
/// 3. Relays change events for this `user_id` and every monitor status
///    until the client disconnects.
async fn handle_user_stream(mut socket: WebSocket, state: AppState, user_id: CompactString) {
    let processor = DatabaseProcessor {
        pool: state.db.clone(),
    };

    let mut events_rx = state.events.subscribe();

    // --- Send the current balance as the snapshot frame --------------------
    let row = match processor
        .process(GetUserBalance {
            user_id: user_id.clone(),
        })
        .await
    {
        Ok(Some(row)) => row,
        Ok(None) => {
            let _ = send_json(
                &mut socket,
                &WsServerMessage::Error {
                    code: WsCloseCode::USER_NOT_FOUND,
                    reason: "user not found".into(),
                },
            )
            .await;
            let _ = socket
                .send(Message::Close(Some(axum::extract::ws::CloseFrame {
                    code: WsCloseCode::USER_NOT_FOUND,
                    reason: "user not found".into(),
                })))
                .await;
            return;
        }
        Err(e) => {
            tracing::error!(error = %e, %user_id, "WS: failed to query balance");
            let _ = send_json(
                &mut socket,
                &WsServerMessage::Error {
                    code: WsCloseCode::INTERNAL_ERROR,
                    reason: "internal error".into(),
                },
            )
            .await;
            let _ = socket
                .send(Message::Close(Some(axum::extract::ws::CloseFrame {
                    code: WsCloseCode::INTERNAL_ERROR,
                    reason: "internal error".into(),
                })))
                .await;
            return;
        }
    };

    let snapshot = WsServerMessage::BalanceUpdate {
        seq: 0,
        user_id: row.user_id,
        balance: row.balance,
        previous_balance: None,
        timestamp: row.updated_at,
    };
    if send_json(&mut socket, &snapshot).await.is_err() {
        return;
    }

    // --- Relay events until disconnect --------------------------------------

    loop {
        tokio::select! {
            result = events_rx.recv() => {
                match result {
                    Ok(event) => {
                        let Some(msg) = to_ws_message(&event, &user_id) else {
                            continue;
                        };
                        if send_json(&mut socket, &msg).await.is_err() {
                            return;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(
                            %user_id,
                            skipped = n,
                            "WS: session lagged behind the event stream"
                        );
                        continue;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }

            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        return;
                    }
                    Some(Ok(_)) => {
                    }
                    Some(Err(_)) => {
                        return;
                    }
                }
            }
        }
    }

    let _ = socket.send(Message::Close(None)).await;
}

/// Convert a stream event into the wire message for one session.
///
/// Change events for other users are filtered out (`None`); monitor
/// status events go to every session.
fn to_ws_message(event: &StreamEvent, user_id: &CompactString) -> Option<WsServerMessage> {
    match event {
        StreamEvent::Change(change) if change.change.user_id() == user_id => {
            Some(change_message(change))
        }
        StreamEvent::Change(_) => None,
        StreamEvent::MonitorStatus(status) => Some(status_message(status)),
    }
}

fn change_message(event: &ChangeEvent) -> WsServerMessage {
    match &event.change {
        Change::Balance {
            user_id,
            previous,
            balance,
        } => WsServerMessage::BalanceUpdate {
            seq: event.seq,
            user_id: user_id.clone(),
            balance: *balance,
            previous_balance: *previous,
            timestamp: event.detected_at,
        },
        Change::Deposit {
            deposit_id,
            user_id,
            amount,
            previous_status,
            status,
        } => WsServerMessage::DepositUpdate {
            seq: event.seq,
            deposit_id: *deposit_id,
            user_id: user_id.clone(),
            amount: *amount,
            status: (*status).into(),
            previous_status: previous_status.map(Into::into),
            timestamp: event.detected_at,
        },
        Change::Withdrawal {
            withdrawal_id,
            user_id,
            amount,
            previous_status,
            status,
        } => WsServerMessage::WithdrawalUpdate {
            seq: event.seq,
            withdrawal_id: *withdrawal_id,
            user_id: user_id.clone(),
            amount: *amount,
            status: (*status).into(),
            previous_status: previous_status.map(Into::into),
            timestamp: event.detected_at,
        },
        Change::TransactionBatch {
            user_id,
            new_count,
            latest_id,
        } => WsServerMessage::TransactionsUpdate {
            seq: event.seq,
            user_id: user_id.clone(),
            new_count: *new_count,
            latest_id: *latest_id,
            timestamp: event.detected_at,
        },
    }
}

fn status_message(event: &MonitorStatusEvent) -> WsServerMessage {
    WsServerMessage::StalenessMonitorStatus {
        checks_performed: event.stats.checks_performed,
        drifts_detected: event.stats.drifts_detected,
        broadcasts_sent: event.stats.broadcasts_sent,
        last_check_at: event.stats.last_check_at,
        timestamp: event.emitted_at,
    }
}

/// Serialize `value` as JSON and send it as a text WebSocket frame.
///
/// Returns `Err(())` if the send fails (client disconnected).
async fn send_json<T: serde::Serialize>(socket: &mut WebSocket, value: &T) -> Result<(), ()> {
    let json = serde_json::to_string(value).map_err(|_| ())?;
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn change_event(seq: u64, user: &str) -> StreamEvent {
        StreamEvent::Change(ChangeEvent {
            seq,
            detected_at: time::OffsetDateTime::UNIX_EPOCH,
            change: Change::Balance {
                user_id: user.into(),
                previous: Some(Decimal::new(10000, 2)),
                balance: Decimal::new(8000, 2),
            },
        })
    }

    #[test]
    fn change_events_are_filtered_by_user() {
        let mine: CompactString = "user-1".into();
        assert!(to_ws_message(&change_event(1, "user-1"), &mine).is_some());
        assert!(to_ws_message(&change_event(2, "user-2"), &mine).is_none());
    }

    #[test]
    fn monitor_status_reaches_every_session() {
        let status = StreamEvent::MonitorStatus(MonitorStatusEvent {
            emitted_at: time::OffsetDateTime::UNIX_EPOCH,
            stats: parigo_core::processors::MonitorStats::default().snapshot(),
        });
        let msg = to_ws_message(&status, &"anyone".into()).unwrap();
        assert!(matches!(
            msg,
            WsServerMessage::StalenessMonitorStatus {
                checks_performed: 0,
                ..
            }
        ));
    }
}
