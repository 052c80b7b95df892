use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use parigo_core::processors::StatsSnapshot;
use parigo_sdk::objects::{ChangeSummaryView, MonitorStatsView};

use crate::state::AppState;

/// `GET /monitor/stats` — counters and recent changes.
pub(super) async fn get_stats(state: State<AppState>) -> impl IntoResponse {
    let snapshot = state.monitor_stats.read().await.snapshot();
    Json(to_view(snapshot))
}

/// `POST /monitor/stats/reset` — zero the counters and the change ring.
pub(super) async fn reset_stats(state: State<AppState>) -> impl IntoResponse {
    state.monitor_stats.write().await.reset();
    tracing::info!("monitor stats reset");
    StatusCode::NO_CONTENT
}

fn to_view(snapshot: StatsSnapshot) -> MonitorStatsView {
    MonitorStatsView {
        checks_performed: snapshot.checks_performed,
        drifts_detected: snapshot.drifts_detected,
        broadcasts_sent: snapshot.broadcasts_sent,
        last_check_at: snapshot.last_check_at,
        recent_changes: snapshot
            .recent_changes
            .into_iter()
            .map(|change| ChangeSummaryView {
                seq: change.seq,
                kind: change.kind,
                subject: change.subject,
                detected_at: change.detected_at,
            })
            .collect(),
    }
}
