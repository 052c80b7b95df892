//! Admin API handlers.
//!
//! Operational endpoints for the consistency monitor.
//!
//! # Endpoints
//!
//! - `GET  /monitor/stats`       – counters and recent changes
//! - `POST /monitor/stats/reset` – zero the counters

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

mod monitor;

/// Build the Admin API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/monitor/stats", get(monitor::get_stats))
        .route("/monitor/stats/reset", post(monitor::reset_stats))
}
