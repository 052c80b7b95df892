//! User API handlers.
//!
//! These endpoints are called by the game frontend.
//!
//! # Endpoints
//!
//! - `POST /bets`                      – place a bet (atomic debit + record)
//! - `GET  /users/{user_id}/balance`   – read the current balance
//! - `GET  /users/{user_id}/stream`    – WebSocket consistency stream

use axum::{
    Json, Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;

use parigo_core::entities::bets::PlaceBetError;

use crate::state::AppState;

mod get_balance;
mod place_bet;
mod ws;

/// Build the User API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/bets", post(place_bet::place_bet))
        .route("/users/{user_id}/balance", get(get_balance::get_balance))
        .route("/users/{user_id}/stream", get(ws::user_stream_ws))
}

// ---------------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------------

/// Errors that can occur in User API handlers.
#[derive(Debug)]
enum UserApiError {
    /// A database query failed.
    Database(sqlx::Error),
    /// The requested user has no balance row.
    UserNotFound,
    /// Bet amount exceeds the available balance.
    InsufficientBalance,
    /// Bet amount was zero or negative.
    NonPositiveAmount,
}

impl From<PlaceBetError> for UserApiError {
    fn from(err: PlaceBetError) -> Self {
        match err {
            PlaceBetError::InsufficientBalance { .. } => UserApiError::InsufficientBalance,
            PlaceBetError::NonPositiveAmount => UserApiError::NonPositiveAmount,
            PlaceBetError::UnknownUser(_) => UserApiError::UserNotFound,
            PlaceBetError::Database(e) => UserApiError::Database(e),
        }
    }
}

impl IntoResponse for UserApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            UserApiError::Database(e) => {
                tracing::error!(error = %e, "User API database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
            UserApiError::UserNotFound => (StatusCode::NOT_FOUND, "user not found"),
            UserApiError::InsufficientBalance => {
                (StatusCode::UNPROCESSABLE_ENTITY, "insufficient balance")
            }
            UserApiError::NonPositiveAmount => {
                (StatusCode::BAD_REQUEST, "bet amount must be positive")
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
