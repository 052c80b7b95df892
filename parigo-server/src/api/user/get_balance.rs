use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use compact_str::CompactString;
use kanau::processor::Processor;

use parigo_core::entities::balances::GetUserBalance;
use parigo_core::framework::DatabaseProcessor;
use parigo_sdk::objects::BalanceResponse;

use super::UserApiError;
use crate::state::AppState;

/// `GET /users/{user_id}/balance` — read the current balance.
pub(super) async fn get_balance(
    state: State<AppState>,
    Path(user_id): Path<CompactString>,
) -> Result<impl IntoResponse, UserApiError> {
    let processor = DatabaseProcessor {
        pool: state.db.clone(),
    };

    let row = processor
        .process(GetUserBalance { user_id })
        .await
        .map_err(UserApiError::Database)?
        .ok_or(UserApiError::UserNotFound)?;

    Ok(Json(BalanceResponse {
        user_id: row.user_id,
        balance: row.balance,
        updated_at: row.updated_at,
    }))
}
