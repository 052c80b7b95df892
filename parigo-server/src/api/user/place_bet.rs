use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use kanau::processor::Processor;

use parigo_core::entities::bets::PlaceBetTxn;
use parigo_core::framework::DatabaseProcessor;
use parigo_sdk::objects::{BetResponse, PlaceBetRequest};

use super::UserApiError;
use crate::state::AppState;

/// `POST /bets` — place a bet.
///
/// Debits the user's balance and records the bet plus its ledger
/// transaction in one database transaction; the response carries the
/// authoritative bet id and post-debit balance.
pub(super) async fn place_bet(
    state: State<AppState>,
    Json(request): Json<PlaceBetRequest>,
) -> Result<impl IntoResponse, UserApiError> {
    let processor = DatabaseProcessor {
        pool: state.db.clone(),
    };

    let placed = processor
        .process(PlaceBetTxn {
            user_id: request.user_id.clone(),
            round_id: request.round_id,
            selection: request.selection.clone(),
            amount: request.amount,
        })
        .await
        .map_err(UserApiError::from)?;

    let response = BetResponse {
        bet_id: placed.record.bet_id,
        user_id: placed.record.user_id,
        round_id: placed.record.round_id,
        selection: request.selection,
        amount: placed.record.amount,
        balance_after: placed.balance_after,
        placed_at: placed.record.placed_at,
    };
    Ok((StatusCode::CREATED, Json(response)))
}
