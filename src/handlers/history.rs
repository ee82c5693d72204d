// src/handlers/history.rs

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::placement::{HistoryParams, HistoryResponse},
    state::AppState,
};

/// Records returned by the history endpoint.
const HISTORY_LIMIT: usize = 10;

/// Lists a user's most recent placements, newest first, with a summary.
pub async fn get_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = params
        .user_id
        .ok_or_else(|| AppError::BadRequest("user_id is required".to_string()))?;

    let records = state
        .placements
        .recent_placements(user_id, HISTORY_LIMIT)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch history for user {}: {}", user_id, e);
            AppError::from(e)
        })?;

    Ok(Json(HistoryResponse::from_records(records)))
}
