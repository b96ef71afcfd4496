//! Per-User Read Endpoints

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::ledger::Balance;
use crate::scoring::{StreakRecord, TierAssignment};

use super::ApiState;

/// GET /{user_id}/balance
pub async fn get_balance(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
) -> Json<Balance> {
    Json(state.engine.get_balance(&user_id).await)
}

/// GET /{user_id}/tier
pub async fn get_tier(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
) -> Json<TierAssignment> {
    Json(state.engine.get_tier(&user_id).await)
}

/// GET /{user_id}/streak
pub async fn get_streak(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
) -> Json<StreakRecord> {
    Json(state.engine.get_streak(&user_id).await)
}

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/{user_id}/balance", get(get_balance))
        .route("/{user_id}/tier", get(get_tier))
        .route("/{user_id}/streak", get(get_streak))
}
