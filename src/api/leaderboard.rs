//! Leaderboard Endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::leaderboard::{LeaderboardEntry, Period};

use super::ApiState;

const DEFAULT_LIMIT: usize = 25;

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<usize>,
}

fn parse_period(period: &str) -> Result<Period, (StatusCode, String)> {
    period
        .parse()
        .map_err(|e: String| (StatusCode::BAD_REQUEST, e))
}

/// GET /{period}?limit= - ranked entries for a window
pub async fn get_leaderboard(
    State(state): State<ApiState>,
    Path(period): Path<String>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>, (StatusCode, String)> {
    let period = parse_period(&period)?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    Ok(Json(state.engine.leaderboard(period, limit).await))
}

/// GET /{period}/users/{user_id} - a user's rank even outside the limit
pub async fn get_rank(
    State(state): State<ApiState>,
    Path((period, user_id)): Path<(String, String)>,
) -> Result<Json<LeaderboardEntry>, (StatusCode, String)> {
    let period = parse_period(&period)?;
    state
        .engine
        .rank_for(&user_id, period)
        .await
        .map(Json)
        .ok_or((
            StatusCode::NOT_FOUND,
            format!("no {} activity for {}", period.as_str(), user_id),
        ))
}

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/{period}", get(get_leaderboard))
        .route("/{period}/users/{user_id}", get(get_rank))
}
