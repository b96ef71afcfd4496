//! Flagged Plate Endpoints

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::plates::{FlaggedPlateAggregate, IncidentType};

use super::ApiState;

#[derive(Debug, Deserialize)]
pub struct FlaggedQuery {
    #[serde(rename = "type")]
    pub filter_type: Option<IncidentType>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

/// GET /?type= - ranked flagged plates, optionally by incident type
pub async fn get_flagged(
    State(state): State<ApiState>,
    Query(query): Query<FlaggedQuery>,
) -> Json<Vec<FlaggedPlateAggregate>> {
    Json(state.engine.flagged_plates(query.filter_type).await)
}

/// GET /search?q= - substring match over normalized plates
pub async fn search(
    State(state): State<ApiState>,
    Query(query): Query<SearchQuery>,
) -> Json<Vec<FlaggedPlateAggregate>> {
    Json(state.engine.search_plates(&query.q).await)
}

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/", get(get_flagged))
        .route("/search", get(search))
}
