//! Referral Endpoints

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::referrals::ReferralRecord;

use super::ApiState;

#[derive(Debug, Deserialize)]
pub struct CreateReferralRequest {
    pub referrer_id: String,
    pub referee_id: String,
    pub required_incidents: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct RefereeActivityRequest {
    pub incident_count: u32,
}

#[derive(Debug, Serialize)]
pub struct ReferralsResponse {
    pub referrer_id: String,
    pub total: usize,
    pub referrals: Vec<ReferralRecord>,
}

/// POST / - register a referral relationship
pub async fn create_referral(
    State(state): State<ApiState>,
    Json(payload): Json<CreateReferralRequest>,
) -> Json<ReferralRecord> {
    let record = state
        .engine
        .create_referral(
            &payload.referrer_id,
            &payload.referee_id,
            payload.required_incidents,
        )
        .await;
    Json(record)
}

/// POST /{referral_id}/activity - referee progress update
pub async fn record_activity(
    State(state): State<ApiState>,
    Path(referral_id): Path<String>,
    Json(payload): Json<RefereeActivityRequest>,
) -> Result<Json<ReferralRecord>, EngineError> {
    let record = state
        .engine
        .record_referee_activity(&referral_id, payload.incident_count)
        .await?;
    Ok(Json(record))
}

/// GET /by/{referrer_id} - a referrer's referral list
pub async fn list_referrals(
    State(state): State<ApiState>,
    Path(referrer_id): Path<String>,
) -> Json<ReferralsResponse> {
    let referrals = state.engine.referrals_for(&referrer_id).await;
    Json(ReferralsResponse {
        total: referrals.len(),
        referrer_id,
        referrals,
    })
}

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/", post(create_referral))
        .route("/{referral_id}/activity", post(record_activity))
        .route("/by/{referrer_id}", get(list_referrals))
}
