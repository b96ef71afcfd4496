//! Payout Endpoints
//!
//! Authorization plus the two lifecycle callbacks the external payment
//! collaborator invokes: settle on success, reverse on failure.

use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use crate::error::EngineError;
use crate::payouts::{PayoutMethod, PayoutRequest};

use super::ApiState;

#[derive(Debug, Deserialize)]
pub struct AuthorizePayoutRequest {
    pub user_id: String,
    pub amount: i64,
    pub method: PayoutMethod,
}

/// POST / - authorize a withdrawal
pub async fn authorize(
    State(state): State<ApiState>,
    Json(payload): Json<AuthorizePayoutRequest>,
) -> Result<Json<PayoutRequest>, EngineError> {
    let request = state
        .engine
        .authorize_payout(&payload.user_id, payload.amount, payload.method)
        .await?;
    Ok(Json(request))
}

/// POST /{payout_id}/reverse - failed external payment
pub async fn reverse(
    State(state): State<ApiState>,
    Path(payout_id): Path<String>,
) -> Result<Json<PayoutRequest>, EngineError> {
    Ok(Json(state.engine.reverse_payout(&payout_id).await?))
}

/// POST /{payout_id}/settle - executed external payment
pub async fn settle(
    State(state): State<ApiState>,
    Path(payout_id): Path<String>,
) -> Result<Json<PayoutRequest>, EngineError> {
    Ok(Json(state.engine.settle_payout(&payout_id).await?))
}

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/", post(authorize))
        .route("/{payout_id}/reverse", post(reverse))
        .route("/{payout_id}/settle", post(settle))
}
