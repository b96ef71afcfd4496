//! HTTP API Endpoints
//!
//! Thin axum glue over the scoring engine. Handlers translate requests
//! into engine calls and `EngineError` into status codes; no scoring
//! logic lives here.

pub mod leaderboard;
pub mod payouts;
pub mod plates;
pub mod referrals;
pub mod reports;
pub mod users;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use crate::scoring::ScoringEngine;

/// Shared state for all API routers.
#[derive(Clone)]
pub struct ApiState {
    pub engine: ScoringEngine,
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Assemble the full API surface.
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/reports", reports::router())
        .nest("/users", users::router())
        .nest("/leaderboard", leaderboard::router())
        .nest("/plates", plates::router())
        .nest("/payouts", payouts::router())
        .nest("/referrals", referrals::router())
        .with_state(state)
}
