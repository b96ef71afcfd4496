//! Report Ingestion Endpoints
//!
//! Accepts report creation and deletion events from the reporting
//! collaborator and returns the derived outcome.

use axum::{
    extract::{Path, State},
    routing::{delete, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::plates::{FlaggedPlateAggregate, IncidentType, Severity};
use crate::scoring::{IncidentReportEvent, ReportOutcome};

use super::ApiState;

#[derive(Debug, Deserialize)]
pub struct CreateReportRequest {
    pub report_id: String,
    pub user_id: String,
    pub plate: Option<String>,
    pub incident_type: IncidentType,
    pub severity: Severity,
    pub occurred_at: DateTime<Utc>,
    pub location: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteReportResponse {
    pub report_id: String,
    pub plate: Option<FlaggedPlateAggregate>,
}

/// POST / - record a report event
pub async fn create_report(
    State(state): State<ApiState>,
    Json(payload): Json<CreateReportRequest>,
) -> Result<Json<ReportOutcome>, EngineError> {
    let outcome = state
        .engine
        .record_incident_report(IncidentReportEvent {
            report_id: payload.report_id,
            user_id: payload.user_id,
            plate: payload.plate,
            incident_type: payload.incident_type,
            severity: payload.severity,
            occurred_at: payload.occurred_at,
            location: payload.location,
        })
        .await?;
    Ok(Json(outcome))
}

/// DELETE /{report_id} - apply deletion compensation
pub async fn delete_report(
    State(state): State<ApiState>,
    Path(report_id): Path<String>,
) -> Result<Json<DeleteReportResponse>, EngineError> {
    let plate = state.engine.record_report_deleted(&report_id).await?;
    Ok(Json(DeleteReportResponse { report_id, plate }))
}

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/", post(create_report))
        .route("/{report_id}", delete(delete_report))
}
