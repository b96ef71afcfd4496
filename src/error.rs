//! Engine Error Taxonomy
//!
//! Every failure the engine can produce is a typed variant; failed
//! operations append nothing to the ledger. User-facing variants map to
//! 4xx responses with clear messages; internal ordering/invariant
//! violations are logged for operators and surfaced as opaque 500s.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A transaction with the same (related_entity, kind) pair already
    /// exists. Safe to treat as "already processed".
    #[error("duplicate entry for {related_entity} ({kind})")]
    DuplicateEntry { related_entity: String, kind: String },

    /// The operation would drive the user's available balance negative.
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: i64, available: i64 },

    /// Payout amount is below the tier-specific minimum.
    #[error("minimum payout is {minimum} credits for the {tier} tier")]
    BelowMinimum { minimum: i64, tier: String },

    /// A streak event arrived dated earlier than the last applied report.
    /// Internal ordering violation; logged, never applied.
    #[error("stale streak update for {user_id}: {report_date} precedes {last_date}")]
    StaleStreakUpdate {
        user_id: String,
        report_date: chrono::NaiveDate,
        last_date: chrono::NaiveDate,
    },

    /// A derived value would violate its invariant (negative balance,
    /// negative danger score). Fatal to the operation.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl EngineError {
    /// Short machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::DuplicateEntry { .. } => "DUPLICATE_ENTRY",
            EngineError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            EngineError::BelowMinimum { .. } => "BELOW_MINIMUM",
            EngineError::StaleStreakUpdate { .. } => "STALE_STREAK_UPDATE",
            EngineError::InvariantViolation(_) => "INVARIANT_VIOLATION",
            EngineError::NotFound(_) => "NOT_FOUND",
            EngineError::Storage(_) => "STORAGE_ERROR",
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            EngineError::DuplicateEntry { .. } => (StatusCode::CONFLICT, self.to_string()),
            EngineError::InsufficientBalance { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "insufficient balance".to_string())
            }
            EngineError::BelowMinimum { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.to_string())
            }
            EngineError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            // Internal-only: operators see the detail in logs, callers do not.
            EngineError::StaleStreakUpdate { .. }
            | EngineError::InvariantViolation(_)
            | EngineError::Storage(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };

        let body = Json(ErrorResponse {
            error: message,
            code: self.code().to_string(),
        });

        (status, body).into_response()
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_below_minimum_message_names_tier() {
        let err = EngineError::BelowMinimum {
            minimum: 100,
            tier: "bronze".to_string(),
        };
        assert!(err.to_string().contains("100"));
        assert!(err.to_string().contains("bronze"));
    }

    #[test]
    fn test_error_codes_are_stable() {
        let err = EngineError::InsufficientBalance {
            requested: 50,
            available: 10,
        };
        assert_eq!(err.code(), "INSUFFICIENT_BALANCE");
    }

    #[test]
    fn test_storage_errors_are_opaque_500s() {
        let err = EngineError::Storage("connection refused".to_string());
        assert_eq!(err.code(), "STORAGE_ERROR");

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
