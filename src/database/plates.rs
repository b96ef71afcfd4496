//! Plate Repository - PostgreSQL operations for flagged plate aggregates using sqlx

use sqlx::PgPool;
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::plates::FlaggedPlateAggregate;

pub struct PlateRepository {
    pool: PgPool,
}

impl PlateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upsert the full aggregate snapshot keyed by normalized plate.
    pub async fn upsert(&self, aggregate: &FlaggedPlateAggregate) -> EngineResult<()> {
        let types = serde_json::to_value(&aggregate.types)
            .map_err(|e| EngineError::Storage(format!("Failed to serialize plate types: {}", e)))?;
        let recent = serde_json::to_value(&aggregate.recent_incidents).map_err(|e| {
            EngineError::Storage(format!("Failed to serialize recent incidents: {}", e))
        })?;

        sqlx::query(
            r#"
            INSERT INTO plates.flagged
            (plate, report_count, danger_score, types, first_seen, last_seen, recent_incidents)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (plate) DO UPDATE SET
                report_count = EXCLUDED.report_count,
                danger_score = EXCLUDED.danger_score,
                types = EXCLUDED.types,
                first_seen = EXCLUDED.first_seen,
                last_seen = EXCLUDED.last_seen,
                recent_incidents = EXCLUDED.recent_incidents
            "#,
        )
        .bind(&aggregate.plate)
        .bind(aggregate.report_count as i64)
        .bind(aggregate.danger_score)
        .bind(types)
        .bind(aggregate.first_seen)
        .bind(aggregate.last_seen)
        .bind(recent)
        .execute(&self.pool)
        .await
        .map_err(|e| EngineError::Storage(format!("Failed to upsert flagged plate: {}", e)))?;

        debug!(plate = %aggregate.plate, danger_score = aggregate.danger_score, "Plate persisted");
        Ok(())
    }
}
