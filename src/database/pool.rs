//! Database Connection Pool using sqlx

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use crate::database::ledger::LedgerRepository;
use crate::database::plates::PlateRepository;
use crate::error::{EngineError, EngineResult};

pub struct DatabasePool {
    pool: PgPool,
    ledger: LedgerRepository,
    plates: PlateRepository,
}

impl DatabasePool {
    pub async fn new(connection_string: &str) -> EngineResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(connection_string)
            .await
            .map_err(|e| {
                EngineError::Storage(format!("Failed to connect to PostgreSQL: {}", e))
            })?;

        info!("Connected to PostgreSQL");

        let ledger = LedgerRepository::new(pool.clone());
        let plates = PlateRepository::new(pool.clone());

        Ok(Self {
            pool,
            ledger,
            plates,
        })
    }

    pub async fn init_schema(&self) -> EngineResult<()> {
        info!("Initializing database schema...");

        sqlx::query("CREATE SCHEMA IF NOT EXISTS ledger")
            .execute(&self.pool)
            .await
            .map_err(|e| EngineError::Storage(format!("Failed to create ledger schema: {}", e)))?;

        sqlx::query("CREATE SCHEMA IF NOT EXISTS plates")
            .execute(&self.pool)
            .await
            .map_err(|e| EngineError::Storage(format!("Failed to create plates schema: {}", e)))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ledger.transactions (
                id UUID PRIMARY KEY,
                user_id TEXT NOT NULL,
                amount BIGINT NOT NULL,
                kind TEXT NOT NULL,
                related_entity TEXT,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| EngineError::Storage(format!("Failed to create transactions table: {}", e)))?;

        // Idempotency guard mirrors the in-memory store's dedup key.
        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS ux_transactions_related_kind
            ON ledger.transactions (related_entity, kind)
            WHERE related_entity IS NOT NULL
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| EngineError::Storage(format!("Failed to create idempotency index: {}", e)))?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS ix_transactions_user_created
            ON ledger.transactions (user_id, created_at)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| EngineError::Storage(format!("Failed to create user index: {}", e)))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS plates.flagged (
                plate TEXT PRIMARY KEY,
                report_count BIGINT NOT NULL,
                danger_score BIGINT NOT NULL,
                types JSONB NOT NULL,
                first_seen TIMESTAMPTZ NOT NULL,
                last_seen TIMESTAMPTZ NOT NULL,
                recent_incidents JSONB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| EngineError::Storage(format!("Failed to create flagged plates table: {}", e)))?;

        info!("Database schema ready");
        Ok(())
    }

    pub fn ledger(&self) -> &LedgerRepository {
        &self.ledger
    }

    pub fn plates(&self) -> &PlateRepository {
        &self.plates
    }
}
