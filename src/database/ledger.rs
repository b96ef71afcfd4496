//! Ledger Repository - PostgreSQL operations for credit transactions using sqlx

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::ledger::{CreditTransaction, TransactionKind};

pub struct LedgerRepository {
    pool: PgPool,
}

impl LedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Write-through for an appended entry. The partial unique index on
    /// (related_entity, kind) makes retries no-ops, matching the
    /// in-memory duplicate guard.
    pub async fn insert(&self, tx: &CreditTransaction) -> EngineResult<()> {
        sqlx::query(
            r#"
            INSERT INTO ledger.transactions
            (id, user_id, amount, kind, related_entity, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(tx.id)
        .bind(&tx.user_id)
        .bind(tx.amount)
        .bind(tx.kind.as_str())
        .bind(&tx.related_entity)
        .bind(tx.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| EngineError::Storage(format!("Failed to insert transaction: {}", e)))?;

        debug!(user_id = %tx.user_id, kind = tx.kind.as_str(), "Transaction persisted");
        Ok(())
    }

    pub async fn get_for_user(
        &self,
        user_id: &str,
        limit: i64,
    ) -> EngineResult<Vec<CreditTransaction>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, amount, kind, related_entity, created_at
            FROM ledger.transactions
            WHERE user_id = $1
            ORDER BY created_at ASC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| EngineError::Storage(format!("Failed to get transactions: {}", e)))?;

        let transactions = rows
            .into_iter()
            .filter_map(|row| {
                let kind = parse_kind(row.get::<String, _>("kind").as_str())?;
                Some(CreditTransaction {
                    id: row.get::<Uuid, _>("id"),
                    user_id: row.get("user_id"),
                    amount: row.get("amount"),
                    kind,
                    related_entity: row.get("related_entity"),
                    created_at: row.get::<DateTime<Utc>, _>("created_at"),
                })
            })
            .collect();

        Ok(transactions)
    }
}

fn parse_kind(kind: &str) -> Option<TransactionKind> {
    match kind {
        "report_reward" => Some(TransactionKind::ReportReward),
        "referral_bonus" => Some(TransactionKind::ReferralBonus),
        "tier_monthly_bonus" => Some(TransactionKind::TierMonthlyBonus),
        "marketplace_share" => Some(TransactionKind::MarketplaceShare),
        "withdrawal_debit" => Some(TransactionKind::WithdrawalDebit),
        "withdrawal_reversal" => Some(TransactionKind::WithdrawalReversal),
        _ => None,
    }
}
