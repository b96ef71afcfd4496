//! Ledger Store
//!
//! Append-only, immutable record of credit-affecting events. The store
//! guards idempotency via a derived (related_entity, kind) key and serves
//! ordered, restartable queries. It never computes balances itself; the
//! projections in `balance.rs` and the aggregators fold over it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::ledger::transaction::{idempotency_key, CreditTransaction, TransactionKind};

#[derive(Default)]
struct LedgerInner {
    /// Entries in append order. Never mutated or removed.
    entries: Vec<CreditTransaction>,
    /// Index into `entries` per user.
    by_user: HashMap<String, Vec<usize>>,
    /// Derived (related_entity, kind) keys already appended.
    dedup: HashSet<u128>,
}

/// In-memory append-only ledger. Cheap to clone; all clones share state.
#[derive(Clone, Default)]
pub struct LedgerStore {
    inner: Arc<RwLock<LedgerInner>>,
}

impl LedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fully-formed transaction. Fails with `DuplicateEntry` if an
    /// entry with the same (related_entity, kind) pair already exists, and
    /// appends nothing in that case.
    pub async fn append(&self, tx: CreditTransaction) -> EngineResult<CreditTransaction> {
        let mut inner = self.inner.write().await;

        if let Some(ref related) = tx.related_entity {
            let key = idempotency_key(related, tx.kind);
            if inner.dedup.contains(&key) {
                return Err(EngineError::DuplicateEntry {
                    related_entity: related.clone(),
                    kind: tx.kind.as_str().to_string(),
                });
            }
            inner.dedup.insert(key);
        }

        debug!(
            user_id = %tx.user_id,
            amount = tx.amount,
            kind = tx.kind.as_str(),
            related = ?tx.related_entity,
            "Ledger entry appended"
        );

        let index = inner.entries.len();
        inner
            .by_user
            .entry(tx.user_id.clone())
            .or_default()
            .push(index);
        inner.entries.push(tx.clone());

        Ok(tx)
    }

    /// Transactions for a user, ordered by `created_at` ascending, with
    /// optional kind and time-window filters. Returns an owned snapshot so
    /// callers can restart or re-fold at any time.
    pub async fn query(
        &self,
        user_id: &str,
        kind: Option<TransactionKind>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Vec<CreditTransaction> {
        let inner = self.inner.read().await;

        let mut result: Vec<CreditTransaction> = inner
            .by_user
            .get(user_id)
            .map(|indices| {
                indices
                    .iter()
                    .map(|&i| &inner.entries[i])
                    .filter(|tx| kind.map_or(true, |k| tx.kind == k))
                    .filter(|tx| from.map_or(true, |f| tx.created_at >= f))
                    .filter(|tx| to.map_or(true, |t| tx.created_at <= t))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        result.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        result
    }

    /// All transactions across users within a window, ascending by
    /// `created_at`. Used by the leaderboard aggregator.
    pub async fn query_window(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Vec<CreditTransaction> {
        let inner = self.inner.read().await;

        let mut result: Vec<CreditTransaction> = inner
            .entries
            .iter()
            .filter(|tx| from.map_or(true, |f| tx.created_at >= f))
            .filter(|tx| to.map_or(true, |t| tx.created_at <= t))
            .cloned()
            .collect();

        result.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        result
    }

    /// Whether an entry with this (related_entity, kind) pair exists.
    pub async fn contains(&self, related_entity: &str, kind: TransactionKind) -> bool {
        let inner = self.inner.read().await;
        inner
            .dedup
            .contains(&idempotency_key(related_entity, kind))
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_and_query_ordering() {
        let store = LedgerStore::new();
        let now = Utc::now();

        for (i, offset) in [3i64, 1, 2].iter().enumerate() {
            let tx = CreditTransaction::new(
                "user_1",
                10,
                TransactionKind::ReportReward,
                Some(format!("report_{}", i)),
            )
            .with_created_at(now - chrono::Duration::hours(*offset));
            store.append(tx).await.unwrap();
        }

        let entries = store.query("user_1", None, None, None).await;
        assert_eq!(entries.len(), 3);
        assert!(entries.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    }

    #[tokio::test]
    async fn test_duplicate_entry_rejected_and_nothing_appended() {
        let store = LedgerStore::new();

        let tx = CreditTransaction::new(
            "user_1",
            10,
            TransactionKind::ReportReward,
            Some("report_42".to_string()),
        );
        store.append(tx.clone()).await.unwrap();

        let retry = CreditTransaction::new(
            "user_1",
            10,
            TransactionKind::ReportReward,
            Some("report_42".to_string()),
        );
        let err = store.append(retry).await.unwrap_err();
        assert!(matches!(err, EngineError::DuplicateEntry { .. }));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_same_related_entity_different_kind_allowed() {
        let store = LedgerStore::new();

        store
            .append(CreditTransaction::new(
                "user_1",
                -500,
                TransactionKind::WithdrawalDebit,
                Some("payout_1".to_string()),
            ))
            .await
            .unwrap();

        store
            .append(CreditTransaction::new(
                "user_1",
                500,
                TransactionKind::WithdrawalReversal,
                Some("payout_1".to_string()),
            ))
            .await
            .unwrap();

        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_kind_and_window_filters() {
        let store = LedgerStore::new();
        let now = Utc::now();

        store
            .append(
                CreditTransaction::new(
                    "user_1",
                    10,
                    TransactionKind::ReportReward,
                    Some("report_old".to_string()),
                )
                .with_created_at(now - chrono::Duration::days(40)),
            )
            .await
            .unwrap();
        store
            .append(CreditTransaction::new(
                "user_1",
                250,
                TransactionKind::ReferralBonus,
                Some("ref_1".to_string()),
            ))
            .await
            .unwrap();

        let rewards = store
            .query("user_1", Some(TransactionKind::ReportReward), None, None)
            .await;
        assert_eq!(rewards.len(), 1);

        let recent = store
            .query("user_1", None, Some(now - chrono::Duration::days(30)), None)
            .await;
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].kind, TransactionKind::ReferralBonus);
    }
}
