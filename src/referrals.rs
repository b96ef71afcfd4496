//! Referral Milestone Engine
//!
//! Tracks referral relationships and qualification progress, pays the
//! per-referral bonus exactly once, and evaluates count-based milestone
//! bonuses. At-most-once payment rests on the ledger's duplicate guard
//! plus a per-user paid-milestones set.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;
use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};
use crate::ledger::{CreditTransaction, LedgerStore, TransactionKind};

/// Milestone thresholds: qualified-referral count to bonus credits.
/// 1,000 credits = $10 at five referrals, 7,500 = $75 at twenty-five.
pub const MILESTONES: &[(u32, i64)] = &[(5, 1_000), (25, 7_500)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferralStatus {
    Pending,
    Qualified,
    Paid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralRecord {
    pub id: String,
    pub referrer_id: String,
    pub referee_id: String,
    pub status: ReferralStatus,
    pub required_incidents: u32,
    /// Monotonic progress; recorded counts never go backwards.
    pub incidents_submitted: u32,
    pub created_at: DateTime<Utc>,
    pub qualified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestoneAward {
    pub threshold: u32,
    pub bonus_credits: i64,
}

#[derive(Default)]
struct ReferralState {
    records: HashMap<String, ReferralRecord>,
    by_referrer: HashMap<String, Vec<String>>,
    /// Milestone thresholds already paid, per referrer.
    paid_milestones: HashMap<String, HashSet<u32>>,
}

#[derive(Clone)]
pub struct ReferralEngine {
    ledger: LedgerStore,
    state: Arc<RwLock<ReferralState>>,
    /// Credits paid to the referrer when a referral qualifies.
    bonus_credits: i64,
}

impl ReferralEngine {
    pub fn new(ledger: LedgerStore, bonus_credits: i64) -> Self {
        Self {
            ledger,
            state: Arc::new(RwLock::new(ReferralState::default())),
            bonus_credits,
        }
    }

    pub async fn create_referral(
        &self,
        referrer_id: &str,
        referee_id: &str,
        required_incidents: u32,
    ) -> ReferralRecord {
        let record = ReferralRecord {
            id: format!("referral_{}", Uuid::new_v4()),
            referrer_id: referrer_id.to_string(),
            referee_id: referee_id.to_string(),
            status: ReferralStatus::Pending,
            required_incidents,
            incidents_submitted: 0,
            created_at: Utc::now(),
            qualified_at: None,
        };

        let mut state = self.state.write().await;
        state
            .by_referrer
            .entry(referrer_id.to_string())
            .or_default()
            .push(record.id.clone());
        state.records.insert(record.id.clone(), record.clone());

        debug!(
            referral_id = %record.id,
            referrer_id = %referrer_id,
            referee_id = %referee_id,
            required = required_incidents,
            "Referral created"
        );

        record
    }

    /// Update a referral's progress from the referee's incident count.
    /// The pending -> qualified transition fires exactly once at the
    /// threshold and pays one `ReferralBonus` to the referrer, keyed on
    /// the referral id so a duplicate progress report cannot pay twice.
    pub async fn record_referee_activity(
        &self,
        referral_id: &str,
        incident_count: u32,
    ) -> EngineResult<ReferralRecord> {
        let mut state = self.state.write().await;
        let record = state
            .records
            .get_mut(referral_id)
            .ok_or_else(|| EngineError::NotFound(format!("referral {}", referral_id)))?;

        record.incidents_submitted = record.incidents_submitted.max(incident_count);

        if record.status != ReferralStatus::Pending
            || record.incidents_submitted < record.required_incidents
        {
            return Ok(record.clone());
        }

        record.status = ReferralStatus::Qualified;
        record.qualified_at = Some(Utc::now());

        let bonus = CreditTransaction::new(
            record.referrer_id.clone(),
            self.bonus_credits,
            TransactionKind::ReferralBonus,
            Some(record.id.clone()),
        );
        match self.ledger.append(bonus).await {
            Ok(_) => {
                record.status = ReferralStatus::Paid;
                info!(
                    referral_id = %record.id,
                    referrer_id = %record.referrer_id,
                    bonus = self.bonus_credits,
                    "Referral qualified, bonus paid"
                );
            }
            // Already paid on a previous qualification pass.
            Err(EngineError::DuplicateEntry { .. }) => {
                record.status = ReferralStatus::Paid;
            }
            Err(e) => return Err(e),
        }

        Ok(record.clone())
    }

    /// Pay each milestone threshold the first time the referrer's
    /// qualified-referral count crosses it.
    pub async fn evaluate_milestones(&self, referrer_id: &str) -> EngineResult<Vec<MilestoneAward>> {
        let mut state = self.state.write().await;

        let qualified = state
            .by_referrer
            .get(referrer_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.records.get(id))
                    .filter(|r| {
                        matches!(r.status, ReferralStatus::Qualified | ReferralStatus::Paid)
                    })
                    .count() as u32
            })
            .unwrap_or(0);

        let mut awarded = Vec::new();
        for &(threshold, bonus_credits) in MILESTONES {
            if qualified < threshold {
                continue;
            }
            let paid = state
                .paid_milestones
                .entry(referrer_id.to_string())
                .or_default();
            if paid.contains(&threshold) {
                continue;
            }

            let tx = CreditTransaction::new(
                referrer_id.to_string(),
                bonus_credits,
                TransactionKind::ReferralBonus,
                Some(format!("{}:milestone:{}", referrer_id, threshold)),
            );
            match self.ledger.append(tx).await {
                Ok(_) => {
                    paid.insert(threshold);
                    info!(
                        referrer_id = %referrer_id,
                        threshold = threshold,
                        bonus = bonus_credits,
                        "Referral milestone paid"
                    );
                    awarded.push(MilestoneAward {
                        threshold,
                        bonus_credits,
                    });
                }
                // Recovered paid-set after a restart; the ledger is truth.
                Err(EngineError::DuplicateEntry { .. }) => {
                    paid.insert(threshold);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(awarded)
    }

    pub async fn get(&self, referral_id: &str) -> Option<ReferralRecord> {
        let state = self.state.read().await;
        state.records.get(referral_id).cloned()
    }

    pub async fn referrals_for(&self, referrer_id: &str) -> Vec<ReferralRecord> {
        let state = self.state.read().await;
        state
            .by_referrer
            .get(referrer_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.records.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> ReferralEngine {
        ReferralEngine::new(LedgerStore::new(), 500)
    }

    #[tokio::test]
    async fn test_qualification_pays_exactly_once() {
        let engine = engine();
        let referral = engine.create_referral("alice", "bob", 5).await;

        engine
            .record_referee_activity(&referral.id, 3)
            .await
            .unwrap();
        let mid = engine.get(&referral.id).await.unwrap();
        assert_eq!(mid.status, ReferralStatus::Pending);

        engine
            .record_referee_activity(&referral.id, 5)
            .await
            .unwrap();
        // Same count reported again; must not pay a second bonus.
        engine
            .record_referee_activity(&referral.id, 5)
            .await
            .unwrap();

        let done = engine.get(&referral.id).await.unwrap();
        assert_eq!(done.status, ReferralStatus::Paid);

        let bonuses = engine
            .ledger
            .query("alice", Some(TransactionKind::ReferralBonus), None, None)
            .await;
        assert_eq!(bonuses.len(), 1);
        assert_eq!(bonuses[0].amount, 500);
    }

    #[tokio::test]
    async fn test_progress_is_monotonic() {
        let engine = engine();
        let referral = engine.create_referral("alice", "bob", 10).await;

        engine.record_referee_activity(&referral.id, 4).await.unwrap();
        let record = engine.record_referee_activity(&referral.id, 2).await.unwrap();
        assert_eq!(record.incidents_submitted, 4);
    }

    #[tokio::test]
    async fn test_milestone_paid_once_at_threshold() {
        let engine = engine();
        for i in 0..5 {
            let r = engine
                .create_referral("alice", &format!("referee_{}", i), 1)
                .await;
            engine.record_referee_activity(&r.id, 1).await.unwrap();
        }

        let first = engine.evaluate_milestones("alice").await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].threshold, 5);
        assert_eq!(first[0].bonus_credits, 1_000);

        let second = engine.evaluate_milestones("alice").await.unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn test_no_milestone_below_threshold() {
        let engine = engine();
        let r = engine.create_referral("alice", "bob", 1).await;
        engine.record_referee_activity(&r.id, 1).await.unwrap();

        let awarded = engine.evaluate_milestones("alice").await.unwrap();
        assert!(awarded.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_referral_is_not_found() {
        let engine = engine();
        let err = engine
            .record_referee_activity("referral_missing", 1)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }
}
