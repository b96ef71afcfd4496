//! Scoring Engine - Main Orchestrator
//!
//! Coordinates the ledger, tier classification, streaks, referrals, plate
//! aggregation and payout authorization. Mutations are serialized per user
//! (per plate inside the registry) so idempotency guards and balance
//! invariants hold under concurrent report submissions; reads fold over a
//! snapshot and never block writers.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::RewardConfig;
use crate::database::DatabasePool;
use crate::error::{EngineError, EngineResult};
use crate::leaderboard::{LeaderboardAggregator, LeaderboardEntry, Period};
use crate::ledger::{balance, Balance, CreditTransaction, LedgerStore, TransactionKind};
use crate::payouts::{PayoutAuthorizer, PayoutMethod, PayoutRequest};
use crate::plates::{FlaggedPlateAggregate, IncidentType, PlateRegistry, Severity};
use crate::referrals::{MilestoneAward, ReferralEngine, ReferralRecord};
use crate::scoring::streaks::{StreakRecord, StreakTracker};
use crate::scoring::tiers::{TierAssignment, TierTable};

/// A report event from the reporting collaborator, validated at the
/// boundary before it touches the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentReportEvent {
    pub report_id: String,
    pub user_id: String,
    pub plate: Option<String>,
    pub incident_type: IncidentType,
    pub severity: Severity,
    pub occurred_at: DateTime<Utc>,
    pub location: Option<String>,
}

/// Everything one accepted report changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportOutcome {
    pub transaction: CreditTransaction,
    pub tier: TierAssignment,
    pub streak: StreakRecord,
    pub plate: Option<FlaggedPlateAggregate>,
}

/// Main scoring engine
#[derive(Clone)]
pub struct ScoringEngine {
    ledger: LedgerStore,
    tiers: TierTable,
    streaks: StreakTracker,
    referrals: ReferralEngine,
    plates: PlateRegistry,
    payouts: PayoutAuthorizer,
    leaderboard: LeaderboardAggregator,
    db: Option<Arc<DatabasePool>>,
    rewards: RewardConfig,

    /// Accepted reports by id, for deletion compensation.
    reports: Arc<RwLock<HashMap<String, IncidentReportEvent>>>,
    /// Per-user mutation locks; concurrent users proceed independently.
    user_locks: Arc<RwLock<HashMap<String, Arc<Mutex<()>>>>>,
}

impl ScoringEngine {
    pub fn new(rewards: RewardConfig) -> Self {
        let ledger = LedgerStore::new();
        let tiers = TierTable::default();

        Self {
            referrals: ReferralEngine::new(ledger.clone(), rewards.referral_bonus_credits),
            payouts: PayoutAuthorizer::new(ledger.clone()),
            leaderboard: LeaderboardAggregator::new(ledger.clone(), tiers.clone()),
            streaks: StreakTracker::new(),
            plates: PlateRegistry::new(),
            db: None,
            rewards,
            reports: Arc::new(RwLock::new(HashMap::new())),
            user_locks: Arc::new(RwLock::new(HashMap::new())),
            ledger,
            tiers,
        }
    }

    pub fn with_database(mut self, db: Arc<DatabasePool>) -> Self {
        self.db = Some(db);
        self
    }

    /// Replace the tier table, e.g. with configured payout minimums. The
    /// leaderboard holds its own copy and is rebuilt to match.
    pub fn with_tier_table(mut self, tiers: TierTable) -> Self {
        self.leaderboard = LeaderboardAggregator::new(self.ledger.clone(), tiers.clone());
        self.tiers = tiers;
        self
    }

    pub fn ledger(&self) -> &LedgerStore {
        &self.ledger
    }

    pub fn streaks(&self) -> &StreakTracker {
        &self.streaks
    }

    async fn user_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.user_locks.write().await;
        locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Accept one incident/violation report: credit the reward at the
    /// user's current tier multiplier, advance the streak, and fold the
    /// plate aggregate. Retried submissions fail with `DuplicateEntry`
    /// before any state changes.
    pub async fn record_incident_report(
        &self,
        event: IncidentReportEvent,
    ) -> EngineResult<ReportOutcome> {
        let lock = self.user_lock(&event.user_id).await;
        let _guard = lock.lock().await;

        let tier = self.classify(&event.user_id, Utc::now()).await;
        let reward = (self.rewards.base_report_reward as f64 * tier.multiplier).round() as i64;

        let transaction = self
            .ledger
            .append(CreditTransaction::new(
                event.user_id.clone(),
                reward,
                TransactionKind::ReportReward,
                Some(event.report_id.clone()),
            ))
            .await?;
        self.persist_transaction(&transaction).await;

        // Streak ordering violations are an operator concern, not a reason
        // to refuse the report; the tracker has already logged them.
        let streak = match self
            .streaks
            .record_report(&event.user_id, event.occurred_at)
            .await
        {
            Ok(streak) => streak,
            Err(EngineError::StaleStreakUpdate { .. }) => {
                self.streaks.get(&event.user_id).await
            }
            Err(e) => return Err(e),
        };

        let plate = match event.plate.as_deref() {
            Some(plate) => {
                let aggregate = self
                    .plates
                    .record_report(
                        plate,
                        &event.report_id,
                        event.incident_type,
                        event.severity,
                        event.occurred_at,
                        event.location.clone(),
                    )
                    .await;
                self.persist_plate(&aggregate).await;
                Some(aggregate)
            }
            None => None,
        };

        let mut reports = self.reports.write().await;
        reports.insert(event.report_id.clone(), event.clone());

        info!(
            user_id = %event.user_id,
            report_id = %event.report_id,
            reward = reward,
            tier = tier.tier.as_str(),
            "Incident report recorded"
        );

        Ok(ReportOutcome {
            transaction,
            tier,
            streak,
            plate,
        })
    }

    /// Deletion compensation: subtract exactly what the report added to
    /// the plate's danger score. The credited reward stays in the ledger;
    /// credits are corrected with offsetting entries, never removed.
    pub async fn record_report_deleted(
        &self,
        report_id: &str,
    ) -> EngineResult<Option<FlaggedPlateAggregate>> {
        let event = {
            let mut reports = self.reports.write().await;
            reports
                .remove(report_id)
                .ok_or_else(|| EngineError::NotFound(format!("report {}", report_id)))?
        };

        let Some(plate) = event.plate.as_deref() else {
            return Ok(None);
        };

        let aggregate = self
            .plates
            .record_report_removed(plate, report_id, event.severity)
            .await;
        if let Some(ref aggregate) = aggregate {
            self.persist_plate(aggregate).await;
        }
        Ok(aggregate)
    }

    /// Marketplace contribution share, idempotent per contribution id.
    pub async fn record_marketplace_contribution(
        &self,
        user_id: &str,
        contribution_id: &str,
        amount: i64,
    ) -> EngineResult<CreditTransaction> {
        if amount <= 0 {
            return Err(EngineError::InvariantViolation(format!(
                "marketplace share must be positive, got {}",
                amount
            )));
        }

        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        let transaction = self
            .ledger
            .append(CreditTransaction::new(
                user_id,
                amount,
                TransactionKind::MarketplaceShare,
                Some(contribution_id.to_string()),
            ))
            .await?;
        self.persist_transaction(&transaction).await;
        Ok(transaction)
    }

    /// One tier bonus per user per calendar month, idempotent via the
    /// ledger guard. Bronze carries no bonus and emits nothing.
    pub async fn grant_monthly_bonus(
        &self,
        user_id: &str,
    ) -> EngineResult<Option<CreditTransaction>> {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        let now = Utc::now();
        let tier = self.classify(user_id, now).await;
        let bonus = self.tiers.requirement(tier.tier).monthly_bonus_credits;
        if bonus == 0 {
            return Ok(None);
        }

        let period_key = format!("{}:{}", user_id, now.format("%Y-%m"));
        let transaction = self
            .ledger
            .append(CreditTransaction::new(
                user_id,
                bonus,
                TransactionKind::TierMonthlyBonus,
                Some(period_key),
            ))
            .await?;
        self.persist_transaction(&transaction).await;

        info!(
            user_id = %user_id,
            tier = tier.tier.as_str(),
            bonus = bonus,
            "Monthly tier bonus granted"
        );
        Ok(Some(transaction))
    }

    // Read surface

    pub async fn get_balance(&self, user_id: &str) -> Balance {
        let transactions = self.ledger.query(user_id, None, None, None).await;
        let settled = self.payouts.settled_payouts().await;
        balance::project(&transactions, &settled)
    }

    /// Trailing-30-day activity ending at `as_of` against the tier table.
    /// Pure in the ledger state; identical inputs classify identically.
    pub async fn classify(&self, user_id: &str, as_of: DateTime<Utc>) -> TierAssignment {
        let window = self
            .ledger
            .query(user_id, None, Some(as_of - Duration::days(30)), Some(as_of))
            .await;

        let window_credits: i64 = window.iter().filter(|tx| tx.is_earning()).map(|tx| tx.amount).sum();
        let window_reports = window
            .iter()
            .filter(|tx| tx.kind == TransactionKind::ReportReward)
            .count() as u32;

        let row = self.tiers.classify(window_credits, window_reports);
        debug!(
            user_id = %user_id,
            credits = window_credits,
            reports = window_reports,
            tier = row.tier.as_str(),
            "Tier classified"
        );

        TierAssignment {
            tier: row.tier,
            multiplier: row.multiplier,
            window_credits,
            window_reports,
        }
    }

    pub async fn get_tier(&self, user_id: &str) -> TierAssignment {
        self.classify(user_id, Utc::now()).await
    }

    pub async fn get_streak(&self, user_id: &str) -> StreakRecord {
        self.streaks.get(user_id).await
    }

    pub async fn leaderboard(&self, period: Period, limit: usize) -> Vec<LeaderboardEntry> {
        self.leaderboard.rank(period, limit).await
    }

    pub async fn rank_for(&self, user_id: &str, period: Period) -> Option<LeaderboardEntry> {
        self.leaderboard.rank_for(user_id, period).await
    }

    pub async fn flagged_plates(
        &self,
        filter_type: Option<IncidentType>,
    ) -> Vec<FlaggedPlateAggregate> {
        self.plates.flagged(filter_type).await
    }

    pub async fn search_plates(&self, query: &str) -> Vec<FlaggedPlateAggregate> {
        self.plates.search(query).await
    }

    // Referrals

    pub async fn create_referral(
        &self,
        referrer_id: &str,
        referee_id: &str,
        required_incidents: Option<u32>,
    ) -> ReferralRecord {
        let required =
            required_incidents.unwrap_or(self.rewards.referral_required_incidents);
        self.referrals
            .create_referral(referrer_id, referee_id, required)
            .await
    }

    pub async fn record_referee_activity(
        &self,
        referral_id: &str,
        incident_count: u32,
    ) -> EngineResult<ReferralRecord> {
        let record = self
            .referrals
            .record_referee_activity(referral_id, incident_count)
            .await?;
        self.referrals.evaluate_milestones(&record.referrer_id).await?;
        Ok(record)
    }

    pub async fn evaluate_milestones(
        &self,
        referrer_id: &str,
    ) -> EngineResult<Vec<MilestoneAward>> {
        self.referrals.evaluate_milestones(referrer_id).await
    }

    pub async fn referrals_for(&self, referrer_id: &str) -> Vec<ReferralRecord> {
        self.referrals.referrals_for(referrer_id).await
    }

    // Payouts

    pub async fn authorize_payout(
        &self,
        user_id: &str,
        amount: i64,
        method: PayoutMethod,
    ) -> EngineResult<PayoutRequest> {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        let tier = self.classify(user_id, Utc::now()).await;
        let requirement = self.tiers.requirement(tier.tier);
        let request = self
            .payouts
            .authorize(user_id, amount, method, requirement)
            .await?;
        if let Some(debit) = self
            .ledger
            .query(user_id, Some(TransactionKind::WithdrawalDebit), None, None)
            .await
            .into_iter()
            .find(|tx| tx.related_entity.as_deref() == Some(request.id.as_str()))
        {
            self.persist_transaction(&debit).await;
        }
        Ok(request)
    }

    pub async fn reverse_payout(&self, payout_id: &str) -> EngineResult<PayoutRequest> {
        let request = self.payouts.reverse(payout_id).await?;
        if let Some(reversal) = self
            .ledger
            .query(
                &request.user_id,
                Some(TransactionKind::WithdrawalReversal),
                None,
                None,
            )
            .await
            .into_iter()
            .find(|tx| tx.related_entity.as_deref() == Some(payout_id))
        {
            self.persist_transaction(&reversal).await;
        }
        Ok(request)
    }

    pub async fn settle_payout(&self, payout_id: &str) -> EngineResult<PayoutRequest> {
        self.payouts.settle(payout_id).await
    }

    pub async fn get_payout(&self, payout_id: &str) -> Option<PayoutRequest> {
        self.payouts.get(payout_id).await
    }

    // Write-through persistence; in-memory state stays authoritative.

    async fn persist_transaction(&self, tx: &CreditTransaction) {
        if let Some(ref db) = self.db {
            if let Err(e) = db.ledger().insert(tx).await {
                warn!(user_id = %tx.user_id, error = %e, "Transaction write-through failed");
            }
        }
    }

    async fn persist_plate(&self, aggregate: &FlaggedPlateAggregate) {
        if let Some(ref db) = self.db {
            if let Err(e) = db.plates().upsert(aggregate).await {
                warn!(plate = %aggregate.plate, error = %e, "Plate write-through failed");
            }
        }
    }
}
