//! Leaderboard Aggregation
//!
//! Ranked, windowed views over earned credits. Materialized from the
//! ledger on demand; recomputable at any time, never partial, and fully
//! deterministic: equal totals order by the earlier first qualifying
//! transaction in the window, then by user id.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::ledger::{LedgerStore, TransactionKind};
use crate::scoring::tiers::{Tier, TierTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Weekly,
    Monthly,
    AllTime,
}

impl Period {
    pub fn window_start(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Period::Weekly => Some(now - Duration::days(7)),
            Period::Monthly => Some(now - Duration::days(30)),
            Period::AllTime => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Weekly => "weekly",
            Period::Monthly => "monthly",
            Period::AllTime => "all_time",
        }
    }
}

impl std::str::FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weekly" => Ok(Period::Weekly),
            "monthly" => Ok(Period::Monthly),
            "all_time" | "alltime" | "all-time" => Ok(Period::AllTime),
            other => Err(format!("unknown leaderboard period: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub rank: u32,
    pub total_credits: i64,
    pub tier: Tier,
}

#[derive(Debug, Default, Clone, Copy)]
struct WindowTotal {
    credits: i64,
    first_earned_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct LeaderboardAggregator {
    ledger: LedgerStore,
    tiers: TierTable,
}

impl LeaderboardAggregator {
    pub fn new(ledger: LedgerStore, tiers: TierTable) -> Self {
        Self { ledger, tiers }
    }

    /// Full deterministic ordering for a period, truncated to `limit`.
    pub async fn rank(&self, period: Period, limit: usize) -> Vec<LeaderboardEntry> {
        let mut ordering = self.full_ordering(period, Utc::now()).await;
        ordering.truncate(limit);
        ordering
    }

    /// A single user's entry, even when outside any display limit.
    /// Computes the full ordering (O(n log n)) and locates the user.
    pub async fn rank_for(&self, user_id: &str, period: Period) -> Option<LeaderboardEntry> {
        self.full_ordering(period, Utc::now())
            .await
            .into_iter()
            .find(|entry| entry.user_id == user_id)
    }

    async fn full_ordering(&self, period: Period, now: DateTime<Utc>) -> Vec<LeaderboardEntry> {
        let from = period.window_start(now);
        let window = self.ledger.query_window(from, Some(now)).await;

        let mut totals: HashMap<String, WindowTotal> = HashMap::new();
        for tx in &window {
            if !tx.is_earning() {
                continue;
            }
            let entry = totals.entry(tx.user_id.clone()).or_default();
            entry.credits += tx.amount;
            if entry.first_earned_at.is_none() {
                // Window queries are ascending, so the first hit is earliest.
                entry.first_earned_at = Some(tx.created_at);
            }
        }

        // Tier context from the trailing 30 days regardless of period.
        let tier_window = self
            .ledger
            .query_window(Some(now - Duration::days(30)), Some(now))
            .await;
        let mut tier_stats: HashMap<String, (i64, u32)> = HashMap::new();
        for tx in &tier_window {
            let entry = tier_stats.entry(tx.user_id.clone()).or_default();
            if tx.is_earning() {
                entry.0 += tx.amount;
            }
            if tx.kind == TransactionKind::ReportReward {
                entry.1 += 1;
            }
        }

        let mut users: Vec<(String, WindowTotal)> = totals.into_iter().collect();
        users.sort_by(|(a_id, a), (b_id, b)| {
            b.credits
                .cmp(&a.credits)
                .then(a.first_earned_at.cmp(&b.first_earned_at))
                .then(a_id.cmp(b_id))
        });

        users
            .into_iter()
            .enumerate()
            .map(|(i, (user_id, total))| {
                let (credits, reports) = tier_stats.get(&user_id).copied().unwrap_or_default();
                LeaderboardEntry {
                    tier: self.tiers.classify(credits, reports).tier,
                    user_id,
                    rank: (i + 1) as u32,
                    total_credits: total.credits,
                }
            })
            .collect()
    }
}
