//! Reputation Tiers
//!
//! Tiers are computed from trailing-30-day activity against a fixed
//! requirement table and are never stored as authoritative: same inputs,
//! same tier, always. The multiplier is applied by callers when crediting
//! report rewards; the classifier never touches the ledger.

use serde::{Deserialize, Serialize};

use crate::config::PayoutConfig;

/// Reputation tier, ordered by threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Bronze => "bronze",
            Tier::Silver => "silver",
            Tier::Gold => "gold",
            Tier::Platinum => "platinum",
            Tier::Diamond => "diamond",
        }
    }
}

/// One row of the requirement table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TierRequirement {
    pub tier: Tier,
    /// Credits earned in the trailing 30 days.
    pub min_monthly_credits: i64,
    /// Reports submitted in the trailing 30 days.
    pub min_monthly_reports: u32,
    /// Applied to report rewards while the tier holds.
    pub multiplier: f64,
    /// Smallest payout this tier may request, in credits.
    pub min_payout_credits: i64,
    /// Credits granted once per calendar month at this tier.
    pub monthly_bonus_credits: i64,
}

/// The fixed tier table, highest threshold first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierTable {
    rows: Vec<TierRequirement>,
}

impl Default for TierTable {
    fn default() -> Self {
        Self {
            rows: vec![
                TierRequirement {
                    tier: Tier::Diamond,
                    min_monthly_credits: 10_000,
                    min_monthly_reports: 1,
                    multiplier: 2.0,
                    min_payout_credits: 100,
                    monthly_bonus_credits: 2_000,
                },
                TierRequirement {
                    tier: Tier::Platinum,
                    min_monthly_credits: 5_000,
                    min_monthly_reports: 1,
                    multiplier: 1.5,
                    min_payout_credits: 250,
                    monthly_bonus_credits: 1_000,
                },
                TierRequirement {
                    tier: Tier::Gold,
                    min_monthly_credits: 2_000,
                    min_monthly_reports: 1,
                    multiplier: 1.25,
                    min_payout_credits: 500,
                    monthly_bonus_credits: 400,
                },
                TierRequirement {
                    tier: Tier::Silver,
                    min_monthly_credits: 500,
                    min_monthly_reports: 1,
                    multiplier: 1.1,
                    min_payout_credits: 750,
                    monthly_bonus_credits: 100,
                },
                TierRequirement {
                    tier: Tier::Bronze,
                    min_monthly_credits: 0,
                    min_monthly_reports: 0,
                    multiplier: 1.0,
                    min_payout_credits: 1_000,
                    monthly_bonus_credits: 0,
                },
            ],
        }
    }
}

impl TierTable {
    /// Standard thresholds with the configured payout minimums applied.
    pub fn with_payout_minimums(payouts: &PayoutConfig) -> Self {
        let mut table = Self::default();
        for row in &mut table.rows {
            row.min_payout_credits = match row.tier {
                Tier::Bronze => payouts.min_payout_bronze,
                Tier::Silver => payouts.min_payout_silver,
                Tier::Gold => payouts.min_payout_gold,
                Tier::Platinum => payouts.min_payout_platinum,
                Tier::Diamond => payouts.min_payout_diamond,
            };
        }
        table
    }

    /// First row (scanning highest to lowest) whose credit and report
    /// requirements are both satisfied. The bronze floor always matches.
    pub fn classify(&self, window_credits: i64, window_reports: u32) -> &TierRequirement {
        self.rows
            .iter()
            .find(|r| {
                window_credits >= r.min_monthly_credits
                    && window_reports >= r.min_monthly_reports
            })
            .unwrap_or(
                self.rows
                    .last()
                    .expect("tier table always has a bronze floor"),
            )
    }

    pub fn requirement(&self, tier: Tier) -> &TierRequirement {
        self.rows
            .iter()
            .find(|r| r.tier == tier)
            .expect("all tiers present in table")
    }
}

/// Derived tier assignment for a user at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierAssignment {
    pub tier: Tier,
    pub multiplier: f64,
    pub window_credits: i64,
    pub window_reports: u32,
}
