//! RoadWatch Scoring & Ledger Engine
//!
//! Turns the reporting platform's event stream (incident reports,
//! referrals, marketplace contributions, withdrawals) into consistent
//! derived state: balances, tiers, streaks, leaderboards, flagged-plate
//! danger scores, and referral milestones.
//!
//! ## Module Structure
//!
//! ```text
//! src/
//! ├── lib.rs         - Crate root with re-exports
//! ├── main.rs        - Server entrypoint
//! ├── config.rs      - Configuration management
//! ├── error.rs       - Typed engine error taxonomy
//! ├── ledger/        - Append-only credit ledger
//! │   ├── transaction.rs - Transaction types & idempotency keys
//! │   ├── store.rs       - Append-only store with duplicate guard
//! │   └── balance.rs     - Balance projection folds
//! ├── scoring/       - Tier, streak & orchestration
//! │   ├── tiers.rs    - Tier table & classifier
//! │   ├── streaks.rs  - Daily streak tracking
//! │   └── engine.rs   - Scoring engine orchestrator
//! ├── referrals.rs   - Referral qualification & milestone bonuses
//! ├── leaderboard.rs - Windowed ranked views
//! ├── plates/        - Danger score aggregation
//! │   ├── aggregate.rs - Per-plate risk aggregates
//! │   └── registry.rs  - Ranked flagged-plate registry
//! ├── payouts.rs     - Withdrawal authorization & reversal
//! ├── api/           - HTTP API endpoints
//! └── database/      - PostgreSQL write-through persistence
//! ```

pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod leaderboard;
pub mod ledger;
pub mod payouts;
pub mod plates;
pub mod referrals;
pub mod scoring;

// Re-export main types for convenience
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use ledger::{Balance, CreditTransaction, LedgerStore, TransactionKind};
pub use scoring::{
    IncidentReportEvent, ReportOutcome, ScoringEngine, StreakRecord, StreakTracker, Tier,
    TierAssignment, TierTable,
};

// Re-export aggregator types
pub use leaderboard::{LeaderboardAggregator, LeaderboardEntry, Period};
pub use plates::{
    FlaggedPlateAggregate, IncidentType, PlateRegistry, RecentIncident, Severity,
};

// Re-export referral and payout types
pub use payouts::{PayoutAuthorizer, PayoutMethod, PayoutRequest, PayoutStatus};
pub use referrals::{MilestoneAward, ReferralEngine, ReferralRecord, ReferralStatus};

// Re-export persistence types
pub use database::DatabasePool;
