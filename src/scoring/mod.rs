//! Scoring Subsystem
//!
//! Tier classification, daily streaks, and the engine orchestrator that
//! ties the ledger and aggregators together.

pub mod engine;
pub mod streaks;
pub mod tiers;

pub use engine::{IncidentReportEvent, ReportOutcome, ScoringEngine};
pub use streaks::{StreakRecord, StreakTracker};
pub use tiers::{Tier, TierAssignment, TierRequirement, TierTable};
