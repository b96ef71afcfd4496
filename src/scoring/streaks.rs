//! Daily Reporting Streaks
//!
//! Streaks are derived from report dates normalized to a calendar day in
//! the user's configured time zone. Callers apply events in
//! report-submission order; an earlier-dated event is an ordering
//! violation and is rejected without touching state.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreakRecord {
    pub current_daily_streak: u32,
    pub longest_daily_streak: u32,
    pub last_report_date: Option<NaiveDate>,
}

/// Tracks per-user streaks. Mutations for one user are serialized by the
/// engine; the tracker itself only needs the shared map.
#[derive(Clone, Default)]
pub struct StreakTracker {
    records: Arc<RwLock<HashMap<String, StreakRecord>>>,
    /// Per-user reporting time zone; UTC when unset.
    time_zones: Arc<RwLock<HashMap<String, FixedOffset>>>,
}

impl StreakTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_time_zone(&self, user_id: &str, offset: FixedOffset) {
        let mut zones = self.time_zones.write().await;
        zones.insert(user_id.to_string(), offset);
    }

    async fn local_day(&self, user_id: &str, at: DateTime<Utc>) -> NaiveDate {
        let zones = self.time_zones.read().await;
        match zones.get(user_id) {
            Some(offset) => at.with_timezone(offset).date_naive(),
            None => at.date_naive(),
        }
    }

    /// Apply one report to the user's streak. Same-day reports are no-ops;
    /// a next-day report extends the streak; a gap resets it to 1. Reports
    /// dated before the last applied day fail with `StaleStreakUpdate`.
    pub async fn record_report(
        &self,
        user_id: &str,
        occurred_at: DateTime<Utc>,
    ) -> EngineResult<StreakRecord> {
        let day = self.local_day(user_id, occurred_at).await;
        let mut records = self.records.write().await;
        let record = records.entry(user_id.to_string()).or_default();

        match record.last_report_date {
            Some(last) if day < last => {
                warn!(
                    user_id = %user_id,
                    report_date = %day,
                    last_date = %last,
                    "Out-of-order streak update rejected"
                );
                return Err(EngineError::StaleStreakUpdate {
                    user_id: user_id.to_string(),
                    report_date: day,
                    last_date: last,
                });
            }
            Some(last) if day == last => {
                // Additional reports on the same day do not extend the streak.
                return Ok(record.clone());
            }
            Some(last) if day == last + chrono::Duration::days(1) => {
                record.current_daily_streak += 1;
            }
            _ => {
                record.current_daily_streak = 1;
            }
        }

        record.last_report_date = Some(day);
        record.longest_daily_streak = record.longest_daily_streak.max(record.current_daily_streak);

        debug!(
            user_id = %user_id,
            day = %day,
            current = record.current_daily_streak,
            longest = record.longest_daily_streak,
            "Streak updated"
        );

        Ok(record.clone())
    }

    pub async fn get(&self, user_id: &str) -> StreakRecord {
        let records = self.records.read().await;
        records.get(user_id).cloned().unwrap_or_default()
    }
}
