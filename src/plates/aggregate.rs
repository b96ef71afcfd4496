//! Flagged Plate Aggregates
//!
//! Per-plate risk state built incrementally as reports arrive. The score
//! only increases; removing a report applies the exact compensating
//! negative delta, never a full recompute.

use std::collections::{BTreeSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Most recent incidents retained per plate.
pub const RECENT_INCIDENT_CAP: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentType {
    Collision,
    HitAndRun,
    RecklessDriving,
    DrunkDriving,
    RoadRage,
    RedLightViolation,
    SpeedViolation,
    IllegalParking,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Per-report contribution to the plate's danger score.
    pub fn score(&self) -> i64 {
        match self {
            Severity::Low => 0,
            Severity::Medium => 5,
            Severity::High => 15,
            Severity::Critical => 25,
        }
    }
}

/// Score contribution of a single report. Severity alone carries the
/// weight; a low-severity report still counts toward `report_count` and
/// the recent list but adds no score.
pub fn report_delta(severity: Severity) -> i64 {
    severity.score()
}

/// Uppercase, spaces and dashes stripped. All registry keys use this form.
pub fn normalize_plate(plate: &str) -> String {
    plate
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect::<String>()
        .to_uppercase()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentIncident {
    pub report_id: String,
    pub incident_type: IncidentType,
    pub severity: Severity,
    pub occurred_at: DateTime<Utc>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlaggedPlateAggregate {
    /// Normalized plate.
    pub plate: String,
    pub report_count: u64,
    pub danger_score: i64,
    /// Distinct incident/violation types observed for this plate.
    pub types: BTreeSet<IncidentType>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    /// Most recent first, capped at `RECENT_INCIDENT_CAP`.
    pub recent_incidents: VecDeque<RecentIncident>,
}

impl FlaggedPlateAggregate {
    pub fn new(plate: String, seen_at: DateTime<Utc>) -> Self {
        Self {
            plate,
            report_count: 0,
            danger_score: 0,
            types: BTreeSet::new(),
            first_seen: seen_at,
            last_seen: seen_at,
            recent_incidents: VecDeque::with_capacity(RECENT_INCIDENT_CAP),
        }
    }

    pub fn apply_report(&mut self, incident: RecentIncident) {
        self.report_count += 1;
        self.danger_score += report_delta(incident.severity);
        self.types.insert(incident.incident_type);
        self.first_seen = self.first_seen.min(incident.occurred_at);
        self.last_seen = self.last_seen.max(incident.occurred_at);

        self.recent_incidents.push_front(incident);
        self.recent_incidents.truncate(RECENT_INCIDENT_CAP);
    }

    /// Apply the compensating delta for a removed report. Returns the
    /// delta actually applied after flooring the score at zero; callers
    /// log when the floor was hit.
    pub fn revert_report(&mut self, report_id: &str, severity: Severity) -> i64 {
        let delta = report_delta(severity);
        let applied = delta.min(self.danger_score);
        self.danger_score -= applied;
        self.report_count = self.report_count.saturating_sub(1);
        self.recent_incidents.retain(|i| i.report_id != report_id);
        -applied
    }
}
