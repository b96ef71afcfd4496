//! Danger Score Aggregation
//!
//! Folds incident and violation reports keyed by license plate into a
//! cumulative risk score and a ranked registry of flagged vehicles.

pub mod aggregate;
pub mod registry;

pub use aggregate::{
    normalize_plate, report_delta, FlaggedPlateAggregate, IncidentType, RecentIncident, Severity,
    RECENT_INCIDENT_CAP,
};
pub use registry::PlateRegistry;
