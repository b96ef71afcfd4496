//! Flagged Plate Registry
//!
//! Owns every `FlaggedPlateAggregate` and applies report deltas
//! incrementally; the hot path never rebuilds an aggregate from scratch.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::plates::aggregate::{
    normalize_plate, report_delta, FlaggedPlateAggregate, IncidentType, RecentIncident, Severity,
};

#[derive(Clone, Default)]
pub struct PlateRegistry {
    plates: Arc<RwLock<HashMap<String, FlaggedPlateAggregate>>>,
}

impl PlateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one report into the plate's aggregate, creating it if absent.
    /// Returns the updated aggregate snapshot.
    pub async fn record_report(
        &self,
        plate: &str,
        report_id: &str,
        incident_type: IncidentType,
        severity: Severity,
        occurred_at: DateTime<Utc>,
        location: Option<String>,
    ) -> FlaggedPlateAggregate {
        let key = normalize_plate(plate);
        let mut plates = self.plates.write().await;
        let aggregate = plates
            .entry(key.clone())
            .or_insert_with(|| FlaggedPlateAggregate::new(key.clone(), occurred_at));

        aggregate.apply_report(RecentIncident {
            report_id: report_id.to_string(),
            incident_type,
            severity,
            occurred_at,
            location,
        });

        debug!(
            plate = %key,
            report_id = %report_id,
            danger_score = aggregate.danger_score,
            report_count = aggregate.report_count,
            "Plate report recorded"
        );

        aggregate.clone()
    }

    /// Compensating delta for a deleted report: subtract exactly what the
    /// original report added, floored at zero. The floor case is an
    /// invariant breach worth an operator's attention, never silent.
    pub async fn record_report_removed(
        &self,
        plate: &str,
        report_id: &str,
        severity: Severity,
    ) -> Option<FlaggedPlateAggregate> {
        let key = normalize_plate(plate);
        let mut plates = self.plates.write().await;
        let aggregate = plates.get_mut(&key)?;

        let expected = -report_delta(severity);
        let applied = aggregate.revert_report(report_id, severity);
        if applied != expected {
            warn!(
                plate = %key,
                report_id = %report_id,
                expected_delta = expected,
                applied_delta = applied,
                "Danger score floored at zero during compensation"
            );
        }

        info!(
            plate = %key,
            report_id = %report_id,
            delta = applied,
            danger_score = aggregate.danger_score,
            "Plate report compensated"
        );

        Some(aggregate.clone())
    }

    pub async fn get(&self, plate: &str) -> Option<FlaggedPlateAggregate> {
        let plates = self.plates.read().await;
        plates.get(&normalize_plate(plate)).cloned()
    }

    /// All aggregates sorted descending by danger score; ties broken by
    /// report count, then earliest first sighting.
    pub async fn rank(&self) -> Vec<FlaggedPlateAggregate> {
        let plates = self.plates.read().await;
        let mut ranked: Vec<FlaggedPlateAggregate> = plates.values().cloned().collect();
        ranked.sort_by(|a, b| {
            b.danger_score
                .cmp(&a.danger_score)
                .then(b.report_count.cmp(&a.report_count))
                .then(a.first_seen.cmp(&b.first_seen))
        });
        ranked
    }

    /// Ranked aggregates restricted to plates with at least one report of
    /// the given type.
    pub async fn flagged(&self, filter_type: Option<IncidentType>) -> Vec<FlaggedPlateAggregate> {
        let ranked = self.rank().await;
        match filter_type {
            Some(t) => ranked.into_iter().filter(|a| a.types.contains(&t)).collect(),
            None => ranked,
        }
    }

    /// Substring match over normalized plates, ranked.
    pub async fn search(&self, query: &str) -> Vec<FlaggedPlateAggregate> {
        let needle = normalize_plate(query);
        if needle.is_empty() {
            return Vec::new();
        }
        self.rank()
            .await
            .into_iter()
            .filter(|a| a.plate.contains(&needle))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seed(registry: &PlateRegistry, plate: &str, reports: &[(&str, Severity)]) {
        for (id, severity) in reports {
            registry
                .record_report(
                    plate,
                    id,
                    IncidentType::RecklessDriving,
                    *severity,
                    Utc::now(),
                    None,
                )
                .await;
        }
    }

    #[tokio::test]
    async fn test_rank_orders_by_score() {
        let registry = PlateRegistry::new();
        seed(&registry, "AA-111", &[("r1", Severity::Low)]).await;
        seed(
            &registry,
            "BB-222",
            &[("r2", Severity::Critical), ("r3", Severity::High)],
        )
        .await;

        let ranked = registry.rank().await;
        assert_eq!(ranked[0].plate, "BB222");
        assert_eq!(ranked[1].plate, "AA111");
    }

    #[tokio::test]
    async fn test_normalized_lookup_and_search() {
        let registry = PlateRegistry::new();
        seed(&registry, "ab 12-3cd", &[("r1", Severity::Medium)]).await;

        assert!(registry.get("AB123CD").await.is_some());
        assert_eq!(registry.search("12-3").await.len(), 1);
        assert!(registry.search("zz").await.is_empty());
    }

    #[tokio::test]
    async fn test_type_filter() {
        let registry = PlateRegistry::new();
        registry
            .record_report(
                "CC-333",
                "r1",
                IncidentType::DrunkDriving,
                Severity::High,
                Utc::now(),
                None,
            )
            .await;
        seed(&registry, "DD-444", &[("r2", Severity::High)]).await;

        let drunk = registry.flagged(Some(IncidentType::DrunkDriving)).await;
        assert_eq!(drunk.len(), 1);
        assert_eq!(drunk[0].plate, "CC333");
    }

    #[tokio::test]
    async fn test_compensation_is_exact_negative_delta() {
        let registry = PlateRegistry::new();
        seed(
            &registry,
            "EE-555",
            &[("r1", Severity::Critical), ("r2", Severity::Medium)],
        )
        .await;

        let before = registry.get("EE555").await.unwrap();
        let after = registry
            .record_report_removed("EE-555", "r1", Severity::Critical)
            .await
            .unwrap();

        assert_eq!(after.danger_score, before.danger_score - 25);
        assert_eq!(after.report_count, before.report_count - 1);
        assert!(after.recent_incidents.iter().all(|i| i.report_id != "r1"));
    }

    #[tokio::test]
    async fn test_two_medium_then_one_critical_total_35() {
        let registry = PlateRegistry::new();
        seed(
            &registry,
            "FF-666",
            &[
                ("r1", Severity::Medium),
                ("r2", Severity::Medium),
                ("r3", Severity::Critical),
            ],
        )
        .await;

        let aggregate = registry.get("FF666").await.unwrap();
        assert_eq!(aggregate.danger_score, 35);
        assert_eq!(aggregate.report_count, 3);
    }
}
