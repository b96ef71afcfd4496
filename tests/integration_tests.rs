//! Integration tests for the scoring & ledger engine
//!
//! These tests verify end-to-end behavior across the ledger, balance
//! projection, tier classification, streaks, referrals, leaderboards,
//! danger scores and payout authorization.

use chrono::{Duration, TimeZone, Utc};
use roadwatch_engine::config::RewardConfig;
use roadwatch_engine::ledger::{balance, replay_holds};
use roadwatch_engine::{
    CreditTransaction, EngineError, IncidentReportEvent, IncidentType, PayoutMethod, Period,
    ScoringEngine, Severity, Tier, TransactionKind,
};
use std::collections::HashSet;

// ============================================================================
// Test Helpers
// ============================================================================

fn create_test_engine() -> ScoringEngine {
    ScoringEngine::new(RewardConfig {
        base_report_reward: 10,
        referral_bonus_credits: 500,
        referral_required_incidents: 5,
    })
}

fn create_test_report(
    report_id: &str,
    user_id: &str,
    plate: Option<&str>,
    severity: Severity,
) -> IncidentReportEvent {
    IncidentReportEvent {
        report_id: report_id.to_string(),
        user_id: user_id.to_string(),
        plate: plate.map(|p| p.to_string()),
        incident_type: IncidentType::RecklessDriving,
        severity,
        occurred_at: Utc::now(),
        location: Some("Elm & 3rd".to_string()),
    }
}

/// Seed earnings directly on the ledger, backdated as needed.
async fn seed_credits(engine: &ScoringEngine, user: &str, amount: i64, days_ago: i64, key: &str) {
    engine
        .ledger()
        .append(
            CreditTransaction::new(
                user,
                amount,
                TransactionKind::MarketplaceShare,
                Some(key.to_string()),
            )
            .with_created_at(Utc::now() - Duration::days(days_ago)),
        )
        .await
        .unwrap();
}

// ============================================================================
// Ledger & Balance
// ============================================================================

#[tokio::test]
async fn first_report_credits_base_reward_at_bronze() {
    let engine = create_test_engine();

    let outcome = engine
        .record_incident_report(create_test_report(
            "report_1",
            "newcomer",
            Some("XY-987"),
            Severity::Critical,
        ))
        .await
        .unwrap();

    // Bronze multiplier is 1.0, so a critical report still earns base.
    assert_eq!(outcome.tier.tier, Tier::Bronze);
    assert_eq!(outcome.transaction.amount, 10);

    let balance = engine.get_balance("newcomer").await;
    assert_eq!(balance.lifetime, 10);
    assert_eq!(balance.available, 10);
    assert_eq!(balance.pending, 0);
    assert_eq!(balance.redeemed, 0);
}

#[tokio::test]
async fn retried_report_submission_credits_once() {
    let engine = create_test_engine();
    let report = create_test_report("report_1", "alice", None, Severity::Low);

    engine.record_incident_report(report.clone()).await.unwrap();
    let err = engine.record_incident_report(report).await.unwrap_err();

    assert!(matches!(err, EngineError::DuplicateEntry { .. }));
    let rewards = engine
        .ledger()
        .query("alice", Some(TransactionKind::ReportReward), None, None)
        .await;
    assert_eq!(rewards.len(), 1);
}

#[tokio::test]
async fn balance_identity_holds_across_full_history() {
    let engine = create_test_engine();
    seed_credits(&engine, "alice", 3_000, 5, "seed_1").await;

    engine
        .record_incident_report(create_test_report("r1", "alice", None, Severity::High))
        .await
        .unwrap();
    let payout = engine
        .authorize_payout("alice", 1_200, PayoutMethod::BankTransfer)
        .await
        .unwrap();
    engine.reverse_payout(&payout.id).await.unwrap();
    let second = engine
        .authorize_payout("alice", 1_500, PayoutMethod::Paypal)
        .await
        .unwrap();
    engine.settle_payout(&second.id).await.unwrap();

    let history = engine.ledger().query("alice", None, None, None).await;
    assert!(replay_holds(&history, &HashSet::new()));

    let settled: HashSet<String> = [second.id.clone()].into();
    let projected = balance::project(&history, &settled);
    assert_eq!(projected.available, projected.lifetime - projected.redeemed - projected.pending);
    assert_eq!(projected.redeemed, 1_500);
    assert_eq!(projected.pending, 0);
}

// ============================================================================
// Tier Classification
// ============================================================================

#[tokio::test]
async fn trailing_window_activity_classifies_gold() {
    let engine = create_test_engine();
    seed_credits(&engine, "gold_user", 2_470, 10, "seed_1").await;

    for i in 0..3 {
        engine
            .record_incident_report(create_test_report(
                &format!("r{}", i),
                "gold_user",
                None,
                Severity::Medium,
            ))
            .await
            .unwrap();
    }

    let tier = engine.get_tier("gold_user").await;
    assert_eq!(tier.tier, Tier::Gold);
    assert!((tier.multiplier - 1.25).abs() < f64::EPSILON);
    assert!(tier.window_credits >= 2_500);
    assert_eq!(tier.window_reports, 3);
}

#[tokio::test]
async fn stale_activity_falls_out_of_the_window() {
    let engine = create_test_engine();
    seed_credits(&engine, "lapsed", 20_000, 45, "seed_old").await;

    let tier = engine.get_tier("lapsed").await;
    assert_eq!(tier.tier, Tier::Bronze);
    assert_eq!(tier.window_credits, 0);
}

// ============================================================================
// Streaks
// ============================================================================

#[tokio::test]
async fn streaks_extend_reset_and_reject_stale_updates() {
    let engine = create_test_engine();
    let day = |d: u32| Utc.with_ymd_and_hms(2026, 4, d, 12, 0, 0).unwrap();

    for (i, d) in [1u32, 2, 3].iter().enumerate() {
        let mut report =
            create_test_report(&format!("r{}", i), "walker", None, Severity::Low);
        report.occurred_at = day(*d);
        engine.record_incident_report(report).await.unwrap();
    }

    let streak = engine.get_streak("walker").await;
    assert_eq!(streak.current_daily_streak, 3);
    assert_eq!(streak.longest_daily_streak, 3);

    // A gap resets current but longest survives.
    let mut late = create_test_report("r9", "walker", None, Severity::Low);
    late.occurred_at = day(9);
    engine.record_incident_report(late).await.unwrap();

    let streak = engine.get_streak("walker").await;
    assert_eq!(streak.current_daily_streak, 1);
    assert_eq!(streak.longest_daily_streak, 3);
    assert!(streak.longest_daily_streak >= streak.current_daily_streak);

    // A backdated report still earns credits but cannot rewind the streak.
    let mut stale = create_test_report("r10", "walker", None, Severity::Low);
    stale.occurred_at = day(2);
    engine.record_incident_report(stale).await.unwrap();
    let streak = engine.get_streak("walker").await;
    assert_eq!(streak.current_daily_streak, 1);
}

// ============================================================================
// Referrals
// ============================================================================

#[tokio::test]
async fn referral_qualification_pays_exactly_one_bonus() {
    let engine = create_test_engine();
    let referral = engine.create_referral("referrer", "referee", None).await;

    engine
        .record_referee_activity(&referral.id, 5)
        .await
        .unwrap();
    // Progress reported twice with the same count.
    engine
        .record_referee_activity(&referral.id, 5)
        .await
        .unwrap();

    let bonuses = engine
        .ledger()
        .query("referrer", Some(TransactionKind::ReferralBonus), None, None)
        .await;
    assert_eq!(bonuses.len(), 1);
    assert_eq!(bonuses[0].amount, 500);
}

#[tokio::test]
async fn fifth_qualified_referral_triggers_milestone() {
    let engine = create_test_engine();

    for i in 0..5 {
        let referral = engine
            .create_referral("power_referrer", &format!("referee_{}", i), Some(1))
            .await;
        engine
            .record_referee_activity(&referral.id, 1)
            .await
            .unwrap();
    }

    let bonuses = engine
        .ledger()
        .query(
            "power_referrer",
            Some(TransactionKind::ReferralBonus),
            None,
            None,
        )
        .await;
    // Five per-referral bonuses plus the 1,000-credit milestone.
    assert_eq!(bonuses.len(), 6);
    assert!(bonuses.iter().any(|tx| tx.amount == 1_000));

    // Re-evaluation never pays the milestone again.
    let again = engine.evaluate_milestones("power_referrer").await.unwrap();
    assert!(again.is_empty());
}

// ============================================================================
// Leaderboard
// ============================================================================

#[tokio::test]
async fn leaderboard_windows_and_tie_breaks_are_deterministic() {
    let engine = create_test_engine();
    seed_credits(&engine, "all_timer", 5_000, 20, "seed_a").await;
    seed_credits(&engine, "this_week_early", 400, 3, "seed_b").await;
    seed_credits(&engine, "this_week_late", 400, 1, "seed_c").await;

    let weekly = engine.leaderboard(Period::Weekly, 10).await;
    assert_eq!(weekly.len(), 2);
    // Tied totals: earlier first transaction wins.
    assert_eq!(weekly[0].user_id, "this_week_early");
    assert_eq!(weekly[1].user_id, "this_week_late");
    assert_eq!(
        weekly.iter().map(|e| e.rank).collect::<Vec<_>>(),
        vec![1, 2]
    );

    let monthly = engine.leaderboard(Period::Monthly, 10).await;
    assert_eq!(monthly[0].user_id, "all_timer");

    let rerun = engine.leaderboard(Period::Weekly, 10).await;
    assert_eq!(
        weekly.iter().map(|e| &e.user_id).collect::<Vec<_>>(),
        rerun.iter().map(|e| &e.user_id).collect::<Vec<_>>()
    );

    // rank_for reaches users outside the display limit.
    let entry = engine
        .rank_for("this_week_late", Period::Weekly)
        .await
        .unwrap();
    assert_eq!(entry.rank, 2);
}

// ============================================================================
// Danger Scores
// ============================================================================

#[tokio::test]
async fn plate_scores_accumulate_and_compensate() {
    let engine = create_test_engine();

    for (id, severity) in [
        ("r1", Severity::Medium),
        ("r2", Severity::Medium),
        ("r3", Severity::Critical),
    ] {
        engine
            .record_incident_report(create_test_report(
                id,
                &format!("witness_{}", id),
                Some("dx 4-521"),
                severity,
            ))
            .await
            .unwrap();
    }

    let plates = engine.search_plates("DX4521").await;
    assert_eq!(plates.len(), 1);
    // Severity weights sum: 5 + 5 + 25.
    assert_eq!(plates[0].danger_score, 35);
    assert_eq!(plates[0].report_count, 3);
    assert_eq!(plates[0].plate, "DX4521");

    // Deleting the critical report subtracts exactly its contribution.
    let after = engine.record_report_deleted("r3").await.unwrap().unwrap();
    assert_eq!(after.danger_score, 10);
    assert_eq!(after.report_count, 2);
}

#[tokio::test]
async fn flagged_plates_rank_by_score_then_count() {
    let engine = create_test_engine();

    engine
        .record_incident_report(create_test_report(
            "r1",
            "w1",
            Some("AA-111"),
            Severity::Critical,
        ))
        .await
        .unwrap();
    for (i, id) in ["r2", "r3", "r4"].iter().enumerate() {
        engine
            .record_incident_report(create_test_report(
                id,
                &format!("w{}", i + 2),
                Some("BB-222"),
                Severity::Medium,
            ))
            .await
            .unwrap();
    }

    let ranked = engine.flagged_plates(None).await;
    // 25 for the single critical vs 15 for three medium reports.
    assert_eq!(ranked[0].plate, "AA111");
    assert_eq!(ranked[1].plate, "BB222");
}

// ============================================================================
// Payouts
// ============================================================================

#[tokio::test]
async fn payout_below_tier_minimum_is_rejected_cleanly() {
    let engine = create_test_engine();
    seed_credits(&engine, "bronze_user", 5_000, 40, "seed_old").await;

    let before = engine.ledger().len().await;
    let err = engine
        .authorize_payout("bronze_user", 50, PayoutMethod::Paypal)
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::BelowMinimum { minimum: 1_000, .. }));
    assert_eq!(engine.ledger().len().await, before);
}

#[tokio::test]
async fn payout_lifecycle_preserves_available_invariant() {
    let engine = create_test_engine();
    seed_credits(&engine, "saver", 4_000, 2, "seed_1").await;

    let payout = engine
        .authorize_payout("saver", 1_000, PayoutMethod::GiftCard)
        .await
        .unwrap();

    let mid = engine.get_balance("saver").await;
    assert_eq!(mid.available, 3_000);
    assert_eq!(mid.pending, 1_000);

    engine.settle_payout(&payout.id).await.unwrap();
    let after = engine.get_balance("saver").await;
    assert_eq!(after.available, 3_000);
    assert_eq!(after.pending, 0);
    assert_eq!(after.redeemed, 1_000);

    // Overdraw attempts never partially apply.
    let err = engine
        .authorize_payout("saver", 3_500, PayoutMethod::GiftCard)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientBalance { .. }));
    assert_eq!(engine.get_balance("saver").await.available, 3_000);
}
