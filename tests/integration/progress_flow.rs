use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use oratoria_lib::db::repositories::practice_repository::PracticeRepository;
use oratoria_lib::db::repositories::session_repository::SessionRepository;
use oratoria_lib::db::DbPool;
use oratoria_lib::models::metrics::{
    GestureLevel, Level, MetricsSnapshot, OverallScore, PostureLevel, SpeedLevel,
};
use oratoria_lib::models::plan::PlanTaskKind;
use oratoria_lib::models::progress::{Severity, TrendMetric, TrendMode, WeaknessArea};
use oratoria_lib::models::session::{PracticeSession, SessionRecord, SessionState};
use oratoria_lib::models::settings::{AnalysisSettings, ProgressSettings};
use oratoria_lib::services::plan_service::{build_plan, PlanService};
use oratoria_lib::services::progress_service::{
    average_overall, compute_trends, identify_weaknesses, ProgressService,
};
use oratoria_lib::services::settings_service::SettingsService;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::tempdir;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 2, 9, 0, 0).unwrap()
}

fn practice(day: i64, metrics: MetricsSnapshot, overall: OverallScore) -> PracticeSession {
    PracticeSession {
        id: format!("p{day}"),
        user_id: 1,
        timestamp: start() + Duration::days(day),
        metrics,
        overall_score: overall,
        generated_comment: String::new(),
    }
}

fn with_fillers(count: u32) -> MetricsSnapshot {
    MetricsSnapshot {
        filler_count: count,
        word_count: 120,
        ..MetricsSnapshot::default()
    }
}

fn solid() -> MetricsSnapshot {
    MetricsSnapshot {
        filler_count: 1,
        word_count: 300,
        eye_contact_percentage: Some(88.0),
        eye_contact_level: Level::High,
        expressiveness_score: Some(0.03),
        expressiveness_level: Level::High,
        confidence_level: Level::High,
        speed_level: SpeedLevel::Normal,
        gesture_level: GestureLevel::Frequent,
        posture_level: PostureLevel::Good,
        ..MetricsSnapshot::default()
    }
}

fn store(pool: &DbPool, session: &PracticeSession) {
    let stamp = session.timestamp.to_rfc3339();
    let record = SessionRecord {
        id: session.id.clone(),
        user_id: session.user_id,
        state: SessionState::Ready,
        source_ref: None,
        error_message: None,
        started_at: stamp.clone(),
        updated_at: stamp,
    };
    pool.with_transaction(|conn| {
        SessionRepository::insert(conn, &record)?;
        PracticeRepository::insert(conn, session)
    })
    .expect("store session");
}

#[test]
fn falling_filler_count_reads_as_improvement() {
    let history = vec![
        practice(0, with_fillers(10), OverallScore::Red),
        practice(1, with_fillers(4), OverallScore::Yellow),
    ];
    let trend = compute_trends(&history, &ProgressSettings::default());

    assert_eq!(trend.mode, TrendMode::HalfSplit);
    let fillers = trend.metrics[&TrendMetric::FillerCount];
    assert!(fillers.known);
    assert_eq!(fillers.before, 10.0);
    assert_eq!(fillers.after, 4.0);
    assert!(fillers.percent_change > 0.0);
    assert!((fillers.percent_change - 60.0).abs() < 1e-9);
    // neither side measured eye contact
    assert!(!trend.metrics[&TrendMetric::EyeContact].known);
}

#[test]
fn long_history_compares_the_latest_windows() {
    let fillers = [9, 9, 9, 8, 6, 4, 2];
    let history: Vec<PracticeSession> = fillers
        .iter()
        .enumerate()
        .map(|(day, &count)| practice(day as i64, with_fillers(count), OverallScore::Yellow))
        .collect();
    let trend = compute_trends(&history, &ProgressSettings::default());

    assert_eq!(trend.mode, TrendMode::Windowed);
    assert_eq!(trend.sessions_before, 3);
    assert_eq!(trend.sessions_after, 3);
    let fillers = trend.metrics[&TrendMetric::FillerCount];
    // before = days 1..=3 (9, 9, 8), after = days 4..=6 (6, 4, 2)
    assert!((fillers.before - 26.0 / 3.0).abs() < 1e-9);
    assert!((fillers.after - 4.0).abs() < 1e-9);
}

#[test]
fn single_session_has_no_trend() {
    let history = vec![practice(0, with_fillers(3), OverallScore::Yellow)];
    let trend = compute_trends(&history, &ProgressSettings::default());
    assert_eq!(trend.mode, TrendMode::InsufficientHistory);
    assert!(trend.metrics.values().all(|metric| !metric.known));
}

#[test]
fn new_user_gets_generic_weaknesses_and_a_full_week() {
    let settings = AnalysisSettings::default();
    let weaknesses = identify_weaknesses(&[], &settings);

    let areas: Vec<WeaknessArea> = weaknesses.iter().map(|w| w.area).collect();
    assert_eq!(
        areas,
        vec![
            WeaknessArea::Storytelling,
            WeaknessArea::VocalVariety,
            WeaknessArea::Improvisation
        ]
    );
    assert!(weaknesses.iter().all(|w| w.level == Severity::Maintenance));

    let plan = build_plan(&weaknesses, 1, start(), &mut StdRng::seed_from_u64(11));
    assert_eq!(plan.tasks.len(), 7);
    let days: Vec<u8> = plan.tasks.iter().map(|task| task.day).collect();
    assert_eq!(days, vec![1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(plan.tasks[0].kind, PlanTaskKind::BaselineRecording);
    assert_eq!(plan.tasks[6].kind, PlanTaskKind::ComparisonRecording);
    assert_eq!(plan.objectives.len(), 3);
}

#[test]
fn weaknesses_are_ranked_and_capped() {
    let weak = MetricsSnapshot {
        filler_count: 8,
        word_count: 200,
        eye_contact_percentage: Some(40.0),
        eye_contact_level: Level::Low,
        speed_level: SpeedLevel::Fast,
        gesture_level: GestureLevel::Scarce,
        posture_level: PostureLevel::Poor,
        ..MetricsSnapshot::default()
    };
    let history: Vec<PracticeSession> = (0..4)
        .map(|day| practice(day, weak.clone(), OverallScore::Red))
        .collect();

    let weaknesses = identify_weaknesses(&history, &AnalysisSettings::default());
    assert_eq!(weaknesses.len(), 3);
    assert!(weaknesses.iter().all(|w| w.priority == 1));
    for pair in weaknesses.windows(2) {
        assert!(pair[0].value >= pair[1].value);
    }
    // every share-based area sits at 1.0 and outranks the mean-based ones
    assert!(weaknesses
        .iter()
        .all(|w| w.area != WeaknessArea::Fillers && w.area != WeaknessArea::EyeContact));
}

#[test]
fn only_recent_sessions_count_towards_weaknesses() {
    let mut history: Vec<PracticeSession> = (0..3)
        .map(|day| practice(day, with_fillers(12), OverallScore::Red))
        .collect();
    history.extend((3..8).map(|day| practice(day, solid(), OverallScore::Green)));

    let weaknesses = identify_weaknesses(&history, &AnalysisSettings::default());
    assert!(weaknesses.iter().all(|w| w.level == Severity::Maintenance));
    // 5 green and 3 red average to 0.625, just under the green cut
    assert_eq!(average_overall(&history), Some(OverallScore::Yellow));
}

#[test]
fn services_read_history_from_the_database() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("progress.sqlite")).expect("db pool");
    let settings = Arc::new(SettingsService::new(None));

    store(&pool, &practice(0, with_fillers(10), OverallScore::Red));
    store(&pool, &practice(9, with_fillers(4), OverallScore::Yellow));

    let summary = ProgressService::new(pool.clone(), Arc::clone(&settings))
        .summary(1)
        .expect("summary");
    assert_eq!(summary.total_sessions, 2);
    assert_eq!(summary.average_overall, Some(OverallScore::Red));
    assert!(summary.trend.metrics[&TrendMetric::FillerCount].percent_change > 0.0);
    assert_eq!(summary.weaknesses[0].area, WeaknessArea::Fillers);
    assert_eq!(summary.weaknesses[0].level, Severity::High);

    let plan = PlanService::new(pool, settings)
        .plan_for(1, start() + Duration::days(10), &mut StdRng::seed_from_u64(3))
        .expect("plan");
    assert_eq!(plan.week, 2);
    assert_eq!(plan.tasks.len(), 7);
    assert_eq!(plan.tasks[1].area, Some(WeaknessArea::Fillers));
}
