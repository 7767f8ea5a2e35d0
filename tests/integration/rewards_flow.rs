use std::collections::HashSet;

use chrono::{DateTime, Duration, TimeZone, Utc};
use oratoria_lib::db::repositories::practice_repository::PracticeRepository;
use oratoria_lib::db::repositories::session_repository::SessionRepository;
use oratoria_lib::db::DbPool;
use oratoria_lib::models::metrics::{Level, MetricsSnapshot, OverallScore, PostureLevel, SpeedLevel};
use oratoria_lib::models::rewards::BadgeKind;
use oratoria_lib::models::session::{PracticeSession, SessionRecord, SessionState};
use oratoria_lib::services::reward_service::RewardService;
use tempfile::tempdir;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 20, 18, 30, 0).unwrap()
}

fn store(pool: &DbPool, user_id: i64, id: &str, at: DateTime<Utc>, metrics: MetricsSnapshot) {
    let stamp = at.to_rfc3339();
    let record = SessionRecord {
        id: id.to_string(),
        user_id,
        state: SessionState::Ready,
        source_ref: Some(format!("/recordings/{id}.mp4")),
        error_message: None,
        started_at: stamp.clone(),
        updated_at: stamp,
    };
    let session = PracticeSession {
        id: id.to_string(),
        user_id,
        timestamp: at,
        metrics,
        overall_score: OverallScore::Yellow,
        generated_comment: String::new(),
    };
    pool.with_transaction(|conn| {
        SessionRepository::insert(conn, &record)?;
        PracticeRepository::insert(conn, &session)
    })
    .expect("store session");
}

fn spoken(words: u32, seconds: f64) -> MetricsSnapshot {
    MetricsSnapshot {
        word_count: words,
        duration_seconds: seconds,
        filler_count: 2,
        ..MetricsSnapshot::default()
    }
}

#[test]
fn streak_stops_at_the_first_missing_day() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("rewards.sqlite")).expect("db pool");
    let today = now();

    for (index, days_ago) in [0, 1, 2, 4].into_iter().enumerate() {
        store(
            &pool,
            1,
            &format!("s{index}"),
            today - Duration::days(days_ago),
            spoken(100, 60.0),
        );
    }

    let outcome = RewardService::new(pool.clone())
        .process(1, today)
        .expect("rewards");
    assert_eq!(outcome.streak.current_length, 3);
    assert_eq!(outcome.streak.last_practice_date, Some(today.date_naive()));

    let kinds: HashSet<BadgeKind> = outcome.newly_awarded.iter().map(|b| b.name).collect();
    assert!(kinds.contains(&BadgeKind::ThreeDayStreak));
    assert!(!kinds.contains(&BadgeKind::WeekStreak));

    let stored = RewardService::new(pool)
        .streak_on(1, today.date_naive())
        .expect("streak");
    assert_eq!(stored.current_length, 3);
}

#[test]
fn evaluating_twice_grants_nothing_new() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("rewards.sqlite")).expect("db pool");
    let service = RewardService::new(pool.clone());

    let strong = MetricsSnapshot {
        word_count: 1_100,
        duration_seconds: 620.0,
        eye_contact_percentage: Some(85.0),
        eye_contact_level: Level::High,
        posture_level: PostureLevel::Good,
        speed_level: SpeedLevel::Normal,
        ..MetricsSnapshot::default()
    };
    store(&pool, 2, "only", now(), strong);

    let first = service.process(2, now()).expect("first");
    assert!(!first.newly_awarded.is_empty());
    let second = service.process(2, now()).expect("second");
    assert!(second.newly_awarded.is_empty());

    let badges = service.badges(2).expect("badges");
    let unique: HashSet<BadgeKind> = badges.iter().map(|b| b.name).collect();
    assert_eq!(unique.len(), badges.len());
    assert_eq!(badges.len(), first.newly_awarded.len());
    assert!(unique.contains(&BadgeKind::SteadyGaze));
    assert!(!unique.contains(&BadgeKind::LaserFocus));
}

#[test]
fn concurrent_processing_never_duplicates_badges() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("rewards.sqlite")).expect("db pool");
    for index in 0..5 {
        store(
            &pool,
            4,
            &format!("c{index}"),
            now() - Duration::hours(index),
            spoken(250, 130.0),
        );
    }

    let awarded: usize = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let service = RewardService::new(pool.clone());
                scope.spawn(move || service.process(4, now()).expect("process"))
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("thread").newly_awarded.len())
            .sum()
    });

    let badges = RewardService::new(pool).badges(4).expect("badges");
    assert_eq!(awarded, badges.len());
    let unique: HashSet<BadgeKind> = badges.iter().map(|b| b.name).collect();
    assert_eq!(unique.len(), badges.len());
    assert!(unique.contains(&BadgeKind::FiveSessions));
    assert!(unique.contains(&BadgeKind::ThousandWords));
    assert!(unique.contains(&BadgeKind::TenMinutesSpoken));
}

#[test]
fn badges_are_scoped_per_user() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("rewards.sqlite")).expect("db pool");
    let service = RewardService::new(pool.clone());

    store(&pool, 10, "a", now(), spoken(50, 30.0));
    store(&pool, 11, "b", now(), spoken(50, 30.0));

    assert_eq!(service.process(10, now()).expect("user 10").newly_awarded.len(), 1);
    assert_eq!(service.process(11, now()).expect("user 11").newly_awarded.len(), 1);
    assert_eq!(service.streak(12).expect("streak").current_length, 0);
}

#[test]
fn reading_the_streak_a_day_later_reports_it_broken() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("rewards.sqlite")).expect("db pool");
    let service = RewardService::new(pool.clone());
    let yesterday = now() - Duration::days(1);

    store(&pool, 30, "y1", yesterday - Duration::days(1), spoken(80, 40.0));
    store(&pool, 30, "y2", yesterday, spoken(80, 40.0));
    assert_eq!(
        service.process(30, yesterday).expect("rewards").streak.current_length,
        2
    );

    let same_day = service
        .streak_on(30, yesterday.date_naive())
        .expect("same day");
    assert_eq!(same_day.current_length, 2);

    let next_day = service.streak_on(30, now().date_naive()).expect("next day");
    assert_eq!(next_day.current_length, 0);
    assert_eq!(next_day.last_practice_date, Some(yesterday.date_naive()));
}
