use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::{Duration, Utc};
use futures::future::join_all;
use oratoria_lib::db::repositories::practice_repository::PracticeRepository;
use oratoria_lib::db::DbPool;
use oratoria_lib::error::{AppError, AppResult};
use oratoria_lib::models::landmarks::{
    FaceLandmarks, FrameDimensions, FrameLandmarks, LandmarkTrack, Point2, Transcript,
};
use oratoria_lib::models::metrics::{MetricsSnapshot, OverallScore};
use oratoria_lib::models::rewards::BadgeKind;
use oratoria_lib::models::session::{PracticeSession, SessionState};
use oratoria_lib::models::settings::AnalysisSettings;
use oratoria_lib::services::analysis_pipeline::AnalysisPipeline;
use oratoria_lib::services::collaborators::{LandmarkDetector, SpeechTranscriber};
use oratoria_lib::services::recording_fetcher::HttpRecordingFetcher;
use oratoria_lib::services::session_service::SessionService;
use tempfile::{tempdir, TempDir};

struct StubDetector;

impl LandmarkDetector for StubDetector {
    fn detect(&self, _recording: &Path) -> AppResult<LandmarkTrack> {
        let face = FaceLandmarks {
            left_iris: Point2::new(0.40, 0.40),
            right_iris: Point2::new(0.60, 0.40),
            left_eye_outer: Point2::new(0.38, 0.40),
            left_eye_inner: Point2::new(0.42, 0.40),
            left_eye_top: Point2::new(0.40, 0.39),
            left_eye_bottom: Point2::new(0.40, 0.41),
            right_eye_inner: Point2::new(0.58, 0.40),
            right_eye_outer: Point2::new(0.62, 0.40),
            right_eye_top: Point2::new(0.60, 0.39),
            right_eye_bottom: Point2::new(0.60, 0.41),
            upper_lip: Point2::new(0.50, 0.60),
            lower_lip: Point2::new(0.50, 0.62),
            nose_tip: Point2::new(0.50, 0.50),
            eyebrows: vec![Point2::new(0.40, 0.35)],
        };
        Ok(LandmarkTrack {
            dimensions: FrameDimensions::default(),
            duration_seconds: 45.0,
            frames: vec![
                FrameLandmarks {
                    face: Some(face),
                    ..FrameLandmarks::default()
                };
                8
            ],
        })
    }
}

struct StubTranscriber;

impl SpeechTranscriber for StubTranscriber {
    fn transcribe(&self, recording: &Path) -> AppResult<Transcript> {
        let clean = recording
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("clean"));
        let text = if clean {
            "hoy les quiero contar una historia sobre mi primer viaje"
        } else {
            "hoy les quiero contar eh una historia sobre mi primer viaje"
        };
        Ok(Transcript {
            text: text.into(),
            duration_seconds: 45.0,
        })
    }
}

struct Fixture {
    dir: TempDir,
    pool: DbPool,
    service: SessionService,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempdir().expect("temp dir");
        let pool = DbPool::new(dir.path().join("sessions.sqlite")).expect("db pool");
        let settings = AnalysisSettings::default();
        let fetcher = Arc::new(HttpRecordingFetcher::new(&settings.fetch).expect("fetcher"));
        let pipeline = AnalysisPipeline::new(
            settings,
            fetcher,
            Arc::new(StubDetector),
            Arc::new(StubTranscriber),
        )
        .expect("pipeline");
        let service = SessionService::new(pool.clone(), pipeline);
        Self { dir, pool, service }
    }

    fn recording(&self) -> String {
        self.recording_named("talk.webm")
    }

    fn recording_named(&self, name: &str) -> String {
        let path = self.dir.path().join(name);
        fs::write(&path, b"bytes").expect("write recording");
        path.display().to_string()
    }
}

#[tokio::test]
async fn finalize_stores_result_and_grants_first_badge() {
    let fixture = Fixture::new();
    let source = fixture.recording();

    let record = fixture.service.start(7).expect("start");
    assert_eq!(record.state, SessionState::Recording);

    let finalized = fixture
        .service
        .finalize(&record.id, &source)
        .await
        .expect("finalize");
    assert_eq!(finalized.session.id, record.id);
    assert_eq!(finalized.session.metrics.filler_count, 1);
    assert!(finalized.summary.contains("1 fillers"));
    assert!(finalized
        .rewards
        .newly_awarded
        .iter()
        .any(|badge| badge.name == BadgeKind::FirstPractice));
    assert_eq!(finalized.rewards.streak.current_length, 1);

    let stored = fixture.service.get(&record.id).expect("session");
    assert_eq!(stored.state, SessionState::Ready);
    assert_eq!(stored.source_ref.as_deref(), Some(source.as_str()));

    let history = fixture
        .pool
        .with_connection(|conn| PracticeRepository::list_by_user(conn, 7))
        .expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].metrics, finalized.session.metrics);
}

#[tokio::test]
async fn concurrent_finalize_runs_analysis_once() {
    let fixture = Fixture::new();
    let source = fixture.recording();
    let record = fixture.service.start(3).expect("start");

    let attempts = (0..4).map(|_| fixture.service.finalize(&record.id, &source));
    let results = join_all(attempts).await;

    let succeeded = results.iter().filter(|result| result.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|result| matches!(result, Err(AppError::Conflict { .. })))
        .count();
    assert_eq!(succeeded, 1);
    assert_eq!(conflicts, 3);

    let count = fixture
        .pool
        .with_connection(|conn| PracticeRepository::count_by_user(conn, 3))
        .expect("count");
    assert_eq!(count, 1);
}

#[tokio::test]
async fn finalize_after_ready_is_a_conflict() {
    let fixture = Fixture::new();
    let source = fixture.recording();
    let record = fixture.service.start(5).expect("start");

    fixture
        .service
        .finalize_at(&record.id, &source, Utc::now())
        .await
        .expect("first finalize");
    let err = fixture
        .service
        .finalize(&record.id, &source)
        .await
        .expect_err("second finalize");
    assert!(matches!(err, AppError::Conflict { .. }));
}

#[tokio::test]
async fn unavailable_source_moves_session_to_error() {
    let fixture = Fixture::new();
    let record = fixture.service.start(9).expect("start");
    let missing = fixture.dir.path().join("gone.mp4");

    let err = fixture
        .service
        .finalize(&record.id, &missing.display().to_string())
        .await
        .expect_err("must fail");
    assert!(err.is_source_unavailable());

    let stored = fixture.service.get(&record.id).expect("session");
    assert_eq!(stored.state, SessionState::Error);
    assert!(stored
        .error_message
        .as_deref()
        .is_some_and(|message| message.contains("recording unavailable")));

    let count = fixture
        .pool
        .with_connection(|conn| PracticeRepository::count_by_user(conn, 9))
        .expect("count");
    assert_eq!(count, 0);
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let fixture = Fixture::new();
    let source = fixture.recording();
    let err = fixture
        .service
        .finalize("no-such-session", &source)
        .await
        .expect_err("must fail");
    assert!(matches!(err, AppError::NotFound));
}

#[tokio::test]
async fn late_commit_is_judged_on_its_own_metrics() {
    let fixture = Fixture::new();
    let hesitant = fixture.recording_named("talk.webm");
    let clean = fixture.recording_named("clean-talk.webm");
    let started = Utc::now();

    let first = fixture.service.start(21).expect("start first");
    let second = fixture.service.start(21).expect("start second");

    // the later-stamped session commits first
    let later = fixture
        .service
        .finalize_at(&second.id, &hesitant, started + Duration::seconds(5))
        .await
        .expect("finalize later");
    assert!(!later
        .rewards
        .newly_awarded
        .iter()
        .any(|badge| badge.name == BadgeKind::ZeroFillers));

    let earlier = fixture
        .service
        .finalize_at(&first.id, &clean, started)
        .await
        .expect("finalize earlier");
    assert_eq!(earlier.session.metrics.filler_count, 0);
    assert!(earlier.session.metrics.word_count > 0);
    assert!(earlier
        .rewards
        .newly_awarded
        .iter()
        .any(|badge| badge.name == BadgeKind::ZeroFillers));
}

#[tokio::test]
async fn failed_store_moves_session_to_error() {
    let fixture = Fixture::new();
    let source = fixture.recording();
    let record = fixture.service.start(13).expect("start");

    // a result row already bound to this session makes the insert fail
    let squatter = PracticeSession {
        id: record.id.clone(),
        user_id: 13,
        timestamp: Utc::now(),
        metrics: MetricsSnapshot::default(),
        overall_score: OverallScore::Red,
        generated_comment: String::new(),
    };
    fixture
        .pool
        .with_connection(|conn| PracticeRepository::insert(conn, &squatter))
        .expect("seed result");

    let err = fixture
        .service
        .finalize(&record.id, &source)
        .await
        .expect_err("store must fail");
    assert!(matches!(err, AppError::Conflict { .. }));

    let stored = fixture.service.get(&record.id).expect("session");
    assert_eq!(stored.state, SessionState::Error);
    assert!(stored.error_message.is_some());

    let retry = fixture
        .service
        .finalize(&record.id, &source)
        .await
        .expect_err("no second run");
    assert!(matches!(retry, AppError::Conflict { .. }));
}
