use std::fs;
use std::path::Path;
use std::sync::Arc;

use oratoria_lib::error::{AppError, AppResult};
use oratoria_lib::models::landmarks::{
    FaceLandmarks, FrameDimensions, FrameLandmarks, HandLandmarks, LandmarkTrack, Point2,
    PoseLandmarks, Transcript,
};
use oratoria_lib::models::metrics::{Level, MetricGap, OverallScore, PostureLevel, SpeedLevel};
use oratoria_lib::models::settings::AnalysisSettings;
use oratoria_lib::services::analysis_pipeline::{analyze, AnalysisPipeline};
use oratoria_lib::services::audio_analyzer::FillerLexicon;
use oratoria_lib::services::collaborators::{LandmarkDetector, SpeechTranscriber};
use oratoria_lib::services::recording_fetcher::HttpRecordingFetcher;
use tempfile::tempdir;

struct FixedDetector(LandmarkTrack);

impl LandmarkDetector for FixedDetector {
    fn detect(&self, _recording: &Path) -> AppResult<LandmarkTrack> {
        Ok(self.0.clone())
    }
}

struct BrokenDetector;

impl LandmarkDetector for BrokenDetector {
    fn detect(&self, _recording: &Path) -> AppResult<LandmarkTrack> {
        Err(AppError::other("codec not supported"))
    }
}

struct FixedTranscriber(Transcript);

impl SpeechTranscriber for FixedTranscriber {
    fn transcribe(&self, _recording: &Path) -> AppResult<Transcript> {
        Ok(self.0.clone())
    }
}

struct BrokenTranscriber;

impl SpeechTranscriber for BrokenTranscriber {
    fn transcribe(&self, _recording: &Path) -> AppResult<Transcript> {
        Err(AppError::other("no audio track"))
    }
}

fn face(gaze_offset: f64, mouth_gap: f64) -> FaceLandmarks {
    FaceLandmarks {
        left_iris: Point2::new(0.40 + gaze_offset, 0.40),
        right_iris: Point2::new(0.60 + gaze_offset, 0.40),
        left_eye_outer: Point2::new(0.38, 0.40),
        left_eye_inner: Point2::new(0.42, 0.40),
        left_eye_top: Point2::new(0.40, 0.39),
        left_eye_bottom: Point2::new(0.40, 0.41),
        right_eye_inner: Point2::new(0.58, 0.40),
        right_eye_outer: Point2::new(0.62, 0.40),
        right_eye_top: Point2::new(0.60, 0.39),
        right_eye_bottom: Point2::new(0.60, 0.41),
        upper_lip: Point2::new(0.50, 0.60),
        lower_lip: Point2::new(0.50, 0.60 + mouth_gap),
        nose_tip: Point2::new(0.50, 0.50),
        eyebrows: vec![Point2::new(0.40, 0.35), Point2::new(0.60, 0.35)],
    }
}

fn steady_track(frames: usize) -> LandmarkTrack {
    LandmarkTrack {
        dimensions: FrameDimensions::default(),
        duration_seconds: 60.0,
        frames: (0..frames)
            .map(|_| FrameLandmarks {
                face: Some(face(0.005, 0.03)),
                ..FrameLandmarks::default()
            })
            .collect(),
    }
}

fn varied_track(frames: usize) -> LandmarkTrack {
    LandmarkTrack {
        dimensions: FrameDimensions::default(),
        duration_seconds: 30.0,
        frames: (0..frames)
            .map(|i| {
                let wave = (i % 5) as f64;
                FrameLandmarks {
                    face: Some(face(0.002 * wave, 0.01 + 0.01 * wave)),
                    hands: Some(if i % 3 == 0 {
                        Vec::new()
                    } else {
                        vec![HandLandmarks {
                            points: vec![
                                Point2::new(0.2, 0.6),
                                Point2::new(0.25 + 0.01 * wave, 0.7),
                                Point2::new(0.3, 0.65),
                            ],
                        }]
                    }),
                    pose: Some(PoseLandmarks {
                        left_shoulder: Point2::new(0.35, 0.80),
                        right_shoulder: Point2::new(0.65, 0.80 + 0.001 * wave),
                    }),
                }
            })
            .collect(),
    }
}

fn recording(dir: &Path) -> String {
    let path = dir.join("talk.mp4");
    fs::write(&path, b"not really a video").expect("write recording");
    path.display().to_string()
}

fn pipeline(
    detector: Arc<dyn LandmarkDetector>,
    transcriber: Arc<dyn SpeechTranscriber>,
) -> AnalysisPipeline {
    let settings = AnalysisSettings::default();
    let fetcher = Arc::new(HttpRecordingFetcher::new(&settings.fetch).expect("fetcher"));
    AnalysisPipeline::new(settings, fetcher, detector, transcriber).expect("pipeline")
}

#[tokio::test]
async fn steady_gaze_and_clean_speech_end_to_end() {
    let dir = tempdir().expect("temp dir");
    let source = recording(dir.path());

    let transcript = Transcript {
        text: vec!["palabra"; 140].join(" "),
        duration_seconds: 60.0,
    };
    let pipeline = pipeline(
        Arc::new(FixedDetector(steady_track(10))),
        Arc::new(FixedTranscriber(transcript)),
    );

    let outcome = pipeline.run(&source).await.expect("analysis");
    let metrics = &outcome.metrics;

    assert_eq!(metrics.eye_contact_percentage, Some(100.0));
    assert_eq!(metrics.eye_contact_level, Level::High);
    assert_eq!(metrics.filler_count, 0);
    assert_eq!(metrics.filler_rate_per_minute, 0.0);
    assert_eq!(outcome.breakdown.fillers, 1.0);
    assert_eq!(metrics.speed_level, SpeedLevel::Normal);
    assert_eq!(metrics.word_count, 140);
    assert_eq!(metrics.quality.frames_analyzed, 10);
    assert!(metrics.quality.video_usable);
    assert!(metrics.quality.audio_usable);
    // the recording was a local file and must survive the run
    assert!(Path::new(&source).exists());
    assert!(!outcome.generated_comment.is_empty());
}

#[tokio::test]
async fn undecodable_recording_fails_the_run() {
    let dir = tempdir().expect("temp dir");
    let source = recording(dir.path());
    let pipeline = pipeline(
        Arc::new(BrokenDetector),
        Arc::new(FixedTranscriber(Transcript::default())),
    );

    let err = pipeline.run(&source).await.expect_err("must fail");
    assert!(err.is_source_unavailable(), "got {err:?}");
}

#[tokio::test]
async fn missing_audio_degrades_instead_of_failing() {
    let dir = tempdir().expect("temp dir");
    let source = recording(dir.path());
    let pipeline = pipeline(
        Arc::new(FixedDetector(steady_track(12))),
        Arc::new(BrokenTranscriber),
    );

    let outcome = pipeline.run(&source).await.expect("analysis");
    let metrics = &outcome.metrics;
    assert_eq!(metrics.word_count, 0);
    assert_eq!(metrics.speed_level, SpeedLevel::Unknown);
    assert!(!metrics.quality.audio_usable);
    assert!(metrics
        .quality
        .gaps
        .iter()
        .any(|gap| matches!(gap, MetricGap::TranscriptionEmpty)));
    assert_eq!(metrics.eye_contact_level, Level::High);
}

#[test]
fn sharded_extraction_matches_sequential() {
    let settings = AnalysisSettings::default();
    let lexicon = FillerLexicon::from_settings(&settings.audio).expect("lexicon");
    let track = varied_track(97);
    let transcript = Transcript {
        text: "eh bueno hoy vamos a hablar de algo o sea importante".into(),
        duration_seconds: 30.0,
    };

    let sequential = analyze(&track, &transcript, &lexicon, &settings, 1);
    for shards in [2, 3, 8, 200] {
        let sharded = analyze(&track, &transcript, &lexicon, &settings, shards);
        assert_eq!(sharded, sequential, "shards = {shards}");
    }

    assert_ne!(sequential.metrics.posture_level, PostureLevel::Unknown);
    assert!(sequential.metrics.hand_visibility_percentage.is_some());
}

#[test]
fn unusable_video_never_reaches_green() {
    let settings = AnalysisSettings::default();
    let lexicon = FillerLexicon::from_settings(&settings.audio).expect("lexicon");
    let track = LandmarkTrack {
        dimensions: FrameDimensions::default(),
        duration_seconds: 60.0,
        frames: vec![FrameLandmarks::default(); 30],
    };
    let transcript = Transcript {
        text: vec!["palabra"; 130].join(" "),
        duration_seconds: 60.0,
    };

    let outcome = analyze(&track, &transcript, &lexicon, &settings, 2);
    assert!(!outcome.metrics.quality.video_usable);
    assert_eq!(outcome.metrics.eye_contact_level, Level::Unknown);
    assert_ne!(outcome.overall_score, OverallScore::Green);
}
