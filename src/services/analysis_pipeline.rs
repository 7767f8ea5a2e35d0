use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::models::landmarks::{LandmarkTrack, Transcript};
use crate::models::metrics::{MetricsSnapshot, OverallScore, QualityFlags};
use crate::models::settings::AnalysisSettings;
use crate::services::audio_analyzer::{self, FillerLexicon};
use crate::services::collaborators::{LandmarkDetector, SpeechTranscriber};
use crate::services::composite_scorer::{self, ScoreBreakdown, ScoreInputs};
use crate::services::feature_extractor;
use crate::services::feedback_composer;
use crate::services::recording_fetcher::RecordingFetcher;
use crate::services::signal_aggregator::SessionAccumulator;
use crate::services::visual_classifier;

/// Everything one run produces. Built in full or not at all.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    pub metrics: MetricsSnapshot,
    pub overall_score: OverallScore,
    pub breakdown: ScoreBreakdown,
    pub generated_comment: String,
}

/// Pure core of a run: landmarks and transcript in, scored snapshot out.
/// Never fails; missing data shows up as unknown levels and quality gaps.
pub fn analyze(
    track: &LandmarkTrack,
    transcript: &Transcript,
    lexicon: &FillerLexicon,
    settings: &AnalysisSettings,
    extraction_shards: usize,
) -> AnalysisOutcome {
    let features =
        feature_extractor::extract_sharded(&track.frames, track.dimensions, extraction_shards);

    let mut accumulator = SessionAccumulator::new(track.dimensions, &settings.confidence);
    accumulator.extend(&features);
    let aggregate = accumulator.finish(&settings.signals);

    let video_duration = if track.duration_seconds > 0.0 {
        track.duration_seconds
    } else {
        transcript.duration_seconds
    };
    let visual = visual_classifier::assess(&aggregate, video_duration, settings);

    let transcript = if transcript.duration_seconds > 0.0 {
        transcript.clone()
    } else {
        Transcript {
            text: transcript.text.clone(),
            duration_seconds: track.duration_seconds,
        }
    };
    let audio = audio_analyzer::assess(&transcript, lexicon, &settings.audio);

    let mut gaps = aggregate.gaps.clone();
    if let Some(gap) = &audio.gap {
        gaps.push(gap.clone());
    }

    let quality = QualityFlags {
        frames_analyzed: aggregate.frames_analyzed,
        frames_with_face: aggregate.frames_with_face,
        frames_with_hands: aggregate.frames_with_hands,
        frames_with_pose: aggregate.frames_with_pose,
        rejected_samples: aggregate.rejected_samples,
        video_usable: aggregate.frames_with_face > 0,
        audio_usable: audio.gap.is_none(),
        gaps,
    };

    let metrics = MetricsSnapshot {
        transcription: audio.transcription,
        duration_seconds: audio.duration_seconds,
        word_count: audio.word_count,
        filler_count: audio.filler_count,
        filler_rate_per_minute: audio.filler_rate_per_minute,
        filler_examples: audio.filler_examples,
        words_per_minute: audio.words_per_minute,
        speed_level: audio.speed_level,
        eye_contact_percentage: visual.eye_contact_percentage,
        eye_contact_level: visual.eye_contact_level,
        expressiveness_score: visual.expressiveness_score,
        expressiveness_level: visual.expressiveness_level,
        confidence_score: visual.confidence_score,
        confidence_level: visual.confidence_level,
        blinks_per_minute: visual.blinks_per_minute,
        head_movement: visual.head_movement,
        hand_visibility_percentage: visual.hand_visibility_percentage,
        gesture_level: visual.gesture_level,
        shoulder_alignment: visual.shoulder_alignment,
        posture_level: visual.posture_level,
        quality,
    };

    let (overall_score, breakdown) = composite_scorer::score(
        &ScoreInputs {
            eye_contact: metrics.eye_contact_level,
            expressiveness: metrics.expressiveness_level,
            confidence: metrics.confidence_level,
            filler_rate_per_minute: metrics.filler_rate_per_minute,
            speed: metrics.speed_level,
            posture: metrics.posture_level,
        },
        &settings.scoring,
    );
    let generated_comment = feedback_composer::compose_comment(&metrics, &settings.scoring);

    info!(
        target: "app::analysis",
        frames = metrics.quality.frames_analyzed,
        overall = %overall_score,
        percentage = breakdown.percentage(),
        gaps = metrics.quality.gaps.len(),
        "analysis complete"
    );

    AnalysisOutcome {
        metrics,
        overall_score,
        breakdown,
        generated_comment,
    }
}

/// Fetch, detect, transcribe and score one recording.
#[derive(Clone)]
pub struct AnalysisPipeline {
    settings: Arc<AnalysisSettings>,
    lexicon: Arc<FillerLexicon>,
    fetcher: Arc<dyn RecordingFetcher>,
    detector: Arc<dyn LandmarkDetector>,
    transcriber: Arc<dyn SpeechTranscriber>,
    extraction_shards: usize,
}

impl AnalysisPipeline {
    pub fn new(
        settings: AnalysisSettings,
        fetcher: Arc<dyn RecordingFetcher>,
        detector: Arc<dyn LandmarkDetector>,
        transcriber: Arc<dyn SpeechTranscriber>,
    ) -> AppResult<Self> {
        let lexicon = FillerLexicon::from_settings(&settings.audio)?;
        let extraction_shards = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Ok(Self {
            settings: Arc::new(settings),
            lexicon: Arc::new(lexicon),
            fetcher,
            detector,
            transcriber,
            extraction_shards,
        })
    }

    pub fn with_extraction_shards(mut self, shards: usize) -> Self {
        self.extraction_shards = shards.max(1);
        self
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    /// Only [`AppError::SourceUnavailable`] (or an infrastructure failure)
    /// aborts a run; every other shortfall degrades inside the snapshot.
    pub async fn run(&self, source_ref: &str) -> AppResult<AnalysisOutcome> {
        let recording = self.fetcher.fetch(source_ref).await?;
        let path = recording.path().to_path_buf();

        let detector = Arc::clone(&self.detector);
        let detect_path = path.clone();
        let detection =
            tokio::task::spawn_blocking(move || detector.detect(&detect_path));

        let transcriber = Arc::clone(&self.transcriber);
        let transcribe_path = path.clone();
        let transcription =
            tokio::task::spawn_blocking(move || transcriber.transcribe(&transcribe_path));

        let (detection, transcription) = tokio::join!(detection, transcription);

        let track = detection
            .map_err(|err| AppError::other(format!("landmark detection task failed: {err}")))?
            .map_err(|err| match err {
                AppError::SourceUnavailable { .. } => err,
                other => AppError::source_unavailable(source_ref, other.to_string()),
            })?;

        let transcript = match transcription {
            Ok(Ok(transcript)) => transcript,
            Ok(Err(err)) => {
                warn!(target: "app::audio", error = %err, "transcription failed, continuing without audio");
                Transcript::default()
            }
            Err(err) => {
                warn!(target: "app::audio", error = %err, "transcription task failed, continuing without audio");
                Transcript::default()
            }
        };

        let settings = Arc::clone(&self.settings);
        let lexicon = Arc::clone(&self.lexicon);
        let shards = self.extraction_shards;
        let outcome = tokio::task::spawn_blocking(move || {
            analyze(&track, &transcript, &lexicon, &settings, shards)
        })
        .await
        .map_err(|err| AppError::other(format!("analysis task failed: {err}")))?;

        drop(recording);
        Ok(outcome)
    }
}
