use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde_json::json;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::models::settings::AnalysisSettings;

pub const CONFIG_ENV_VAR: &str = "ORATORIA_CONFIG";

/// Loads analysis settings from an optional YAML file on top of the
/// defaults, validates them and caches the result.
pub struct SettingsService {
    path: Option<PathBuf>,
    cache: RwLock<Option<AnalysisSettings>>,
}

impl SettingsService {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            cache: RwLock::new(None),
        }
    }

    /// Uses `explicit` when given, otherwise the `ORATORIA_CONFIG` variable.
    pub fn resolve(explicit: Option<PathBuf>) -> Self {
        let path = explicit.or_else(|| {
            std::env::var_os(CONFIG_ENV_VAR)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
        });
        Self::new(path)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self) -> AppResult<AnalysisSettings> {
        if let Ok(guard) = self.cache.read() {
            if let Some(settings) = guard.as_ref() {
                return Ok(settings.clone());
            }
        }

        let settings = self.load()?;
        if let Ok(mut guard) = self.cache.write() {
            *guard = Some(settings.clone());
        }
        Ok(settings)
    }

    /// Drops the cached value and reads the file again.
    pub fn reload(&self) -> AppResult<AnalysisSettings> {
        if let Ok(mut guard) = self.cache.write() {
            *guard = None;
        }
        self.get()
    }

    fn load(&self) -> AppResult<AnalysisSettings> {
        let settings = match &self.path {
            Some(path) => {
                let raw = fs::read_to_string(path).map_err(|err| {
                    AppError::config(format!("cannot read {}: {err}", path.display()))
                })?;
                let settings = parse_settings(&raw)?;
                info!(target: "app::settings", path = %path.display(), "loaded analysis settings");
                settings
            }
            None => {
                info!(target: "app::settings", "no settings file, using defaults");
                AnalysisSettings::default()
            }
        };

        validate(&settings)?;
        Ok(settings)
    }
}

pub fn parse_settings(raw: &str) -> AppResult<AnalysisSettings> {
    if raw.trim().is_empty() {
        warn!(target: "app::settings", "settings file is empty, using defaults");
        return Ok(AnalysisSettings::default());
    }
    Ok(serde_yaml::from_str(raw)?)
}

fn ensure(condition: bool, field: &str, message: &str) -> AppResult<()> {
    if condition {
        Ok(())
    } else {
        Err(AppError::validation_with_details(
            format!("invalid setting {field}: {message}"),
            json!({ "field": field }),
        ))
    }
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

pub fn validate(settings: &AnalysisSettings) -> AppResult<()> {
    let signals = &settings.signals;
    ensure(signals.min_samples >= 1, "signals.minSamples", "must be at least 1")?;
    for (field, ceiling) in [
        ("signals.gazeCeiling", signals.gaze_ceiling),
        ("signals.mouthCeiling", signals.mouth_ceiling),
        ("signals.eyebrowCeiling", signals.eyebrow_ceiling),
        ("signals.handCeiling", signals.hand_ceiling),
        ("signals.headDisplacementCeiling", signals.head_displacement_ceiling),
        ("signals.eyeOpennessCeiling", signals.eye_openness_ceiling),
        ("signals.shoulderCeiling", signals.shoulder_ceiling),
    ] {
        ensure(positive(ceiling), field, "must be positive")?;
    }

    let gaze = &settings.gaze;
    ensure(
        positive(gaze.mean_weight) && positive(gaze.std_weight),
        "gaze weights",
        "must be positive",
    )?;
    ensure(
        gaze.full_contact_at >= 0.0 && gaze.full_contact_at < gaze.no_contact_at,
        "gaze.fullContactAt",
        "must be below gaze.noContactAt",
    )?;
    ensure(
        gaze.medium_percentage <= gaze.high_percentage,
        "gaze.mediumPercentage",
        "must not exceed gaze.highPercentage",
    )?;

    let expressiveness = &settings.expressiveness;
    ensure(
        [
            expressiveness.std_weight,
            expressiveness.range_weight,
            expressiveness.mouth_weight,
            expressiveness.eyebrow_weight,
            expressiveness.hand_weight,
        ]
        .into_iter()
        .all(|weight| weight.is_finite() && weight >= 0.0),
        "expressiveness weights",
        "must be non-negative",
    )?;
    ensure(
        expressiveness.medium_score <= expressiveness.high_score,
        "expressiveness.mediumScore",
        "must not exceed expressiveness.highScore",
    )?;

    let confidence = &settings.confidence;
    ensure(
        positive(confidence.blink_optimal_min)
            && confidence.blink_optimal_min <= confidence.blink_optimal_max
            && confidence.blink_optimal_max < confidence.blink_zero_at,
        "confidence blink range",
        "expected 0 < optimalMin <= optimalMax < zeroAt",
    )?;
    ensure(
        confidence.blink_closed_below < confidence.blink_open_above,
        "confidence.blinkClosedBelow",
        "must be below confidence.blinkOpenAbove",
    )?;
    ensure(
        confidence.medium_score <= confidence.high_score,
        "confidence.mediumScore",
        "must not exceed confidence.highScore",
    )?;

    let posture = &settings.posture;
    ensure(
        posture.vertical_good_below <= posture.vertical_fair_below
            && posture.horizontal_good_below <= posture.horizontal_fair_below,
        "posture thresholds",
        "good must not exceed fair",
    )?;

    ensure(
        settings.gestures.moderate_percentage <= settings.gestures.frequent_percentage,
        "gestures.moderatePercentage",
        "must not exceed gestures.frequentPercentage",
    )?;

    ensure(
        settings.audio.slow_below_wpm <= settings.audio.fast_above_wpm,
        "audio.slowBelowWpm",
        "must not exceed audio.fastAboveWpm",
    )?;

    let scoring = &settings.scoring;
    ensure(
        scoring.filler_full_point_max_rate <= scoring.filler_half_point_max_rate,
        "scoring filler rates",
        "full-point rate must not exceed half-point rate",
    )?;
    ensure(
        scoring.yellow_percentage <= scoring.green_percentage,
        "scoring.yellowPercentage",
        "must not exceed scoring.greenPercentage",
    )?;
    ensure(
        scoring.max_comment_observations >= 1,
        "scoring.maxCommentObservations",
        "must be at least 1",
    )?;

    let progress = &settings.progress;
    ensure(progress.trend_window >= 1, "progress.trendWindow", "must be at least 1")?;
    ensure(positive(progress.trend_epsilon), "progress.trendEpsilon", "must be positive")?;
    ensure(
        progress.weakness_lookback >= 1,
        "progress.weaknessLookback",
        "must be at least 1",
    )?;
    ensure(
        progress.max_weaknesses >= 1,
        "progress.maxWeaknesses",
        "must be at least 1",
    )?;

    ensure(settings.fetch.timeout_secs >= 1, "fetch.timeoutSecs", "must be at least 1")?;

    Ok(())
}
