//! Threshold-driven mappings from aggregated visual statistics to levels.
//!
//! Each `classify_*` function is total: a missing numeric always yields the
//! `Unknown` level and nothing here can fail.

use tracing::info;

use crate::models::features::{MetricKind, StreamStats};
use crate::models::metrics::{GestureLevel, Level, PostureLevel};
use crate::models::settings::{
    AnalysisSettings, ConfidenceSettings, ExpressivenessSettings, GazeSettings, GestureSettings,
    PostureSettings,
};
use crate::services::signal_aggregator::SessionAggregate;

/// Weighted gaze offset of a session: average deviation counts more than its
/// variability.
pub fn combined_gaze_deviation(gaze: &StreamStats, settings: &GazeSettings) -> f64 {
    settings.mean_weight * gaze.mean + settings.std_weight * gaze.std
}

/// Maps a combined deviation to a contact percentage. Non-increasing in
/// `combined`; 100 at or below `full_contact_at`, 0 at or above `no_contact_at`.
pub fn eye_contact_percentage(combined: f64, settings: &GazeSettings) -> f64 {
    if combined <= settings.full_contact_at {
        return 100.0;
    }
    if combined >= settings.no_contact_at {
        return 0.0;
    }
    let span = settings.no_contact_at - settings.full_contact_at;
    ((settings.no_contact_at - combined) / span * 100.0).clamp(0.0, 100.0)
}

pub fn classify_eye_contact(percentage: Option<f64>, settings: &GazeSettings) -> Level {
    match percentage {
        Some(pct) if pct >= settings.high_percentage => Level::High,
        Some(pct) if pct >= settings.medium_percentage => Level::Medium,
        Some(_) => Level::Low,
        None => Level::Unknown,
    }
}

fn stream_expressiveness(stats: &StreamStats, settings: &ExpressivenessSettings) -> f64 {
    stats.std * settings.std_weight + stats.range() * settings.range_weight
}

/// Needs all three streams; any missing one leaves the score unmeasured.
pub fn expressiveness_score(
    mouth: Option<&StreamStats>,
    eyebrow: Option<&StreamStats>,
    hands: Option<&StreamStats>,
    settings: &ExpressivenessSettings,
) -> Option<f64> {
    let mouth = stream_expressiveness(mouth?, settings);
    let eyebrow = stream_expressiveness(eyebrow?, settings);
    let hands = stream_expressiveness(hands?, settings);
    Some(
        settings.mouth_weight * mouth
            + settings.eyebrow_weight * eyebrow
            + settings.hand_weight * hands,
    )
}

pub fn classify_expressiveness(score: Option<f64>, settings: &ExpressivenessSettings) -> Level {
    match score {
        Some(value) if value >= settings.high_score => Level::High,
        Some(value) if value >= settings.medium_score => Level::Medium,
        Some(_) => Level::Low,
        None => Level::Unknown,
    }
}

pub fn blinks_per_minute(blinks: u32, duration_seconds: f64) -> f64 {
    if duration_seconds > 0.0 {
        f64::from(blinks) / duration_seconds * 60.0
    } else {
        0.0
    }
}

/// 1 inside the optimal range, linear up from 0 below it, linear down to 0 at
/// `blink_zero_at` above it.
pub fn blink_score(rate: f64, settings: &ConfidenceSettings) -> f64 {
    if rate < settings.blink_optimal_min {
        (rate / settings.blink_optimal_min).clamp(0.0, 1.0)
    } else if rate <= settings.blink_optimal_max {
        1.0
    } else {
        let span = settings.blink_zero_at - settings.blink_optimal_max;
        (1.0 - (rate - settings.blink_optimal_max) / span).max(0.0)
    }
}

pub fn confidence_score(
    mean_head_displacement: Option<f64>,
    blink_rate: f64,
    settings: &ConfidenceSettings,
) -> Option<f64> {
    let movement = (1.0 - settings.movement_penalty * mean_head_displacement?).max(0.0);
    Some(settings.movement_weight * movement + settings.blink_weight * blink_score(blink_rate, settings))
}

pub fn classify_confidence(score: Option<f64>, settings: &ConfidenceSettings) -> Level {
    match score {
        Some(value) if value >= settings.high_score => Level::High,
        Some(value) if value >= settings.medium_score => Level::Medium,
        Some(_) => Level::Low,
        None => Level::Unknown,
    }
}

/// Two threshold regimes selected by magnitude: large alignment values come
/// from vertically framed footage, where the coordinate scale is roughly ten
/// times coarser. This is a proxy for orientation, not a detector.
pub fn classify_posture(alignment: Option<f64>, settings: &PostureSettings) -> PostureLevel {
    let Some(value) = alignment else {
        return PostureLevel::Unknown;
    };

    let (good_below, fair_below) = if value > settings.vertical_framing_above {
        (settings.vertical_good_below, settings.vertical_fair_below)
    } else {
        (settings.horizontal_good_below, settings.horizontal_fair_below)
    };

    if value < good_below {
        PostureLevel::Good
    } else if value < fair_below {
        PostureLevel::Fair
    } else {
        PostureLevel::Poor
    }
}

pub fn hand_visibility_percentage(frames_with_hands: usize, frames_analyzed: usize) -> Option<f64> {
    if frames_analyzed == 0 {
        return None;
    }
    Some(frames_with_hands as f64 / frames_analyzed as f64 * 100.0)
}

pub fn classify_gestures(percentage: Option<f64>, settings: &GestureSettings) -> GestureLevel {
    match percentage {
        Some(pct) if pct >= settings.frequent_percentage => GestureLevel::Frequent,
        Some(pct) if pct >= settings.moderate_percentage => GestureLevel::Moderate,
        Some(_) => GestureLevel::Scarce,
        None => GestureLevel::Unknown,
    }
}

/// Visual half of a metrics snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualAssessment {
    pub eye_contact_percentage: Option<f64>,
    pub eye_contact_level: Level,
    pub expressiveness_score: Option<f64>,
    pub expressiveness_level: Level,
    pub confidence_score: Option<f64>,
    pub confidence_level: Level,
    pub blinks_per_minute: f64,
    pub head_movement: Option<f64>,
    pub hand_visibility_percentage: Option<f64>,
    pub gesture_level: GestureLevel,
    pub shoulder_alignment: Option<f64>,
    pub posture_level: PostureLevel,
}

pub fn assess(
    aggregate: &SessionAggregate,
    duration_seconds: f64,
    settings: &AnalysisSettings,
) -> VisualAssessment {
    let eye_contact_percentage = aggregate
        .stats(MetricKind::Gaze)
        .map(|gaze| eye_contact_percentage(combined_gaze_deviation(gaze, &settings.gaze), &settings.gaze));

    let expressiveness_score = expressiveness_score(
        aggregate.stats(MetricKind::MouthOpening),
        aggregate.stats(MetricKind::EyebrowLift),
        aggregate.stats(MetricKind::HandDispersion),
        &settings.expressiveness,
    );

    let blinks_per_minute = blinks_per_minute(aggregate.blink_count, duration_seconds);
    let head_movement = aggregate
        .stats(MetricKind::HeadDisplacement)
        .map(|head| head.mean);
    let confidence_score =
        confidence_score(head_movement, blinks_per_minute, &settings.confidence);

    let hand_visibility_percentage =
        hand_visibility_percentage(aggregate.frames_with_hands, aggregate.frames_analyzed);
    let shoulder_alignment = aggregate
        .stats(MetricKind::ShoulderAlignment)
        .map(|shoulders| shoulders.mean);

    let assessment = VisualAssessment {
        eye_contact_percentage,
        eye_contact_level: classify_eye_contact(eye_contact_percentage, &settings.gaze),
        expressiveness_score,
        expressiveness_level: classify_expressiveness(
            expressiveness_score,
            &settings.expressiveness,
        ),
        confidence_score,
        confidence_level: classify_confidence(confidence_score, &settings.confidence),
        blinks_per_minute,
        head_movement,
        hand_visibility_percentage,
        gesture_level: classify_gestures(hand_visibility_percentage, &settings.gestures),
        shoulder_alignment,
        posture_level: classify_posture(shoulder_alignment, &settings.posture),
    };

    info!(
        target: "app::analysis",
        eye_contact = ?assessment.eye_contact_percentage,
        eye_contact_level = %assessment.eye_contact_level,
        expressiveness_level = %assessment.expressiveness_level,
        confidence_level = %assessment.confidence_level,
        gesture_level = %assessment.gesture_level,
        posture_level = %assessment.posture_level,
        "visual assessment complete"
    );

    assessment
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gaze() -> GazeSettings {
        GazeSettings::default()
    }

    fn stats(mean: f64, std: f64, min: f64, max: f64) -> StreamStats {
        StreamStats {
            count: 10,
            rejected: 0,
            mean,
            std,
            min,
            max,
            p75: max,
            p90: max,
        }
    }

    #[test]
    fn eye_contact_boundaries() {
        assert_eq!(eye_contact_percentage(0.008, &gaze()), 100.0);
        assert_eq!(eye_contact_percentage(0.012, &gaze()), 0.0);
        assert!((eye_contact_percentage(0.010, &gaze()) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn eye_contact_is_non_increasing() {
        let mut previous = f64::INFINITY;
        for step in 0..=200 {
            let combined = step as f64 * 0.0001;
            let pct = eye_contact_percentage(combined, &gaze());
            assert!(pct <= previous);
            previous = pct;
        }
    }

    #[test]
    fn eye_contact_levels() {
        assert_eq!(classify_eye_contact(Some(70.0), &gaze()), Level::High);
        assert_eq!(classify_eye_contact(Some(40.0), &gaze()), Level::Medium);
        assert_eq!(classify_eye_contact(Some(39.9), &gaze()), Level::Low);
        assert_eq!(classify_eye_contact(None, &gaze()), Level::Unknown);
    }

    #[test]
    fn expressiveness_combines_three_streams() {
        let settings = ExpressivenessSettings::default();
        let mouth = stats(0.03, 0.01, 0.0, 0.04);
        let brow = stats(0.05, 0.01, 0.04, 0.06);
        let hands = stats(0.0, 0.0, 0.0, 0.0);

        let score = expressiveness_score(Some(&mouth), Some(&brow), Some(&hands), &settings)
            .unwrap();
        // mouth 0.019, brow 0.013, hands 0
        assert!((score - (0.4 * 0.019 + 0.3 * 0.013)).abs() < 1e-12);
        assert_eq!(classify_expressiveness(Some(score), &settings), Level::Medium);

        assert!(expressiveness_score(Some(&mouth), None, Some(&hands), &settings).is_none());
        assert_eq!(classify_expressiveness(None, &settings), Level::Unknown);
    }

    #[test]
    fn blink_score_shape() {
        let settings = ConfidenceSettings::default();
        assert_eq!(blink_score(0.0, &settings), 0.0);
        assert!((blink_score(6.0, &settings) - 0.5).abs() < 1e-12);
        assert_eq!(blink_score(12.0, &settings), 1.0);
        assert_eq!(blink_score(25.0, &settings), 1.0);
        assert!((blink_score(40.0, &settings) - 0.5).abs() < 1e-12);
        assert_eq!(blink_score(55.0, &settings), 0.0);
        assert_eq!(blink_score(80.0, &settings), 0.0);
    }

    #[test]
    fn confidence_needs_head_samples() {
        let settings = ConfidenceSettings::default();
        assert!(confidence_score(None, 15.0, &settings).is_none());

        let score = confidence_score(Some(0.01), 15.0, &settings).unwrap();
        assert!((score - (0.6 * 0.8 + 0.4)).abs() < 1e-12);
        assert_eq!(classify_confidence(Some(score), &settings), Level::High);
        assert_eq!(classify_confidence(Some(0.4), &settings), Level::Medium);
        assert_eq!(classify_confidence(Some(0.39), &settings), Level::Low);
    }

    #[test]
    fn posture_switches_regime_on_magnitude() {
        let settings = PostureSettings::default();
        assert_eq!(classify_posture(Some(0.010), &settings), PostureLevel::Good);
        assert_eq!(classify_posture(Some(0.020), &settings), PostureLevel::Fair);
        assert_eq!(classify_posture(Some(0.050), &settings), PostureLevel::Poor);
        assert_eq!(classify_posture(Some(0.500), &settings), PostureLevel::Good);
        assert_eq!(classify_posture(Some(0.700), &settings), PostureLevel::Fair);
        assert_eq!(classify_posture(Some(0.800), &settings), PostureLevel::Poor);
        assert_eq!(classify_posture(None, &settings), PostureLevel::Unknown);
    }

    #[test]
    fn gestures_from_hand_visibility() {
        let settings = GestureSettings::default();
        let pct = hand_visibility_percentage(5, 10);
        assert_eq!(pct, Some(50.0));
        assert_eq!(classify_gestures(pct, &settings), GestureLevel::Frequent);
        assert_eq!(classify_gestures(Some(20.0), &settings), GestureLevel::Moderate);
        assert_eq!(classify_gestures(Some(5.0), &settings), GestureLevel::Scarce);
        assert_eq!(
            classify_gestures(hand_visibility_percentage(0, 0), &settings),
            GestureLevel::Unknown
        );
    }
}
