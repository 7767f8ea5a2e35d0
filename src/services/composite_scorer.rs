use serde::Serialize;
use tracing::debug;

use crate::models::metrics::{Level, OverallScore, PostureLevel, SpeedLevel};
use crate::models::settings::ScoringSettings;

const MAX_POINTS: f64 = 5.0;

/// Points per factor, each 0, 0.5 or 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub eye_contact: f64,
    pub expressiveness: f64,
    pub confidence: f64,
    pub fillers: f64,
    pub speed: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.eye_contact + self.expressiveness + self.confidence + self.fillers + self.speed
    }

    pub fn percentage(&self) -> f64 {
        self.total() * 100.0 / MAX_POINTS
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScoreInputs {
    pub eye_contact: Level,
    pub expressiveness: Level,
    pub confidence: Level,
    pub filler_rate_per_minute: f64,
    pub speed: SpeedLevel,
    pub posture: PostureLevel,
}

pub fn filler_points(rate_per_minute: f64, settings: &ScoringSettings) -> f64 {
    if rate_per_minute <= settings.filler_full_point_max_rate {
        1.0
    } else if rate_per_minute <= settings.filler_half_point_max_rate {
        0.5
    } else {
        0.0
    }
}

pub fn speed_points(speed: SpeedLevel) -> f64 {
    match speed {
        SpeedLevel::Normal => 1.0,
        SpeedLevel::Slow | SpeedLevel::Fast => 0.5,
        SpeedLevel::Unknown => 0.0,
    }
}

pub fn breakdown(inputs: &ScoreInputs, settings: &ScoringSettings) -> ScoreBreakdown {
    ScoreBreakdown {
        eye_contact: inputs.eye_contact.points(),
        expressiveness: inputs.expressiveness.points(),
        confidence: inputs.confidence.points(),
        fillers: filler_points(inputs.filler_rate_per_minute, settings),
        speed: speed_points(inputs.speed),
    }
}

/// Posture is a hard ceiling: without a good or fair posture the top tier is
/// out of reach whatever the percentage.
pub fn tier(percentage: f64, posture: PostureLevel, settings: &ScoringSettings) -> OverallScore {
    if percentage >= settings.green_percentage {
        if posture.permits_green() {
            OverallScore::Green
        } else {
            OverallScore::Yellow
        }
    } else if percentage >= settings.yellow_percentage {
        OverallScore::Yellow
    } else {
        OverallScore::Red
    }
}

pub fn score(inputs: &ScoreInputs, settings: &ScoringSettings) -> (OverallScore, ScoreBreakdown) {
    let breakdown = breakdown(inputs, settings);
    let overall = tier(breakdown.percentage(), inputs.posture, settings);
    debug!(
        target: "app::analysis",
        points = breakdown.total(),
        percentage = breakdown.percentage(),
        posture = %inputs.posture,
        overall = %overall,
        "composite score"
    );
    (overall, breakdown)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(posture: PostureLevel) -> ScoreInputs {
        // 1 + 0.5 + 0.5 + 1 + 0.5 = 3.5 points -> 70%
        ScoreInputs {
            eye_contact: Level::High,
            expressiveness: Level::Medium,
            confidence: Level::Medium,
            filler_rate_per_minute: 1.0,
            speed: SpeedLevel::Fast,
            posture,
        }
    }

    #[test]
    fn seventy_percent_with_poor_posture_is_yellow() {
        let settings = ScoringSettings::default();
        let (overall, breakdown) = score(&inputs(PostureLevel::Poor), &settings);
        assert!((breakdown.percentage() - 70.0).abs() < 1e-9);
        assert_eq!(overall, OverallScore::Yellow);
    }

    #[test]
    fn seventy_percent_with_good_posture_is_green() {
        let settings = ScoringSettings::default();
        let (overall, _) = score(&inputs(PostureLevel::Good), &settings);
        assert_eq!(overall, OverallScore::Green);
        let (overall, _) = score(&inputs(PostureLevel::Fair), &settings);
        assert_eq!(overall, OverallScore::Green);
    }

    #[test]
    fn unknown_posture_cannot_be_green() {
        let settings = ScoringSettings::default();
        let (overall, _) = score(&inputs(PostureLevel::Unknown), &settings);
        assert_eq!(overall, OverallScore::Yellow);
    }

    #[test]
    fn no_combination_yields_green_with_poor_posture() {
        let settings = ScoringSettings::default();
        let levels = [Level::High, Level::Medium, Level::Low, Level::Unknown];
        let speeds = [SpeedLevel::Slow, SpeedLevel::Normal, SpeedLevel::Fast, SpeedLevel::Unknown];
        for eye in levels {
            for expr in levels {
                for conf in levels {
                    for speed in speeds {
                        for rate in [0.0, 3.0, 9.0] {
                            let inputs = ScoreInputs {
                                eye_contact: eye,
                                expressiveness: expr,
                                confidence: conf,
                                filler_rate_per_minute: rate,
                                speed,
                                posture: PostureLevel::Poor,
                            };
                            assert_ne!(score(&inputs, &settings).0, OverallScore::Green);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn filler_rate_points() {
        let settings = ScoringSettings::default();
        assert_eq!(filler_points(0.0, &settings), 1.0);
        assert_eq!(filler_points(2.0, &settings), 1.0);
        assert_eq!(filler_points(5.0, &settings), 0.5);
        assert_eq!(filler_points(5.1, &settings), 0.0);
    }

    #[test]
    fn low_totals_are_red() {
        let settings = ScoringSettings::default();
        assert_eq!(tier(39.9, PostureLevel::Good, &settings), OverallScore::Red);
        assert_eq!(tier(40.0, PostureLevel::Poor, &settings), OverallScore::Yellow);
    }
}
