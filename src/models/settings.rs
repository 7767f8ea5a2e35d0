use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Calibrated constants of the analysis engine. Every field has a default, so a
/// config file only needs to carry what it overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisSettings {
    pub signals: SignalSettings,
    pub gaze: GazeSettings,
    pub expressiveness: ExpressivenessSettings,
    pub confidence: ConfidenceSettings,
    pub posture: PostureSettings,
    pub gestures: GestureSettings,
    pub audio: AudioSettings,
    pub scoring: ScoringSettings,
    pub progress: ProgressSettings,
    pub fetch: FetchSettings,
}

/// Sanity ceilings (a sample at or above its ceiling is a detector glitch) and
/// the minimum number of surviving samples a statistic needs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SignalSettings {
    pub min_samples: usize,
    pub gaze_ceiling: f64,
    pub mouth_ceiling: f64,
    pub eyebrow_ceiling: f64,
    pub hand_ceiling: f64,
    pub head_displacement_ceiling: f64,
    pub eye_openness_ceiling: f64,
    pub shoulder_ceiling: f64,
}

impl Default for SignalSettings {
    fn default() -> Self {
        Self {
            min_samples: 3,
            gaze_ceiling: 2.0,
            mouth_ceiling: 1.0,
            eyebrow_ceiling: 1.0,
            hand_ceiling: 1.0,
            head_displacement_ceiling: 1.0,
            eye_openness_ceiling: 1.0,
            shoulder_ceiling: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GazeSettings {
    pub mean_weight: f64,
    pub std_weight: f64,
    /// Combined deviation at or below which contact is 100%.
    pub full_contact_at: f64,
    /// Combined deviation at or above which contact is 0%.
    pub no_contact_at: f64,
    pub high_percentage: f64,
    pub medium_percentage: f64,
}

impl Default for GazeSettings {
    fn default() -> Self {
        Self {
            mean_weight: 0.6,
            std_weight: 0.4,
            full_contact_at: 0.008,
            no_contact_at: 0.012,
            high_percentage: 70.0,
            medium_percentage: 40.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ExpressivenessSettings {
    pub std_weight: f64,
    pub range_weight: f64,
    pub mouth_weight: f64,
    pub eyebrow_weight: f64,
    pub hand_weight: f64,
    pub high_score: f64,
    pub medium_score: f64,
}

impl Default for ExpressivenessSettings {
    fn default() -> Self {
        Self {
            std_weight: 0.7,
            range_weight: 0.3,
            mouth_weight: 0.4,
            eyebrow_weight: 0.3,
            hand_weight: 0.3,
            high_score: 0.02,
            medium_score: 0.01,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfidenceSettings {
    pub movement_penalty: f64,
    pub movement_weight: f64,
    pub blink_weight: f64,
    pub blink_optimal_min: f64,
    pub blink_optimal_max: f64,
    /// Blink rate at which the above-range score reaches zero.
    pub blink_zero_at: f64,
    /// Eye openness must rise above this to arm the blink detector.
    pub blink_open_above: f64,
    /// Eye openness below this counts as closed.
    pub blink_closed_below: f64,
    pub high_score: f64,
    pub medium_score: f64,
}

impl Default for ConfidenceSettings {
    fn default() -> Self {
        Self {
            movement_penalty: 20.0,
            movement_weight: 0.6,
            blink_weight: 0.4,
            blink_optimal_min: 12.0,
            blink_optimal_max: 25.0,
            blink_zero_at: 55.0,
            blink_open_above: 0.15,
            blink_closed_below: 0.10,
            high_score: 0.7,
            medium_score: 0.4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PostureSettings {
    /// Mean alignment above this suggests vertically framed footage.
    pub vertical_framing_above: f64,
    pub vertical_good_below: f64,
    pub vertical_fair_below: f64,
    pub horizontal_good_below: f64,
    pub horizontal_fair_below: f64,
}

impl Default for PostureSettings {
    fn default() -> Self {
        Self {
            vertical_framing_above: 0.1,
            vertical_good_below: 0.68,
            vertical_fair_below: 0.75,
            horizontal_good_below: 0.015,
            horizontal_fair_below: 0.03,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GestureSettings {
    pub frequent_percentage: f64,
    pub moderate_percentage: f64,
}

impl Default for GestureSettings {
    fn default() -> Self {
        Self {
            frequent_percentage: 50.0,
            moderate_percentage: 20.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FillerLanguage {
    #[default]
    Spanish,
    English,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AudioSettings {
    pub language: FillerLanguage,
    /// Extra filler patterns appended to the language lexicon.
    pub extra_filler_patterns: Vec<String>,
    pub slow_below_wpm: f64,
    pub fast_above_wpm: f64,
    pub max_filler_examples: usize,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            language: FillerLanguage::Spanish,
            extra_filler_patterns: Vec::new(),
            slow_below_wpm: 120.0,
            fast_above_wpm: 180.0,
            max_filler_examples: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoringSettings {
    pub filler_full_point_max_rate: f64,
    pub filler_half_point_max_rate: f64,
    pub green_percentage: f64,
    pub yellow_percentage: f64,
    pub max_comment_observations: usize,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            filler_full_point_max_rate: 2.0,
            filler_half_point_max_rate: 5.0,
            green_percentage: 70.0,
            yellow_percentage: 40.0,
            max_comment_observations: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressSettings {
    pub trend_window: usize,
    pub trend_epsilon: f64,
    pub weakness_lookback: usize,
    pub max_weaknesses: usize,
}

impl Default for ProgressSettings {
    fn default() -> Self {
        Self {
            trend_window: 3,
            trend_epsilon: 1e-6,
            weakness_lookback: 5,
            max_weaknesses: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FetchSettings {
    pub timeout_secs: u64,
    /// Where downloaded recordings are staged. Defaults to the system temp dir.
    pub work_dir: Option<PathBuf>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            work_dir: None,
        }
    }
}
