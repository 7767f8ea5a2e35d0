use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::features::MetricKind;

/// Three-step qualitative level shared by eye contact, expressiveness and
/// confidence.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    High,
    Medium,
    Low,
    #[default]
    Unknown,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::High => "high",
            Level::Medium => "medium",
            Level::Low => "low",
            Level::Unknown => "unknown",
        }
    }

    /// Composite-score points for this level.
    pub fn points(&self) -> f64 {
        match self {
            Level::High => 1.0,
            Level::Medium => 0.5,
            Level::Low | Level::Unknown => 0.0,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SpeedLevel {
    Slow,
    Normal,
    Fast,
    #[default]
    Unknown,
}

impl SpeedLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpeedLevel::Slow => "slow",
            SpeedLevel::Normal => "normal",
            SpeedLevel::Fast => "fast",
            SpeedLevel::Unknown => "unknown",
        }
    }

    /// Ordinal used for trend comparison (slow=0, normal=1, fast=2).
    pub fn ordinal(&self) -> Option<f64> {
        match self {
            SpeedLevel::Slow => Some(0.0),
            SpeedLevel::Normal => Some(1.0),
            SpeedLevel::Fast => Some(2.0),
            SpeedLevel::Unknown => None,
        }
    }
}

impl fmt::Display for SpeedLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PostureLevel {
    Good,
    Fair,
    Poor,
    #[default]
    Unknown,
}

impl PostureLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostureLevel::Good => "good",
            PostureLevel::Fair => "fair",
            PostureLevel::Poor => "poor",
            PostureLevel::Unknown => "unknown",
        }
    }

    /// Postures that allow the top composite tier.
    pub fn permits_green(&self) -> bool {
        matches!(self, PostureLevel::Good | PostureLevel::Fair)
    }
}

impl fmt::Display for PostureLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GestureLevel {
    Frequent,
    Moderate,
    Scarce,
    #[default]
    Unknown,
}

impl GestureLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            GestureLevel::Frequent => "frequent",
            GestureLevel::Moderate => "moderate",
            GestureLevel::Scarce => "scarce",
            GestureLevel::Unknown => "unknown",
        }
    }
}

impl fmt::Display for GestureLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OverallScore {
    Green,
    Yellow,
    Red,
}

impl OverallScore {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverallScore::Green => "green",
            OverallScore::Yellow => "yellow",
            OverallScore::Red => "red",
        }
    }

    pub fn weight(&self) -> f64 {
        match self {
            OverallScore::Green => 1.0,
            OverallScore::Yellow => 0.5,
            OverallScore::Red => 0.0,
        }
    }
}

impl fmt::Display for OverallScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for OverallScore {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "green" => Ok(OverallScore::Green),
            "yellow" => Ok(OverallScore::Yellow),
            "red" => Ok(OverallScore::Red),
            other => Err(format!("unsupported overall score: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Subsystem {
    Face,
    Hands,
    Pose,
}

/// Non-fatal reasons a metric could not be measured. These never abort a run;
/// the affected metric reports "unknown".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MetricGap {
    /// The detector never found this subsystem in any analyzed frame.
    DetectionAbsent { subsystem: Subsystem },
    InsufficientSamples {
        metric: MetricKind,
        valid: usize,
        required: usize,
    },
    TranscriptionEmpty,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QualityFlags {
    pub frames_analyzed: usize,
    pub frames_with_face: usize,
    pub frames_with_hands: usize,
    pub frames_with_pose: usize,
    pub rejected_samples: usize,
    pub video_usable: bool,
    pub audio_usable: bool,
    #[serde(default)]
    pub gaps: Vec<MetricGap>,
}

/// Durable output of one analysis run.
///
/// Every level field is a pure function of its numeric field; a `None`
/// numeric always maps to the `Unknown` level. The default value is the
/// snapshot of a run with no usable signal.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub transcription: String,
    pub duration_seconds: f64,
    pub word_count: u32,
    pub filler_count: u32,
    pub filler_rate_per_minute: f64,
    #[serde(default)]
    pub filler_examples: Vec<String>,
    pub words_per_minute: Option<f64>,
    pub speed_level: SpeedLevel,

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

    pub quality: QualityFlags,
}
