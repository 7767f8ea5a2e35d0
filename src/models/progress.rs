use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::metrics::OverallScore;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum TrendMetric {
    FillerCount,
    EyeContact,
    Expressiveness,
    Speed,
}

impl TrendMetric {
    pub const ALL: [TrendMetric; 4] = [
        TrendMetric::FillerCount,
        TrendMetric::EyeContact,
        TrendMetric::Expressiveness,
        TrendMetric::Speed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrendMetric::FillerCount => "fillerCount",
            TrendMetric::EyeContact => "eyeContact",
            TrendMetric::Expressiveness => "expressiveness",
            TrendMetric::Speed => "speed",
        }
    }

    /// Sign applied to the raw relative change so that a positive number
    /// always reads as an improvement. Speed has no better direction.
    pub fn improvement_sign(&self) -> f64 {
        match self {
            TrendMetric::FillerCount => -1.0,
            TrendMetric::EyeContact | TrendMetric::Expressiveness | TrendMetric::Speed => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TrendMode {
    /// Fewer than two sessions: nothing to compare.
    InsufficientHistory,
    /// First half of the history against the second half.
    HalfSplit,
    /// Latest `W` sessions against the `W` before them.
    Windowed,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricTrend {
    pub before: f64,
    pub after: f64,
    pub percent_change: f64,
    /// Whether both sides had at least one measured value.
    pub known: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrendWindow {
    pub mode: TrendMode,
    pub sessions_before: usize,
    pub sessions_after: usize,
    pub metrics: BTreeMap<TrendMetric, MetricTrend>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum WeaknessArea {
    Fillers,
    EyeContact,
    Expressiveness,
    SlowPace,
    FastPace,
    Gestures,
    Posture,
    Confidence,
    // generic advanced-practice areas
    Storytelling,
    VocalVariety,
    Improvisation,
}

impl WeaknessArea {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeaknessArea::Fillers => "fillers",
            WeaknessArea::EyeContact => "eyeContact",
            WeaknessArea::Expressiveness => "expressiveness",
            WeaknessArea::SlowPace => "slowPace",
            WeaknessArea::FastPace => "fastPace",
            WeaknessArea::Gestures => "gestures",
            WeaknessArea::Posture => "posture",
            WeaknessArea::Confidence => "confidence",
            WeaknessArea::Storytelling => "storytelling",
            WeaknessArea::VocalVariety => "vocalVariety",
            WeaknessArea::Improvisation => "improvisation",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WeaknessArea::Fillers => "Reduce filler words",
            WeaknessArea::EyeContact => "Hold eye contact with the camera",
            WeaknessArea::Expressiveness => "Add facial and gestural expression",
            WeaknessArea::SlowPace => "Pick up the speaking pace",
            WeaknessArea::FastPace => "Slow down and pause",
            WeaknessArea::Gestures => "Use your hands to support the message",
            WeaknessArea::Posture => "Keep shoulders level and open",
            WeaknessArea::Confidence => "Stay steady and composed",
            WeaknessArea::Storytelling => "Structure talks as stories",
            WeaknessArea::VocalVariety => "Vary pitch, volume and rhythm",
            WeaknessArea::Improvisation => "Speak well without preparation",
        }
    }
}

impl fmt::Display for WeaknessArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    /// Used for generic areas when nothing needs fixing.
    Maintenance,
}

impl Severity {
    pub fn priority(&self) -> u8 {
        match self {
            Severity::High => 1,
            Severity::Medium => 2,
            Severity::Maintenance => 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Weakness {
    pub area: WeaknessArea,
    pub level: Severity,
    pub priority: u8,
    /// Unitless severity in `[0, 1]`; ranks weaknesses of equal priority.
    pub value: f64,
    /// The measured quantity that triggered the flag, in its own unit.
    pub observed: f64,
}

impl Weakness {
    pub fn new(area: WeaknessArea, level: Severity, value: f64, observed: f64) -> Self {
        Self {
            area,
            level,
            priority: level.priority(),
            value: value.clamp(0.0, 1.0),
            observed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub user_id: i64,
    pub total_sessions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_overall: Option<OverallScore>,
    pub trend: TrendWindow,
    pub weaknesses: Vec<Weakness>,
}
