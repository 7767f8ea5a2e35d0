use serde::{Deserialize, Serialize};

use crate::models::landmarks::Point2;

/// Scalar features of one sampled frame. `None` means the subsystem the
/// feature depends on had no detection in that frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameFeatures {
    pub gaze_deviation_left: Option<f64>,
    pub gaze_deviation_right: Option<f64>,
    pub mouth_opening: Option<f64>,
    pub eyebrow_lift: Option<f64>,
    pub hand_dispersion: Option<f64>,
    /// Whether at least one hand was detected.
    pub hands_visible: bool,
    /// Head reference point in pixel space.
    pub head_position: Option<Point2>,
    pub eye_openness: Option<f64>,
    pub shoulder_alignment: Option<f64>,
}

impl FrameFeatures {
    pub fn has_face(&self) -> bool {
        self.gaze_deviation_left.is_some() || self.head_position.is_some()
    }

    pub fn has_pose(&self) -> bool {
        self.shoulder_alignment.is_some()
    }
}

/// Metric streams the aggregator keeps, each with its own sanity ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Gaze,
    MouthOpening,
    EyebrowLift,
    HandDispersion,
    HeadDisplacement,
    EyeOpenness,
    ShoulderAlignment,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Gaze => "gaze",
            MetricKind::MouthOpening => "mouth_opening",
            MetricKind::EyebrowLift => "eyebrow_lift",
            MetricKind::HandDispersion => "hand_dispersion",
            MetricKind::HeadDisplacement => "head_displacement",
            MetricKind::EyeOpenness => "eye_openness",
            MetricKind::ShoulderAlignment => "shoulder_alignment",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Robust statistics of one filtered stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStats {
    pub count: usize,
    pub rejected: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub p75: f64,
    pub p90: f64,
}

impl StreamStats {
    pub fn range(&self) -> f64 {
        self.max - self.min
    }
}
