//! Landmark sets produced by the external detector for a single frame.
//!
//! Coordinates are normalized to `[0, 1]` relative to the frame, the way the
//! face-mesh / hands / pose models report them.

use serde::{Deserialize, Serialize};

/// Face-mesh indices of the points the feature extractor reads.
pub mod mesh_indices {
    pub const LEFT_IRIS: usize = 469;
    pub const RIGHT_IRIS: usize = 474;

    pub const LEFT_EYE_OUTER: usize = 33;
    pub const LEFT_EYE_INNER: usize = 133;
    pub const LEFT_EYE_TOP: usize = 159;
    pub const LEFT_EYE_BOTTOM: usize = 145;

    pub const RIGHT_EYE_INNER: usize = 263;
    pub const RIGHT_EYE_OUTER: usize = 362;
    pub const RIGHT_EYE_TOP: usize = 386;
    pub const RIGHT_EYE_BOTTOM: usize = 374;

    pub const UPPER_LIP: usize = 13;
    pub const LOWER_LIP: usize = 14;
    pub const NOSE_TIP: usize = 1;

    pub const EYEBROWS: [usize; 10] = [70, 63, 105, 66, 107, 300, 293, 334, 296, 336];

    /// Refined meshes (with iris) carry 478 points.
    pub const REFINED_MESH_LEN: usize = 478;
}

/// Pose-model indices.
pub mod pose_indices {
    pub const LEFT_SHOULDER: usize = 11;
    pub const RIGHT_SHOULDER: usize = 12;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point2) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceLandmarks {
    pub left_iris: Point2,
    pub right_iris: Point2,
    pub left_eye_outer: Point2,
    pub left_eye_inner: Point2,
    pub left_eye_top: Point2,
    pub left_eye_bottom: Point2,
    pub right_eye_inner: Point2,
    pub right_eye_outer: Point2,
    pub right_eye_top: Point2,
    pub right_eye_bottom: Point2,
    pub upper_lip: Point2,
    pub lower_lip: Point2,
    pub nose_tip: Point2,
    #[serde(default)]
    pub eyebrows: Vec<Point2>,
}

impl FaceLandmarks {
    /// Picks the named points out of a refined face mesh. Returns `None` when the
    /// mesh is too short to contain the iris points.
    pub fn from_mesh(mesh: &[Point2]) -> Option<Self> {
        use mesh_indices::*;

        if mesh.len() < REFINED_MESH_LEN {
            return None;
        }

        Some(Self {
            left_iris: mesh[LEFT_IRIS],
            right_iris: mesh[RIGHT_IRIS],
            left_eye_outer: mesh[LEFT_EYE_OUTER],
            left_eye_inner: mesh[LEFT_EYE_INNER],
            left_eye_top: mesh[LEFT_EYE_TOP],
            left_eye_bottom: mesh[LEFT_EYE_BOTTOM],
            right_eye_inner: mesh[RIGHT_EYE_INNER],
            right_eye_outer: mesh[RIGHT_EYE_OUTER],
            right_eye_top: mesh[RIGHT_EYE_TOP],
            right_eye_bottom: mesh[RIGHT_EYE_BOTTOM],
            upper_lip: mesh[UPPER_LIP],
            lower_lip: mesh[LOWER_LIP],
            nose_tip: mesh[NOSE_TIP],
            eyebrows: EYEBROWS.iter().map(|&idx| mesh[idx]).collect(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandLandmarks {
    pub points: Vec<Point2>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoseLandmarks {
    pub left_shoulder: Point2,
    pub right_shoulder: Point2,
}

impl PoseLandmarks {
    pub fn from_pose(points: &[Point2]) -> Option<Self> {
        Some(Self {
            left_shoulder: *points.get(pose_indices::LEFT_SHOULDER)?,
            right_shoulder: *points.get(pose_indices::RIGHT_SHOULDER)?,
        })
    }
}

/// Detector output for one sampled frame. Each subsystem may be absent
/// independently.
///
/// `hands` distinguishes "hand model produced nothing" (`None`) from "hand
/// model ran and saw no hands" (`Some(vec![])`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameLandmarks {
    #[serde(default)]
    pub face: Option<FaceLandmarks>,
    #[serde(default)]
    pub hands: Option<Vec<HandLandmarks>>,
    #[serde(default)]
    pub pose: Option<PoseLandmarks>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameDimensions {
    pub width: u32,
    pub height: u32,
}

impl Default for FrameDimensions {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Everything the detector reports for one recording: frame geometry, the
/// duration covered and the ordered sampled frames.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandmarkTrack {
    pub dimensions: FrameDimensions,
    pub duration_seconds: f64,
    pub frames: Vec<FrameLandmarks>,
}

/// Transcriber output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    pub text: String,
    pub duration_seconds: f64,
}

impl Transcript {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}
