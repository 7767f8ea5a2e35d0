//! Seams to the external landmark detector and speech transcriber.
//!
//! Both are blocking calls and run on the blocking pool. The JSON
//! implementations read detector/transcriber output that was produced ahead of
//! time and stored next to the recording.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::landmarks::{
    FaceLandmarks, FrameDimensions, FrameLandmarks, HandLandmarks, LandmarkTrack, Point2,
    PoseLandmarks, Transcript,
};

pub trait LandmarkDetector: Send + Sync {
    /// Runs detection over every sampled frame of the recording. An error
    /// means the recording could not be decoded.
    fn detect(&self, recording: &Path) -> AppResult<LandmarkTrack>;
}

pub trait SpeechTranscriber: Send + Sync {
    fn transcribe(&self, recording: &Path) -> AppResult<Transcript>;
}

/// Raw detector output: full point arrays per model, as the mesh, hands and
/// pose models emit them.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTrack {
    #[serde(default)]
    dimensions: FrameDimensions,
    duration_seconds: f64,
    frames: Vec<RawFrame>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFrame {
    #[serde(default)]
    face_mesh: Option<Vec<Point2>>,
    #[serde(default)]
    hands: Option<Vec<Vec<Point2>>>,
    #[serde(default)]
    pose: Option<Vec<Point2>>,
}

impl RawFrame {
    fn into_landmarks(self) -> FrameLandmarks {
        FrameLandmarks {
            face: self
                .face_mesh
                .as_deref()
                .and_then(FaceLandmarks::from_mesh),
            hands: self.hands.map(|hands| {
                hands
                    .into_iter()
                    .map(|points| HandLandmarks { points })
                    .collect()
            }),
            pose: self.pose.as_deref().and_then(PoseLandmarks::from_pose),
        }
    }
}

fn sidecar_path(recording: &Path, suffix: &str) -> PathBuf {
    let mut name = recording
        .file_stem()
        .map(|stem| stem.to_os_string())
        .unwrap_or_default();
    name.push(suffix);
    recording.with_file_name(name)
}

fn read_sidecar(path: &Path, recording: &Path) -> AppResult<String> {
    fs::read_to_string(path).map_err(|err| {
        AppError::source_unavailable(
            recording.display().to_string(),
            format!("cannot read {}: {err}", path.display()),
        )
    })
}

/// Reads `<stem>.landmarks.json` next to the recording, or a fixed file.
#[derive(Debug, Clone, Default)]
pub struct JsonLandmarkDetector {
    path: Option<PathBuf>,
}

impl JsonLandmarkDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }
}

impl LandmarkDetector for JsonLandmarkDetector {
    fn detect(&self, recording: &Path) -> AppResult<LandmarkTrack> {
        let path = self
            .path
            .clone()
            .unwrap_or_else(|| sidecar_path(recording, ".landmarks.json"));
        let raw = read_sidecar(&path, recording)?;
        let track: RawTrack = serde_json::from_str(&raw).map_err(|err| {
            AppError::source_unavailable(
                recording.display().to_string(),
                format!("undecodable landmark data: {err}"),
            )
        })?;

        debug!(
            target: "app::analysis",
            path = %path.display(),
            frames = track.frames.len(),
            "loaded landmark track"
        );

        Ok(LandmarkTrack {
            dimensions: track.dimensions,
            duration_seconds: track.duration_seconds,
            frames: track
                .frames
                .into_iter()
                .map(RawFrame::into_landmarks)
                .collect(),
        })
    }
}

/// Reads `<stem>.transcript.json` next to the recording, or a fixed file.
#[derive(Debug, Clone, Default)]
pub struct JsonTranscriber {
    path: Option<PathBuf>,
}

impl JsonTranscriber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }
}

impl SpeechTranscriber for JsonTranscriber {
    fn transcribe(&self, recording: &Path) -> AppResult<Transcript> {
        let path = self
            .path
            .clone()
            .unwrap_or_else(|| sidecar_path(recording, ".transcript.json"));
        let raw = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::landmarks::mesh_indices::REFINED_MESH_LEN;

    #[test]
    fn sidecar_sits_next_to_recording() {
        let path = sidecar_path(Path::new("/tmp/rec/talk.mp4"), ".landmarks.json");
        assert_eq!(path, PathBuf::from("/tmp/rec/talk.landmarks.json"));
    }

    #[test]
    fn raw_frames_map_through_adapters() {
        let dir = tempfile::tempdir().unwrap();
        let recording = dir.path().join("talk.mp4");
        let mesh = vec![Point2::new(0.5, 0.5); REFINED_MESH_LEN];
        let short_mesh = vec![Point2::new(0.5, 0.5); 10];
        let pose = vec![Point2::new(0.5, 0.5); 33];
        let body = serde_json::json!({
            "dimensions": {"width": 640, "height": 480},
            "durationSeconds": 12.5,
            "frames": [
                {"faceMesh": mesh, "hands": [], "pose": pose},
                {"faceMesh": short_mesh},
                {}
            ]
        });
        fs::write(
            dir.path().join("talk.landmarks.json"),
            serde_json::to_string(&body).unwrap(),
        )
        .unwrap();

        let track = JsonLandmarkDetector::new().detect(&recording).unwrap();
        assert_eq!(track.dimensions.width, 640);
        assert_eq!(track.frames.len(), 3);
        assert!(track.frames[0].face.is_some());
        assert_eq!(track.frames[0].hands, Some(Vec::new()));
        assert!(track.frames[0].pose.is_some());
        assert!(track.frames[1].face.is_none());
        assert_eq!(track.frames[2], FrameLandmarks::default());
    }

    #[test]
    fn missing_landmarks_are_source_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = JsonLandmarkDetector::new()
            .detect(&dir.path().join("missing.mp4"))
            .unwrap_err();
        assert!(err.is_source_unavailable());
    }
}
