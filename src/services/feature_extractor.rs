//! Per-frame feature extraction.
//!
//! Every function here is pure: a frame's features depend only on that
//! frame's landmarks and the frame geometry. Anything that needs the previous
//! frame (head displacement, blink transitions) is derived later by the
//! aggregator from the ordered feature sequence.

use std::thread;

use crate::models::features::FrameFeatures;
use crate::models::landmarks::{
    FaceLandmarks, FrameDimensions, FrameLandmarks, HandLandmarks, Point2, PoseLandmarks,
};
use crate::utils::stats;

pub fn extract_frame_features(frame: &FrameLandmarks, dims: FrameDimensions) -> FrameFeatures {
    let mut features = FrameFeatures::default();

    if let Some(face) = &frame.face {
        apply_face(&mut features, face, dims);
    }

    if let Some(hands) = &frame.hands {
        let (dispersion, visible) = hand_dispersion(hands);
        features.hand_dispersion = Some(dispersion);
        features.hands_visible = visible;
    }

    if let Some(pose) = &frame.pose {
        features.shoulder_alignment = Some(shoulder_alignment(pose));
    }

    features
}

/// Extracts every frame in order.
pub fn extract_all(frames: &[FrameLandmarks], dims: FrameDimensions) -> Vec<FrameFeatures> {
    frames
        .iter()
        .map(|frame| extract_frame_features(frame, dims))
        .collect()
}

/// Same output as [`extract_all`], computed on up to `shards` scoped threads.
/// Chunks are joined back in frame order.
pub fn extract_sharded(
    frames: &[FrameLandmarks],
    dims: FrameDimensions,
    shards: usize,
) -> Vec<FrameFeatures> {
    let shards = shards.max(1);
    if shards == 1 || frames.len() < shards * 2 {
        return extract_all(frames, dims);
    }

    let chunk_size = frames.len().div_ceil(shards);
    thread::scope(|scope| {
        let handles: Vec<_> = frames
            .chunks(chunk_size)
            .map(|chunk| scope.spawn(move || extract_all(chunk, dims)))
            .collect();

        let mut features = Vec::with_capacity(frames.len());
        for handle in handles {
            match handle.join() {
                Ok(chunk) => features.extend(chunk),
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
        features
    })
}

fn apply_face(features: &mut FrameFeatures, face: &FaceLandmarks, dims: FrameDimensions) {
    let left_center = eye_center(
        &face.left_eye_outer,
        &face.left_eye_inner,
        &face.left_eye_top,
        &face.left_eye_bottom,
    );
    let right_center = eye_center(
        &face.right_eye_inner,
        &face.right_eye_outer,
        &face.right_eye_top,
        &face.right_eye_bottom,
    );
    features.gaze_deviation_left = Some(face.left_iris.distance(&left_center));
    features.gaze_deviation_right = Some(face.right_iris.distance(&right_center));

    features.mouth_opening = Some((face.lower_lip.y - face.upper_lip.y).abs());

    if !face.eyebrows.is_empty() {
        let brow_y = centroid_y(&face.eyebrows);
        let eye_y = centroid_y(&[
            face.left_eye_top,
            face.left_eye_bottom,
            face.right_eye_top,
            face.right_eye_bottom,
        ]);
        features.eyebrow_lift = Some((eye_y - brow_y).abs());
    }

    let left_open = (face.left_eye_bottom.y - face.left_eye_top.y).abs();
    let right_open = (face.right_eye_bottom.y - face.right_eye_top.y).abs();
    features.eye_openness = Some((left_open + right_open) / 2.0);

    features.head_position = Some(Point2::new(
        face.nose_tip.x * f64::from(dims.width),
        face.nose_tip.y * f64::from(dims.height),
    ));
}

/// Combined x/y spread of every visible hand point. Zero with no hands.
fn hand_dispersion(hands: &[HandLandmarks]) -> (f64, bool) {
    let xs: Vec<f64> = hands
        .iter()
        .flat_map(|hand| hand.points.iter().map(|p| p.x))
        .collect();
    if xs.is_empty() {
        return (0.0, false);
    }
    let ys: Vec<f64> = hands
        .iter()
        .flat_map(|hand| hand.points.iter().map(|p| p.y))
        .collect();

    let x_std = stats::std_dev(&xs).unwrap_or(0.0);
    let y_std = stats::std_dev(&ys).unwrap_or(0.0);
    (x_std.hypot(y_std), true)
}

fn shoulder_alignment(pose: &PoseLandmarks) -> f64 {
    (pose.left_shoulder.y - pose.right_shoulder.y).abs()
}

/// Socket center: horizontal from the corners, vertical from the lids.
fn eye_center(corner_a: &Point2, corner_b: &Point2, top: &Point2, bottom: &Point2) -> Point2 {
    Point2::new((corner_a.x + corner_b.x) / 2.0, (top.y + bottom.y) / 2.0)
}

fn centroid_y(points: &[Point2]) -> f64 {
    points.iter().map(|p| p.y).sum::<f64>() / points.len() as f64
}
