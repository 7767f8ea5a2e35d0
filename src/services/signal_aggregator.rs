//! Session-level reduction of per-frame feature streams.
//!
//! A [`SessionAccumulator`] is created for one analysis run, fed the ordered
//! frame features and consumed by [`SessionAccumulator::finish`]. It is never
//! shared between runs.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::models::features::{FrameFeatures, MetricKind, StreamStats};
use crate::models::landmarks::{FrameDimensions, Point2};
use crate::models::metrics::{MetricGap, Subsystem};
use crate::models::settings::{ConfidenceSettings, SignalSettings};
use crate::utils::stats;

/// Filters `values` against `ceiling` and reduces the survivors.
///
/// A sample is rejected when it is not finite or its magnitude is at or above
/// the ceiling. Fewer than `min_samples` survivors is a gap, not an error.
pub fn aggregate(
    metric: MetricKind,
    values: &[f64],
    ceiling: f64,
    min_samples: usize,
) -> Result<StreamStats, MetricGap> {
    let valid: Vec<f64> = values
        .iter()
        .copied()
        .filter(|value| value.is_finite() && value.abs() < ceiling)
        .collect();
    let rejected = values.len() - valid.len();

    if valid.len() < min_samples {
        return Err(MetricGap::InsufficientSamples {
            metric,
            valid: valid.len(),
            required: min_samples,
        });
    }

    let sorted = stats::sorted(&valid);
    let count = sorted.len();
    let mean = sorted.iter().sum::<f64>() / count as f64;
    let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;

    Ok(StreamStats {
        count,
        rejected,
        mean,
        std: variance.sqrt(),
        min: sorted[0],
        max: sorted[count - 1],
        p75: stats::percentile_of_sorted(&sorted, 75.0),
        p90: stats::percentile_of_sorted(&sorted, 90.0),
    })
}

#[derive(Debug, Clone)]
pub struct SessionAccumulator {
    frame_width: f64,
    blink_open_above: f64,
    blink_closed_below: f64,
    streams: BTreeMap<MetricKind, Vec<f64>>,
    previous_head: Option<Point2>,
    blink_armed: bool,
    blink_count: u32,
    frames_analyzed: usize,
    frames_with_face: usize,
    frames_with_hands: usize,
    frames_with_pose: usize,
    frames_with_hand_model: usize,
}

impl SessionAccumulator {
    pub fn new(dims: FrameDimensions, confidence: &ConfidenceSettings) -> Self {
        Self {
            frame_width: f64::from(dims.width.max(1)),
            blink_open_above: confidence.blink_open_above,
            blink_closed_below: confidence.blink_closed_below,
            streams: BTreeMap::new(),
            previous_head: None,
            blink_armed: false,
            blink_count: 0,
            frames_analyzed: 0,
            frames_with_face: 0,
            frames_with_hands: 0,
            frames_with_pose: 0,
            frames_with_hand_model: 0,
        }
    }

    /// Feeds the next frame. Frames must arrive in capture order.
    pub fn push(&mut self, features: &FrameFeatures) {
        self.frames_analyzed += 1;

        if features.has_face() {
            self.frames_with_face += 1;
        }

        if let (Some(left), Some(right)) =
            (features.gaze_deviation_left, features.gaze_deviation_right)
        {
            if left > 0.0 || right > 0.0 {
                self.record(MetricKind::Gaze, (left + right) / 2.0);
            }
        }

        if let Some(mouth) = features.mouth_opening {
            self.record(MetricKind::MouthOpening, mouth);
        }
        if let Some(brow) = features.eyebrow_lift {
            self.record(MetricKind::EyebrowLift, brow);
        }

        if let Some(dispersion) = features.hand_dispersion {
            self.frames_with_hand_model += 1;
            self.record(MetricKind::HandDispersion, dispersion);
        }
        if features.hands_visible {
            self.frames_with_hands += 1;
        }

        if let Some(openness) = features.eye_openness {
            self.record(MetricKind::EyeOpenness, openness);
            if openness > self.blink_open_above {
                self.blink_armed = true;
            } else if self.blink_armed && openness < self.blink_closed_below {
                self.blink_count += 1;
                self.blink_armed = false;
            }
        }

        if let Some(head) = features.head_position {
            if let Some(previous) = self.previous_head {
                self.record(
                    MetricKind::HeadDisplacement,
                    head.distance(&previous) / self.frame_width,
                );
            }
            self.previous_head = Some(head);
        }

        if let Some(alignment) = features.shoulder_alignment {
            self.frames_with_pose += 1;
            self.record(MetricKind::ShoulderAlignment, alignment);
        }
    }

    pub fn extend<'a, I>(&mut self, features: I)
    where
        I: IntoIterator<Item = &'a FrameFeatures>,
    {
        for frame in features {
            self.push(frame);
        }
    }

    fn record(&mut self, metric: MetricKind, value: f64) {
        self.streams.entry(metric).or_default().push(value);
    }

    pub fn finish(self, signals: &SignalSettings) -> SessionAggregate {
        let mut results = BTreeMap::new();
        let mut gaps = Vec::new();
        let mut rejected_samples = 0;

        for metric in ALL_METRICS {
            let values = self.streams.get(&metric).map(Vec::as_slice).unwrap_or(&[]);
            let result = aggregate(metric, values, ceiling_for(signals, metric), signals.min_samples);
            match &result {
                Ok(stats) => {
                    rejected_samples += stats.rejected;
                    debug!(
                        target: "app::analysis",
                        metric = %metric,
                        count = stats.count,
                        rejected = stats.rejected,
                        mean = stats.mean,
                        std = stats.std,
                        "stream aggregated"
                    );
                }
                Err(gap) => {
                    let valid = match gap {
                        MetricGap::InsufficientSamples { valid, .. } => *valid,
                        _ => 0,
                    };
                    rejected_samples += values.len() - valid;
                    warn!(
                        target: "app::analysis",
                        metric = %metric,
                        samples = values.len(),
                        valid,
                        "insufficient samples, metric reports unknown"
                    );
                    gaps.push(gap.clone());
                }
            }
            results.insert(metric, result);
        }

        if self.frames_with_face == 0 {
            gaps.push(MetricGap::DetectionAbsent {
                subsystem: Subsystem::Face,
            });
        }
        if self.frames_with_hand_model == 0 {
            gaps.push(MetricGap::DetectionAbsent {
                subsystem: Subsystem::Hands,
            });
        }
        if self.frames_with_pose == 0 {
            gaps.push(MetricGap::DetectionAbsent {
                subsystem: Subsystem::Pose,
            });
        }

        SessionAggregate {
            streams: results,
            gaps,
            rejected_samples,
            blink_count: self.blink_count,
            frames_analyzed: self.frames_analyzed,
            frames_with_face: self.frames_with_face,
            frames_with_hands: self.frames_with_hands,
            frames_with_pose: self.frames_with_pose,
        }
    }
}

const ALL_METRICS: [MetricKind; 7] = [
    MetricKind::Gaze,
    MetricKind::MouthOpening,
    MetricKind::EyebrowLift,
    MetricKind::HandDispersion,
    MetricKind::HeadDisplacement,
    MetricKind::EyeOpenness,
    MetricKind::ShoulderAlignment,
];

fn ceiling_for(signals: &SignalSettings, metric: MetricKind) -> f64 {
    match metric {
        MetricKind::Gaze => signals.gaze_ceiling,
        MetricKind::MouthOpening => signals.mouth_ceiling,
        MetricKind::EyebrowLift => signals.eyebrow_ceiling,
        MetricKind::HandDispersion => signals.hand_ceiling,
        MetricKind::HeadDisplacement => signals.head_displacement_ceiling,
        MetricKind::EyeOpenness => signals.eye_openness_ceiling,
        MetricKind::ShoulderAlignment => signals.shoulder_ceiling,
    }
}

/// Everything the classifiers need from one run.
#[derive(Debug, Clone)]
pub struct SessionAggregate {
    pub streams: BTreeMap<MetricKind, Result<StreamStats, MetricGap>>,
    pub gaps: Vec<MetricGap>,
    pub rejected_samples: usize,
    pub blink_count: u32,
    pub frames_analyzed: usize,
    pub frames_with_face: usize,
    pub frames_with_hands: usize,
    pub frames_with_pose: usize,
}

impl SessionAggregate {
    pub fn stats(&self, metric: MetricKind) -> Option<&StreamStats> {
        self.streams.get(&metric).and_then(|result| result.as_ref().ok())
    }
}
