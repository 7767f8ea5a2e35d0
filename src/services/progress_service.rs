//! Longitudinal analytics over a user's finalized sessions.
//!
//! The free functions are pure and read-only over a history slice; the
//! service only loads that slice and assembles the summary.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::db::repositories::practice_repository::PracticeRepository;
use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::metrics::{GestureLevel, Level, OverallScore, PostureLevel, SpeedLevel};
use crate::models::progress::{
    MetricTrend, ProgressSummary, Severity, TrendMetric, TrendMode, TrendWindow, Weakness,
    WeaknessArea,
};
use crate::models::session::PracticeSession;
use crate::models::settings::{AnalysisSettings, ProgressSettings};
use crate::services::settings_service::SettingsService;

const FILLER_HIGH_MEAN: f64 = 5.0;
const FILLER_MEDIUM_MEAN: f64 = 2.0;
const EYE_CONTACT_HIGH_BELOW: f64 = 50.0;
const EYE_CONTACT_MEDIUM_BELOW: f64 = 70.0;
const SHARE_HIGH: f64 = 0.6;
const SHARE_MEDIUM: f64 = 0.3;
const POOR_POSTURE_HIGH_SHARE: f64 = 0.4;
const UNEVEN_POSTURE_MEDIUM_SHARE: f64 = 0.5;
const LOW_CONFIDENCE_MEDIUM_SHARE: f64 = 0.5;

const GENERIC_AREAS: [WeaknessArea; 3] = [
    WeaknessArea::Storytelling,
    WeaknessArea::VocalVariety,
    WeaknessArea::Improvisation,
];

fn metric_value(session: &PracticeSession, metric: TrendMetric) -> Option<f64> {
    let metrics = &session.metrics;
    match metric {
        TrendMetric::FillerCount => Some(f64::from(metrics.filler_count)),
        TrendMetric::EyeContact => metrics.eye_contact_percentage,
        TrendMetric::Expressiveness => metrics.expressiveness_score,
        TrendMetric::Speed => metrics.speed_level.ordinal(),
    }
}

fn mean_of<I: IntoIterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    (count > 0).then(|| sum / count as f64)
}

fn side_mean(sessions: &[PracticeSession], metric: TrendMetric) -> Option<f64> {
    mean_of(sessions.iter().filter_map(|session| metric_value(session, metric)))
}

/// Signed relative change in percent; positive always means improvement.
pub fn percent_change(metric: TrendMetric, before: f64, after: f64, epsilon: f64) -> f64 {
    metric.improvement_sign() * (after - before) / before.abs().max(epsilon) * 100.0
}

fn chronological(sessions: &[PracticeSession]) -> Vec<PracticeSession> {
    let mut ordered = sessions.to_vec();
    ordered.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    ordered
}

/// Compares two disjoint slices of the history. Below `2 * W` sessions the
/// history is split in halves; otherwise the latest `W` are compared with the
/// `W` before them.
pub fn compute_trends(sessions: &[PracticeSession], settings: &ProgressSettings) -> TrendWindow {
    let ordered = chronological(sessions);
    let window = settings.trend_window.max(1);
    let total = ordered.len();

    let (mode, before, after) = if total < 2 {
        (TrendMode::InsufficientHistory, &ordered[..0], &ordered[..0])
    } else if total < 2 * window {
        let mid = total / 2;
        (TrendMode::HalfSplit, &ordered[..mid], &ordered[mid..])
    } else {
        (
            TrendMode::Windowed,
            &ordered[total - 2 * window..total - window],
            &ordered[total - window..],
        )
    };

    let metrics: BTreeMap<TrendMetric, MetricTrend> = TrendMetric::ALL
        .iter()
        .map(|&metric| {
            let trend = match (side_mean(before, metric), side_mean(after, metric)) {
                (Some(before), Some(after)) => MetricTrend {
                    before,
                    after,
                    percent_change: percent_change(metric, before, after, settings.trend_epsilon),
                    known: true,
                },
                _ => MetricTrend::default(),
            };
            (metric, trend)
        })
        .collect();

    debug!(
        target: "app::progress",
        sessions = total,
        mode = ?mode,
        "computed trend window"
    );

    TrendWindow {
        mode,
        sessions_before: before.len(),
        sessions_after: after.len(),
        metrics,
    }
}

fn share<F>(sessions: &[PracticeSession], predicate: F) -> f64
where
    F: Fn(&PracticeSession) -> bool,
{
    if sessions.is_empty() {
        return 0.0;
    }
    sessions.iter().filter(|session| predicate(session)).count() as f64 / sessions.len() as f64
}

fn by_share(area: WeaknessArea, fraction: f64) -> Option<Weakness> {
    if fraction >= SHARE_HIGH {
        Some(Weakness::new(area, Severity::High, fraction, fraction))
    } else if fraction >= SHARE_MEDIUM {
        Some(Weakness::new(area, Severity::Medium, fraction, fraction))
    } else {
        None
    }
}

/// Flags weak areas over the latest `weakness_lookback` sessions, ranked by
/// `(priority, value desc)` and capped. With nothing flagged (including an
/// empty history) the generic advanced-practice areas are returned instead.
pub fn identify_weaknesses(
    sessions: &[PracticeSession],
    settings: &AnalysisSettings,
) -> Vec<Weakness> {
    let ordered = chronological(sessions);
    let lookback = settings.progress.weakness_lookback.max(1);
    let recent = &ordered[ordered.len().saturating_sub(lookback)..];

    let mut found = Vec::new();

    if let Some(mean) = mean_of(recent.iter().map(|s| f64::from(s.metrics.filler_count))) {
        let value = mean / 10.0;
        if mean > FILLER_HIGH_MEAN {
            found.push(Weakness::new(WeaknessArea::Fillers, Severity::High, value, mean));
        } else if mean > FILLER_MEDIUM_MEAN {
            found.push(Weakness::new(WeaknessArea::Fillers, Severity::Medium, value, mean));
        }
    }

    if let Some(mean) = mean_of(recent.iter().filter_map(|s| s.metrics.eye_contact_percentage)) {
        let value = (100.0 - mean) / 100.0;
        if mean < EYE_CONTACT_HIGH_BELOW {
            found.push(Weakness::new(WeaknessArea::EyeContact, Severity::High, value, mean));
        } else if mean < EYE_CONTACT_MEDIUM_BELOW {
            found.push(Weakness::new(WeaknessArea::EyeContact, Severity::Medium, value, mean));
        }
    }

    let measured: Vec<PracticeSession> = recent
        .iter()
        .filter(|s| s.metrics.expressiveness_level != Level::Unknown)
        .cloned()
        .collect();
    if let Some(mean) = mean_of(measured.iter().filter_map(|s| s.metrics.expressiveness_score)) {
        let thresholds = &settings.expressiveness;
        let low_share = share(&measured, |s| s.metrics.expressiveness_level == Level::Low);
        let shortfall = (thresholds.high_score - mean) / thresholds.high_score;
        let value = low_share.max(shortfall);
        if low_share >= SHARE_HIGH || mean < thresholds.medium_score {
            found.push(Weakness::new(WeaknessArea::Expressiveness, Severity::High, value, mean));
        } else if low_share >= SHARE_MEDIUM || mean < thresholds.high_score {
            found.push(Weakness::new(WeaknessArea::Expressiveness, Severity::Medium, value, mean));
        }
    }

    found.extend(by_share(
        WeaknessArea::SlowPace,
        share(recent, |s| s.metrics.speed_level == SpeedLevel::Slow),
    ));
    found.extend(by_share(
        WeaknessArea::FastPace,
        share(recent, |s| s.metrics.speed_level == SpeedLevel::Fast),
    ));
    found.extend(by_share(
        WeaknessArea::Gestures,
        share(recent, |s| s.metrics.gesture_level == GestureLevel::Scarce),
    ));

    let poor = share(recent, |s| s.metrics.posture_level == PostureLevel::Poor);
    let fair = share(recent, |s| s.metrics.posture_level == PostureLevel::Fair);
    let posture_value = poor + fair / 2.0;
    if poor >= POOR_POSTURE_HIGH_SHARE {
        found.push(Weakness::new(WeaknessArea::Posture, Severity::High, posture_value, poor));
    } else if poor + fair >= UNEVEN_POSTURE_MEDIUM_SHARE {
        found.push(Weakness::new(
            WeaknessArea::Posture,
            Severity::Medium,
            posture_value,
            poor + fair,
        ));
    }

    let low_confidence = share(recent, |s| s.metrics.confidence_level == Level::Low);
    if low_confidence >= LOW_CONFIDENCE_MEDIUM_SHARE {
        found.push(Weakness::new(
            WeaknessArea::Confidence,
            Severity::Medium,
            low_confidence,
            low_confidence,
        ));
    }

    found.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| b.value.total_cmp(&a.value))
    });
    found.truncate(settings.progress.max_weaknesses.max(1));

    if found.is_empty() {
        return GENERIC_AREAS
            .iter()
            .map(|&area| Weakness::new(area, Severity::Maintenance, 0.0, 0.0))
            .collect();
    }

    found
}

/// Mean of the tier weights (green 1, yellow 0.5, red 0) mapped back to a tier.
pub fn average_overall(sessions: &[PracticeSession]) -> Option<OverallScore> {
    let mean = mean_of(sessions.iter().map(|s| s.overall_score.weight()))?;
    Some(if mean >= 0.67 {
        OverallScore::Green
    } else if mean >= 0.34 {
        OverallScore::Yellow
    } else {
        OverallScore::Red
    })
}

pub struct ProgressService {
    db: DbPool,
    settings: Arc<SettingsService>,
}

impl ProgressService {
    pub fn new(db: DbPool, settings: Arc<SettingsService>) -> Self {
        Self { db, settings }
    }

    pub fn history(&self, user_id: i64) -> AppResult<Vec<PracticeSession>> {
        self.db
            .with_connection(|conn| PracticeRepository::list_by_user(conn, user_id))
    }

    pub fn trends(&self, user_id: i64) -> AppResult<TrendWindow> {
        let settings = self.settings.get()?;
        Ok(compute_trends(&self.history(user_id)?, &settings.progress))
    }

    pub fn weaknesses(&self, user_id: i64) -> AppResult<Vec<Weakness>> {
        let settings = self.settings.get()?;
        Ok(identify_weaknesses(&self.history(user_id)?, &settings))
    }

    pub fn summary(&self, user_id: i64) -> AppResult<ProgressSummary> {
        let settings = self.settings.get()?;
        let history = self.history(user_id)?;

        let summary = ProgressSummary {
            user_id,
            total_sessions: history.len(),
            average_overall: average_overall(&history),
            trend: compute_trends(&history, &settings.progress),
            weaknesses: identify_weaknesses(&history, &settings),
        };

        info!(
            target: "app::progress",
            user_id,
            sessions = summary.total_sessions,
            weaknesses = summary.weaknesses.len(),
            "progress summary ready"
        );
        Ok(summary)
    }
}
