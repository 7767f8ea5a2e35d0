use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info};

use crate::db::repositories::badge_repository::BadgeRepository;
use crate::db::repositories::practice_repository::PracticeRepository;
use crate::db::repositories::streak_repository::StreakRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::metrics::{Level, OverallScore, PostureLevel, SpeedLevel};
use crate::models::rewards::{Badge, BadgeKind, RewardOutcome, Streak};
use crate::models::session::PracticeSession;

const SESSION_MILESTONES: [(usize, BadgeKind); 5] = [
    (1, BadgeKind::FirstPractice),
    (5, BadgeKind::FiveSessions),
    (10, BadgeKind::TenSessions),
    (25, BadgeKind::TwentyFiveSessions),
    (50, BadgeKind::FiftySessions),
];

const SECONDS_MILESTONES: [(f64, BadgeKind); 2] = [
    (600.0, BadgeKind::TenMinutesSpoken),
    (3600.0, BadgeKind::HourSpoken),
];

const WORD_MILESTONES: [(u64, BadgeKind); 2] = [
    (1_000, BadgeKind::ThousandWords),
    (5_000, BadgeKind::FiveThousandWords),
];

const STREAK_MILESTONES: [(u32, BadgeKind); 3] = [
    (3, BadgeKind::ThreeDayStreak),
    (7, BadgeKind::WeekStreak),
    (30, BadgeKind::MonthStreak),
];

/// Every badge whose predicate holds. Milestones look at the whole `history`
/// and the current streak length; per-session badges judge `finalized` only.
/// Badges the user already holds are included; persistence filters them out.
pub fn evaluate_badges(
    history: &[PracticeSession],
    finalized: Option<&PracticeSession>,
    streak_length: u32,
) -> BTreeSet<BadgeKind> {
    let mut earned = BTreeSet::new();

    for (required, badge) in SESSION_MILESTONES {
        if history.len() >= required {
            earned.insert(badge);
        }
    }

    let seconds: f64 = history.iter().map(|s| s.metrics.duration_seconds).sum();
    for (required, badge) in SECONDS_MILESTONES {
        if seconds >= required {
            earned.insert(badge);
        }
    }

    let words: u64 = history.iter().map(|s| u64::from(s.metrics.word_count)).sum();
    for (required, badge) in WORD_MILESTONES {
        if words >= required {
            earned.insert(badge);
        }
    }

    for (required, badge) in STREAK_MILESTONES {
        if streak_length >= required {
            earned.insert(badge);
        }
    }

    if let Some(session) = finalized {
        let metrics = &session.metrics;
        let eye_contact = metrics.eye_contact_percentage.unwrap_or(0.0);

        // an empty transcript has zero fillers but proves nothing
        let filler_free = metrics.word_count > 0 && metrics.filler_count == 0;
        if filler_free {
            earned.insert(BadgeKind::ZeroFillers);
        }
        if eye_contact >= 80.0 {
            earned.insert(BadgeKind::SteadyGaze);
        }
        if eye_contact >= 90.0 {
            earned.insert(BadgeKind::LaserFocus);
        }
        if metrics.expressiveness_level == Level::High {
            earned.insert(BadgeKind::Expressive);
        }
        if metrics.posture_level == PostureLevel::Good {
            earned.insert(BadgeKind::UprightPosture);
        }
        if metrics.speed_level == SpeedLevel::Normal {
            earned.insert(BadgeKind::PerfectPace);
        }
        if session.overall_score == OverallScore::Green
            && filler_free
            && metrics.eye_contact_level == Level::High
            && metrics.posture_level == PostureLevel::Good
            && metrics.speed_level == SpeedLevel::Normal
        {
            earned.insert(BadgeKind::PerfectSession);
        }
    }

    earned
}

/// Consecutive calendar days with at least one session, counted backwards
/// from `today`. Zero when there is no session today.
pub fn streak_length<I>(dates: I, today: NaiveDate) -> u32
where
    I: IntoIterator<Item = NaiveDate>,
{
    let days: BTreeSet<NaiveDate> = dates.into_iter().collect();
    let mut length = 0;
    let mut day = today;
    while days.contains(&day) {
        length += 1;
        match day.pred_opt() {
            Some(previous) => day = previous,
            None => break,
        }
    }
    length
}

pub fn compute_streak(user_id: i64, history: &[PracticeSession], today: NaiveDate) -> Streak {
    let dates: Vec<NaiveDate> = history
        .iter()
        .map(|session| session.timestamp.date_naive())
        .collect();

    Streak {
        user_id,
        current_length: streak_length(dates.iter().copied(), today),
        last_practice_date: dates.into_iter().filter(|date| *date <= today).max(),
    }
}

/// Badge and streak bookkeeping after a session is finalized.
#[derive(Clone)]
pub struct RewardService {
    db: DbPool,
}

impl RewardService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Rewards for `session`, which must already be stored. Per-session
    /// badges judge this session even when a later-stamped one committed first.
    pub fn process_finalized(
        &self,
        session: &PracticeSession,
        now: DateTime<Utc>,
    ) -> AppResult<RewardOutcome> {
        self.award(session.user_id, Some(&session.id), now)
    }

    /// Re-evaluates a user's rewards, judging their most recent session.
    pub fn process(&self, user_id: i64, now: DateTime<Utc>) -> AppResult<RewardOutcome> {
        self.award(user_id, None, now)
    }

    /// Evaluation and the inserts share one immediate transaction, and the
    /// `(user, badge)` uniqueness constraint turns a repeat award into a no-op,
    /// so concurrent calls for one user never duplicate a badge.
    fn award(
        &self,
        user_id: i64,
        session_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<RewardOutcome> {
        let earned_at = now.to_rfc3339();

        let outcome = self.db.with_transaction(|conn| {
            let history = PracticeRepository::list_by_user(conn, user_id)?;
            let finalized = match session_id {
                Some(id) => Some(
                    history
                        .iter()
                        .find(|session| session.id == id)
                        .ok_or_else(AppError::not_found)?,
                ),
                None => history.last(),
            };
            let streak = compute_streak(user_id, &history, now.date_naive());
            StreakRepository::upsert(conn, &streak, &earned_at)?;

            let mut newly_awarded = Vec::new();
            for kind in evaluate_badges(&history, finalized, streak.current_length) {
                if let Some(id) = BadgeRepository::insert_if_absent(conn, user_id, kind, &earned_at)? {
                    newly_awarded.push(Badge {
                        id,
                        user_id,
                        name: kind,
                        earned_at: earned_at.clone(),
                    });
                }
            }

            Ok(RewardOutcome {
                newly_awarded,
                streak,
            })
        })?;

        for badge in &outcome.newly_awarded {
            debug!(target: "app::rewards", user_id, badge = %badge.name, "badge awarded");
        }
        info!(
            target: "app::rewards",
            user_id,
            awarded = outcome.newly_awarded.len(),
            streak = outcome.streak.current_length,
            "rewards processed"
        );
        Ok(outcome)
    }

    pub fn badges(&self, user_id: i64) -> AppResult<Vec<Badge>> {
        self.db
            .with_connection(|conn| BadgeRepository::list_by_user(conn, user_id))
    }

    pub fn streak(&self, user_id: i64) -> AppResult<Streak> {
        self.streak_on(user_id, Utc::now().date_naive())
    }

    /// Streak as seen on `today`. The stored value was computed at the last
    /// finalize, so it only still holds if that practice day is `today`.
    pub fn streak_on(&self, user_id: i64, today: NaiveDate) -> AppResult<Streak> {
        let stored = self
            .db
            .with_connection(|conn| StreakRepository::find_by_user(conn, user_id))?;

        let Some(stored) = stored else {
            return Ok(Streak {
                user_id,
                current_length: 0,
                last_practice_date: None,
            });
        };

        if stored.last_practice_date == Some(today) {
            return Ok(stored);
        }
        // the run ended before today, or the stored row is from a later clock
        let history = self
            .db
            .with_connection(|conn| PracticeRepository::list_by_user(conn, user_id))?;
        Ok(compute_streak(user_id, &history, today))
    }
}
