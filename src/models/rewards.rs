use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Fixed badge table. The string key is what gets persisted, so renaming a
/// variant must keep its key.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum BadgeKind {
    FirstPractice,
    FiveSessions,
    TenSessions,
    TwentyFiveSessions,
    FiftySessions,
    ZeroFillers,
    SteadyGaze,
    LaserFocus,
    Expressive,
    UprightPosture,
    PerfectPace,
    PerfectSession,
    TenMinutesSpoken,
    HourSpoken,
    ThousandWords,
    FiveThousandWords,
    ThreeDayStreak,
    WeekStreak,
    MonthStreak,
}

impl BadgeKind {
    pub const ALL: [BadgeKind; 19] = [
        BadgeKind::FirstPractice,
        BadgeKind::FiveSessions,
        BadgeKind::TenSessions,
        BadgeKind::TwentyFiveSessions,
        BadgeKind::FiftySessions,
        BadgeKind::ZeroFillers,
        BadgeKind::SteadyGaze,
        BadgeKind::LaserFocus,
        BadgeKind::Expressive,
        BadgeKind::UprightPosture,
        BadgeKind::PerfectPace,
        BadgeKind::PerfectSession,
        BadgeKind::TenMinutesSpoken,
        BadgeKind::HourSpoken,
        BadgeKind::ThousandWords,
        BadgeKind::FiveThousandWords,
        BadgeKind::ThreeDayStreak,
        BadgeKind::WeekStreak,
        BadgeKind::MonthStreak,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            BadgeKind::FirstPractice => "first_practice",
            BadgeKind::FiveSessions => "five_sessions",
            BadgeKind::TenSessions => "ten_sessions",
            BadgeKind::TwentyFiveSessions => "twenty_five_sessions",
            BadgeKind::FiftySessions => "fifty_sessions",
            BadgeKind::ZeroFillers => "zero_fillers",
            BadgeKind::SteadyGaze => "steady_gaze",
            BadgeKind::LaserFocus => "laser_focus",
            BadgeKind::Expressive => "expressive",
            BadgeKind::UprightPosture => "upright_posture",
            BadgeKind::PerfectPace => "perfect_pace",
            BadgeKind::PerfectSession => "perfect_session",
            BadgeKind::TenMinutesSpoken => "ten_minutes_spoken",
            BadgeKind::HourSpoken => "hour_spoken",
            BadgeKind::ThousandWords => "thousand_words",
            BadgeKind::FiveThousandWords => "five_thousand_words",
            BadgeKind::ThreeDayStreak => "three_day_streak",
            BadgeKind::WeekStreak => "week_streak",
            BadgeKind::MonthStreak => "month_streak",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            BadgeKind::FirstPractice => "First practice",
            BadgeKind::FiveSessions => "Five sessions",
            BadgeKind::TenSessions => "Ten sessions",
            BadgeKind::TwentyFiveSessions => "Twenty-five sessions",
            BadgeKind::FiftySessions => "Fifty sessions",
            BadgeKind::ZeroFillers => "Filler free",
            BadgeKind::SteadyGaze => "Steady gaze",
            BadgeKind::LaserFocus => "Laser focus",
            BadgeKind::Expressive => "Expressive speaker",
            BadgeKind::UprightPosture => "Upright posture",
            BadgeKind::PerfectPace => "Perfect pace",
            BadgeKind::PerfectSession => "Perfect session",
            BadgeKind::TenMinutesSpoken => "Ten minutes on stage",
            BadgeKind::HourSpoken => "One hour on stage",
            BadgeKind::ThousandWords => "A thousand words",
            BadgeKind::FiveThousandWords => "Five thousand words",
            BadgeKind::ThreeDayStreak => "Three-day streak",
            BadgeKind::WeekStreak => "Week streak",
            BadgeKind::MonthStreak => "Month streak",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.key() == key)
    }
}

impl fmt::Display for BadgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub id: i64,
    pub user_id: i64,
    pub name: BadgeKind,
    pub earned_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Streak {
    pub user_id: i64,
    pub current_length: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_practice_date: Option<NaiveDate>,
}

/// Result of processing rewards after a finalized session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RewardOutcome {
    pub newly_awarded: Vec<Badge>,
    pub streak: Streak,
}
