use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::info;

use crate::db::repositories::practice_repository::PracticeRepository;
use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::plan::{Exercise, Plan, PlanObjective, PlanTask, PlanTaskKind};
use crate::models::progress::{Severity, Weakness, WeaknessArea};
use crate::services::progress_service::identify_weaknesses;
use crate::services::settings_service::SettingsService;

pub const PLAN_DAYS: u8 = 7;
const EXERCISES_PER_WEAKNESS: usize = 2;

const BASELINE: Exercise = Exercise {
    title: "Baseline recording",
    description: "Record a two-minute talk on any topic so the week has a starting point.",
};

const COMPARISON: Exercise = Exercise {
    title: "Comparison recording",
    description: "Record the same talk as on day 1 and compare both analyses.",
};

const GENERIC_POOL: &[Exercise] = &[
    Exercise {
        title: "Free talk",
        description: "Speak for three minutes about your day without stopping.",
    },
    Exercise {
        title: "Read aloud",
        description: "Read a news article aloud, pausing at every full stop.",
    },
    Exercise {
        title: "Mirror practice",
        description: "Rehearse your opening in front of a mirror twice.",
    },
    Exercise {
        title: "Elevator pitch",
        description: "Explain a project you care about in sixty seconds.",
    },
    Exercise {
        title: "Listen back",
        description: "Replay your last recording and note one thing to keep and one to change.",
    },
];

const FILLERS_HIGH: &[Exercise] = &[
    Exercise {
        title: "Pause instead of filling",
        description: "Talk for two minutes and replace every filler with a silent one-second pause.",
    },
    Exercise {
        title: "Filler tally",
        description: "Have someone clap each time you use a filler during a three-minute talk.",
    },
    Exercise {
        title: "Slow start",
        description: "Begin each sentence only once you know how it ends. Repeat for five minutes.",
    },
];

const FILLERS_MEDIUM: &[Exercise] = &[
    Exercise {
        title: "Transition phrases",
        description: "Prepare three linking phrases and use them instead of fillers between ideas.",
    },
    Exercise {
        title: "One-minute clean run",
        description: "Speak for one minute on a familiar topic with zero fillers.",
    },
    Exercise {
        title: "Breath marks",
        description: "Mark breathing points in a short script and read it at a calm pace.",
    },
];

const EYE_CONTACT_HIGH: &[Exercise] = &[
    Exercise {
        title: "Lens anchor",
        description: "Put a sticker next to the camera and hold your gaze on it for full sentences.",
    },
    Exercise {
        title: "Notes above the lens",
        description: "Place your notes just under the camera and glance down only between sentences.",
    },
    Exercise {
        title: "Five-second hold",
        description: "Deliver a talk keeping eye contact for at least five seconds at a time.",
    },
];

const EYE_CONTACT_MEDIUM: &[Exercise] = &[
    Exercise {
        title: "Sentence-end contact",
        description: "Finish every sentence looking straight into the camera.",
    },
    Exercise {
        title: "Video call rehearsal",
        description: "Present to a friend on a call and keep your eyes on the lens, not the screen.",
    },
    Exercise {
        title: "Memorized opening",
        description: "Memorize your first thirty seconds so you can deliver them to the camera.",
    },
];

const EXPRESSIVENESS_HIGH: &[Exercise] = &[
    Exercise {
        title: "Exaggerated reading",
        description: "Read a children's story with exaggerated faces and gestures.",
    },
    Exercise {
        title: "Emotion switch",
        description: "Say the same sentence five times, each with a different emotion.",
    },
    Exercise {
        title: "Mute rehearsal",
        description: "Deliver a talk without sound and make the message clear through expression.",
    },
];

const EXPRESSIVENESS_MEDIUM: &[Exercise] = &[
    Exercise {
        title: "Smile on key points",
        description: "Mark three key points in your talk and deliver each with a visible smile.",
    },
    Exercise {
        title: "Raised-brow questions",
        description: "Ask the audience two rhetorical questions, lifting your brows on each.",
    },
    Exercise {
        title: "Story beat",
        description: "Tell a short anecdote and let your face follow its high and low moments.",
    },
];

const SLOW_PACE_HIGH: &[Exercise] = &[
    Exercise {
        title: "Timed paragraph",
        description: "Read a 150-word paragraph in under one minute, three times in a row.",
    },
    Exercise {
        title: "Metronome speech",
        description: "Speak along a metronome set slightly faster than your natural pace.",
    },
    Exercise {
        title: "Trim the pauses",
        description: "Record a talk and cut every pause longer than two seconds on the retake.",
    },
];

const SLOW_PACE_MEDIUM: &[Exercise] = &[
    Exercise {
        title: "Energy warm-up",
        description: "Do one minute of tongue twisters before recording.",
    },
    Exercise {
        title: "Key-point sprint",
        description: "Summarize your talk's three key points in thirty seconds.",
    },
    Exercise {
        title: "Lively topic",
        description: "Speak for two minutes about something that excites you.",
    },
];

const FAST_PACE_HIGH: &[Exercise] = &[
    Exercise {
        title: "Full-stop pauses",
        description: "Read a text aloud and hold a two-second pause at every full stop.",
    },
    Exercise {
        title: "Slow metronome",
        description: "Speak along a metronome set below your natural pace for three minutes.",
    },
    Exercise {
        title: "Word stress",
        description: "Underline one word per sentence in a script and slow down to stress it.",
    },
];

const FAST_PACE_MEDIUM: &[Exercise] = &[
    Exercise {
        title: "Breathe between ideas",
        description: "Take a full breath before each new idea in a two-minute talk.",
    },
    Exercise {
        title: "Count to two",
        description: "After every question you ask the audience, count to two before going on.",
    },
    Exercise {
        title: "Dictation pace",
        description: "Explain a recipe slowly enough for someone to write it down.",
    },
];

const GESTURES_HIGH: &[Exercise] = &[
    Exercise {
        title: "Hands in frame",
        description: "Frame the camera to include your hands and keep them visible for the whole talk.",
    },
    Exercise {
        title: "Number gestures",
        description: "Show the count with your fingers each time you list items.",
    },
    Exercise {
        title: "Describe a shape",
        description: "Describe a building or object using your hands to draw it in the air.",
    },
];

const GESTURES_MEDIUM: &[Exercise] = &[
    Exercise {
        title: "Open palms",
        description: "Deliver your conclusion with open palms facing the camera.",
    },
    Exercise {
        title: "Contrast gestures",
        description: "Use one hand for each side when comparing two options.",
    },
    Exercise {
        title: "Gesture map",
        description: "Plan one gesture per key point in your script and rehearse them.",
    },
];

const POSTURE_HIGH: &[Exercise] = &[
    Exercise {
        title: "Wall alignment",
        description: "Stand with your back against a wall for one minute, then record standing the same way.",
    },
    Exercise {
        title: "Level shoulders check",
        description: "Record ten seconds, check your shoulder line, adjust and record the full talk.",
    },
    Exercise {
        title: "Grounded stance",
        description: "Talk for two minutes with feet at shoulder width and weight on both feet.",
    },
];

const POSTURE_MEDIUM: &[Exercise] = &[
    Exercise {
        title: "Camera height",
        description: "Raise the camera to eye level so you do not lean toward it.",
    },
    Exercise {
        title: "Shoulder roll",
        description: "Roll your shoulders back before each recording and hold them there.",
    },
    Exercise {
        title: "Seated upright",
        description: "Record seated at the front edge of the chair with your back straight.",
    },
];

const CONFIDENCE_HIGH: &[Exercise] = &[
    Exercise {
        title: "Power pose",
        description: "Hold an open posture for two minutes before recording.",
    },
    Exercise {
        title: "Still head",
        description: "Deliver your opening keeping your head steady and your gaze calm.",
    },
    Exercise {
        title: "Box breathing",
        description: "Breathe in four counts, hold four, out four, hold four, then record.",
    },
];

const CONFIDENCE_MEDIUM: &[Exercise] = &[
    Exercise {
        title: "Strong close",
        description: "End your talk with a clear final sentence and two seconds of silence.",
    },
    Exercise {
        title: "Slow blink reset",
        description: "Pause and blink slowly whenever you lose the thread, then continue.",
    },
    Exercise {
        title: "Familiar topic",
        description: "Speak for three minutes about something you know well.",
    },
];

const STORYTELLING: &[Exercise] = &[
    Exercise {
        title: "Three-act story",
        description: "Tell a personal story with a clear setup, conflict and resolution.",
    },
    Exercise {
        title: "Open with a hook",
        description: "Start a talk with a question or a surprising fact.",
    },
    Exercise {
        title: "Data as a story",
        description: "Present one number by telling the story of how it came to be.",
    },
];

const VOCAL_VARIETY: &[Exercise] = &[
    Exercise {
        title: "Pitch ladder",
        description: "Say the same sentence low, middle and high, then use all three in a talk.",
    },
    Exercise {
        title: "Volume contrast",
        description: "Deliver a key point in a lower voice and the next one louder.",
    },
    Exercise {
        title: "Poem reading",
        description: "Read a short poem aloud, following its rhythm.",
    },
];

const IMPROVISATION: &[Exercise] = &[
    Exercise {
        title: "Random topic",
        description: "Pick a random word and talk about it for two minutes with no preparation.",
    },
    Exercise {
        title: "Devil's advocate",
        description: "Argue for one minute against an opinion you hold.",
    },
    Exercise {
        title: "Q&A drill",
        description: "Have someone ask you five unexpected questions and answer each in thirty seconds.",
    },
];

/// Catalog lookup. Generic areas have a single list; the focus areas split by
/// severity, and a maintenance request for them uses the medium list.
pub fn exercises_for(area: WeaknessArea, severity: Severity) -> &'static [Exercise] {
    let high = severity == Severity::High;
    match area {
        WeaknessArea::Fillers if high => FILLERS_HIGH,
        WeaknessArea::Fillers => FILLERS_MEDIUM,
        WeaknessArea::EyeContact if high => EYE_CONTACT_HIGH,
        WeaknessArea::EyeContact => EYE_CONTACT_MEDIUM,
        WeaknessArea::Expressiveness if high => EXPRESSIVENESS_HIGH,
        WeaknessArea::Expressiveness => EXPRESSIVENESS_MEDIUM,
        WeaknessArea::SlowPace if high => SLOW_PACE_HIGH,
        WeaknessArea::SlowPace => SLOW_PACE_MEDIUM,
        WeaknessArea::FastPace if high => FAST_PACE_HIGH,
        WeaknessArea::FastPace => FAST_PACE_MEDIUM,
        WeaknessArea::Gestures if high => GESTURES_HIGH,
        WeaknessArea::Gestures => GESTURES_MEDIUM,
        WeaknessArea::Posture if high => POSTURE_HIGH,
        WeaknessArea::Posture => POSTURE_MEDIUM,
        WeaknessArea::Confidence if high => CONFIDENCE_HIGH,
        WeaknessArea::Confidence => CONFIDENCE_MEDIUM,
        WeaknessArea::Storytelling => STORYTELLING,
        WeaknessArea::VocalVariety => VOCAL_VARIETY,
        WeaknessArea::Improvisation => IMPROVISATION,
    }
}

pub fn generic_pool() -> &'static [Exercise] {
    GENERIC_POOL
}

fn task(day: u8, kind: PlanTaskKind, exercise: &Exercise, area: Option<WeaknessArea>) -> PlanTask {
    PlanTask {
        day,
        kind,
        title: exercise.title.to_string(),
        description: exercise.description.to_string(),
        area,
    }
}

fn objective(weakness: &Weakness) -> PlanObjective {
    let focus = match weakness.level {
        Severity::High => "main focus this week",
        Severity::Medium => "secondary focus",
        Severity::Maintenance => "keep growing",
    };
    PlanObjective {
        area: weakness.area,
        level: weakness.level,
        description: format!("{} ({focus})", weakness.area.label()),
    }
}

/// Lays out a 7-day plan. `weaknesses` must already be in priority order.
/// All randomness comes from `rng`, so a seeded generator gives a fixed plan.
pub fn build_plan<R: Rng + ?Sized>(
    weaknesses: &[Weakness],
    week: u32,
    generated_at: DateTime<Utc>,
    rng: &mut R,
) -> Plan {
    let targeted: Vec<(WeaknessArea, &Exercise)> = weaknesses
        .iter()
        .flat_map(|weakness| {
            exercises_for(weakness.area, weakness.level)
                .choose_multiple(&mut *rng, EXERCISES_PER_WEAKNESS)
                .map(|exercise| (weakness.area, exercise))
                .collect::<Vec<_>>()
        })
        .collect();

    let mut tasks = Vec::with_capacity(usize::from(PLAN_DAYS));
    tasks.push(task(1, PlanTaskKind::BaselineRecording, &BASELINE, None));

    let mut selected = targeted.into_iter();
    for day in 2..PLAN_DAYS {
        let next = match selected.next() {
            Some((area, exercise)) => task(day, PlanTaskKind::Targeted, exercise, Some(area)),
            None => match GENERIC_POOL.choose(&mut *rng) {
                Some(exercise) => task(day, PlanTaskKind::Generic, exercise, None),
                None => task(day, PlanTaskKind::Generic, &BASELINE, None),
            },
        };
        tasks.push(next);
    }

    tasks.push(task(PLAN_DAYS, PlanTaskKind::ComparisonRecording, &COMPARISON, None));

    Plan {
        week,
        objectives: weaknesses.iter().map(objective).collect(),
        tasks,
        generated_at: generated_at.to_rfc3339(),
    }
}

/// Weeks elapsed since the first session, counting from 1.
pub fn week_number(first_session: Option<DateTime<Utc>>, now: DateTime<Utc>) -> u32 {
    first_session
        .map(|first| (now - first).num_weeks().max(0))
        .and_then(|weeks| u32::try_from(weeks).ok())
        .map_or(1, |weeks| weeks.saturating_add(1))
}

pub struct PlanService {
    db: DbPool,
    settings: Arc<SettingsService>,
}

impl PlanService {
    pub fn new(db: DbPool, settings: Arc<SettingsService>) -> Self {
        Self { db, settings }
    }

    pub fn plan_for<R: Rng + ?Sized>(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> AppResult<Plan> {
        let settings = self.settings.get()?;
        let history = self
            .db
            .with_connection(|conn| PracticeRepository::list_by_user(conn, user_id))?;

        let weaknesses = identify_weaknesses(&history, &settings);
        let first = history.iter().map(|session| session.timestamp).min();
        let plan = build_plan(&weaknesses, week_number(first, now), now, rng);

        info!(
            target: "app::plan",
            user_id,
            week = plan.week,
            objectives = plan.objectives.len(),
            "generated practice plan"
        );
        Ok(plan)
    }
}
