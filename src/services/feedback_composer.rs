//! Rule-based natural-language feedback for one finalized session.

use crate::models::metrics::{GestureLevel, Level, MetricsSnapshot, PostureLevel, SpeedLevel};
use crate::models::settings::ScoringSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Tone {
    MajorIssue,
    MinorIssue,
    Strength,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Observation {
    tone: Tone,
    text: String,
}

impl Observation {
    fn new(tone: Tone, text: impl Into<String>) -> Self {
        Self {
            tone,
            text: text.into(),
        }
    }
}

fn fillers(snapshot: &MetricsSnapshot, settings: &ScoringSettings) -> Option<Observation> {
    if snapshot.transcription.trim().is_empty() {
        return None;
    }

    let rate = snapshot.filler_rate_per_minute;
    let observation = if snapshot.filler_count == 0 {
        Observation::new(Tone::Strength, "No filler words detected, clean delivery.")
    } else if rate <= settings.filler_full_point_max_rate {
        Observation::new(
            Tone::Strength,
            format!(
                "Filler words are rare ({} in total, {rate:.1} per minute).",
                snapshot.filler_count
            ),
        )
    } else if rate <= settings.filler_half_point_max_rate {
        Observation::new(
            Tone::MinorIssue,
            format!("Watch the filler words: {rate:.1} per minute. Try a silent pause instead."),
        )
    } else {
        Observation::new(
            Tone::MajorIssue,
            format!(
                "Filler words are frequent ({rate:.1} per minute). Practice replacing them with short pauses."
            ),
        )
    };
    Some(observation)
}

fn eye_contact(snapshot: &MetricsSnapshot) -> Option<Observation> {
    let pct = snapshot.eye_contact_percentage?;
    match snapshot.eye_contact_level {
        Level::High => Some(Observation::new(
            Tone::Strength,
            format!("Great eye contact with the camera ({pct:.0}%)."),
        )),
        Level::Medium => Some(Observation::new(
            Tone::MinorIssue,
            format!("Eye contact is acceptable ({pct:.0}%) but drifts at times; look at the lens more often."),
        )),
        Level::Low => Some(Observation::new(
            Tone::MajorIssue,
            format!("Eye contact is low ({pct:.0}%). Keep your gaze on the camera while you speak."),
        )),
        Level::Unknown => None,
    }
}

fn expressiveness(snapshot: &MetricsSnapshot) -> Option<Observation> {
    match snapshot.expressiveness_level {
        Level::High => Some(Observation::new(
            Tone::Strength,
            "Your face and hands carry the message with energy.",
        )),
        Level::Medium => Some(Observation::new(
            Tone::MinorIssue,
            "Expression is moderate; emphasize key ideas with your face and hands.",
        )),
        Level::Low => Some(Observation::new(
            Tone::MajorIssue,
            "Delivery looks flat. Let your facial expression and gestures follow the content.",
        )),
        Level::Unknown => None,
    }
}

fn speed(snapshot: &MetricsSnapshot) -> Option<Observation> {
    let wpm = snapshot.words_per_minute?;
    match snapshot.speed_level {
        SpeedLevel::Normal => Some(Observation::new(
            Tone::Strength,
            format!("Comfortable speaking pace ({wpm:.0} words per minute)."),
        )),
        SpeedLevel::Slow => Some(Observation::new(
            Tone::MinorIssue,
            format!("The pace is slow ({wpm:.0} words per minute); add some energy."),
        )),
        SpeedLevel::Fast => Some(Observation::new(
            Tone::MinorIssue,
            format!("You speak fast ({wpm:.0} words per minute); slow down and pause between ideas."),
        )),
        SpeedLevel::Unknown => None,
    }
}

fn gestures(snapshot: &MetricsSnapshot) -> Option<Observation> {
    match snapshot.gesture_level {
        GestureLevel::Frequent => Some(Observation::new(
            Tone::Strength,
            "Your hands are visible and support what you say.",
        )),
        GestureLevel::Moderate => None,
        GestureLevel::Scarce => Some(Observation::new(
            Tone::MinorIssue,
            "Your hands are rarely visible; bring them into the frame to gesture.",
        )),
        GestureLevel::Unknown => None,
    }
}

fn posture(snapshot: &MetricsSnapshot) -> Option<Observation> {
    match snapshot.posture_level {
        PostureLevel::Good => Some(Observation::new(
            Tone::Strength,
            "Upright, balanced posture.",
        )),
        PostureLevel::Fair => Some(Observation::new(
            Tone::MinorIssue,
            "Shoulders tilt slightly; keep them level.",
        )),
        PostureLevel::Poor => Some(Observation::new(
            Tone::MajorIssue,
            "Posture is uneven. Square your shoulders to the camera before you start.",
        )),
        PostureLevel::Unknown => None,
    }
}

/// Joins the most relevant observations, issues before strengths, at most
/// `settings.max_comment_observations` of them.
pub fn compose_comment(snapshot: &MetricsSnapshot, settings: &ScoringSettings) -> String {
    let mut observations: Vec<Observation> = [
        fillers(snapshot, settings),
        eye_contact(snapshot),
        expressiveness(snapshot),
        speed(snapshot),
        gestures(snapshot),
        posture(snapshot),
    ]
    .into_iter()
    .flatten()
    .collect();

    // stable: areas keep their fixed order within a tone
    observations.sort_by_key(|observation| observation.tone);
    observations.truncate(settings.max_comment_observations);

    if observations.is_empty() {
        return "Not enough signal in this recording to give feedback. Check the framing and the audio, then try again.".to_string();
    }

    observations
        .into_iter()
        .map(|observation| observation.text)
        .collect::<Vec<_>>()
        .join(" ")
}

/// One-line metric digest.
pub fn summary_line(snapshot: &MetricsSnapshot) -> String {
    let mut parts = Vec::with_capacity(6);

    match snapshot.eye_contact_percentage {
        Some(pct) => parts.push(format!("Eye contact {} ({pct:.0}%)", snapshot.eye_contact_level)),
        None => parts.push(format!("Eye contact {}", snapshot.eye_contact_level)),
    }
    parts.push(format!("Expressiveness {}", snapshot.expressiveness_level));
    parts.push(format!("Confidence {}", snapshot.confidence_level));
    parts.push(format!(
        "{} fillers ({:.1}/min)",
        snapshot.filler_count, snapshot.filler_rate_per_minute
    ));
    match snapshot.words_per_minute {
        Some(wpm) => parts.push(format!("Speed {} ({wpm:.0} words/min)", snapshot.speed_level)),
        None => parts.push(format!("Speed {}", snapshot.speed_level)),
    }
    parts.push(format!("Duration {:.0}s", snapshot.duration_seconds));

    parts.join(". ") + "."
}
