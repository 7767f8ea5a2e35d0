use regex::Regex;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::models::landmarks::Transcript;
use crate::models::metrics::{MetricGap, SpeedLevel};
use crate::models::settings::{AudioSettings, FillerLanguage};

const SPANISH_FILLERS: &[&str] = &[
    r"\beh+\b",
    r"\bum+\b",
    r"\bemm+\b",
    r"\bahh+\b",
    r"\beste\b",
    r"\bbueno\b",
    r"\bo sea\b",
    r"\bcomo que\b",
    r"\bpues\b",
    r"\bentonces\b",
    r"\bverdad\b",
    r"\bno\?",
];

const ENGLISH_FILLERS: &[&str] = &[
    r"\buh+\b",
    r"\bum+\b",
    r"\ber+m*\b",
    r"\bahh*\b",
    r"\blike\b",
    r"\byou know\b",
    r"\bi mean\b",
    r"\bbasically\b",
    r"\bactually\b",
    r"\bliterally\b",
    r"\bkind of\b",
    r"\bsort of\b",
    r"\bright\?",
];

/// Compiled filler patterns for one language plus any configured extras.
#[derive(Debug, Clone)]
pub struct FillerLexicon {
    patterns: Vec<Regex>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FillerMatches {
    pub count: u32,
    pub examples: Vec<String>,
}

impl FillerLexicon {
    pub fn new(language: FillerLanguage, extra_patterns: &[String]) -> AppResult<Self> {
        let builtin = match language {
            FillerLanguage::Spanish => SPANISH_FILLERS,
            FillerLanguage::English => ENGLISH_FILLERS,
        };

        let mut patterns = Vec::with_capacity(builtin.len() + extra_patterns.len());
        for pattern in builtin
            .iter()
            .copied()
            .chain(extra_patterns.iter().map(String::as_str))
        {
            let regex = Regex::new(pattern).map_err(|err| {
                AppError::config(format!("invalid filler pattern {pattern:?}: {err}"))
            })?;
            patterns.push(regex);
        }

        Ok(Self { patterns })
    }

    pub fn from_settings(settings: &AudioSettings) -> AppResult<Self> {
        Self::new(settings.language, &settings.extra_filler_patterns)
    }

    /// Counts matches of every pattern against the lower-cased text. Examples
    /// keep pattern order, then text order, up to `max_examples`.
    pub fn find(&self, text: &str, max_examples: usize) -> FillerMatches {
        let lowered = text.to_lowercase();
        let mut found = FillerMatches::default();

        for pattern in &self.patterns {
            for hit in pattern.find_iter(&lowered) {
                found.count += 1;
                if found.examples.len() < max_examples {
                    found.examples.push(hit.as_str().to_string());
                }
            }
        }

        found
    }
}

pub fn word_count(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}

pub fn per_minute(count: f64, duration_seconds: f64) -> f64 {
    if duration_seconds > 0.0 {
        count / (duration_seconds / 60.0)
    } else {
        0.0
    }
}

pub fn classify_speed(words_per_minute: Option<f64>, settings: &AudioSettings) -> SpeedLevel {
    match words_per_minute {
        Some(wpm) if wpm < settings.slow_below_wpm => SpeedLevel::Slow,
        Some(wpm) if wpm <= settings.fast_above_wpm => SpeedLevel::Normal,
        Some(_) => SpeedLevel::Fast,
        None => SpeedLevel::Unknown,
    }
}

/// Audio half of a metrics snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioAssessment {
    pub transcription: String,
    pub duration_seconds: f64,
    pub word_count: u32,
    pub filler_count: u32,
    pub filler_rate_per_minute: f64,
    pub filler_examples: Vec<String>,
    pub words_per_minute: Option<f64>,
    pub speed_level: SpeedLevel,
    pub gap: Option<MetricGap>,
}

/// Never fails: an empty transcript yields zero counts and unknown speed.
pub fn assess(
    transcript: &Transcript,
    lexicon: &FillerLexicon,
    settings: &AudioSettings,
) -> AudioAssessment {
    let duration_seconds = transcript.duration_seconds.max(0.0);

    if transcript.is_empty() {
        warn!(
            target: "app::audio",
            duration_seconds,
            "empty transcription, audio metrics default to zero"
        );
        return AudioAssessment {
            transcription: String::new(),
            duration_seconds,
            word_count: 0,
            filler_count: 0,
            filler_rate_per_minute: 0.0,
            filler_examples: Vec::new(),
            words_per_minute: None,
            speed_level: SpeedLevel::Unknown,
            gap: Some(MetricGap::TranscriptionEmpty),
        };
    }

    let fillers = lexicon.find(&transcript.text, settings.max_filler_examples);
    let words = word_count(&transcript.text);
    let words_per_minute =
        (duration_seconds > 0.0).then(|| per_minute(f64::from(words), duration_seconds));
    let speed_level = classify_speed(words_per_minute, settings);
    let filler_rate_per_minute = per_minute(f64::from(fillers.count), duration_seconds);

    info!(
        target: "app::audio",
        words,
        fillers = fillers.count,
        filler_rate = filler_rate_per_minute,
        wpm = ?words_per_minute,
        speed = %speed_level,
        "audio assessment complete"
    );

    AudioAssessment {
        transcription: transcript.text.clone(),
        duration_seconds,
        word_count: words,
        filler_count: fillers.count,
        filler_rate_per_minute,
        filler_examples: fillers.examples,
        words_per_minute,
        speed_level,
        gap: None,
    }
}
