use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::metrics::{MetricsSnapshot, OverallScore};

/// Lifecycle of a practice session: `recording → processing → ready | error`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Recording,
    Processing,
    Ready,
    Error,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Recording => "recording",
            SessionState::Processing => "processing",
            SessionState::Ready => "ready",
            SessionState::Error => "error",
        }
    }

    pub fn can_transition_to(&self, next: SessionState) -> bool {
        matches!(
            (self, next),
            (SessionState::Recording, SessionState::Processing)
                | (SessionState::Processing, SessionState::Ready)
                | (SessionState::Processing, SessionState::Error)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for SessionState {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, <Self as TryFrom<&str>>::Error> {
        match value {
            "recording" => Ok(SessionState::Recording),
            "processing" => Ok(SessionState::Processing),
            "ready" => Ok(SessionState::Ready),
            "error" => Ok(SessionState::Error),
            other => Err(format!("unsupported session state: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub user_id: i64,
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub started_at: String,
    pub updated_at: String,
}

/// A finalized, scored practice session. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PracticeSession {
    pub id: String,
    pub user_id: i64,
    pub timestamp: DateTime<Utc>,
    pub metrics: MetricsSnapshot,
    pub overall_score: OverallScore,
    pub generated_comment: String,
}
