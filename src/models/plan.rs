use serde::{Deserialize, Serialize};

use crate::models::progress::{Severity, WeaknessArea};

/// One catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub title: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PlanTaskKind {
    BaselineRecording,
    Targeted,
    Generic,
    ComparisonRecording,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanTask {
    pub day: u8,
    pub kind: PlanTaskKind,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<WeaknessArea>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanObjective {
    pub area: WeaknessArea,
    pub level: Severity,
    pub description: String,
}

/// A 7-day practice plan. Generated fresh per request, never cached.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub week: u32,
    pub objectives: Vec<PlanObjective>,
    pub tasks: Vec<PlanTask>,
    pub generated_at: String,
}
