use std::convert::TryFrom;

use chrono::{DateTime, Utc};
use rusqlite::{named_params, Connection, Row};

use crate::error::{AppError, AppResult};
use crate::models::metrics::{MetricsSnapshot, OverallScore};
use crate::models::session::PracticeSession;

#[derive(Debug, Clone)]
pub struct PracticeResultRow {
    pub session_id: String,
    pub user_id: i64,
    pub metrics: String,
    pub overall_score: String,
    pub generated_comment: String,
    pub recorded_at: String,
}

impl PracticeResultRow {
    pub fn from_session(session: &PracticeSession) -> AppResult<Self> {
        Ok(Self {
            session_id: session.id.clone(),
            user_id: session.user_id,
            metrics: serde_json::to_string(&session.metrics)?,
            overall_score: session.overall_score.as_str().to_string(),
            generated_comment: session.generated_comment.clone(),
            recorded_at: session.timestamp.to_rfc3339(),
        })
    }

    pub fn into_session(self) -> AppResult<PracticeSession> {
        let metrics: MetricsSnapshot = serde_json::from_str(&self.metrics)?;
        let overall_score =
            OverallScore::try_from(self.overall_score.as_str()).map_err(AppError::validation)?;
        let timestamp = DateTime::parse_from_rfc3339(&self.recorded_at)
            .map_err(|err| AppError::validation(format!("invalid recorded_at: {err}")))?
            .with_timezone(&Utc);

        Ok(PracticeSession {
            id: self.session_id,
            user_id: self.user_id,
            timestamp,
            metrics,
            overall_score,
            generated_comment: self.generated_comment,
        })
    }
}

impl TryFrom<&Row<'_>> for PracticeResultRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            session_id: row.get("session_id")?,
            user_id: row.get("user_id")?,
            metrics: row.get("metrics")?,
            overall_score: row.get("overall_score")?,
            generated_comment: row.get("generated_comment")?,
            recorded_at: row.get("recorded_at")?,
        })
    }
}

pub struct PracticeRepository;

impl PracticeRepository {
    pub fn insert(conn: &Connection, session: &PracticeSession) -> AppResult<()> {
        let row = PracticeResultRow::from_session(session)?;

        conn.execute(
            r#"
                INSERT INTO practice_results (
                    session_id,
                    user_id,
                    metrics,
                    overall_score,
                    generated_comment,
                    recorded_at
                ) VALUES (
                    :session_id,
                    :user_id,
                    :metrics,
                    :overall_score,
                    :generated_comment,
                    :recorded_at
                )
            "#,
            named_params! {
                ":session_id": &row.session_id,
                ":user_id": &row.user_id,
                ":metrics": &row.metrics,
                ":overall_score": &row.overall_score,
                ":generated_comment": &row.generated_comment,
                ":recorded_at": &row.recorded_at,
            },
        )?;

        Ok(())
    }

    /// All finalized sessions of a user, oldest first.
    pub fn list_by_user(conn: &Connection, user_id: i64) -> AppResult<Vec<PracticeSession>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT
                    session_id,
                    user_id,
                    metrics,
                    overall_score,
                    generated_comment,
                    recorded_at
                FROM practice_results
                WHERE user_id = :user_id
                ORDER BY recorded_at ASC, id ASC
            "#,
        )?;

        let rows = stmt.query_map(named_params! {":user_id": user_id}, |row| {
            PracticeResultRow::try_from(row)
        })?;

        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row?.into_session()?);
        }
        Ok(sessions)
    }

    pub fn count_by_user(conn: &Connection, user_id: i64) -> AppResult<usize> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM practice_results WHERE user_id = :user_id",
            named_params! {":user_id": user_id},
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
