use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::session::{SessionRecord, SessionState};

#[derive(Debug, Clone)]
pub struct SessionRow {
    pub id: String,
    pub user_id: i64,
    pub state: String,
    pub source_ref: Option<String>,
    pub error_message: Option<String>,
    pub started_at: String,
    pub updated_at: String,
}

impl SessionRow {
    pub fn from_record(record: &SessionRecord) -> Self {
        Self {
            id: record.id.clone(),
            user_id: record.user_id,
            state: record.state.as_str().to_string(),
            source_ref: record.source_ref.clone(),
            error_message: record.error_message.clone(),
            started_at: record.started_at.clone(),
            updated_at: record.updated_at.clone(),
        }
    }

    pub fn into_record(self) -> AppResult<SessionRecord> {
        let state = SessionState::try_from(self.state.as_str()).map_err(AppError::validation)?;

        Ok(SessionRecord {
            id: self.id,
            user_id: self.user_id,
            state,
            source_ref: self.source_ref,
            error_message: self.error_message,
            started_at: self.started_at,
            updated_at: self.updated_at,
        })
    }
}

impl TryFrom<&Row<'_>> for SessionRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            state: row.get("state")?,
            source_ref: row.get("source_ref")?,
            error_message: row.get("error_message")?,
            started_at: row.get("started_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub struct SessionRepository;

impl SessionRepository {
    pub fn insert(conn: &Connection, record: &SessionRecord) -> AppResult<()> {
        let row = SessionRow::from_record(record);

        conn.execute(
            r#"
                INSERT INTO practice_sessions (
                    id,
                    user_id,
                    state,
                    source_ref,
                    error_message,
                    started_at,
                    updated_at
                ) VALUES (
                    :id,
                    :user_id,
                    :state,
                    :source_ref,
                    :error_message,
                    :started_at,
                    :updated_at
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":user_id": &row.user_id,
                ":state": &row.state,
                ":source_ref": &row.source_ref,
                ":error_message": &row.error_message,
                ":started_at": &row.started_at,
                ":updated_at": &row.updated_at,
            },
        )?;

        Ok(())
    }

    pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<SessionRecord> {
        let mut stmt = conn.prepare(
            r#"
                SELECT
                    id,
                    user_id,
                    state,
                    source_ref,
                    error_message,
                    started_at,
                    updated_at
                FROM practice_sessions
                WHERE id = :id
            "#,
        )?;

        let row = stmt
            .query_row(named_params! {":id": id}, |row| SessionRow::try_from(row))
            .optional()?;

        match row {
            Some(row) => row.into_record(),
            None => Err(AppError::not_found()),
        }
    }

    /// Moves a session from `from` to `to` only if it is still in `from`.
    /// Returns `false` when another caller moved it first.
    pub fn transition(
        conn: &Connection,
        id: &str,
        from: SessionState,
        to: SessionState,
        source_ref: Option<&str>,
        error_message: Option<&str>,
        updated_at: &str,
    ) -> AppResult<bool> {
        if !from.can_transition_to(to) {
            return Err(AppError::validation(format!(
                "illegal session transition {from} -> {to}"
            )));
        }

        let changed = conn.execute(
            r#"
                UPDATE practice_sessions
                SET state = :to,
                    source_ref = COALESCE(:source_ref, source_ref),
                    error_message = :error_message,
                    updated_at = :updated_at
                WHERE id = :id AND state = :from
            "#,
            named_params! {
                ":id": id,
                ":from": from.as_str(),
                ":to": to.as_str(),
                ":source_ref": source_ref,
                ":error_message": error_message,
                ":updated_at": updated_at,
            },
        )?;

        Ok(changed == 1)
    }
}
