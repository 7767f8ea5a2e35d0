use std::convert::TryFrom;

use rusqlite::{named_params, Connection, Row};

use crate::error::{AppError, AppResult};
use crate::models::rewards::{Badge, BadgeKind};

#[derive(Debug, Clone)]
pub struct BadgeRow {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub earned_at: String,
}

impl BadgeRow {
    pub fn into_record(self) -> AppResult<Badge> {
        let name = BadgeKind::from_key(&self.name)
            .ok_or_else(|| AppError::validation(format!("unknown badge: {}", self.name)))?;

        Ok(Badge {
            id: self.id,
            user_id: self.user_id,
            name,
            earned_at: self.earned_at,
        })
    }
}

impl TryFrom<&Row<'_>> for BadgeRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            name: row.get("name")?,
            earned_at: row.get("earned_at")?,
        })
    }
}

pub struct BadgeRepository;

impl BadgeRepository {
    /// Inserts the badge unless the user already holds it. Returns the new
    /// row id, or `None` if nothing was written.
    pub fn insert_if_absent(
        conn: &Connection,
        user_id: i64,
        kind: BadgeKind,
        earned_at: &str,
    ) -> AppResult<Option<i64>> {
        let inserted = conn.execute(
            r#"
                INSERT OR IGNORE INTO badges (user_id, name, earned_at)
                VALUES (:user_id, :name, :earned_at)
            "#,
            named_params! {
                ":user_id": user_id,
                ":name": kind.key(),
                ":earned_at": earned_at,
            },
        )?;

        if inserted == 0 {
            return Ok(None);
        }
        Ok(Some(conn.last_insert_rowid()))
    }

    pub fn list_by_user(conn: &Connection, user_id: i64) -> AppResult<Vec<Badge>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT id, user_id, name, earned_at
                FROM badges
                WHERE user_id = :user_id
                ORDER BY earned_at ASC, id ASC
            "#,
        )?;

        let rows = stmt.query_map(named_params! {":user_id": user_id}, |row| {
            BadgeRow::try_from(row)
        })?;

        let mut badges = Vec::new();
        for row in rows {
            badges.push(row?.into_record()?);
        }
        Ok(badges)
    }
}
