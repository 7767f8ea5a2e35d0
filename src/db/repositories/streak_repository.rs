use chrono::NaiveDate;
use rusqlite::{named_params, Connection, OptionalExtension};

use crate::error::{AppError, AppResult};
use crate::models::rewards::Streak;

pub struct StreakRepository;

impl StreakRepository {
    pub fn upsert(conn: &Connection, streak: &Streak, updated_at: &str) -> AppResult<()> {
        let last_practice_date = streak
            .last_practice_date
            .map(|date| date.format("%Y-%m-%d").to_string());

        conn.execute(
            r#"
                INSERT INTO streaks (user_id, current_length, last_practice_date, updated_at)
                VALUES (:user_id, :current_length, :last_practice_date, :updated_at)
                ON CONFLICT(user_id) DO UPDATE SET
                    current_length = excluded.current_length,
                    last_practice_date = excluded.last_practice_date,
                    updated_at = excluded.updated_at
            "#,
            named_params! {
                ":user_id": streak.user_id,
                ":current_length": streak.current_length,
                ":last_practice_date": last_practice_date,
                ":updated_at": updated_at,
            },
        )?;

        Ok(())
    }

    pub fn find_by_user(conn: &Connection, user_id: i64) -> AppResult<Option<Streak>> {
        let row = conn
            .query_row(
                r#"
                    SELECT user_id, current_length, last_practice_date
                    FROM streaks
                    WHERE user_id = :user_id
                "#,
                named_params! {":user_id": user_id},
                |row| {
                    Ok((
                        row.get::<_, i64>("user_id")?,
                        row.get::<_, u32>("current_length")?,
                        row.get::<_, Option<String>>("last_practice_date")?,
                    ))
                },
            )
            .optional()?;

        let Some((user_id, current_length, last_practice_date)) = row else {
            return Ok(None);
        };

        let last_practice_date = match last_practice_date {
            Some(raw) => Some(
                NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                    .map_err(|err| AppError::validation(format!("invalid streak date: {err}")))?,
            ),
            None => None,
        };

        Ok(Some(Streak {
            user_id,
            current_length,
            last_practice_date,
        }))
    }
}
