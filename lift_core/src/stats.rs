//! Read-only performance lookups over logged sets.

use crate::parser::normalize_name;
use crate::{Error, ExerciseStats, Result, UserId};
use rusqlite::{params, Connection, OptionalExtension};

/// Set count, heaviest set and heaviest tested 1RM for one exercise.
///
/// Ties on the heaviest weight resolve to the set stored first.
pub fn exercise_stats(conn: &Connection, user_id: UserId, exercise: &str) -> Result<ExerciseStats> {
    let exercise = normalize_name(exercise);

    let count: i64 = conn.query_row(
        "SELECT COUNT(*)
         FROM sets s
         JOIN sessions sess ON sess.session_id = s.session_id
         WHERE sess.user_id = ?1 AND s.exercise = ?2",
        params![user_id, exercise],
        |row| row.get(0),
    )?;

    let heaviest: Option<(f64, u32)> = conn
        .query_row(
            "SELECT s.weight, s.reps
             FROM sets s
             JOIN sessions sess ON sess.session_id = s.session_id
             WHERE sess.user_id = ?1 AND s.exercise = ?2
             ORDER BY s.weight DESC, s.set_id ASC
             LIMIT 1",
            params![user_id, exercise],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let Some((max_weight, reps_at_max)) = heaviest else {
        tracing::debug!("No '{}' sets for user {}", exercise, user_id);
        return Err(Error::NoData { exercise });
    };

    let tested_one_rm: Option<f64> = conn.query_row(
        "SELECT MAX(s.weight)
         FROM sets s
         JOIN sessions sess ON sess.session_id = s.session_id
         WHERE sess.user_id = ?1 AND s.exercise = ?2 AND s.is_one_rm = 1",
        params![user_id, exercise],
        |row| row.get(0),
    )?;

    Ok(ExerciseStats {
        exercise,
        count: count as usize,
        max_weight,
        reps_at_max,
        tested_one_rm,
    })
}
