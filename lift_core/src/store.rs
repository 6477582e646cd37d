//! SQLite persistence for users, sessions and sets.
//!
//! The schema carries the invariants itself: a partial unique index allows at
//! most one open session per user, and `(session_id, exercise, set_index)` is
//! unique. Callers group read-then-write sequences in [`Store::transaction`],
//! which takes the write lock up front.

use crate::parser::normalize_name;
use crate::config::StorageConfig;
use crate::{NewSet, Result, Session, SessionId, SessionSummary, SetRecord, User, UserId};
use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, ToSql, Transaction, TransactionBehavior};
use std::path::Path;
use std::time::Duration;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    user_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    username   TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sessions (
    session_id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id    INTEGER NOT NULL REFERENCES users(user_id),
    started_at TEXT NOT NULL,
    notes      TEXT,
    ended_at   TEXT
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_one_active_session_per_user
    ON sessions (user_id)
    WHERE ended_at IS NULL;

CREATE TABLE IF NOT EXISTS sets (
    set_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id INTEGER NOT NULL REFERENCES sessions(session_id),
    exercise   TEXT NOT NULL CHECK (length(exercise) > 0),
    weight     REAL NOT NULL CHECK (weight >= 0),
    reps       INTEGER NOT NULL CHECK (reps > 0),
    set_index  INTEGER NOT NULL CHECK (set_index > 0),
    is_one_rm  INTEGER NOT NULL CHECK (is_one_rm IN (0, 1))
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_sets_unique_order
    ON sets (session_id, exercise, set_index);
"#;

impl ToSql for UserId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        self.0.to_sql()
    }
}

impl FromSql for UserId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(UserId)
    }
}

impl ToSql for SessionId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        self.0.to_sql()
    }
}

impl FromSql for SessionId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(SessionId)
    }
}

/// Owner of the SQLite connection
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) the database file at `path`
    pub fn open(path: &Path, storage: &StorageConfig) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_millis(storage.busy_timeout_ms))?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!("Opened {:?} (journal_mode={})", path, mode);

        Self::with_schema(conn)
    }

    /// Open a throwaway in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::with_schema(Connection::open_in_memory()?)
    }

    fn with_schema(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Connection for read-only queries
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Begin an IMMEDIATE transaction.
    ///
    /// The write lock is held from the first statement, so another writer
    /// cannot slip in between a read and the write that depends on it.
    /// Dropping the transaction without committing rolls it back.
    pub fn transaction(&mut self) -> Result<Transaction<'_>> {
        Ok(self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?)
    }
}

// ============================================================================
// Users
// ============================================================================

/// Look up a user by normalized name, creating the row if it does not exist
pub fn create_user_if_absent(conn: &Connection, username: &str, at: DateTime<Utc>) -> Result<UserId> {
    let username = normalize_name(username);

    let inserted = conn.execute(
        "INSERT INTO users (username, created_at) VALUES (?1, ?2)
         ON CONFLICT (username) DO NOTHING",
        params![username, at],
    )?;

    let user_id: UserId = conn.query_row(
        "SELECT user_id FROM users WHERE username = ?1",
        params![username],
        |row| row.get(0),
    )?;

    if inserted > 0 {
        tracing::info!("Created user '{}' ({})", username, user_id);
    }
    Ok(user_id)
}

pub fn get_user(conn: &Connection, user_id: UserId) -> Result<Option<User>> {
    let user = conn
        .query_row(
            "SELECT user_id, username, created_at FROM users WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    created_at: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(user)
}

// ============================================================================
// Sessions
// ============================================================================

/// Close every open session of the user; returns how many were closed
pub fn end_all_open_sessions(conn: &Connection, user_id: UserId, at: DateTime<Utc>) -> Result<usize> {
    let closed = conn.execute(
        "UPDATE sessions SET ended_at = ?1 WHERE user_id = ?2 AND ended_at IS NULL",
        params![at, user_id],
    )?;

    if closed > 1 {
        tracing::warn!("Closed {} open sessions for user {}", closed, user_id);
    }
    Ok(closed)
}

pub fn create_session(
    conn: &Connection,
    user_id: UserId,
    at: DateTime<Utc>,
    notes: Option<&str>,
) -> Result<SessionId> {
    conn.execute(
        "INSERT INTO sessions (user_id, started_at, notes, ended_at) VALUES (?1, ?2, ?3, NULL)",
        params![user_id, at, notes],
    )?;
    let session_id = SessionId(conn.last_insert_rowid());
    tracing::debug!("Created session {} for user {}", session_id, user_id);
    Ok(session_id)
}

/// Newest session of the user that has not ended
pub fn get_active_session(conn: &Connection, user_id: UserId) -> Result<Option<SessionId>> {
    let session_id = conn
        .query_row(
            "SELECT session_id FROM sessions
             WHERE user_id = ?1 AND ended_at IS NULL
             ORDER BY session_id DESC
             LIMIT 1",
            params![user_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(session_id)
}

pub fn get_session(conn: &Connection, session_id: SessionId) -> Result<Option<Session>> {
    let session = conn
        .query_row(
            "SELECT session_id, user_id, started_at, notes, ended_at
             FROM sessions WHERE session_id = ?1",
            params![session_id],
            map_session,
        )
        .optional()?;
    Ok(session)
}

/// End one session; returns false if it was already ended (or unknown)
pub fn end_session(conn: &Connection, session_id: SessionId, at: DateTime<Utc>) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE sessions SET ended_at = ?1 WHERE session_id = ?2 AND ended_at IS NULL",
        params![at, session_id],
    )?;
    Ok(updated > 0)
}

/// All sessions of the user, newest first
pub fn list_sessions(conn: &Connection, user_id: UserId) -> Result<Vec<SessionSummary>> {
    let mut stmt = conn.prepare(
        "SELECT s.session_id, s.user_id, s.started_at, s.notes, s.ended_at,
                (SELECT COUNT(*) FROM sets st WHERE st.session_id = s.session_id)
         FROM sessions s
         WHERE s.user_id = ?1
         ORDER BY s.session_id DESC",
    )?;

    let rows = stmt.query_map(params![user_id], |row| {
        let set_count: i64 = row.get(5)?;
        Ok(SessionSummary {
            session: map_session(row)?,
            set_count: set_count as usize,
        })
    })?;

    let mut sessions = Vec::new();
    for row in rows {
        sessions.push(row?);
    }
    Ok(sessions)
}

fn map_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get(0)?,
        user_id: row.get(1)?,
        started_at: row.get(2)?,
        notes: row.get(3)?,
        ended_at: row.get(4)?,
    })
}

// ============================================================================
// Sets
// ============================================================================

/// One past the highest set index logged for the exercise in the session
pub fn next_set_index(conn: &Connection, session_id: SessionId, exercise: &str) -> Result<u32> {
    let exercise = normalize_name(exercise);
    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(set_index), 0) FROM sets WHERE session_id = ?1 AND exercise = ?2",
        params![session_id, exercise],
        |row| row.get(0),
    )?;
    Ok(current + 1)
}

/// Append a batch of sets with contiguous indices following the current max.
///
/// Taking a [`Transaction`] means the index read and the inserts commit or
/// roll back together.
pub fn insert_sets(
    tx: &Transaction<'_>,
    session_id: SessionId,
    exercise: &str,
    rows: &[NewSet],
) -> Result<usize> {
    let exercise = normalize_name(exercise);
    let start_index = next_set_index(tx, session_id, &exercise)?;

    let mut stmt = tx.prepare_cached(
        "INSERT INTO sets (session_id, exercise, weight, reps, is_one_rm, set_index)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;

    let mut inserted = 0;
    for (set_index, row) in (start_index..).zip(rows) {
        inserted += stmt.execute(params![
            session_id,
            exercise,
            row.weight,
            row.reps,
            row.is_one_rm,
            set_index
        ])?;
    }

    tracing::debug!(
        "Inserted {} '{}' sets into session {} starting at index {}",
        inserted,
        exercise,
        session_id,
        start_index
    );
    Ok(inserted)
}

/// Sets of a session, most recently logged first
pub fn list_sets(conn: &Connection, session_id: SessionId) -> Result<Vec<SetRecord>> {
    let mut stmt = conn.prepare(
        "SELECT set_id, session_id, exercise, weight, reps, set_index, is_one_rm
         FROM sets
         WHERE session_id = ?1
         ORDER BY set_id DESC",
    )?;

    let rows = stmt.query_map(params![session_id], |row| {
        Ok(SetRecord {
            id: row.get(0)?,
            session_id: row.get(1)?,
            exercise: row.get(2)?,
            weight: row.get(3)?,
            reps: row.get(4)?,
            set_index: row.get(5)?,
            is_one_rm: row.get(6)?,
        })
    })?;

    let mut sets = Vec::new();
    for row in rows {
        sets.push(row?);
    }
    Ok(sets)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::Error;
    use chrono::TimeZone;

    pub(crate) fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
    }

    pub(crate) fn count_sets(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM sets", [], |row| row.get(0))
            .unwrap()
    }

    fn seeded() -> (Store, UserId, SessionId) {
        let store = Store::open_in_memory().unwrap();
        let user = create_user_if_absent(store.conn(), "alex", at(8)).unwrap();
        let session = create_session(store.conn(), user, at(9), None).unwrap();
        (store, user, session)
    }

    fn indices(conn: &Connection, session_id: SessionId, exercise: &str) -> Vec<u32> {
        let mut stmt = conn
            .prepare(
                "SELECT set_index FROM sets WHERE session_id = ?1 AND exercise = ?2
                 ORDER BY set_index",
            )
            .unwrap();
        stmt.query_map(params![session_id, exercise], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect()
    }

    #[test]
    fn test_create_user_if_absent_is_idempotent() {
        let store = Store::open_in_memory().unwrap();

        let first = create_user_if_absent(store.conn(), "Alex", at(8)).unwrap();
        let second = create_user_if_absent(store.conn(), "  ALEX ", at(9)).unwrap();
        assert_eq!(first, second);

        let rows: i64 = store
            .conn()
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);

        let user = get_user(store.conn(), first).unwrap().unwrap();
        assert_eq!(user.username, "alex");
        assert_eq!(user.created_at, at(8));
    }

    #[test]
    fn test_set_indices_continue_across_batches() {
        let (mut store, _, session) = seeded();

        let tx = store.transaction().unwrap();
        let n = insert_sets(
            &tx,
            session,
            "bench press",
            &[NewSet::new(135.0, 5, false), NewSet::new(155.0, 3, false)],
        )
        .unwrap();
        assert_eq!(n, 2);
        tx.commit().unwrap();

        let tx = store.transaction().unwrap();
        insert_sets(&tx, session, "bench press", &[NewSet::new(175.0, 1, true)]).unwrap();
        tx.commit().unwrap();

        assert_eq!(indices(store.conn(), session, "bench press"), vec![1, 2, 3]);
        assert_eq!(next_set_index(store.conn(), session, "Bench Press").unwrap(), 4);
    }

    #[test]
    fn test_indices_are_per_exercise() {
        let (mut store, _, session) = seeded();

        let tx = store.transaction().unwrap();
        insert_sets(&tx, session, "squat", &[NewSet::new(225.0, 5, false)]).unwrap();
        insert_sets(&tx, session, "bench press", &[NewSet::new(135.0, 5, false)]).unwrap();
        insert_sets(&tx, session, "squat", &[NewSet::new(245.0, 3, false)]).unwrap();
        tx.commit().unwrap();

        assert_eq!(indices(store.conn(), session, "squat"), vec![1, 2]);
        assert_eq!(indices(store.conn(), session, "bench press"), vec![1]);
    }

    #[test]
    fn test_failed_batch_leaves_no_rows() {
        let (mut store, _, session) = seeded();

        {
            let tx = store.transaction().unwrap();
            // Second row violates the weight check after the first has landed
            let err = insert_sets(
                &tx,
                session,
                "bench press",
                &[NewSet::new(135.0, 5, false), NewSet::new(-1.0, 5, false)],
            )
            .unwrap_err();
            assert!(matches!(err, Error::StorageConstraintViolation(_)));
        }

        assert_eq!(count_sets(store.conn()), 0);
        assert_eq!(next_set_index(store.conn(), session, "bench press").unwrap(), 1);
    }

    #[test]
    fn test_insert_into_unknown_session_is_constraint_violation() {
        let (mut store, _, _) = seeded();

        let tx = store.transaction().unwrap();
        let err = insert_sets(&tx, SessionId(999), "row", &[NewSet::new(50.0, 10, false)])
            .unwrap_err();
        assert!(matches!(err, Error::StorageConstraintViolation(_)));
        drop(tx);

        assert_eq!(count_sets(store.conn()), 0);
    }

    #[test]
    fn test_second_open_session_rejected_by_index() {
        let (store, user, _) = seeded();

        let err = create_session(store.conn(), user, at(10), None).unwrap_err();
        assert!(matches!(err, Error::StorageConstraintViolation(_)));
    }

    #[test]
    fn test_end_all_open_sessions() {
        let (store, user, session) = seeded();

        assert_eq!(end_all_open_sessions(store.conn(), user, at(10)).unwrap(), 1);
        assert_eq!(end_all_open_sessions(store.conn(), user, at(11)).unwrap(), 0);
        assert_eq!(get_active_session(store.conn(), user).unwrap(), None);

        let ended = get_session(store.conn(), session).unwrap().unwrap();
        assert_eq!(ended.ended_at, Some(at(10)));
    }

    #[test]
    fn test_get_active_session_returns_newest_open() {
        let (store, user, first) = seeded();
        assert_eq!(get_active_session(store.conn(), user).unwrap(), Some(first));

        end_session(store.conn(), first, at(10)).unwrap();
        let second = create_session(store.conn(), user, at(11), Some("legs")).unwrap();
        assert_eq!(get_active_session(store.conn(), user).unwrap(), Some(second));

        let other = create_user_if_absent(store.conn(), "sam", at(8)).unwrap();
        assert_eq!(get_active_session(store.conn(), other).unwrap(), None);
    }

    #[test]
    fn test_end_session_never_reopens_or_moves_end() {
        let (store, _, session) = seeded();

        assert!(end_session(store.conn(), session, at(10)).unwrap());
        assert!(!end_session(store.conn(), session, at(12)).unwrap());

        let ended = get_session(store.conn(), session).unwrap().unwrap();
        assert_eq!(ended.ended_at, Some(at(10)));
        assert!(!ended.is_active());
    }

    #[test]
    fn test_list_sets_most_recent_first() {
        let (mut store, _, session) = seeded();

        let tx = store.transaction().unwrap();
        insert_sets(
            &tx,
            session,
            "deadlift",
            &[NewSet::new(315.0, 5, false), NewSet::new(405.0, 1, true)],
        )
        .unwrap();
        tx.commit().unwrap();

        let sets = list_sets(store.conn(), session).unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].weight, 405.0);
        assert_eq!(sets[0].set_index, 2);
        assert!(sets[0].is_one_rm);
        assert_eq!(sets[1].weight, 315.0);
        assert_eq!(sets[1].set_index, 1);
        assert!(!sets[1].is_one_rm);
    }

    #[test]
    fn test_list_sessions_newest_first_with_counts() {
        let (mut store, user, first) = seeded();

        let tx = store.transaction().unwrap();
        insert_sets(&tx, first, "squat", &[NewSet::new(225.0, 5, false); 3]).unwrap();
        tx.commit().unwrap();

        end_session(store.conn(), first, at(10)).unwrap();
        let second = create_session(store.conn(), user, at(11), Some("easy day")).unwrap();

        let sessions = list_sessions(store.conn(), user).unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].session.id, second);
        assert_eq!(sessions[0].session.notes.as_deref(), Some("easy day"));
        assert_eq!(sessions[0].set_count, 0);
        assert_eq!(sessions[1].session.id, first);
        assert_eq!(sessions[1].set_count, 3);
    }

    #[test]
    fn test_open_on_disk_persists() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("nested").join("lift_log.db");

        let user = {
            let store = Store::open(&db_path, &StorageConfig::default()).unwrap();
            create_user_if_absent(store.conn(), "alex", at(8)).unwrap()
        };

        let store = Store::open(&db_path, &StorageConfig::default()).unwrap();
        assert!(db_path.exists());
        assert_eq!(
            create_user_if_absent(store.conn(), "alex", at(9)).unwrap(),
            user
        );
    }
}
