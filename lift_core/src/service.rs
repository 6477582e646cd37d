//! Session and set operations as atomic units of work.
//!
//! Every operation takes the store and an explicit user id. Operations that
//! read state and then write based on it run inside a single
//! [`Store::transaction`], and each takes one timestamp for all of its effects.

use crate::parser::{normalize_name, parse_entry};
use crate::store::{self, Store};
use crate::{
    AddedSets, EndedSession, Error, NewSet, Result, SessionId, SessionSummary, SetRecord,
    StartedSession, User, UserId,
};
use chrono::{DateTime, Utc};

/// Identify a user by name, creating the user on first login
pub fn login(store: &mut Store, username: &str) -> Result<User> {
    login_at(store, username, Utc::now())
}

pub fn login_at(store: &mut Store, username: &str, now: DateTime<Utc>) -> Result<User> {
    if normalize_name(username).is_empty() {
        return Err(Error::InvalidUsername);
    }

    let tx = store.transaction()?;
    let user_id = store::create_user_if_absent(&tx, username, now)?;
    let user =
        store::get_user(&tx, user_id)?.ok_or(Error::Sqlite(rusqlite::Error::QueryReturnedNoRows))?;
    tx.commit()?;

    tracing::info!("Logged in as '{}' ({})", user.username, user.id);
    Ok(user)
}

/// Close any open session for the user and open a new one
pub fn start_session(store: &mut Store, user_id: UserId, notes: Option<&str>) -> Result<StartedSession> {
    start_session_at(store, user_id, notes, Utc::now())
}

pub fn start_session_at(
    store: &mut Store,
    user_id: UserId,
    notes: Option<&str>,
    now: DateTime<Utc>,
) -> Result<StartedSession> {
    let notes = notes.map(str::trim).filter(|n| !n.is_empty());

    let tx = store.transaction()?;
    let closed = store::end_all_open_sessions(&tx, user_id, now)?;
    let session_id = store::create_session(&tx, user_id, now, notes)?;
    tx.commit()?;

    tracing::info!(
        "Started session {} for user {} (closed {} open)",
        session_id,
        user_id,
        closed
    );
    Ok(StartedSession {
        session_id,
        started_at: now,
        closed,
    })
}

/// Parse an entry line and log its sets into the user's active session.
///
/// `ask_is_one_rep_max` is consulted once for every single-rep set, in entry
/// order, and decides whether that set is flagged as a tested one-rep max.
/// Either every set of the entry is stored or none is.
pub fn add_sets_from_entry<F>(
    store: &mut Store,
    user_id: UserId,
    raw_entry: &str,
    mut ask_is_one_rep_max: F,
) -> Result<AddedSets>
where
    F: FnMut(&str, f64) -> bool,
{
    let tx = store.transaction()?;

    let session_id = store::get_active_session(&tx, user_id)?.ok_or(Error::NoActiveSession)?;
    let entry = parse_entry(raw_entry)?;

    let rows: Vec<NewSet> = entry
        .sets
        .iter()
        .map(|set| {
            let is_one_rm = set.reps == 1 && ask_is_one_rep_max(&entry.exercise, set.weight);
            NewSet::new(set.weight, set.reps, is_one_rm)
        })
        .collect();

    let count = store::insert_sets(&tx, session_id, &entry.exercise, &rows)?;
    tx.commit()?;

    tracing::info!(
        "Logged {} '{}' sets in session {}",
        count,
        entry.exercise,
        session_id
    );
    Ok(AddedSets {
        session_id,
        exercise: entry.exercise,
        count,
    })
}

/// End the user's most recent open session, if there is one
pub fn end_active_session(store: &mut Store, user_id: UserId) -> Result<Option<EndedSession>> {
    end_active_session_at(store, user_id, Utc::now())
}

pub fn end_active_session_at(
    store: &mut Store,
    user_id: UserId,
    now: DateTime<Utc>,
) -> Result<Option<EndedSession>> {
    let tx = store.transaction()?;

    let Some(session_id) = store::get_active_session(&tx, user_id)? else {
        tracing::debug!("No active session to end for user {}", user_id);
        return Ok(None);
    };
    store::end_session(&tx, session_id, now)?;
    tx.commit()?;

    tracing::info!("Ended session {} for user {}", session_id, user_id);
    Ok(Some(EndedSession {
        session_id,
        ended_at: now,
    }))
}

pub fn active_session(store: &Store, user_id: UserId) -> Result<Option<SessionId>> {
    store::get_active_session(store.conn(), user_id)
}

/// The active session and its sets, most recent first
pub fn current_session_sets(store: &Store, user_id: UserId) -> Result<Option<(SessionId, Vec<SetRecord>)>> {
    match store::get_active_session(store.conn(), user_id)? {
        Some(session_id) => Ok(Some((session_id, store::list_sets(store.conn(), session_id)?))),
        None => Ok(None),
    }
}

pub fn list_sessions(store: &Store, user_id: UserId) -> Result<Vec<SessionSummary>> {
    store::list_sessions(store.conn(), user_id)
}
