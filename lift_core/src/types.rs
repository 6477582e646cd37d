//! Core domain types for the Lift Log system.
//!
//! This module defines the fundamental types used throughout the system:
//! - Identifiers for users and sessions
//! - Persisted entities (users, sessions, sets)
//! - Parsed and pending set rows
//! - Operation results returned to the shell

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

/// Row id of a user
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

/// Row id of a session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Persisted Entities
// ============================================================================

/// A user, identified by a normalized username
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// A training session. `ended_at == None` means the session is still active.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub started_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }
}

/// A session row as listed for the user, with the number of sets logged in it
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session: Session,
    pub set_count: usize,
}

/// A stored set
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SetRecord {
    pub id: i64,
    pub session_id: SessionId,
    pub exercise: String,
    pub weight: f64,
    pub reps: u32,
    pub set_index: u32,
    pub is_one_rm: bool,
}

// ============================================================================
// Set Rows
// ============================================================================

/// A `<weight>x<reps>` token after validation
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParsedSet {
    pub weight: f64,
    pub reps: u32,
}

/// A set waiting to be inserted; the store assigns its index
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NewSet {
    pub weight: f64,
    pub reps: u32,
    pub is_one_rm: bool,
}

impl NewSet {
    pub fn new(weight: f64, reps: u32, is_one_rm: bool) -> Self {
        Self {
            weight,
            reps,
            is_one_rm,
        }
    }
}

// ============================================================================
// Operation Results
// ============================================================================

/// Outcome of starting a session
#[derive(Clone, Debug)]
pub struct StartedSession {
    pub session_id: SessionId,
    pub started_at: DateTime<Utc>,
    /// Number of previously open sessions that were closed first
    pub closed: usize,
}

/// Outcome of logging a batch of sets
#[derive(Clone, Debug, PartialEq)]
pub struct AddedSets {
    pub session_id: SessionId,
    pub exercise: String,
    pub count: usize,
}

/// Outcome of ending the active session
#[derive(Clone, Debug)]
pub struct EndedSession {
    pub session_id: SessionId,
    pub ended_at: DateTime<Utc>,
}

/// Historical performance for one exercise
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExerciseStats {
    pub exercise: String,
    pub count: usize,
    pub max_weight: f64,
    pub reps_at_max: u32,
    /// Heaviest set flagged as a tested one-rep max, if any
    pub tested_one_rm: Option<f64>,
}
