//! Error types for the lift_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for lift_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Entry line is not of the form `exercise: set, set, ...`
    #[error("Malformed entry: {0}")]
    MalformedEntry(String),

    /// A single `<weight>x<reps>` token could not be accepted
    #[error("Invalid set '{token}': {reason}")]
    InvalidToken { token: String, reason: String },

    /// Username is empty after normalization
    #[error("Username must not be empty")]
    InvalidUsername,

    /// The user has no open session to log into
    #[error("No active session")]
    NoActiveSession,

    /// A uniqueness, foreign key or check constraint rejected a write
    #[error("Storage constraint violated: {0}")]
    StorageConstraintViolation(String),

    /// No sets were found for the requested exercise
    #[error("No sets found for exercise '{exercise}'")]
    NoData { exercise: String },

    /// SQLite error other than a constraint violation
    #[error("Database error: {0}")]
    Sqlite(rusqlite::Error),

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether the shell should report the error and carry on.
    ///
    /// Input and lookup errors leave no state behind. Storage and IO errors
    /// are surfaced to the caller as-is.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::MalformedEntry(_)
                | Error::InvalidToken { .. }
                | Error::InvalidUsername
                | Error::NoActiveSession
                | Error::NoData { .. }
        )
    }

    pub(crate) fn invalid_token(token: &str, reason: impl Into<String>) -> Self {
        Error::InvalidToken {
            token: token.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(code, message)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Error::StorageConstraintViolation(
                    message.unwrap_or_else(|| code.to_string()),
                )
            }
            other => Error::Sqlite(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_failure_maps_to_violation() {
        let sqlite_err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE),
            Some("UNIQUE constraint failed: sets.session_id".into()),
        );

        match Error::from(sqlite_err) {
            Error::StorageConstraintViolation(msg) => assert!(msg.contains("UNIQUE")),
            other => panic!("Expected StorageConstraintViolation, got {:?}", other),
        }
    }

    #[test]
    fn test_other_sqlite_errors_pass_through() {
        let err = Error::from(rusqlite::Error::QueryReturnedNoRows);
        assert!(matches!(err, Error::Sqlite(_)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_input_errors_are_recoverable() {
        assert!(Error::NoActiveSession.is_recoverable());
        assert!(Error::MalformedEntry("x".into()).is_recoverable());
        assert!(Error::invalid_token("5x0", "reps must be positive").is_recoverable());
        assert!(!Error::StorageConstraintViolation("fk".into()).is_recoverable());
    }

    #[test]
    fn test_invalid_token_message_names_token() {
        let err = Error::invalid_token("135x", "expected <weight>x<reps>");
        assert_eq!(
            err.to_string(),
            "Invalid set '135x': expected <weight>x<reps>"
        );
    }
}
