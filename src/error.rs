//! Error types for the batch edit engine.

use thiserror::Error;

/// Result type alias using photobatch's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Invalid input detected before any write
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Referenced entity does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Entity has no stable identity yet
    #[error("Entity is not persisted: {0}")]
    NotPersisted(String),

    /// Date could not be constructed
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// External collaborator failed
    #[error("Hook error: {0}")]
    Hook(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound { kind, id: id.into() }
    }

    /// Whether the error is a transient lock conflict that may succeed on retry.
    ///
    /// SQLite reports contention as `SQLITE_BUSY` or `SQLITE_LOCKED`; other
    /// stores surface it in the message, so "deadlock" is matched as a fallback.
    pub fn is_transient(&self) -> bool {
        let Error::Database(err) = self else {
            return false;
        };
        if let rusqlite::Error::SqliteFailure(e, _) = err {
            if matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ) {
                return true;
            }
        }
        err.to_string().to_lowercase().contains("deadlock")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_failure(code: std::os::raw::c_int, msg: Option<&str>) -> Error {
        Error::Database(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(code),
            msg.map(str::to_string),
        ))
    }

    #[test]
    fn test_busy_and_locked_are_transient() {
        assert!(sqlite_failure(rusqlite::ffi::SQLITE_BUSY, None).is_transient());
        assert!(sqlite_failure(rusqlite::ffi::SQLITE_LOCKED, None).is_transient());
        assert!(!sqlite_failure(rusqlite::ffi::SQLITE_CONSTRAINT, None).is_transient());
    }

    #[test]
    fn test_deadlock_message_is_transient() {
        let err = Error::Database(rusqlite::Error::ToSqlConversionFailure(
            "Deadlock found when trying to get lock".into(),
        ));
        assert!(err.is_transient());
        assert!(!Error::Validation("deadlock".into()).is_transient());
    }
}
